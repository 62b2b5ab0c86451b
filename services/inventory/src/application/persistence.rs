//! 后台持久化
//!
//! 每次写入一个后台任务，调用方不等待。失败只记录日志和计数，
//! 不重试，也不回滚内存中的乐观更新；下一次全量刷新或推送会纠正。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::domain::entities::Material;
use crate::domain::repositories::MaterialRepository;

/// 写操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Add,
    Update,
    Delete,
}

impl WriteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOp::Add => "add",
            WriteOp::Update => "update",
            WriteOp::Delete => "delete",
        }
    }
}

/// 持久化分发器
///
/// 并发数不设上限。同一物料的两次写入可能乱序落盘，以最后完成者为准。
pub struct PersistenceDispatcher {
    repo: Arc<dyn MaterialRepository>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl PersistenceDispatcher {
    pub fn new(repo: Arc<dyn MaterialRepository>, shutdown: CancellationToken) -> Self {
        Self {
            repo,
            tracker: TaskTracker::new(),
            shutdown,
        }
    }

    /// 提交写入，立即返回
    pub fn dispatch(&self, op: WriteOp, material: Material) {
        let repo = Arc::clone(&self.repo);
        let shutdown = self.shutdown.clone();

        self.tracker.spawn(async move {
            let write = async {
                match op {
                    WriteOp::Add => repo.add(&material).await,
                    WriteOp::Update => repo.update(&material).await,
                    WriteOp::Delete => repo.delete(&material).await,
                }
            };

            tokio::select! {
                result = write => match result {
                    Ok(()) => {
                        debug!(op = op.as_str(), material_id = %material.id(), "Material persisted");
                    }
                    Err(e) => {
                        metrics::counter!(
                            "lager_persistence_failures_total",
                            "op" => op.as_str(),
                            "kind" => e.kind()
                        )
                        .increment(1);
                        error!(
                            op = op.as_str(),
                            kind = e.kind(),
                            material_id = %material.id(),
                            serial = material.serial_str(),
                            error = %e,
                            "Failed to persist material"
                        );
                    }
                },
                _ = shutdown.cancelled() => {
                    debug!(op = op.as_str(), material_id = %material.id(), "Persistence task cancelled");
                }
            }
        });
    }

    /// 正在执行的写入数
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// 等待当前所有写入完成
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// 取消未完成的写入并等待任务退出
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
