//! 物料仓储接口

use async_trait::async_trait;
use lager_errors::AppResult;
use tokio::sync::broadcast;

use crate::domain::entities::{LogEntry, Material};
use crate::domain::value_objects::MaterialId;

/// 物料仓储接口
///
/// 持久化的权威来源。`add` / `update` 按 ID upsert，`delete` 同时删除日志。
#[async_trait]
pub trait MaterialRepository: Send + Sync {
    /// 全量快照
    async fn list_all(&self) -> AppResult<Vec<Material>>;

    /// 新增物料
    async fn add(&self, material: &Material) -> AppResult<()>;

    /// 更新物料（含新增的日志条目）
    async fn update(&self, material: &Material) -> AppResult<()>;

    /// 删除物料及其全部日志
    async fn delete(&self, material: &Material) -> AppResult<()>;

    /// 变更推送
    ///
    /// 推送型后端返回接收端，每条消息为一次完整快照。
    /// 本地后端返回 `None`，依赖显式刷新。
    fn subscribe(&self) -> Option<broadcast::Receiver<Vec<Material>>> {
        None
    }

    /// 单独加载日志
    ///
    /// 日志与快照分开存储的后端返回 `Some`，否则 `None` 表示日志已随快照加载。
    async fn fetch_log(&self, _id: &MaterialId) -> AppResult<Option<Vec<LogEntry>>> {
        Ok(None)
    }
}
