//! Graceful Shutdown

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shutdown 控制器
///
/// 基于 `CancellationToken`，后台任务持有子 token，关闭时逐级取消。
#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发关闭
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("Triggering shutdown");
        }
        self.token.cancel();
    }

    /// 为后台任务派生子 token
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// 等待关闭信号
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }
}

/// 运行带有 graceful shutdown 的任务
///
/// 任务先结束则返回其结果；关闭信号先到则放弃任务并返回 `Ok(None)`。
pub async fn run_with_shutdown<Fut, T, E>(
    shutdown: &ShutdownController,
    task: Fut,
) -> Result<Option<T>, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    tokio::select! {
        result = task => result.map(Some),
        _ = shutdown.wait() => {
            info!("Task cancelled due to shutdown");
            Ok(None)
        }
    }
}
