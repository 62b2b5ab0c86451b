//! 应用启动器
//!
//! 提供统一的启动模式

use std::future::Future;

use lager_config::AppConfig;
use lager_errors::AppResult;
use tracing::info;

use crate::infrastructure::Infrastructure;
use crate::runtime::{init_runtime, shutdown_signal};
use crate::shutdown::ShutdownController;

/// 运行应用
///
/// 依次完成：
/// 1. 加载配置
/// 2. 初始化运行时（日志、指标）
/// 3. 创建基础设施资源
/// 4. 监听 Ctrl+C / SIGTERM 并转为 shutdown 信号
/// 5. 调用 `app` 运行业务逻辑，直到其返回
///
/// ```ignore
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     lager_bootstrap::run("config", |infra, shutdown| async move {
///         // 构建仓储与引擎 ...
///         Ok(())
///     })
///     .await
/// }
/// ```
pub async fn run<F, Fut>(config_dir: &str, app: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(Infrastructure, ShutdownController) -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    let config = AppConfig::load(config_dir)?;
    init_runtime(&config);

    info!("Starting {}", config.app_name);

    let infra = Infrastructure::from_config(config).await?;

    let shutdown = ShutdownController::new();
    let signal_shutdown = shutdown.clone();
    let signal_handle = tokio::spawn(async move {
        shutdown_signal().await;
        signal_shutdown.shutdown();
    });

    let result = app(infra, shutdown.clone()).await;

    shutdown.shutdown();
    signal_handle.abort();
    result?;

    info!("Application stopped");
    Ok(())
}
