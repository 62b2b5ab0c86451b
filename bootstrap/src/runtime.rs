//! 运行时初始化

use std::net::SocketAddr;

use lager_config::AppConfig;
use lager_telemetry::{init_metrics, init_tracing, init_tracing_json};
use tracing::{info, warn};

/// 初始化运行时（日志、指标）
pub fn init_runtime(config: &AppConfig) {
    if config.is_production() {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_tracing(&config.telemetry.log_level);
    }

    if let Some(addr) = &config.telemetry.metrics_addr {
        match addr.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    warn!(error = %e, "Failed to start metrics exporter, continuing without it");
                }
            }
            Err(e) => warn!(metrics_addr = %addr, error = %e, "Invalid metrics address"),
        }
    }

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        "Runtime initialized"
    );
}

/// 等待关闭信号
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
