//! telemetry - 可观测性库

use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化 tracing
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// 初始化 JSON 格式的 tracing（生产环境）
pub fn init_tracing_json(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// 指标导出错误
pub type MetricsError = metrics_exporter_prometheus::BuildError;

/// 初始化 Prometheus metrics 导出
///
/// 在 `addr` 上启动 HTTP 监听，暴露 `/metrics`。需要在 tokio 运行时内调用。
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    describe_metrics();
    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// 注册指标描述
fn describe_metrics() {
    metrics::describe_counter!("lager_scans_total", "Scanner codes processed, by outcome");
    metrics::describe_counter!("lager_undo_total", "Undo requests, by outcome");
    metrics::describe_counter!(
        "lager_persistence_failures_total",
        "Background repository writes that failed, by operation"
    );
    metrics::describe_gauge!("lager_materials", "Materials held in the in-memory snapshot");
}
