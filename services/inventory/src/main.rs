//! lager-inventory - 扫码出入库控制台

use std::sync::Arc;

use lager_bootstrap::{
    Infrastructure, RetryConfig, ShutdownController, run_with_shutdown, with_retry,
};
use lager_errors::{AppError, AppResult};
use lager_inventory::api::{Console, Reply};
use lager_inventory::application::InventoryEngine;
use lager_inventory::domain::enums::ScanMode;
use lager_inventory::domain::repositories::MaterialRepository;
use lager_inventory::infrastructure::persistence::{
    CloudMaterialRepository, SqliteMaterialRepository,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lager_bootstrap::run("config", |infra: Infrastructure, shutdown: ShutdownController| async move {
        info!("Initializing inventory console...");

        let watcher_token = shutdown.child_token();
        let repo = build_repository(&infra, watcher_token).await?;

        let scanner = &infra.config().scanner;
        let engine = Arc::new(
            InventoryEngine::new(repo)
                .with_mode(ScanMode::from(scanner.default_mode))
                .with_actor(scanner.default_actor.clone()),
        );

        let retry_config = RetryConfig::default();
        let initial_load = with_retry(&retry_config, "initial load", || engine.refresh());
        let Some(count) = run_with_shutdown(&shutdown, initial_load).await? else {
            engine.shutdown().await;
            infra.close().await;
            return Ok(());
        };
        info!(count, "Materials loaded");

        if engine.start_sync() {
            info!("Live sync enabled");
        }

        let console = Console::new(Arc::clone(&engine), infra.config().protocol.clone());
        let result = run_console(&console, &shutdown).await;

        engine.shutdown().await;
        infra.close().await;
        result
    })
    .await
}

async fn build_repository(
    infra: &Infrastructure,
    watcher_token: CancellationToken,
) -> AppResult<Arc<dyn MaterialRepository>> {
    let config = infra.config();
    if config.uses_cloud() {
        let (Some(cloud), Some(client)) = (&config.cloud, infra.http_client()) else {
            return Err(AppError::internal("cloud backend configured without HTTP client"));
        };
        let repo = Arc::new(CloudMaterialRepository::new(client.clone(), cloud));
        Arc::clone(&repo).start_watcher(watcher_token);
        info!("Using cloud repository");
        return Ok(repo);
    }

    let pool = infra
        .sqlite_pool()
        .cloned()
        .ok_or_else(|| AppError::internal("no storage backend configured"))?;
    let repo = SqliteMaterialRepository::new(pool);
    repo.migrate().await?;
    info!("Using SQLite repository");
    Ok(Arc::new(repo))
}

/// 逐行读取标准输入，直到 `:quit`、EOF 或关闭信号
async fn run_console(console: &Console, shutdown: &ShutdownController) -> AppResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line
                .map_err(|e| AppError::internal(format!("Failed to read input: {}", e)))?,
            _ = shutdown.wait() => break,
        };

        let Some(line) = line else {
            break;
        };

        match console.handle_line(&line).await {
            Reply::Lines(output) => {
                for text in output {
                    println!("{text}");
                }
            }
            Reply::Quit => break,
        }
    }

    info!("Console closed");
    Ok(())
}
