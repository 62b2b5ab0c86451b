//! 基础设施资源管理
//!
//! 根据配置选择本地 SQLite 或云端文档库，并创建对应的连接资源

use std::time::Duration;

use lager_adapter_sqlite::{SqliteConfig, check_connection, create_pool};
use lager_config::AppConfig;
use lager_errors::{AppError, AppResult};
use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use tracing::info;

use crate::retry::{RetryConfig, with_conditional_retry};

/// 基础设施资源容器
pub struct Infrastructure {
    /// 应用配置
    config: AppConfig,
    /// SQLite 连接池（本地模式）
    sqlite_pool: Option<SqlitePool>,
    /// HTTP 客户端（云端模式）
    http_client: Option<reqwest::Client>,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（带重试）
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        if let Some(cloud) = &config.cloud {
            let client = reqwest::Client::builder()
                .user_agent(concat!("lager/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;
            info!(
                project_id = %cloud.project_id,
                collection = %cloud.collection,
                "Cloud backend configured"
            );
            return Ok(Self {
                config,
                sqlite_pool: None,
                http_client: Some(client),
            });
        }

        let sqlite_config = SqliteConfig::new(config.database.url.expose_secret())
            .with_max_connections(config.database.max_connections)
            .with_busy_timeout(Duration::from_millis(config.database.busy_timeout_ms));

        let pool = with_conditional_retry(
            &RetryConfig::default(),
            "SQLite connection",
            || {
                let cfg = sqlite_config.clone();
                async move {
                    let pool = create_pool(&cfg).await?;
                    check_connection(&pool).await?;
                    Ok::<_, AppError>(pool)
                }
            },
            AppError::is_transient,
        )
        .await?;

        Ok(Self {
            config,
            sqlite_pool: Some(pool),
            http_client: None,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn sqlite_pool(&self) -> Option<&SqlitePool> {
        self.sqlite_pool.as_ref()
    }

    pub fn http_client(&self) -> Option<&reqwest::Client> {
        self.http_client.as_ref()
    }

    /// 关闭连接资源
    pub async fn close(&self) {
        if let Some(pool) = &self.sqlite_pool {
            pool.close().await;
            info!("SQLite pool closed");
        }
    }
}
