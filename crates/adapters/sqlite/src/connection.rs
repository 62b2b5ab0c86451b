//! SQLite 连接管理

use std::str::FromStr;
use std::time::Duration;

use lager_errors::{AppError, AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use tracing::info;

/// SQLite 连接池配置
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            busy_timeout: Duration::from_millis(5000),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl SqliteConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// 内存数据库每个连接是独立的库，只能使用单连接
    fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// 创建 SQLite 连接池
///
/// 文件库启用 WAL 和外键约束；库文件不存在时自动创建。
pub async fn create_pool(config: &SqliteConfig) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| AppError::database(format!("Invalid database url: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    let (options, max_connections) = if config.is_memory() {
        (options, 1)
    } else {
        (
            options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal),
            config.max_connections,
        )
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|e| AppError::database(format!("Failed to create pool: {}", e)))?;

    info!(
        max_connections,
        busy_timeout_ms = config.busy_timeout.as_millis() as u64,
        "SQLite connection pool created"
    );
    Ok(pool)
}

/// 检查数据库连接
pub async fn check_connection(pool: &SqlitePool) -> AppResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| AppError::database(format!("Database health check failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_pool_is_usable() {
        let pool = create_pool(&SqliteConfig::new("sqlite::memory:")).await.unwrap();
        check_connection(&pool).await.unwrap();
        assert_eq!(pool.options().get_max_connections(), 1);
    }

    #[tokio::test]
    async fn test_file_pool_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lager.db");
        let url = format!("sqlite://{}", path.display());

        let pool = create_pool(&SqliteConfig::new(url).with_max_connections(2))
            .await
            .unwrap();
        check_connection(&pool).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_invalid_url_is_database_error() {
        let result =
            create_pool(&SqliteConfig::new("sqlite:///nonexistent-lager-dir/sub/lager.db")).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
