//! SQLite 迁移管理模块
//!
//! 按版本号顺序应用迁移，已应用的迁移用校验和防篡改

use chrono::{DateTime, Utc};
use lager_errors::{AppError, AppResult};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// 迁移记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    /// 迁移版本
    pub version: i64,
    /// 迁移名称
    pub name: String,
    /// 应用时间
    pub applied_at: DateTime<Utc>,
    /// 校验和
    pub checksum: String,
}

/// 迁移定义
///
/// SQLite 的预编译语句一次只执行一条 SQL，每个迁移只包含一条语句。
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub up_sql: String,
    pub checksum: String,
}

impl Migration {
    /// 创建新的迁移
    pub fn new(version: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        let up_sql = up_sql.into();
        let checksum = Self::calculate_checksum(&up_sql);
        Self {
            version,
            name: name.into(),
            up_sql,
            checksum,
        }
    }

    /// 计算校验和（SHA256，忽略首尾空白）
    fn calculate_checksum(sql: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(sql.trim().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// 迁移结果
#[derive(Debug, Default)]
pub struct MigrationResult {
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
    pub errors: Vec<MigrationError>,
}

impl MigrationResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 迁移错误
#[derive(Debug)]
pub struct MigrationError {
    pub version: i64,
    pub name: String,
    pub error: String,
}

/// 迁移管理器
pub struct MigrationManager {
    pool: SqlitePool,
    table_name: String,
}

impl MigrationManager {
    /// 创建新的迁移管理器
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            table_name: "_migrations".to_string(),
        }
    }

    /// 设置迁移表名
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// 初始化迁移表
    pub async fn init(&self) -> AppResult<()> {
        let create_sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL,
                checksum TEXT NOT NULL
            )
            "#,
            self.table_name
        );

        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create migration table: {}", e)))?;

        Ok(())
    }

    /// 获取已应用的迁移
    pub async fn get_applied_migrations(&self) -> AppResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT version, name, applied_at, checksum FROM {} ORDER BY version ASC",
            self.table_name
        );

        sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get migrations: {}", e)))
    }

    /// 获取当前版本
    pub async fn current_version(&self) -> AppResult<Option<i64>> {
        let sql = format!("SELECT MAX(version) FROM {}", self.table_name);

        let row: Option<(Option<i64>,)> = sqlx::query_as(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get current version: {}", e)))?;

        Ok(row.and_then(|(v,)| v))
    }

    /// 在事务中应用单个迁移
    pub async fn apply(&self, migration: &Migration) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query(&migration.up_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::database(format!(
                    "Failed to apply migration {}: {}",
                    migration.version, e
                ))
            })?;

        let insert_sql = format!(
            "INSERT INTO {} (version, name, applied_at, checksum) VALUES (?, ?, ?, ?)",
            self.table_name
        );
        sqlx::query(&insert_sql)
            .bind(migration.version)
            .bind(&migration.name)
            .bind(Utc::now())
            .bind(&migration.checksum)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to record migration: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit migration: {}", e)))?;

        info!(
            version = migration.version,
            name = %migration.name,
            "Migration applied successfully"
        );

        Ok(())
    }

    /// 应用所有待处理的迁移
    ///
    /// 遇到第一个失败的迁移即停止，后续迁移不再执行。
    pub async fn migrate(&self, migrations: &[Migration]) -> AppResult<MigrationResult> {
        self.init().await?;

        let applied = self.get_applied_migrations().await?;
        let mut result = MigrationResult::default();

        let mut sorted: Vec<_> = migrations.iter().collect();
        sorted.sort_by_key(|m| m.version);

        for migration in sorted {
            if let Some(record) = applied.iter().find(|r| r.version == migration.version) {
                if record.checksum != migration.checksum {
                    warn!(
                        version = migration.version,
                        name = %migration.name,
                        "Applied migration has been modified"
                    );
                    result.errors.push(MigrationError {
                        version: migration.version,
                        name: migration.name.clone(),
                        error: "Checksum mismatch - migration has been modified".to_string(),
                    });
                    continue;
                }
                result.skipped.push(migration.version);
                continue;
            }

            match self.apply(migration).await {
                Ok(()) => result.applied.push(migration.version),
                Err(e) => {
                    result.errors.push(MigrationError {
                        version: migration.version,
                        name: migration.name.clone(),
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        Ok(result)
    }

    /// 应用迁移，有任何错误时返回 Err
    pub async fn migrate_strict(&self, migrations: &[Migration]) -> AppResult<MigrationResult> {
        let result = self.migrate(migrations).await?;
        if let Some(first) = result.errors.first() {
            return Err(AppError::database(format!(
                "Migration {} ({}) failed: {}",
                first.version, first.name, first.error
            )));
        }
        Ok(result)
    }
}
