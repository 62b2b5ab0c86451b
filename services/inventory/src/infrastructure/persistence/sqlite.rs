//! SQLite 仓储实现
//!
//! 物料存 `materials`，日志逐条存 `material_log`（按物料 ID + 序号，只追加）。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use lager_adapter_sqlite::MigrationManager;
use lager_errors::{AppError, AppResult};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::domain::entities::{LogEntry, Material};
use crate::domain::repositories::MaterialRepository;
use crate::domain::value_objects::MaterialId;

use super::converters::{log_entry_from_row, material_from_row};
use super::migrations::inventory_migrations;
use super::rows::{LogRow, MaterialRow};

pub struct SqliteMaterialRepository {
    pool: SqlitePool,
}

impl SqliteMaterialRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 执行表结构迁移
    pub async fn migrate(&self) -> AppResult<()> {
        let result = MigrationManager::new(self.pool.clone())
            .migrate_strict(&inventory_migrations())
            .await?;
        info!(
            applied = result.applied.len(),
            skipped = result.skipped.len(),
            "Inventory schema ready"
        );
        Ok(())
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))
    }

    /// 写入尚未保存的日志条目
    async fn insert_log_entries(
        tx: &mut Transaction<'static, Sqlite>,
        material: &Material,
    ) -> AppResult<()> {
        let material_id = material.id().to_string();
        for (seq, entry) in material.event_log().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO material_log (id, material_id, seq, timestamp, actor, description)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.id.to_string())
            .bind(&material_id)
            .bind(seq as i64)
            .bind(entry.timestamp)
            .bind(&entry.actor)
            .bind(&entry.description)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to save material log: {}", e)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl MaterialRepository for SqliteMaterialRepository {
    async fn list_all(&self) -> AppResult<Vec<Material>> {
        let rows = sqlx::query_as::<_, MaterialRow>(
            r#"
            SELECT id, serial_number, label, in_stock, note, position,
                   last_action, last_actor, previous_holder
            FROM materials
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list materials: {}", e)))?;

        let log_rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT id, material_id, timestamp, actor, description
            FROM material_log
            ORDER BY material_id, seq
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list material logs: {}", e)))?;

        let mut logs: HashMap<String, Vec<LogEntry>> = HashMap::new();
        for row in log_rows {
            let material_id = row.material_id.clone();
            logs.entry(material_id)
                .or_default()
                .push(log_entry_from_row(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let log = logs.remove(&row.id).unwrap_or_default();
                material_from_row(row, log)
            })
            .collect()
    }

    async fn add(&self, material: &Material) -> AppResult<()> {
        let mut tx = self.begin().await?;
        let last_action = material.last_action();

        sqlx::query(
            r#"
            INSERT INTO materials (
                id, serial_number, label, in_stock, note, position,
                last_action, last_actor, previous_holder, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(material.id().to_string())
        .bind(material.serial_number().map(|s| s.as_str()))
        .bind(material.label())
        .bind(material.in_stock())
        .bind(material.note())
        .bind(material.position())
        .bind(last_action.map(|a| a.kind.as_str()))
        .bind(last_action.map(|a| a.actor.as_str()))
        .bind(last_action.and_then(|a| a.previous_holder.as_deref()))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to save material: {}", e)))?;

        Self::insert_log_entries(&mut tx, material).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit material: {}", e)))?;
        Ok(())
    }

    async fn update(&self, material: &Material) -> AppResult<()> {
        let mut tx = self.begin().await?;
        let last_action = material.last_action();

        sqlx::query(
            r#"
            INSERT INTO materials (
                id, serial_number, label, in_stock, note, position,
                last_action, last_actor, previous_holder, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                serial_number = excluded.serial_number,
                label = excluded.label,
                in_stock = excluded.in_stock,
                note = excluded.note,
                position = excluded.position,
                last_action = excluded.last_action,
                last_actor = excluded.last_actor,
                previous_holder = excluded.previous_holder,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(material.id().to_string())
        .bind(material.serial_number().map(|s| s.as_str()))
        .bind(material.label())
        .bind(material.in_stock())
        .bind(material.note())
        .bind(material.position())
        .bind(last_action.map(|a| a.kind.as_str()))
        .bind(last_action.map(|a| a.actor.as_str()))
        .bind(last_action.and_then(|a| a.previous_holder.as_deref()))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to update material: {}", e)))?;

        Self::insert_log_entries(&mut tx, material).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit material: {}", e)))?;
        Ok(())
    }

    async fn delete(&self, material: &Material) -> AppResult<()> {
        let mut tx = self.begin().await?;
        let id = material.id().to_string();

        sqlx::query("DELETE FROM material_log WHERE material_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete material log: {}", e)))?;

        sqlx::query("DELETE FROM materials WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete material: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit delete: {}", e)))?;
        Ok(())
    }

    async fn fetch_log(&self, id: &MaterialId) -> AppResult<Option<Vec<LogEntry>>> {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT id, material_id, timestamp, actor, description
            FROM material_log
            WHERE material_id = ?
            ORDER BY seq
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to fetch material log: {}", e)))?;

        let entries = rows
            .into_iter()
            .map(log_entry_from_row)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Some(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::SerialNumber;
    use lager_adapter_sqlite::{SqliteConfig, create_pool};

    async fn repository() -> SqliteMaterialRepository {
        let pool = create_pool(&SqliteConfig::new("sqlite::memory:")).await.unwrap();
        let repo = SqliteMaterialRepository::new(pool);
        repo.migrate().await.unwrap();
        repo
    }

    fn drill() -> Material {
        Material::new("Drill", Some(SerialNumber::new("A1").unwrap())).with_note("18V")
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let repo = repository().await;
        let material = drill();
        repo.add(&material).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all, vec![material]);
    }

    #[tokio::test]
    async fn test_update_appends_log_and_keeps_last_action() {
        let repo = repository().await;
        let mut material = drill().with_holder("Bob");
        repo.add(&material).await.unwrap();

        material.check_in("System");
        repo.update(&material).await.unwrap();
        material.check_out("Alice");
        repo.update(&material).await.unwrap();

        let stored = repo.list_all().await.unwrap().remove(0);
        assert_eq!(stored.event_log().len(), 2);
        assert_eq!(stored.position(), Some("Alice"));
        assert_eq!(stored.last_action(), material.last_action());

        let log = repo.fetch_log(material.id()).await.unwrap().unwrap();
        let descriptions: Vec<&str> = log.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["received via scan from System", "issued via scan to Alice"]
        );
        assert_eq!(log[0].id, material.event_log()[0].id);
    }

    #[tokio::test]
    async fn test_update_unknown_material_inserts() {
        let repo = repository().await;
        let material = drill();
        repo.update(&material).await.unwrap();
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_material_and_log() {
        let repo = repository().await;
        let mut material = drill();
        material.check_out("Alice");
        repo.add(&material).await.unwrap();

        repo.delete(&material).await.unwrap();
        assert!(repo.list_all().await.unwrap().is_empty());
        assert!(repo.fetch_log(material.id()).await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_migrate_is_repeatable() {
        let repo = repository().await;
        repo.migrate().await.unwrap();
    }
}
