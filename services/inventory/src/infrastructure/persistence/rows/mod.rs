//! 数据库行映射结构

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// 物料数据库行
#[derive(Debug, FromRow)]
pub struct MaterialRow {
    pub id: String,
    pub serial_number: Option<String>,
    pub label: String,
    pub in_stock: bool,
    pub note: Option<String>,
    pub position: Option<String>,
    pub last_action: Option<String>,
    pub last_actor: Option<String>,
    pub previous_holder: Option<String>,
}

/// 物料日志数据库行
#[derive(Debug, FromRow)]
pub struct LogRow {
    pub id: String,
    pub material_id: String,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub description: String,
}
