//! 数据库行到领域对象的转换

use lager_errors::{AppError, AppResult};

use crate::domain::entities::{LastAction, LogEntry, Material};
use crate::domain::enums::ActionKind;
use crate::domain::value_objects::{LogEntryId, MaterialId, SerialNumber};

use super::rows::{LogRow, MaterialRow};

/// 将 MaterialRow 和其日志转换为 Material
pub fn material_from_row(row: MaterialRow, event_log: Vec<LogEntry>) -> AppResult<Material> {
    let id: MaterialId = row
        .id
        .parse()
        .map_err(|e| AppError::database(format!("Invalid material id {}: {}", row.id, e)))?;

    // 历史数据中的非法序列号按未设置处理
    let serial_number = SerialNumber::parse_optional(row.serial_number.as_deref()).unwrap_or(None);

    let last_action = match (row.last_action.as_deref().and_then(ActionKind::parse), row.last_actor) {
        (Some(kind), actor) => Some(
            LastAction::new(kind, actor.unwrap_or_default()).with_previous_holder(row.previous_holder),
        ),
        (None, _) => None,
    };

    Ok(Material::from_parts(
        id,
        serial_number,
        row.label,
        row.in_stock,
        row.note,
        row.position,
        event_log,
        last_action,
    ))
}

/// 将 LogRow 转换为 LogEntry
pub fn log_entry_from_row(row: LogRow) -> AppResult<LogEntry> {
    let id: LogEntryId = row
        .id
        .parse()
        .map_err(|e| AppError::database(format!("Invalid log entry id {}: {}", row.id, e)))?;

    Ok(LogEntry {
        id,
        timestamp: row.timestamp,
        actor: row.actor,
        description: row.description,
    })
}
