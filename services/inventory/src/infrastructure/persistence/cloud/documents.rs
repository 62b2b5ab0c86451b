//! 文档字段映射
//!
//! 云端文档使用带类型标记的字段值（`stringValue`、`booleanValue` 等）。

use chrono::{DateTime, SecondsFormat, Utc};
use lager_errors::{AppError, AppResult};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::domain::entities::{LastAction, LogEntry, Material};
use crate::domain::enums::ActionKind;
use crate::domain::value_objects::{LogEntryId, MaterialId, SerialNumber};

/// 单个文档
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    /// 完整资源名，最后一段为文档 ID
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn document_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// 列表响应（分页）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    pub next_page_token: Option<String>,
}

// ========== 写入 ==========

fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

fn optional_string_value(value: Option<&str>) -> Value {
    match value {
        Some(v) => string_value(v),
        None => json!({ "nullValue": null }),
    }
}

fn timestamp_value(value: &DateTime<Utc>) -> Value {
    json!({ "timestampValue": value.to_rfc3339_opts(SecondsFormat::Micros, true) })
}

fn map_value(fields: Map<String, Value>) -> Value {
    json!({ "mapValue": { "fields": fields } })
}

fn log_entry_value(entry: &LogEntry) -> Value {
    let mut fields = Map::new();
    fields.insert("id".into(), string_value(&entry.id.to_string()));
    fields.insert("timestamp".into(), timestamp_value(&entry.timestamp));
    fields.insert("actor".into(), string_value(&entry.actor));
    fields.insert("description".into(), string_value(&entry.description));
    map_value(fields)
}

fn last_action_value(action: Option<&LastAction>) -> Value {
    let Some(action) = action else {
        return json!({ "nullValue": null });
    };
    let mut fields = Map::new();
    fields.insert("kind".into(), string_value(action.kind.as_str()));
    fields.insert("actor".into(), string_value(&action.actor));
    fields.insert(
        "previousHolder".into(),
        optional_string_value(action.previous_holder.as_deref()),
    );
    map_value(fields)
}

/// 物料转换为文档字段
pub fn material_to_fields(material: &Material) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(
        "serialNumber".into(),
        optional_string_value(material.serial_number().map(SerialNumber::as_str)),
    );
    fields.insert("label".into(), string_value(material.label()));
    fields.insert("inStock".into(), json!({ "booleanValue": material.in_stock() }));
    fields.insert("note".into(), optional_string_value(material.note()));
    fields.insert("position".into(), optional_string_value(material.position()));
    fields.insert(
        "eventLog".into(),
        json!({
            "arrayValue": {
                "values": material.event_log().iter().map(log_entry_value).collect::<Vec<_>>()
            }
        }),
    );
    fields.insert("lastAction".into(), last_action_value(material.last_action()));
    fields
}

// ========== 读取 ==========

fn get_string(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)?
        .get("stringValue")?
        .as_str()
        .map(str::to_string)
}

fn get_bool(fields: &Map<String, Value>, key: &str) -> Option<bool> {
    fields.get(key)?.get("booleanValue")?.as_bool()
}

fn get_timestamp(fields: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let raw = fields.get(key)?.get("timestampValue")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn get_map<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    fields.get(key)?.get("mapValue")?.get("fields")?.as_object()
}

fn get_array<'a>(fields: &'a Map<String, Value>, key: &str) -> Vec<&'a Value> {
    fields
        .get(key)
        .and_then(|v| v.get("arrayValue"))
        .and_then(|v| v.get("values"))
        .and_then(Value::as_array)
        .map(|values| values.iter().collect())
        .unwrap_or_default()
}

/// 缺少 ID 或时间戳的条目使用确定值，保证同一文档每次加载结果相同
fn log_entry_from_value(material: &MaterialId, seq: usize, value: &Value) -> Option<LogEntry> {
    let fields = value.get("mapValue")?.get("fields")?.as_object()?;
    let id = get_string(fields, "id")
        .and_then(|id| id.parse::<LogEntryId>().ok())
        .unwrap_or_else(|| LogEntryId::derived(material, seq));
    Some(LogEntry {
        id,
        timestamp: get_timestamp(fields, "timestamp").unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        actor: get_string(fields, "actor").unwrap_or_default(),
        description: get_string(fields, "description").unwrap_or_default(),
    })
}

/// 文档转换为物料
///
/// 文档 ID 原样作为物料 ID（可以是自动生成的非 UUID 字符串）。
/// 缺失的可选字段按未设置处理；名称必须存在。
pub fn material_from_document(document: &Document) -> AppResult<Material> {
    let id: MaterialId = document.document_id().parse().map_err(|e| {
        AppError::external_service(format!("Invalid document id {}: {}", document.name, e))
    })?;
    let fields = &document.fields;

    let label = get_string(fields, "label").ok_or_else(|| {
        AppError::external_service(format!("Document {} has no label", document.name))
    })?;
    let serial_number =
        SerialNumber::parse_optional(get_string(fields, "serialNumber").as_deref()).unwrap_or(None);
    let in_stock = get_bool(fields, "inStock").unwrap_or(true);

    let event_log = get_array(fields, "eventLog")
        .into_iter()
        .enumerate()
        .filter_map(|(seq, value)| log_entry_from_value(&id, seq, value))
        .collect();

    let last_action = get_map(fields, "lastAction").and_then(|action| {
        let kind = get_string(action, "kind").and_then(|k| ActionKind::parse(&k))?;
        Some(
            LastAction::new(kind, get_string(action, "actor").unwrap_or_default())
                .with_previous_holder(get_string(action, "previousHolder")),
        )
    });

    Ok(Material::from_parts(
        id,
        serial_number,
        label,
        in_stock,
        get_string(fields, "note"),
        get_string(fields, "position"),
        event_log,
        last_action,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document_for(material: &Material) -> Document {
        Document {
            name: format!("projects/p/databases/(default)/documents/materials/{}", material.id()),
            fields: material_to_fields(material),
        }
    }

    #[test]
    fn test_fields_use_typed_values() {
        let material = Material::new("Drill", Some(SerialNumber::new("A1").unwrap()));
        let fields = material_to_fields(&material);

        assert_eq!(fields["label"], json!({ "stringValue": "Drill" }));
        assert_eq!(fields["inStock"], json!({ "booleanValue": true }));
        assert_eq!(fields["note"], json!({ "nullValue": null }));
        assert_eq!(fields["eventLog"], json!({ "arrayValue": { "values": [] } }));
    }

    #[test]
    fn test_document_maps_back_to_material() {
        let mut material = Material::new("Saw", Some(SerialNumber::new("B2").unwrap()))
            .with_holder("Bob")
            .with_note("left handed");
        material.check_in("System");

        let restored = material_from_document(&document_for(&material)).unwrap();
        assert_eq!(restored.id(), material.id());
        assert_eq!(restored.serial_str(), "B2");
        assert_eq!(restored.note(), Some("left handed"));
        assert!(restored.in_stock());
        assert_eq!(restored.event_log().len(), 1);
        assert_eq!(restored.event_log()[0].id, material.event_log()[0].id);
        assert_eq!(restored.last_action(), material.last_action());
    }

    #[test]
    fn test_document_without_label_is_rejected() {
        let document = Document {
            name: format!("documents/materials/{}", MaterialId::new()),
            fields: Map::new(),
        };
        assert!(material_from_document(&document).is_err());
    }

    #[test]
    fn test_generated_document_id_is_kept() {
        let document: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/materials/Xk3fQ9aZb2LmN0pR7sTu",
            "fields": {
                "label": { "stringValue": "Ladder" },
                "serialNumber": { "stringValue": "L7" },
                "inStock": { "booleanValue": false },
                "position": { "stringValue": "Dana" },
                "eventLog": { "arrayValue": { "values": [
                    { "mapValue": { "fields": {
                        "actor": { "stringValue": "Dana" },
                        "description": { "stringValue": "issued via scan to Dana" }
                    } } }
                ] } }
            }
        }))
        .unwrap();

        let first = material_from_document(&document).unwrap();
        assert_eq!(first.id().as_str(), "Xk3fQ9aZb2LmN0pR7sTu");
        assert_eq!(first.holder(), Some("Dana"));
        assert_eq!(first.event_log().len(), 1);

        // 缺少 ID 的日志条目每次加载得到相同结果
        let second = material_from_document(&document).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_list_response_without_documents() {
        let response: ListDocumentsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.documents.is_empty());
        assert!(response.next_page_token.is_none());
    }
}
