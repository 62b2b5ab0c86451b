//! 库存表结构迁移

use lager_adapter_sqlite::Migration;

/// 按版本排列的迁移，每个迁移一条语句
pub fn inventory_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "create_materials",
            r#"
            CREATE TABLE IF NOT EXISTS materials (
                id TEXT PRIMARY KEY,
                serial_number TEXT,
                label TEXT NOT NULL,
                in_stock INTEGER NOT NULL,
                note TEXT,
                position TEXT,
                last_action TEXT,
                last_actor TEXT,
                previous_holder TEXT,
                updated_at TEXT NOT NULL
            )
            "#,
        ),
        Migration::new(
            2,
            "create_material_log",
            r#"
            CREATE TABLE IF NOT EXISTS material_log (
                id TEXT PRIMARY KEY,
                material_id TEXT NOT NULL REFERENCES materials (id) ON DELETE CASCADE,
                seq INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                actor TEXT NOT NULL,
                description TEXT NOT NULL
            )
            "#,
        ),
        Migration::new(
            3,
            "index_material_log",
            "CREATE INDEX IF NOT EXISTS idx_material_log_material ON material_log (material_id, seq)",
        ),
        Migration::new(
            4,
            "index_materials_serial",
            "CREATE INDEX IF NOT EXISTS idx_materials_serial ON materials (serial_number)",
        ),
    ]
}
