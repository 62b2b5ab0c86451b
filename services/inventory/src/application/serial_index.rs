//! 序列号索引
//!
//! 由物料列表派生，列表变化时整体重建，不做增量维护。

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::domain::entities::Material;

/// 序列号 → 列表下标
///
/// 有序映射，前缀查找的结果因此确定：取字典序最小的匹配序列号。
/// 重复序列号以列表中最后出现的物料为准。
#[derive(Debug, Clone, Default)]
pub struct SerialIndex {
    entries: BTreeMap<String, usize>,
}

impl SerialIndex {
    pub fn build(materials: &[Material]) -> Self {
        let mut entries = BTreeMap::new();
        for (position, material) in materials.iter().enumerate() {
            if let Some(serial) = material.serial_number() {
                entries.insert(serial.as_str().to_string(), position);
            }
        }
        Self { entries }
    }

    /// 精确匹配优先，其次前缀匹配
    pub fn lookup(&self, code: &str) -> Option<usize> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }

        if let Some(&position) = self.entries.get(code) {
            return Some(position);
        }

        self.entries
            .range::<str, _>((Bound::Included(code), Bound::Unbounded))
            .next()
            .filter(|(serial, _)| serial.starts_with(code))
            .map(|(_, &position)| position)
    }

    /// 仅精确匹配
    pub fn exact(&self, serial: &str) -> Option<usize> {
        self.entries.get(serial.trim()).copied()
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.entries.contains_key(serial.trim())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
