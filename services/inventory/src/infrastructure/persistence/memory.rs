//! 内存仓储
//!
//! 离线运行和测试使用。每次写入后通过 broadcast 推送完整快照。

use async_trait::async_trait;
use lager_errors::{AppError, AppResult};
use tokio::sync::{RwLock, broadcast};

use crate::domain::entities::Material;
use crate::domain::repositories::MaterialRepository;

const CHANNEL_CAPACITY: usize = 16;

pub struct InMemoryMaterialRepository {
    materials: RwLock<Vec<Material>>,
    changes: broadcast::Sender<Vec<Material>>,
}

impl InMemoryMaterialRepository {
    pub fn new() -> Self {
        Self::with_materials(Vec::new())
    }

    pub fn with_materials(materials: Vec<Material>) -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            materials: RwLock::new(materials),
            changes,
        }
    }

    fn publish(&self, snapshot: Vec<Material>) {
        // 没有订阅者时发送失败，忽略
        let _ = self.changes.send(snapshot);
    }
}

impl Default for InMemoryMaterialRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MaterialRepository for InMemoryMaterialRepository {
    async fn list_all(&self) -> AppResult<Vec<Material>> {
        Ok(self.materials.read().await.clone())
    }

    async fn add(&self, material: &Material) -> AppResult<()> {
        let mut materials = self.materials.write().await;
        if materials.iter().any(|m| m.id() == material.id()) {
            return Err(AppError::conflict(format!(
                "material {} already exists",
                material.id()
            )));
        }
        materials.push(material.clone());
        let snapshot = materials.clone();
        drop(materials);

        self.publish(snapshot);
        Ok(())
    }

    async fn update(&self, material: &Material) -> AppResult<()> {
        let mut materials = self.materials.write().await;
        match materials.iter_mut().find(|m| m.id() == material.id()) {
            Some(existing) => *existing = material.clone(),
            None => materials.push(material.clone()),
        }
        let snapshot = materials.clone();
        drop(materials);

        self.publish(snapshot);
        Ok(())
    }

    async fn delete(&self, material: &Material) -> AppResult<()> {
        let mut materials = self.materials.write().await;
        materials.retain(|m| m.id() != material.id());
        let snapshot = materials.clone();
        drop(materials);

        self.publish(snapshot);
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<Vec<Material>>> {
        Some(self.changes.subscribe())
    }
}
