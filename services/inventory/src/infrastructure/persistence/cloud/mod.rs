//! 云端仓储实现
//!
//! 文档库 REST 接口：每个物料一个文档，文档 ID 为物料 ID，日志内嵌在文档中。
//! REST 接口没有推送，订阅由轮询任务提供：快照变化时广播。

mod documents;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lager_config::CloudConfig;
use lager_errors::{AppError, AppResult};
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::entities::Material;
use crate::domain::repositories::MaterialRepository;
use crate::domain::value_objects::MaterialId;

use documents::{ListDocumentsResponse, material_from_document, material_to_fields};

const PAGE_SIZE: u32 = 300;
const CHANNEL_CAPACITY: usize = 16;

pub struct CloudMaterialRepository {
    client: reqwest::Client,
    collection_url: String,
    api_key: Option<Secret<String>>,
    poll_interval: Duration,
    changes: broadcast::Sender<Vec<Material>>,
}

impl CloudMaterialRepository {
    pub fn new(client: reqwest::Client, config: &CloudConfig) -> Self {
        let collection_url = format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            config.base_url.trim_end_matches('/'),
            config.project_id,
            config.collection
        );
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            client,
            collection_url,
            api_key: config.api_key.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            changes,
        }
    }

    fn document_url(&self, id: &MaterialId) -> String {
        format!("{}/{}", self.collection_url, id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key.expose_secret().as_str())]),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> AppResult<Response> {
        let response = self.authorize(request).send().await.map_err(|e| {
            AppError::external_service(format!("{} request failed: {}", operation, e))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            reqwest::StatusCode::NOT_FOUND => {
                AppError::not_found(format!("{} failed: {}", operation, body))
            }
            reqwest::StatusCode::CONFLICT => {
                AppError::conflict(format!("{} failed: {}", operation, body))
            }
            _ => AppError::external_service(format!("{} failed with {}: {}", operation, status, body)),
        })
    }

    async fn write(&self, material: &Material, create_only: bool) -> AppResult<()> {
        let mut request = self
            .client
            .patch(self.document_url(material.id()))
            .json(&json!({ "fields": material_to_fields(material) }));
        if create_only {
            request = request.query(&[("currentDocument.exists", "false")]);
        }
        self.send(request, "write material").await?;
        Ok(())
    }

    /// 快照与上次不同时广播，返回是否已广播
    fn publish_if_changed(&self, detector: &mut ChangeDetector, snapshot: Vec<Material>) -> bool {
        if !detector.observe(&snapshot) {
            return false;
        }
        debug!(count = snapshot.len(), "Cloud snapshot changed");
        // 没有订阅者时发送失败，忽略
        let _ = self.changes.send(snapshot);
        true
    }

    /// 启动轮询任务，快照与上次不同时广播
    pub fn start_watcher(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.poll_interval.as_secs(), "Cloud watcher started");
            let mut ticker = tokio::time::interval(self.poll_interval);
            let mut detector = ChangeDetector::default();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.list_all().await {
                            Ok(snapshot) => {
                                self.publish_if_changed(&mut detector, snapshot);
                            }
                            Err(e) => warn!(error = %e, "Failed to poll cloud snapshot"),
                        }
                    }
                    _ = shutdown.cancelled() => break,
                }
            }
            info!("Cloud watcher stopped");
        })
    }
}

/// 记住上次轮询到的快照
#[derive(Debug, Default)]
struct ChangeDetector {
    last: Option<Vec<Material>>,
}

impl ChangeDetector {
    /// 与上次不同时记住新快照并返回 true
    fn observe(&mut self, snapshot: &[Material]) -> bool {
        if self.last.as_deref() == Some(snapshot) {
            return false;
        }
        self.last = Some(snapshot.to_vec());
        true
    }
}

#[async_trait]
impl MaterialRepository for CloudMaterialRepository {
    async fn list_all(&self) -> AppResult<Vec<Material>> {
        let mut materials = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&self.collection_url)
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListDocumentsResponse = self
                .send(request, "list materials")
                .await?
                .json()
                .await
                .map_err(|e| AppError::external_service(format!("Invalid list response: {}", e)))?;

            for document in &page.documents {
                match material_from_document(document) {
                    Ok(material) => materials.push(material),
                    Err(e) => warn!(document = %document.name, error = %e, "Skipping malformed document"),
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(materials)
    }

    async fn add(&self, material: &Material) -> AppResult<()> {
        self.write(material, true).await
    }

    async fn update(&self, material: &Material) -> AppResult<()> {
        self.write(material, false).await
    }

    async fn delete(&self, material: &Material) -> AppResult<()> {
        let request = self.client.delete(self.document_url(material.id()));
        self.send(request, "delete material").await?;
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<Vec<Material>>> {
        Some(self.changes.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CloudConfig {
        CloudConfig {
            base_url: "https://docs.example.test/v1/".into(),
            project_id: "werkstatt".into(),
            collection: "materials".into(),
            api_key: None,
            poll_interval_secs: 0,
        }
    }

    #[test]
    fn test_document_urls() {
        let repo = CloudMaterialRepository::new(reqwest::Client::new(), &config());
        let id = MaterialId::new();
        assert_eq!(
            repo.document_url(&id),
            format!(
                "https://docs.example.test/v1/projects/werkstatt/databases/(default)/documents/materials/{}",
                id
            )
        );
        assert_eq!(repo.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_change_detector_ignores_identical_snapshots() {
        let drill = Material::new("Drill", None);
        let mut detector = ChangeDetector::default();

        assert!(detector.observe(&[]));
        assert!(!detector.observe(&[]));
        assert!(detector.observe(std::slice::from_ref(&drill)));
        assert!(!detector.observe(std::slice::from_ref(&drill)));

        let mut moved = drill.clone();
        moved.set_position(Some("Van 2".into()));
        assert!(detector.observe(&[moved]));
    }

    #[tokio::test]
    async fn test_publishes_only_changed_snapshots() {
        let repo = CloudMaterialRepository::new(reqwest::Client::new(), &config());
        let mut rx = repo.subscribe().unwrap();
        let mut detector = ChangeDetector::default();
        let snapshot = vec![Material::new("Drill", None)];

        assert!(repo.publish_if_changed(&mut detector, snapshot.clone()));
        assert_eq!(rx.try_recv().unwrap(), snapshot);

        assert!(!repo.publish_if_changed(&mut detector, snapshot.clone()));
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        assert!(repo.publish_if_changed(&mut detector, Vec::new()));
        assert!(rx.try_recv().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watcher_stops_on_shutdown() {
        let mut config = config();
        config.base_url = "http://127.0.0.1:9".into();
        let repo = Arc::new(CloudMaterialRepository::new(reqwest::Client::new(), &config));

        let token = CancellationToken::new();
        let handle = Arc::clone(&repo).start_watcher(token.clone());
        token.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_external_service_error() {
        let mut config = config();
        config.base_url = "http://127.0.0.1:9".into();
        let repo = CloudMaterialRepository::new(reqwest::Client::new(), &config);

        let result = repo.list_all().await;
        assert!(matches!(result, Err(AppError::ExternalService(_))));
    }
}
