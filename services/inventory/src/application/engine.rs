//! 库存状态引擎
//!
//! 持有内存中的权威物料列表和派生的序列号索引，解析扫码、执行出入库迁移，
//! 写操作交给后台持久化。列表的两个修改来源（本地乐观更新、仓储全量快照）
//! 之间不加事务，最后写入者生效。

use std::sync::Arc;
use std::time::Duration;

use lager_errors::{AppError, AppResult};
use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::commands::{AddMaterialCommand, EditMaterialCommand};
use super::persistence::{PersistenceDispatcher, WriteOp};
use super::serial_index::SerialIndex;
use super::session::SessionLog;
use crate::domain::entities::{LogEntry, Material, SYSTEM_ACTOR};
use crate::domain::enums::{ActionKind, ScanMode};
use crate::domain::errors::{MaterialError, ScanError, UndoError};
use crate::domain::repositories::MaterialRepository;
use crate::domain::value_objects::MaterialId;

/// 关闭时等待未完成写入的时间
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// 扫码结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// 已完成迁移，会话日志已追加
    Applied {
        label: String,
        serial: String,
        mode: ScanMode,
    },
    /// 出库模式下未设置持有人，物料未改变
    ActorRequired { label: String, serial: String },
}

impl ScanOutcome {
    pub fn label(&self) -> &str {
        match self {
            ScanOutcome::Applied { label, .. } | ScanOutcome::ActorRequired { label, .. } => label,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ScanOutcome::Applied { .. })
    }

    fn metric_label(&self) -> &'static str {
        match self {
            ScanOutcome::Applied { .. } => "applied",
            ScanOutcome::ActorRequired { .. } => "actor_required",
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    materials: Vec<Material>,
    index: SerialIndex,
    mode: ScanMode,
    /// 会话操作人（出库时即持有人），空白视为未设置
    actor: Option<String>,
    filter_text: String,
    filter_active: bool,
    session: SessionLog,
}

impl EngineState {
    fn replace(&mut self, materials: Vec<Material>) {
        self.materials = materials;
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = SerialIndex::build(&self.materials);
        metrics::gauge!("lager_materials").set(self.materials.len() as f64);
    }

    fn actor_or_system(&self) -> String {
        self.actor.clone().unwrap_or_else(|| SYSTEM_ACTOR.to_string())
    }
}

/// 库存状态引擎
pub struct InventoryEngine {
    repo: Arc<dyn MaterialRepository>,
    state: RwLock<EngineState>,
    persistence: PersistenceDispatcher,
    listeners: TaskTracker,
    shutdown: CancellationToken,
}

impl InventoryEngine {
    pub fn new(repo: Arc<dyn MaterialRepository>) -> Self {
        Self::with_shutdown(repo, CancellationToken::new())
    }

    /// 使用外部取消令牌，令牌取消时后台写入和同步监听一起停止
    pub fn with_shutdown(repo: Arc<dyn MaterialRepository>, shutdown: CancellationToken) -> Self {
        let persistence = PersistenceDispatcher::new(Arc::clone(&repo), shutdown.child_token());
        Self {
            repo,
            state: RwLock::new(EngineState::default()),
            persistence,
            listeners: TaskTracker::new(),
            shutdown,
        }
    }

    pub fn with_mode(mut self, mode: ScanMode) -> Self {
        self.state.get_mut().mode = mode;
        self
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.state.get_mut().actor = normalize_actor(actor);
        self
    }

    // ========== 扫码 ==========

    /// 按扫码规则查找物料：去空白，精确匹配优先，其次前缀匹配
    pub async fn resolve(&self, code: &str) -> Option<Material> {
        let state = self.state.read().await;
        state
            .index
            .lookup(code)
            .map(|position| state.materials[position].clone())
    }

    /// 处理一次扫码
    pub async fn process_scan(&self, code: &str) -> Result<ScanOutcome, ScanError> {
        let result = self.apply_scan(code.trim()).await;

        let outcome = match &result {
            Ok(outcome) => outcome.metric_label(),
            Err(e) => e.outcome(),
        };
        metrics::counter!("lager_scans_total", "outcome" => outcome).increment(1);

        if let Err(e) = &result {
            debug!(code = code.trim(), error = %e, "Scan rejected");
        }
        result
    }

    async fn apply_scan(&self, code: &str) -> Result<ScanOutcome, ScanError> {
        let mut state = self.state.write().await;
        let mode = state.mode;
        let actor = state.actor.clone();

        let position = state
            .index
            .lookup(code)
            .ok_or_else(|| ScanError::NotFound(code.to_string()))?;

        let EngineState {
            materials, session, ..
        } = &mut *state;
        let material = &mut materials[position];
        let label = material.label().to_string();
        let serial = material.serial_str().to_string();

        match mode {
            ScanMode::CheckIn if material.in_stock() => {
                return Err(ScanError::AlreadyInStock { label, serial });
            }
            ScanMode::CheckOut if !material.in_stock() => {
                let holder = material.position().unwrap_or("unknown").to_string();
                return Err(ScanError::NotInStock {
                    label,
                    serial,
                    holder,
                });
            }
            _ => {}
        }

        if mode.requires_actor() && actor.is_none() {
            info!(serial = %serial, "Check-out scan ignored, no holder set");
            return Ok(ScanOutcome::ActorRequired { label, serial });
        }

        let actor = actor.as_deref().unwrap_or(SYSTEM_ACTOR);
        match mode {
            ScanMode::CheckIn => material.check_in(actor),
            ScanMode::CheckOut => material.check_out(actor),
        }

        let snapshot = material.clone();
        session.record(&label, &serial);
        state.reindex();
        drop(state);

        info!(serial = %serial, label = %label, mode = %mode, "Scan applied");
        self.persistence.dispatch(WriteOp::Update, snapshot);

        Ok(ScanOutcome::Applied {
            label,
            serial,
            mode,
        })
    }

    /// 撤销物料最近一次扫码迁移，返回被撤销的动作
    pub async fn undo(&self, code: &str) -> Result<ActionKind, UndoError> {
        let result = self.apply_undo(code.trim()).await;

        let outcome = match &result {
            Ok(_) => "applied",
            Err(e) => e.outcome(),
        };
        metrics::counter!("lager_undo_total", "outcome" => outcome).increment(1);
        result
    }

    async fn apply_undo(&self, code: &str) -> Result<ActionKind, UndoError> {
        let mut state = self.state.write().await;
        let actor = state.actor_or_system();

        let position = state
            .index
            .lookup(code)
            .ok_or_else(|| UndoError::NotFound(code.to_string()))?;

        let EngineState {
            materials, session, ..
        } = &mut *state;
        let material = &mut materials[position];
        let reverted = material.undo(&actor)?;
        session.remove_last(material.label(), material.serial_str());

        let snapshot = material.clone();
        state.reindex();
        drop(state);

        info!(
            serial = snapshot.serial_str(),
            reverted = reverted.as_str(),
            "Last action undone"
        );
        self.persistence.dispatch(WriteOp::Update, snapshot);
        Ok(reverted)
    }

    /// 手工修正位置，不写日志、不改在库状态
    pub async fn set_position(
        &self,
        code: &str,
        position: Option<String>,
    ) -> Result<(), MaterialError> {
        let code = code.trim();
        let mut state = self.state.write().await;
        let index = state
            .index
            .lookup(code)
            .ok_or_else(|| MaterialError::NotFound(code.to_string()))?;

        let material = &mut state.materials[index];
        material.set_position(position);
        let snapshot = material.clone();
        state.reindex();
        drop(state);

        self.persistence.dispatch(WriteOp::Update, snapshot);
        Ok(())
    }

    // ========== 物料维护 ==========

    /// 新增物料，初始在库
    pub async fn add_material(&self, cmd: AddMaterialCommand) -> Result<MaterialId, MaterialError> {
        let serial = cmd.validate()?;

        let mut state = self.state.write().await;
        if let Some(serial) = &serial
            && state.index.contains(serial.as_str())
        {
            return Err(MaterialError::DuplicateSerial(serial.to_string()));
        }

        let mut material = Material::new(cmd.label.trim(), serial);
        if let Some(note) = cmd.note.filter(|n| !n.trim().is_empty()) {
            material = material.with_note(note.trim());
        }
        let id = material.id().clone();

        state.materials.push(material.clone());
        state.reindex();
        drop(state);

        info!(material_id = %id, serial = material.serial_str(), "Material added");
        self.persistence.dispatch(WriteOp::Add, material);
        Ok(id)
    }

    /// 手工编辑，返回变更的字段名；无变更时不写日志也不持久化
    ///
    /// 按完整序列号定位物料。
    pub async fn edit_material(
        &self,
        cmd: EditMaterialCommand,
    ) -> Result<Vec<&'static str>, MaterialError> {
        let code = cmd.code.trim().to_string();
        let changes = cmd.into_changes()?;

        let mut state = self.state.write().await;
        let actor = state.actor_or_system();
        let index = state
            .index
            .exact(&code)
            .ok_or_else(|| MaterialError::NotFound(code.clone()))?;

        if let Some(serial) = &changes.serial_number
            && let Some(other) = state.index.exact(serial.as_str())
            && other != index
        {
            return Err(MaterialError::DuplicateSerial(serial.to_string()));
        }

        let material = &mut state.materials[index];
        let changed = material.apply_changes(changes, &actor)?;
        if changed.is_empty() {
            return Ok(changed);
        }

        let snapshot = material.clone();
        state.reindex();
        drop(state);

        info!(
            serial = snapshot.serial_str(),
            fields = %changed.join(","),
            "Material edited"
        );
        self.persistence.dispatch(WriteOp::Update, snapshot);
        Ok(changed)
    }

    /// 删除物料及其日志，返回被删除的物料
    ///
    /// 维护操作只接受完整序列号，不做前缀匹配。
    pub async fn delete_material(&self, code: &str) -> Result<Material, MaterialError> {
        let code = code.trim();
        let mut state = self.state.write().await;
        let index = state
            .index
            .exact(code)
            .ok_or_else(|| MaterialError::NotFound(code.to_string()))?;

        let material = state.materials.remove(index);
        state.reindex();
        drop(state);

        info!(material_id = %material.id(), serial = material.serial_str(), "Material deleted");
        self.persistence.dispatch(WriteOp::Delete, material.clone());
        Ok(material)
    }

    // ========== 同步 ==========

    /// 从仓储全量重新加载，返回物料数
    pub async fn refresh(&self) -> AppResult<usize> {
        let materials = self.repo.list_all().await?;
        let count = materials.len();
        self.apply_snapshot(materials).await;
        debug!(count, "Snapshot refreshed");
        Ok(count)
    }

    /// 整体替换内存列表
    pub async fn apply_snapshot(&self, materials: Vec<Material>) {
        self.state.write().await.replace(materials);
    }

    /// 仓储支持推送时启动监听任务，返回是否已启动
    pub fn start_sync(self: &Arc<Self>) -> bool {
        let Some(mut rx) = self.repo.subscribe() else {
            return false;
        };

        let engine = Arc::clone(self);
        let token = self.shutdown.child_token();
        self.listeners.spawn(async move {
            info!("Snapshot listener started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(materials) => engine.apply_snapshot(materials).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Snapshot listener lagged, waiting for next snapshot");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            info!("Snapshot listener stopped");
        });
        true
    }

    // ========== 查询 ==========

    /// 物料日志；日志单独存储的后端按需加载
    pub async fn material_log(&self, code: &str) -> AppResult<Vec<LogEntry>> {
        let material = self
            .resolve(code)
            .await
            .ok_or_else(|| AppError::not_found(format!("no material found for '{}'", code.trim())))?;

        match self.repo.fetch_log(material.id()).await? {
            Some(log) => Ok(log),
            None => Ok(material.event_log().to_vec()),
        }
    }

    pub async fn materials(&self) -> Vec<Material> {
        self.state.read().await.materials.clone()
    }

    /// 过滤后的列表
    ///
    /// 过滤激活且文本非空白时，返回名称、序列号或位置包含该文本（不区分大小写）的物料。
    pub async fn filtered_list(&self) -> Vec<Material> {
        let state = self.state.read().await;
        if !state.filter_active || state.filter_text.trim().is_empty() {
            return state.materials.clone();
        }

        let needle = state.filter_text.to_lowercase();
        state
            .materials
            .iter()
            .filter(|m| matches_filter(m, &needle))
            .cloned()
            .collect()
    }

    pub async fn session_lines(&self) -> Vec<String> {
        self.state.read().await.session.lines().to_vec()
    }

    pub async fn clear_session(&self) {
        self.state.write().await.session.clear();
    }

    // ========== 会话设置 ==========

    pub async fn mode(&self) -> ScanMode {
        self.state.read().await.mode
    }

    pub async fn set_mode(&self, mode: ScanMode) {
        self.state.write().await.mode = mode;
    }

    pub async fn actor(&self) -> Option<String> {
        self.state.read().await.actor.clone()
    }

    pub async fn set_actor(&self, actor: Option<String>) {
        self.state.write().await.actor = normalize_actor(actor);
    }

    pub async fn set_filter(&self, text: impl Into<String>) {
        self.state.write().await.filter_text = text.into();
    }

    pub async fn set_filter_active(&self, active: bool) {
        self.state.write().await.filter_active = active;
    }

    // ========== 生命周期 ==========

    /// 等待已提交的写入完成
    pub async fn flush(&self) {
        self.persistence.flush().await;
    }

    /// 停止监听，等待写入（有限时），然后取消剩余任务
    pub async fn shutdown(&self) {
        self.listeners.close();
        if tokio::time::timeout(SHUTDOWN_GRACE, self.persistence.flush())
            .await
            .is_err()
        {
            warn!(
                pending = self.persistence.in_flight(),
                "Pending writes did not finish in time, cancelling"
            );
        }
        self.shutdown.cancel();
        self.persistence.shutdown().await;
        self.listeners.wait().await;
        info!("Inventory engine stopped");
    }
}

fn normalize_actor(actor: Option<String>) -> Option<String> {
    actor
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
}

fn matches_filter(material: &Material, needle: &str) -> bool {
    material.label().to_lowercase().contains(needle)
        || material.serial_str().to_lowercase().contains(needle)
        || material
            .position()
            .is_some_and(|p| p.to_lowercase().contains(needle))
}
