//! lager-config - 配置加载库

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite 连接串，例如 `sqlite://lager.db`
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// 写冲突时的等待时间
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Secret::new(default_database_url()),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://lager.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// 云端文档库配置（Firestore REST 形态）
///
/// 配置存在时使用云端仓储替代本地 SQLite。
#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    #[serde(default = "default_cloud_base_url")]
    pub base_url: String,
    pub project_id: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    pub api_key: Option<Secret<String>>,
    /// 变更轮询间隔
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_cloud_base_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

fn default_collection() -> String {
    "materials".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Prometheus 导出地址，例如 `127.0.0.1:9464`
    pub metrics_addr: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_addr: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 扫描模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanModeSetting {
    /// 入库（Empfang）
    #[default]
    CheckIn,
    /// 出库（Ausgabe）
    CheckOut,
}

/// 扫描会话配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub default_mode: ScanModeSetting,
    pub default_actor: Option<String>,
}

/// 交接单配置
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_lines_per_page")]
    pub lines_per_page: usize,
    #[serde(default)]
    pub organisation: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            lines_per_page: default_lines_per_page(),
            organisation: String::new(),
        }
    }
}

fn default_output_dir() -> String {
    "protocols".to_string()
}

fn default_lines_per_page() -> usize {
    30
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub cloud: Option<CloudConfig>,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

fn default_app_name() -> String {
    "lager".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 优先级（低到高）：`default.toml` → `{APP_ENV}.toml` → `LAGER_*` 环境变量。
    /// 当前目录下的 `.env` 会先载入环境变量。
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| default_app_env());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("LAGER_").split("__"))
            .extract()?;

        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否启用云端同步
    pub fn uses_cloud(&self) -> bool {
        self.cloud.is_some()
    }
}
