//! Service configuration.
//!
//! Layered as: defaults, optional `config/default.toml`, `ANALYTICS__*`
//! variables, then the flat variables older deployments set.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clickhouse_client::ClickHouseConfig;
use serde::{Deserialize, Serialize};
use worker::{ExportConfig, StorageConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,
    #[serde(default = "default_sink_check_delay_secs")]
    pub sink_check_delay_secs: u64,
    /// Checkpoint file; the watermark is kept in memory when unset
    #[serde(default)]
    pub watermark_path: Option<PathBuf>,
}

fn default_interval_minutes() -> u64 {
    10
}

fn default_warmup_secs() -> u64 {
    30
}

fn default_sink_check_delay_secs() -> u64 {
    5
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            warmup_secs: default_warmup_secs(),
            sink_check_delay_secs: default_sink_check_delay_secs(),
            watermark_path: None,
        }
    }
}

impl ExportSettings {
    pub fn scheduler_config(&self) -> ExportConfig {
        ExportConfig {
            interval: Duration::from_secs(self.interval_minutes.max(1) * 60),
            warmup_delay: Duration::from_secs(self.warmup_secs),
            sink_check_delay: Duration::from_secs(self.sink_check_delay_secs),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Raises the default log filter to `debug` and logs payloads
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub clickhouse: ClickHouseConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub export: ExportSettings,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            clickhouse: ClickHouseConfig::default(),
            storage: StorageConfig::default(),
            export: ExportSettings::default(),
        }
    }
}

/// Load configuration from files and environment.
pub fn load_config() -> Result<AppConfig> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&AppConfig::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("ANALYTICS")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Applies the flat variables older deployments set. Blank values are ignored.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = var("CLICKHOUSE_URL") {
        config.clickhouse.url = Some(url);
    }
    if let Some(username) = var("CLICKHOUSE_USER") {
        config.clickhouse.username = username;
    }
    if let Some(password) = var("CLICKHOUSE_PASSWORD_SECRET").or_else(|| var("CLICKHOUSE_PASSWORD")) {
        config.clickhouse.password = password;
    }
    if let Some(database) = var("CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Some(bucket) = var("S3_BUCKET_NAME") {
        config.storage.bucket = bucket;
    }
    if let Some(region) = var("AWS_REGION") {
        config.storage.region = region;
    }
    if let Some(minutes) = var("UPLOAD_INTERVAL_MINUTES").and_then(|v| v.trim().parse().ok()) {
        config.export.interval_minutes = minutes;
    }
    if let Some(debug) = var("DEBUG_ANALYTICS") {
        config.debug = truthy(&debug);
    }
    if let Some(path) = var("WATERMARK_PATH") {
        config.export.watermark_path = Some(PathBuf::from(path));
    }
}
