//! Object storage sink for export artifacts.
//!
//! `OpendalSink` writes through an OpenDAL operator so the same code serves
//! S3 in production and a local directory in development.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use engine_core::Result;
use opendal::{services, ErrorKind, Operator};
use serde::{Deserialize, Serialize};
use telemetry::health;
use tracing::{info, warn};

/// Per-object metadata attached to every export artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub data_type: String,
    pub record_count: usize,
    pub uploaded_at: DateTime<Utc>,
}

impl ObjectMetadata {
    /// Key/value pairs as stored on the object.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("dataType".to_string(), self.data_type.clone()),
            ("recordCount".to_string(), self.record_count.to_string()),
            (
                "uploadedAt".to_string(),
                self.uploaded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        ]
    }
}

/// Destination for export artifacts.
#[async_trait]
pub trait ObjectSink: Send + Sync {
    /// Human-readable target, e.g. `s3://bucket`.
    fn target(&self) -> String;

    /// Verifies the target is reachable.
    async fn check(&self) -> Result<()>;

    /// Writes one JSON object. Failures propagate to the calling job.
    async fn put(&self, key: &str, body: Bytes, metadata: &ObjectMetadata) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Fs,
}

/// Object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom S3 endpoint (MinIO, R2, LocalStack)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Explicit keys; the ambient AWS environment is used when absent
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Root directory for the `fs` backend
    #[serde(default = "default_root")]
    pub root: String,
}

fn default_backend() -> StorageBackend {
    StorageBackend::S3
}

fn default_bucket() -> String {
    "analytics-exports".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_root() -> String {
    "./exports".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            root: default_root(),
        }
    }
}

fn storage_error(context: &str, e: opendal::Error) -> engine_core::Error {
    engine_core::Error::storage(format!("{}: {}", context, e))
}

pub struct OpendalSink {
    operator: Operator,
    target: String,
}

impl OpendalSink {
    pub fn new(operator: Operator, target: impl Into<String>) -> Self {
        Self {
            operator,
            target: target.into(),
        }
    }

    /// Builds the operator for the configured backend.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackend::S3 => {
                let mut builder = services::S3::default()
                    .bucket(&config.bucket)
                    .region(&config.region);
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint(endpoint);
                }
                if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
                    builder = builder.access_key_id(key).secret_access_key(secret);
                }
                let operator = Operator::new(builder)
                    .map_err(|e| storage_error("S3 configuration error", e))?
                    .finish();
                Ok(Self::new(operator, format!("s3://{}", config.bucket)))
            }
            StorageBackend::Fs => {
                let builder = services::Fs::default().root(&config.root);
                let operator = Operator::new(builder)
                    .map_err(|e| storage_error("Filesystem configuration error", e))?
                    .finish();
                Ok(Self::new(operator, format!("file://{}", config.root)))
            }
        }
    }

    /// In-process sink, used by tests and local smoke runs.
    pub fn memory() -> Result<Self> {
        let operator = Operator::new(services::Memory::default())
            .map_err(|e| storage_error("Memory configuration error", e))?
            .finish();
        Ok(Self::new(operator, "memory://"))
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}

#[async_trait]
impl ObjectSink for OpendalSink {
    fn target(&self) -> String {
        self.target.clone()
    }

    async fn check(&self) -> Result<()> {
        self.operator
            .check()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    engine_core::Error::storage(format!("{} does not exist", self.target))
                }
                ErrorKind::PermissionDenied => {
                    engine_core::Error::storage(format!("access to {} denied", self.target))
                }
                _ => storage_error("Connectivity check failed", e),
            })
    }

    async fn put(&self, key: &str, body: Bytes, metadata: &ObjectMetadata) -> Result<()> {
        let mut write = self
            .operator
            .write_with(key, body)
            .content_type("application/json");

        if self.operator.info().full_capability().write_with_user_metadata {
            write = write.user_metadata(metadata.to_pairs());
        }

        write
            .await
            .map_err(|e| storage_error(&format!("Failed to write {}", key), e))?;
        Ok(())
    }
}

/// One-shot startup check; never fatal.
pub async fn connectivity_check(sink: &dyn ObjectSink) -> bool {
    match sink.check().await {
        Ok(()) => {
            health().object_storage.set_healthy();
            info!(sink = %sink.target(), "Object storage reachable");
            true
        }
        Err(e) => {
            health().object_storage.set_unhealthy(e.to_string());
            warn!(
                sink = %sink.target(),
                error = %e,
                "Object storage check failed, exports will be retried each cycle"
            );
            false
        }
    }
}
