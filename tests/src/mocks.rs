//! Mock implementations for testing.

use async_trait::async_trait;
use bytes::Bytes;
use engine_core::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use worker::{ObjectMetadata, ObjectSink};

/// One object written through the mock sink.
#[derive(Debug, Clone)]
pub struct CapturedObject {
    pub key: String,
    pub body: serde_json::Value,
    pub metadata: ObjectMetadata,
}

/// Object sink that captures writes in memory.
///
/// Implements the same `ObjectSink` trait as `OpendalSink`, so the exporter
/// runs its production code path up to the storage call.
#[derive(Clone)]
pub struct MockSink {
    objects: Arc<Mutex<Vec<CapturedObject>>>,
    /// Fail writes whose key starts with this prefix
    fail_prefix: Arc<Mutex<Option<String>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(Vec::new())),
            fail_prefix: Arc::new(Mutex::new(None)),
        }
    }

    pub fn objects(&self) -> Vec<CapturedObject> {
        self.objects.lock().clone()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().len()
    }

    /// The object written under `prefix/`, if any.
    pub fn find(&self, prefix: &str) -> Option<CapturedObject> {
        let prefix = format!("{}/", prefix);
        self.objects
            .lock()
            .iter()
            .find(|o| o.key.starts_with(&prefix))
            .cloned()
    }

    pub fn clear(&self) {
        self.objects.lock().clear();
    }

    /// Makes writes under `prefix/` fail, e.g. `"sessions"`.
    pub fn fail_writes_under(&self, prefix: impl Into<String>) {
        *self.fail_prefix.lock() = Some(format!("{}/", prefix.into()));
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectSink for MockSink {
    fn target(&self) -> String {
        "mock://exports".to_string()
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }

    async fn put(&self, key: &str, body: Bytes, metadata: &ObjectMetadata) -> Result<()> {
        if let Some(prefix) = self.fail_prefix.lock().as_deref() {
            if key.starts_with(prefix) {
                return Err(engine_core::Error::storage(format!("Mock write failure: {}", key)));
            }
        }

        let body = serde_json::from_slice(&body)?;
        self.objects.lock().push(CapturedObject {
            key: key.to_string(),
            body,
            metadata: metadata.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn metadata() -> ObjectMetadata {
        ObjectMetadata {
            data_type: "sessions".into(),
            record_count: 1,
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_mock_sink_captures_objects() {
        let sink = MockSink::new();

        sink.put("sessions/2025-08-04/sessions_x.json", Bytes::from_static(b"{\"recordCount\":1}"), &metadata())
            .await
            .unwrap();

        assert_eq!(sink.object_count(), 1);
        let object = sink.find("sessions").unwrap();
        assert_eq!(object.body["recordCount"], 1);
    }

    #[tokio::test]
    async fn test_mock_sink_failure_mode() {
        let sink = MockSink::new();
        sink.fail_writes_under("sessions");

        let result = sink
            .put("sessions/2025-08-04/sessions_x.json", Bytes::from_static(b"{}"), &metadata())
            .await;
        assert!(result.is_err());

        sink.put("metrics/2025-08-04/metrics_x.json", Bytes::from_static(b"{}"), &metadata())
            .await
            .unwrap();
        assert_eq!(sink.object_count(), 1);
    }
}
