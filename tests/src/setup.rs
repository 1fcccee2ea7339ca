//! Common test setup functions.

use api::{router, AppState};
use axum::Router;
use chrono::{DateTime, Utc};
use clickhouse_client::{ClickHouseConfig, DegradedReason, EventStore};
use std::sync::Arc;
use worker::{Exporter, MemoryWatermark};

use crate::containers::TestContainers;
use crate::mocks::MockSink;

/// Test context with a real ClickHouse store and a mock object sink.
///
/// - The real Axum router with all layers
/// - `EventStore` against a per-test database
/// - `MockSink` capturing export artifacts
pub struct TestContext {
    pub containers: TestContainers,
    pub store: Arc<EventStore>,
    pub sink: Arc<MockSink>,
    pub exporter: Arc<Exporter>,
    pub router: Router,
}

impl TestContext {
    /// Connects to ClickHouse with a fresh database; the export watermark
    /// starts at `watermark`.
    pub async fn new(watermark: DateTime<Utc>) -> Self {
        let containers = TestContainers::start().await;

        let store = Arc::new(EventStore::initialize(Self::store_config(&containers)).await);
        assert!(
            store.is_connected(),
            "ClickHouse should be reachable: {:?}",
            store.status()
        );

        let sink = Arc::new(MockSink::new());
        let exporter = Arc::new(Exporter::new(
            store.clone(),
            sink.clone(),
            Arc::new(MemoryWatermark::new(watermark)),
        ));
        let router = router(AppState::new(store.clone(), exporter.clone()));

        Self {
            containers,
            store,
            sink,
            exporter,
            router,
        }
    }

    /// Config for a unique database; inserts wait for the write so reads
    /// see them immediately.
    pub fn store_config(containers: &TestContainers) -> ClickHouseConfig {
        let database = format!("analytics_test_{}", uuid::Uuid::new_v4().simple());
        ClickHouseConfig::default()
            .with_url(&containers.clickhouse_url)
            .with_database(database)
            .with_credentials(&containers.clickhouse_username, &containers.clickhouse_password)
            .with_async_insert(false)
    }

    pub fn clickhouse_url(&self) -> &str {
        &self.containers.clickhouse_url
    }
}

/// Router and exporter over a store with no ClickHouse configured.
pub struct DegradedContext {
    pub store: Arc<EventStore>,
    pub sink: Arc<MockSink>,
    pub exporter: Arc<Exporter>,
    pub router: Router,
}

impl DegradedContext {
    pub async fn new() -> Self {
        let store = Arc::new(EventStore::initialize(ClickHouseConfig::default()).await);
        assert!(matches!(
            store.status(),
            clickhouse_client::StoreStatus::Degraded(DegradedReason::InvalidCredentials(_))
        ));

        let sink = Arc::new(MockSink::new());
        let exporter = Arc::new(Exporter::new(
            store.clone(),
            sink.clone(),
            Arc::new(MemoryWatermark::starting_now()),
        ));
        let router = router(AppState::new(store.clone(), exporter.clone()));

        Self {
            store,
            sink,
            exporter,
            router,
        }
    }
}
