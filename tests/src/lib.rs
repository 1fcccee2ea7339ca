//! Shared harness for the workspace integration tests.
//!
//! Tests that need a real store start a ClickHouse testcontainer, or use
//! `ANALYTICS_TEST_CLICKHOUSE_URL` when set. Degraded-mode tests run without
//! Docker.

pub mod containers;
pub mod fixtures;
pub mod mocks;
pub mod setup;
