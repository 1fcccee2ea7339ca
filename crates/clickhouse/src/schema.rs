//! Stream table schemas.
//!
//! Every stream table:
//! - is append-only MergeTree
//! - stores `timestamp` as DateTime64(3, 'UTC') for millisecond precision
//! - derives `date` from `timestamp` and partitions on it
//! - orders rows by (session_id, timestamp)

use engine_core::{Result, StreamKind};
use tracing::debug;

use crate::client::ClickHouseClient;

/// Unqualified table name for a stream.
pub fn table_name(stream: StreamKind) -> &'static str {
    match stream {
        StreamKind::PageViews => "page_views_stream",
        StreamKind::Clicks => "click_events_stream",
        StreamKind::ScrollDepth => "scroll_depth_stream",
        StreamKind::Sessions => "sessions_stream",
        StreamKind::CustomEvents => "custom_events_stream",
    }
}

const PAGE_VIEWS_COLUMNS: &str = r#"
    id String,
    user_id String,
    session_id String,
    page_url String,
    page_title String,
    referrer String,
    user_agent String,
    ip_address String,
    time_on_page UInt32,
    viewport_width UInt16,
    viewport_height UInt16,
    device LowCardinality(String),
    timestamp DateTime64(3, 'UTC'),
    date Date DEFAULT toDate(timestamp, 'UTC')
"#;

const CLICK_EVENTS_COLUMNS: &str = r#"
    id String,
    user_id String,
    session_id String,
    page_url String,
    element_type LowCardinality(String),
    element_text String,
    element_id String,
    element_class String,
    click_x UInt16,
    click_y UInt16,
    timestamp DateTime64(3, 'UTC'),
    date Date DEFAULT toDate(timestamp, 'UTC')
"#;

const SCROLL_DEPTH_COLUMNS: &str = r#"
    id String,
    user_id String,
    session_id String,
    page_url String,
    max_scroll_depth UInt8,
    scroll_milestones String,
    page_height UInt32,
    viewport_height UInt32,
    time_to_max_scroll UInt32,
    timestamp DateTime64(3, 'UTC'),
    date Date DEFAULT toDate(timestamp, 'UTC')
"#;

const SESSIONS_COLUMNS: &str = r#"
    session_id String,
    user_id String,
    start_time Nullable(DateTime64(3, 'UTC')),
    end_time Nullable(DateTime64(3, 'UTC')),
    duration UInt32,
    page_count UInt32,
    initial_referrer String,
    initial_user_agent String,
    ip_address String,
    timestamp DateTime64(3, 'UTC'),
    date Date DEFAULT toDate(timestamp, 'UTC')
"#;

const CUSTOM_EVENTS_COLUMNS: &str = r#"
    id String,
    user_id String,
    session_id String,
    page_url String,
    event_type LowCardinality(String),
    event_name String,
    properties String,
    timestamp DateTime64(3, 'UTC'),
    date Date DEFAULT toDate(timestamp, 'UTC')
"#;

fn columns(stream: StreamKind) -> &'static str {
    match stream {
        StreamKind::PageViews => PAGE_VIEWS_COLUMNS,
        StreamKind::Clicks => CLICK_EVENTS_COLUMNS,
        StreamKind::ScrollDepth => SCROLL_DEPTH_COLUMNS,
        StreamKind::Sessions => SESSIONS_COLUMNS,
        StreamKind::CustomEvents => CUSTOM_EVENTS_COLUMNS,
    }
}

/// `CREATE DATABASE IF NOT EXISTS` for the configured database.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database)
}

/// `CREATE TABLE IF NOT EXISTS` for one stream table.
pub fn create_table(database: &str, stream: StreamKind) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {}.{} ({})
ENGINE = MergeTree()
PARTITION BY date
ORDER BY (session_id, timestamp)
SETTINGS index_granularity = 8192",
        database,
        table_name(stream),
        columns(stream)
    )
}

/// All DDL in execution order: database first, then the five stream tables.
pub fn all_statements(database: &str) -> Vec<String> {
    std::iter::once(create_database(database))
        .chain(StreamKind::ALL.iter().map(|s| create_table(database, *s)))
        .collect()
}

/// Initialize the database schema.
///
/// Creates the database and all stream tables if they don't exist. Safe to re-run.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    for sql in all_statements(client.database()) {
        client
            .inner()
            .query(&sql)
            .execute()
            .await
            .map_err(|e| engine_core::Error::store(format!("Schema error: {}", e)))?;
    }

    debug!(database = %client.database(), "ClickHouse schema initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_cover_every_stream() {
        let statements = all_statements("analytics");
        assert_eq!(statements.len(), 6);
        assert_eq!(statements[0], "CREATE DATABASE IF NOT EXISTS analytics");
        for stream in StreamKind::ALL {
            let qualified = format!("analytics.{}", table_name(stream));
            assert!(statements.iter().any(|s| s.contains(&qualified)));
        }
    }

    #[test]
    fn test_tables_partitioned_by_date_and_ordered_by_session() {
        for stream in StreamKind::ALL {
            let ddl = create_table("analytics", stream);
            assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS"));
            assert!(ddl.contains("PARTITION BY date"));
            assert!(ddl.contains("ORDER BY (session_id, timestamp)"));
            assert!(ddl.contains("date Date DEFAULT toDate(timestamp, 'UTC')"));
        }
    }
}
