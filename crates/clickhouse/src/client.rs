//! ClickHouse client wrapper.

use crate::config::ClickHouseConfig;
use crate::schema::table_name;
use clickhouse::Client;
use engine_core::{Result, StreamKind};
use tracing::info;

/// ClickHouse client wrapper.
///
/// The inner client is not bound to a database so the database itself can be
/// created through it; table references are always qualified.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| engine_core::Error::store("ClickHouse URL is not configured"))?;

        let mut client = Client::default()
            .with_url(url)
            .with_user(&config.username)
            .with_password(&config.password);

        if config.async_insert {
            client = client
                .with_option("async_insert", "1")
                .with_option("wait_for_async_insert", "0");
        }

        info!(
            url = %url,
            database = %config.database,
            async_insert = config.async_insert,
            "Created ClickHouse client"
        );

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    pub fn database(&self) -> &str {
        &self.config.database
    }

    /// `database.table` for a stream.
    pub fn table(&self, stream: StreamKind) -> String {
        format!("{}.{}", self.config.database, table_name(stream))
    }

    /// Round-trips `SELECT 1`.
    pub async fn ping(&self) -> Result<()> {
        self.inner
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .map_err(|e| engine_core::Error::store(format!("Ping error: {}", e)))?;
        Ok(())
    }
}
