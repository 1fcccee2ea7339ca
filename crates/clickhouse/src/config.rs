//! ClickHouse configuration.

use serde::{Deserialize, Serialize};

/// ClickHouse client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// ClickHouse HTTP(S) URL; the store stays degraded without one
    #[serde(default)]
    pub url: Option<String>,
    /// Database holding the stream tables
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_username")]
    pub username: String,
    /// Empty password is valid
    #[serde(default)]
    pub password: String,
    /// Send inserts with `async_insert=1, wait_for_async_insert=0`
    #[serde(default = "default_async_insert")]
    pub async_insert: bool,
}

fn default_database() -> String {
    "analytics".to_string()
}

fn default_username() -> String {
    "default".to_string()
}

fn default_async_insert() -> bool {
    true
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: None,
            database: default_database(),
            username: default_username(),
            password: String::new(),
            async_insert: default_async_insert(),
        }
    }
}

impl ClickHouseConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_async_insert(mut self, enabled: bool) -> Self {
        self.async_insert = enabled;
        self
    }
}
