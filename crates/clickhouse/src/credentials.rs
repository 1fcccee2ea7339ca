//! Network-free credential validation.
//!
//! Rejects configurations that still carry template placeholders or the
//! retired demo secret, so the store never attempts a doomed connection.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::config::ClickHouseConfig;

/// Historical default cloud endpoint shipped in templates.
const LEGACY_DEFAULT_URL: &str = "https://akl2spzdfi.us-east-2.aws.clickhouse.cloud:8443";

const PLACEHOLDER_URL_MARKER: &str = "your-clickhouse-url";

const PLACEHOLDER_PASSWORDS: [&str; 2] = ["your-secure-password", "your-password"];

/// Demo secret that was once committed to configuration.
const RETIRED_DEMO_SECRET: &str = "jg3YoKz2K~vw9";

static CLUSTER_SERVICE_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9-]+(\.[a-z0-9-]+)*\.svc\.cluster\.local$")
        .expect("cluster host pattern is valid")
});

static DATABASE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("database name pattern is valid")
});

/// Why a configuration was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialIssue {
    MissingUrl,
    PlaceholderUrl,
    EmptyUsername,
    PlaceholderPassword,
    DemoSecret,
    InvalidDatabase,
}

impl std::fmt::Display for CredentialIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::MissingUrl => "ClickHouse URL is not configured",
            Self::PlaceholderUrl => "ClickHouse URL is a template placeholder",
            Self::EmptyUsername => "ClickHouse username is empty",
            Self::PlaceholderPassword => "ClickHouse password is a template placeholder",
            Self::DemoSecret => "ClickHouse password is the retired demo secret",
            Self::InvalidDatabase => "ClickHouse database name is not a plain identifier",
        };
        f.write_str(msg)
    }
}

/// True if the URL points at an in-cluster service (`*.svc.cluster.local`).
pub fn is_cluster_service(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| CLUSTER_SERVICE_HOST.is_match(h)))
        .unwrap_or(false)
}

fn is_placeholder_url(url: &str) -> bool {
    url.contains(PLACEHOLDER_URL_MARKER) || url.trim_end_matches('/') == LEGACY_DEFAULT_URL
}

/// Checks a configuration without touching the network.
pub fn validate_credentials(config: &ClickHouseConfig) -> Result<(), CredentialIssue> {
    let url = match config.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ => return Err(CredentialIssue::MissingUrl),
    };

    if is_placeholder_url(url) && !is_cluster_service(url) {
        return Err(CredentialIssue::PlaceholderUrl);
    }

    if config.username.trim().is_empty() {
        return Err(CredentialIssue::EmptyUsername);
    }

    if PLACEHOLDER_PASSWORDS.contains(&config.password.as_str()) {
        return Err(CredentialIssue::PlaceholderPassword);
    }

    if config.password == RETIRED_DEMO_SECRET {
        return Err(CredentialIssue::DemoSecret);
    }

    if !DATABASE_NAME.is_match(&config.database) {
        return Err(CredentialIssue::InvalidDatabase);
    }

    Ok(())
}
