//! Structured logging setup.
//!
//! `RUST_LOG` always wins. Without it the filter is `info`, or `debug` for
//! the engine's own crates when the debug toggle is on, which also logs each
//! received payload.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Engine crates raised to `debug` by the debug toggle.
const ENGINE_TARGETS: [&str; 6] = [
    "analytics_engine",
    "api",
    "clickhouse_client",
    "engine_core",
    "telemetry",
    "worker",
];

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub filter: String,
    /// One JSON object per line instead of human-readable output
    pub json: bool,
}

impl TracingConfig {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            json: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// Installs the global subscriber.
pub fn init_tracing(config: TracingConfig) {
    let env_filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .init();
    }

    tracing::info!(filter = %config.filter, json = config.json, "Tracing initialized");
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(debug: bool) -> String {
    if !debug {
        return "info".to_string();
    }
    std::iter::once("info".to_string())
        .chain(ENGINE_TARGETS.iter().map(|t| format!("{}=debug", t)))
        .collect::<Vec<_>>()
        .join(",")
}

fn env_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Initialize tracing from `RUST_LOG`, `LOG_JSON` and the debug toggle.
pub fn init_tracing_from_env(debug: bool) {
    let json = std::env::var("LOG_JSON").map(|v| env_flag(&v)).unwrap_or(false);
    let filter = std::env::var("RUST_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default_filter(debug));

    init_tracing(TracingConfig::new(filter).with_json(json));
}
