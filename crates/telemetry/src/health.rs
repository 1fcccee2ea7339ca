//! Component health registry.
//!
//! Components start out unchecked. The ClickHouse component is set once at
//! startup from the store status; object storage is set by the delayed sink
//! check. Neither being down stops the service from answering requests.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Overall service health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Last known state of one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Unchecked,
    Up,
    Down,
}

#[derive(Debug, Clone)]
struct Observation {
    state: ComponentState,
    message: Option<String>,
    checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    last: RwLock<Observation>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            last: RwLock::new(Observation {
                state: ComponentState::Unchecked,
                message: None,
                checked_at: None,
            }),
        }
    }

    fn record(&self, state: ComponentState, message: Option<String>) {
        *self.last.write() = Observation {
            state,
            message,
            checked_at: Some(Utc::now()),
        };
    }

    pub fn set_healthy(&self) {
        self.record(ComponentState::Up, None);
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.record(ComponentState::Down, Some(msg.into()));
    }

    pub fn state(&self) -> ComponentState {
        self.last.read().state
    }

    pub fn is_healthy(&self) -> bool {
        self.state() == ComponentState::Up
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn report(&self) -> ComponentHealthReport {
        let last = self.last.read().clone();
        ComponentHealthReport {
            name: self.name.to_string(),
            state: last.state,
            message: last.message,
            checked_at: last.checked_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealthReport {
    pub name: String,
    pub state: ComponentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
}

pub struct HealthRegistry {
    pub clickhouse: ComponentHealth,
    pub object_storage: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            clickhouse: ComponentHealth::new("clickhouse"),
            object_storage: ComponentHealth::new("object_storage"),
        }
    }

    /// Healthy when every component is up, unhealthy when every component is
    /// down, degraded otherwise.
    pub fn report(&self) -> HealthReport {
        let components: Vec<ComponentHealthReport> = [&self.clickhouse, &self.object_storage]
            .into_iter()
            .map(ComponentHealth::report)
            .collect();

        let status = if components.iter().all(|c| c.state == ComponentState::Up) {
            HealthStatus::Healthy
        } else if components.iter().all(|c| c.state == ComponentState::Down) {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Degraded
        };

        HealthReport { status, components }
    }

    /// Ready means accepted events are persisted.
    pub fn is_ready(&self) -> bool {
        self.clickhouse.is_healthy()
    }

    pub fn is_alive(&self) -> bool {
        true
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
