//! Timers that drive the exporter.

use std::sync::Arc;
use std::time::Duration;

use engine_core::Error;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::exporter::Exporter;
use crate::sink::connectivity_check;

/// Export timer configuration.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Recurring cycle interval
    pub interval: Duration,
    /// One-shot cycle after startup
    pub warmup_delay: Duration,
    /// One-shot sink connectivity check after startup
    pub sink_check_delay: Duration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10 * 60),
            warmup_delay: Duration::from_secs(30),
            sink_check_delay: Duration::from_secs(5),
        }
    }
}

pub struct ExportScheduler {
    config: ExportConfig,
    exporter: Arc<Exporter>,
}

impl ExportScheduler {
    pub fn new(config: ExportConfig, exporter: Arc<Exporter>) -> Self {
        Self { config, exporter }
    }

    pub fn exporter(&self) -> &Arc<Exporter> {
        &self.exporter
    }

    /// Starts the sink check, the warm-up cycle and the recurring timer.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            sleep(scheduler.config.sink_check_delay).await;
            connectivity_check(scheduler.exporter.sink().as_ref()).await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            sleep(scheduler.config.warmup_delay).await;
            scheduler.tick("warmup").await;
        }));

        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_interval().await;
        }));

        info!(
            interval_secs = self.config.interval.as_secs(),
            warmup_secs = self.config.warmup_delay.as_secs(),
            "Export scheduler started"
        );
        handles
    }

    async fn run_interval(&self) {
        let mut ticker = interval_at(Instant::now() + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick("interval").await;
        }
    }

    async fn tick(&self, trigger: &'static str) {
        match self.exporter.run_cycle().await {
            Ok(_) => {}
            Err(Error::CycleInProgress) => {
                warn!(trigger, "Export cycle still running, tick dropped");
            }
            Err(e) => {
                error!(trigger, error = %e, "Export cycle error");
            }
        }
    }
}
