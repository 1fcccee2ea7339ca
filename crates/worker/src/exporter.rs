//! Export cycle runner.
//!
//! A cycle covers `[watermark, now)`. It first checks whether any stream has
//! rows in the window. If none do, the watermark advances and nothing is
//! written. Otherwise five independent jobs run on their own tasks and are
//! joined all-settled: one failing job never blocks the others or the
//! watermark.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use engine_core::{Error, Result, StreamKind, TimeWindow};
use serde::Serialize;
use telemetry::metrics;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::artifact::{ExportJob, ExportManifest};
use crate::sink::ObjectSink;
use crate::source::ExportSource;
use crate::watermark::WatermarkStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoNewData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Uploaded { key: String, record_count: usize },
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub job: ExportJob,
    #[serde(flatten)]
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleKind {
    Skipped { reason: SkipReason },
    Exported { reports: Vec<JobReport> },
}

/// Result of one export cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleOutcome {
    pub window: TimeWindow,
    #[serde(flatten)]
    pub kind: CycleKind,
}

impl CycleOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self.kind, CycleKind::Skipped { .. })
    }

    pub fn reports(&self) -> &[JobReport] {
        match &self.kind {
            CycleKind::Exported { reports } => reports,
            CycleKind::Skipped { .. } => &[],
        }
    }

    pub fn status_of(&self, job: ExportJob) -> Option<&JobStatus> {
        self.reports().iter().find(|r| r.job == job).map(|r| &r.status)
    }

    pub fn uploaded_count(&self) -> usize {
        self.reports()
            .iter()
            .filter(|r| matches!(r.status, JobStatus::Uploaded { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.reports()
            .iter()
            .filter(|r| matches!(r.status, JobStatus::Failed { .. }))
            .count()
    }
}

pub struct Exporter {
    source: Arc<dyn ExportSource>,
    sink: Arc<dyn ObjectSink>,
    watermark: Arc<dyn WatermarkStore>,
    cycle_lock: Mutex<()>,
}

impl Exporter {
    pub fn new(
        source: Arc<dyn ExportSource>,
        sink: Arc<dyn ObjectSink>,
        watermark: Arc<dyn WatermarkStore>,
    ) -> Self {
        Self {
            source,
            sink,
            watermark,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn sink(&self) -> &Arc<dyn ObjectSink> {
        &self.sink
    }

    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark.current()
    }

    /// Runs a cycle ending now.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Runs a cycle for `[watermark, now)`.
    ///
    /// Returns `Error::CycleInProgress` without doing anything if another
    /// cycle holds the guard.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleOutcome> {
        let _guard = self.cycle_lock.try_lock().map_err(|_| Error::CycleInProgress)?;

        let started = Instant::now();
        let window = TimeWindow::new(self.watermark.current().min(now), now);
        debug!(start = %window.start, end = %window.end, "Export cycle started");

        let kind = if self.has_meaningful_data(&window).await {
            CycleKind::Exported {
                reports: self.run_jobs(window, now).await,
            }
        } else {
            CycleKind::Skipped {
                reason: SkipReason::NoNewData,
            }
        };

        if let Err(e) = self.watermark.advance(now).await {
            error!(error = %e, "Failed to persist export watermark");
        }

        let outcome = CycleOutcome { window, kind };
        record(&outcome, started);
        Ok(outcome)
    }

    /// Manual trigger; rejected while a cycle is running.
    pub async fn trigger_manual(&self) -> Result<CycleOutcome> {
        info!("Manual export triggered");
        match self.run_cycle().await {
            Err(Error::CycleInProgress) => {
                metrics().export_cycles_rejected.inc();
                warn!("Manual export rejected, a cycle is already running");
                Err(Error::CycleInProgress)
            }
            other => other,
        }
    }

    /// True if any stream has rows in the window. Fails open when the store
    /// is degraded or a count fails.
    async fn has_meaningful_data(&self, window: &TimeWindow) -> bool {
        if !self.source.is_connected() {
            debug!("Store degraded, assuming new data");
            return true;
        }

        let source = &self.source;
        let (page_views, clicks, scroll, sessions, custom) = tokio::join!(
            source.count_in_window(StreamKind::PageViews, window),
            source.count_in_window(StreamKind::Clicks, window),
            source.count_in_window(StreamKind::ScrollDepth, window),
            source.count_in_window(StreamKind::Sessions, window),
            source.count_in_window(StreamKind::CustomEvents, window),
        );

        [page_views, clicks, scroll, sessions, custom]
            .into_iter()
            .any(|count| match count {
                Ok(n) => n > 0,
                Err(e) => {
                    warn!(error = %e, "Count check failed, assuming new data");
                    true
                }
            })
    }

    async fn run_jobs(&self, window: TimeWindow, now: DateTime<Utc>) -> Vec<JobReport> {
        let handles: Vec<(ExportJob, JoinHandle<Result<JobStatus>>)> = ExportJob::ALL
            .into_iter()
            .map(|job| {
                let source = self.source.clone();
                let sink = self.sink.clone();
                let handle =
                    tokio::spawn(async move { run_job(job, source, sink, window, now).await });
                (job, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (job, handle) in handles {
            let status = match handle.await {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    error!(job = %job, error = %e, "Export job failed");
                    JobStatus::Failed {
                        error: e.to_string(),
                    }
                }
                Err(e) => {
                    error!(job = %job, error = %e, "Export job aborted");
                    JobStatus::Failed {
                        error: format!("job aborted: {}", e),
                    }
                }
            };
            reports.push(JobReport { job, status });
        }
        reports
    }
}

async fn run_job(
    job: ExportJob,
    source: Arc<dyn ExportSource>,
    sink: Arc<dyn ObjectSink>,
    window: TimeWindow,
    now: DateTime<Utc>,
) -> Result<JobStatus> {
    let manifest = match job {
        ExportJob::PageViews => {
            let rows = source.page_view_aggregates(&window).await?;
            window_manifest(job, window, &rows)?
        }
        ExportJob::ClickEvents => {
            let rows = source.click_aggregates(&window).await?;
            window_manifest(job, window, &rows)?
        }
        ExportJob::Sessions => {
            let rows = source.session_summaries(&window).await?;
            window_manifest(job, window, &rows)?
        }
        ExportJob::ScrollDepth => {
            let rows = source.scroll_aggregates(&window).await?;
            window_manifest(job, window, &rows)?
        }
        ExportJob::Metrics => {
            let last_hour = TimeWindow::trailing(now, Duration::hours(1));
            let values = source.trailing_metrics(&last_hour).await?;
            (!values.is_zero()).then(|| ExportManifest::for_metrics(now, values))
        }
    };

    let Some(manifest) = manifest else {
        debug!(job = %job, "Nothing to export");
        return Ok(JobStatus::Skipped);
    };

    let key = job.object_key(now);
    sink.put(&key, manifest.to_bytes()?, &manifest.metadata(Utc::now()))
        .await?;

    info!(
        job = %job,
        key = %key,
        records = manifest.record_count,
        "Export uploaded"
    );
    Ok(JobStatus::Uploaded {
        key,
        record_count: manifest.record_count,
    })
}

fn window_manifest<T: Serialize>(
    job: ExportJob,
    window: TimeWindow,
    rows: &[T],
) -> Result<Option<ExportManifest>> {
    if rows.is_empty() {
        return Ok(None);
    }
    ExportManifest::for_window(job, window, rows).map(Some)
}

fn record(outcome: &CycleOutcome, started: Instant) {
    let m = metrics();
    m.export_cycles.inc();
    m.export_cycle_latency_ms
        .observe(started.elapsed().as_millis() as u64);

    match &outcome.kind {
        CycleKind::Skipped { reason } => {
            m.export_cycles_skipped.inc();
            info!(reason = ?reason, end = %outcome.window.end, "Export cycle skipped");
        }
        CycleKind::Exported { reports } => {
            for report in reports {
                match report.status {
                    JobStatus::Uploaded { .. } => m.export_files_uploaded.inc(),
                    JobStatus::Skipped => m.export_jobs_skipped.inc(),
                    JobStatus::Failed { .. } => m.export_jobs_failed.inc(),
                }
            }
            info!(
                uploaded = outcome.uploaded_count(),
                failed = outcome.failed_count(),
                end = %outcome.window.end,
                "Export cycle finished"
            );
        }
    }
}
