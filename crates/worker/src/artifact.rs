//! Export jobs, object keys, and the JSON manifest written per job.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use clickhouse_client::TrailingMetrics;
use engine_core::{Result, TimeWindow};
use serde::{Deserialize, Serialize};

use crate::sink::ObjectMetadata;

/// The five independent jobs of an export cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportJob {
    PageViews,
    ClickEvents,
    Sessions,
    ScrollDepth,
    Metrics,
}

impl ExportJob {
    pub const ALL: [ExportJob; 5] = [
        ExportJob::PageViews,
        ExportJob::ClickEvents,
        ExportJob::Sessions,
        ExportJob::ScrollDepth,
        ExportJob::Metrics,
    ];

    /// Top-level key prefix.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::PageViews => "page-views",
            Self::ClickEvents => "click-events",
            Self::Sessions => "sessions",
            Self::ScrollDepth => "scroll-depth",
            Self::Metrics => "metrics",
        }
    }

    /// File name stem.
    pub fn stem(&self) -> &'static str {
        match self {
            Self::PageViews => "page_views",
            Self::ClickEvents => "click_events",
            Self::Sessions => "sessions",
            Self::ScrollDepth => "scroll_depth",
            Self::Metrics => "metrics",
        }
    }

    /// `dataType` recorded in the manifest and object metadata.
    pub fn data_type(&self) -> &'static str {
        match self {
            Self::Metrics => "real_time_metrics",
            other => other.stem(),
        }
    }

    /// `{prefix}/{YYYY-MM-DD}/{stem}_{compact timestamp}.json`
    pub fn object_key(&self, at: DateTime<Utc>) -> String {
        format!(
            "{}/{}/{}_{}.json",
            self.prefix(),
            at.format("%Y-%m-%d"),
            self.stem(),
            compact_timestamp(at)
        )
    }
}

impl std::fmt::Display for ExportJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.stem())
    }
}

/// `YYYY-MM-DD_HHMMSSmmm` in UTC.
pub fn compact_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d_%H%M%S%3f").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastHour {
    pub page_views: u64,
    pub click_events: u64,
    pub active_sessions: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsBody {
    pub last_hour: LastHour,
}

/// Body of one export object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub data_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub record_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsBody>,
}

impl ExportManifest {
    /// Manifest for a windowed job; `recordCount` is the number of rows.
    pub fn for_window<T: Serialize>(job: ExportJob, window: TimeWindow, rows: &[T]) -> Result<Self> {
        Ok(Self {
            data_type: job.data_type(),
            time_range: Some(window),
            timestamp: None,
            record_count: rows.len(),
            data: Some(serde_json::to_value(rows)?),
            metrics: None,
        })
    }

    /// Manifest for the trailing-hour metrics job.
    pub fn for_metrics(at: DateTime<Utc>, metrics: TrailingMetrics) -> Self {
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Millis, true);
        Self {
            data_type: ExportJob::Metrics.data_type(),
            time_range: None,
            timestamp: Some(timestamp.clone()),
            record_count: 1,
            data: None,
            metrics: Some(MetricsBody {
                last_hour: LastHour {
                    page_views: metrics.page_views,
                    click_events: metrics.click_events,
                    active_sessions: metrics.active_sessions,
                    timestamp,
                },
            }),
        }
    }

    /// Pretty-printed JSON body.
    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec_pretty(self)?))
    }

    pub fn metadata(&self, uploaded_at: DateTime<Utc>) -> ObjectMetadata {
        ObjectMetadata {
            data_type: self.data_type.to_string(),
            record_count: self.record_count,
            uploaded_at,
        }
    }
}
