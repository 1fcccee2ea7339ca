//! Half-open time windows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The window of length `span` ending at `end`.
    pub fn trailing(end: DateTime<Utc>, span: Duration) -> Self {
        Self {
            start: end - span,
            end,
        }
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}
