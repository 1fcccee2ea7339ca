//! Per-page scroll milestone tracking.
//!
//! Clients report scroll depth repeatedly while a page is open. Each
//! (session, page) pair keeps a tracker so the milestones stored with every
//! event are the cumulative, ascending set, reported at most once each.

use std::sync::Arc;
use std::time::Duration;

use engine_core::{Milestone, ScrollDepthEvent, ScrollTracker};
use moka::future::Cache;
use parking_lot::Mutex;

/// Trackers idle longer than this are dropped.
const TRACKER_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Maximum tracked (session, page) pairs.
const TRACKER_MAX_CAPACITY: u64 = 100_000;

type TrackerKey = (String, String);

#[derive(Clone)]
pub struct ScrollProgress {
    trackers: Cache<TrackerKey, Arc<Mutex<ScrollTracker>>>,
}

impl ScrollProgress {
    pub fn new() -> Self {
        Self {
            trackers: Cache::builder()
                .max_capacity(TRACKER_MAX_CAPACITY)
                .time_to_idle(TRACKER_IDLE_TTL)
                .build(),
        }
    }

    /// Folds the event into its tracker, rewrites the event's milestone set
    /// and returns the milestones crossed for the first time.
    pub async fn apply(&self, event: &mut ScrollDepthEvent) -> Vec<Milestone> {
        let key = (
            event.session_id.clone(),
            event.page_url.clone().unwrap_or_default(),
        );
        let tracker = self
            .trackers
            .get_with(key, async { Arc::new(Mutex::new(ScrollTracker::new())) })
            .await;

        let mut tracker = tracker.lock();
        let mut crossed = Vec::new();
        if let Some(reported) = &event.scroll_milestones {
            for milestone in reported.iter() {
                crossed.extend(tracker.observe(milestone.percent()));
            }
        }
        crossed.extend(tracker.observe(event.max_scroll_depth));
        event.scroll_milestones = Some(tracker.milestones().clone());
        crossed
    }
}

impl Default for ScrollProgress {
    fn default() -> Self {
        Self::new()
    }
}
