//! Tracking payloads accepted from the capture SDK.
//!
//! Every payload keeps optional fields as `Option` so the store can apply the
//! default policy explicitly when it builds rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::limits::MAX_CUSTOM_PROPERTIES_BYTES;
use crate::scroll::MilestoneSet;

/// User id recorded when the client did not identify the visitor.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Event type recorded for custom events that omit one.
pub const DEFAULT_CUSTOM_EVENT_TYPE: &str = "custom";

/// Page count recorded for session rows that omit one.
pub const DEFAULT_SESSION_PAGE_COUNT: u32 = 1;

/// The five append-only event streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    PageViews,
    Clicks,
    ScrollDepth,
    Sessions,
    CustomEvents,
}

impl StreamKind {
    pub const ALL: [StreamKind; 5] = [
        StreamKind::PageViews,
        StreamKind::Clicks,
        StreamKind::ScrollDepth,
        StreamKind::Sessions,
        StreamKind::CustomEvents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageViews => "page_views",
            Self::Clicks => "clicks",
            Self::ScrollDepth => "scroll_depth",
            Self::Sessions => "sessions",
            Self::CustomEvents => "custom_events",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device class of the visitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Desktop,
    Tablet,
    Mobile,
    #[default]
    Unknown,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Tablet => "tablet",
            Self::Mobile => "mobile",
            Self::Unknown => "unknown",
        }
    }
}

/// Browser viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    #[serde(default)]
    pub width: u16,
    #[serde(default)]
    pub height: u16,
}

/// Click coordinates relative to the viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: u16,
    #[serde(default)]
    pub y: u16,
}

/// Validates custom properties JSON size.
fn validate_properties_size(props: &serde_json::Value) -> Result<(), ValidationError> {
    if props.is_null() {
        return Ok(());
    }

    let size = serde_json::to_vec(props).map(|v| v.len()).unwrap_or(0);

    if size > MAX_CUSTOM_PROPERTIES_BYTES {
        let mut err = ValidationError::new("properties_too_large");
        err.message = Some(
            format!(
                "properties {}KB exceeds {}KB limit",
                size / 1024,
                MAX_CUSTOM_PROPERTIES_BYTES / 1024
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// A page view, or a time-on-page update sent when the page is hidden.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageViewEvent {
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[validate(length(max = 2048))]
    pub page_url: Option<String>,
    #[validate(length(max = 500))]
    pub page_title: Option<String>,
    #[validate(length(max = 2048))]
    pub referrer: Option<String>,
    #[validate(length(max = 512))]
    pub user_agent: Option<String>,
    #[validate(length(max = 45))]
    pub ip_address: Option<String>,
    /// Seconds spent on the page
    pub time_on_page: Option<u32>,
    pub viewport: Option<Viewport>,
    pub device: Option<Device>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[validate(length(max = 2048))]
    pub page_url: Option<String>,
    /// Lowercased tag name of the clicked element
    #[validate(length(max = 64))]
    pub element_type: Option<String>,
    #[validate(length(max = 200))]
    pub element_text: Option<String>,
    #[validate(length(max = 256))]
    pub element_id: Option<String>,
    #[validate(length(max = 1000))]
    pub element_class: Option<String>,
    pub click_position: Option<Position>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScrollDepthEvent {
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[validate(length(max = 2048))]
    pub page_url: Option<String>,
    /// Deepest scroll position reached, as a percentage
    #[serde(default)]
    #[validate(range(max = 100))]
    pub max_scroll_depth: u8,
    pub scroll_milestones: Option<MilestoneSet>,
    pub page_height: Option<u32>,
    pub viewport_height: Option<u32>,
    /// Seconds from page load to the deepest position
    pub time_to_max_scroll: Option<u32>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// One append-only row of a session's lifecycle.
///
/// A session is written at start and again at end; the row with the latest
/// `end_time` is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds
    pub duration: Option<u32>,
    pub page_count: Option<u32>,
    #[validate(length(max = 2048))]
    pub initial_referrer: Option<String>,
    #[validate(length(max = 512))]
    pub initial_user_agent: Option<String>,
    #[validate(length(max = 45))]
    pub ip_address: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomEvent {
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[validate(length(max = 2048))]
    pub page_url: Option<String>,
    #[validate(length(max = 100))]
    pub event_type: Option<String>,
    #[validate(length(max = 200))]
    pub event_name: Option<String>,
    /// Arbitrary properties (max 16KB)
    #[validate(custom(function = "validate_properties_size"))]
    pub properties: Option<serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// One tracked event of any kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackedEvent {
    PageView(PageViewEvent),
    Click(ClickEvent),
    ScrollDepth(ScrollDepthEvent),
    Session(SessionRecord),
    Custom(CustomEvent),
}

impl TrackedEvent {
    /// Stream the event is appended to.
    pub fn stream(&self) -> StreamKind {
        match self {
            Self::PageView(_) => StreamKind::PageViews,
            Self::Click(_) => StreamKind::Clicks,
            Self::ScrollDepth(_) => StreamKind::ScrollDepth,
            Self::Session(_) => StreamKind::Sessions,
            Self::Custom(_) => StreamKind::CustomEvents,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::PageView(e) => &e.session_id,
            Self::Click(e) => &e.session_id,
            Self::ScrollDepth(e) => &e.session_id,
            Self::Session(e) => &e.session_id,
            Self::Custom(e) => &e.session_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::PageView(e) => e.timestamp,
            Self::Click(e) => e.timestamp,
            Self::ScrollDepth(e) => e.timestamp,
            Self::Session(e) => e.timestamp,
            Self::Custom(e) => e.timestamp,
        }
    }

    /// Replaces the client-supplied timestamp with the server receive time.
    ///
    /// Export windows and trailing queries are evaluated against the store
    /// clock, so stored rows must not carry client clock skew.
    pub fn stamp_received(&mut self, at: DateTime<Utc>) {
        let slot = match self {
            Self::PageView(e) => &mut e.timestamp,
            Self::Click(e) => &mut e.timestamp,
            Self::ScrollDepth(e) => &mut e.timestamp,
            Self::Session(e) => &mut e.timestamp,
            Self::Custom(e) => &mut e.timestamp,
        };
        *slot = at;
    }

    /// Sets the client address on kinds that record one, unless the payload
    /// already carried it.
    pub fn fill_ip_address(&mut self, ip: Option<String>) {
        let slot = match self {
            Self::PageView(e) => &mut e.ip_address,
            Self::Session(e) => &mut e.ip_address,
            _ => return,
        };
        if slot.as_deref().map_or(true, str::is_empty) {
            *slot = ip;
        }
    }
}
