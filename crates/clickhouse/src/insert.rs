//! Row types for the stream tables and the insert path.
//!
//! Conversions from tracking payloads apply the default policy: missing user
//! becomes "anonymous", missing strings become "", missing numbers become 0.

use crate::client::ClickHouseClient;
use clickhouse::Row;
use engine_core::encoding::{encode_bounded, encode_properties};
use engine_core::limits::MAX_CUSTOM_PROPERTIES_BYTES;
use engine_core::{
    ClickEvent, CustomEvent, DeviceClassifier, PageViewEvent, Result, ScrollDepthEvent,
    SessionRecord, StreamKind, ANONYMOUS_USER, DEFAULT_CUSTOM_EVENT_TYPE,
    DEFAULT_SESSION_PAGE_COUNT,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn user_or_anonymous(user_id: Option<String>) -> String {
    user_id
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| ANONYMOUS_USER.to_string())
}

fn new_row_id() -> String {
    Uuid::new_v4().to_string()
}

/// Row for the page_views_stream table.
#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct PageViewRow {
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    pub page_url: String,
    pub page_title: String,
    pub referrer: String,
    pub user_agent: String,
    pub ip_address: String,
    pub time_on_page: u32,
    pub viewport_width: u16,
    pub viewport_height: u16,
    pub device: String,
    /// Milliseconds since epoch
    pub timestamp: i64,
}

impl PageViewRow {
    pub fn from_event(event: PageViewEvent, classifier: &DeviceClassifier) -> Self {
        let device = classifier.resolve(event.device, event.user_agent.as_deref());
        let viewport = event.viewport.unwrap_or_default();

        Self {
            id: new_row_id(),
            user_id: user_or_anonymous(event.user_id),
            session_id: event.session_id,
            page_url: event.page_url.unwrap_or_default(),
            page_title: event.page_title.unwrap_or_default(),
            referrer: event.referrer.unwrap_or_default(),
            user_agent: event.user_agent.unwrap_or_default(),
            ip_address: event.ip_address.unwrap_or_default(),
            time_on_page: event.time_on_page.unwrap_or(0),
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            device: device.as_str().to_string(),
            timestamp: event.timestamp.timestamp_millis(),
        }
    }
}

/// Row for the click_events_stream table.
#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct ClickRow {
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    pub page_url: String,
    pub element_type: String,
    pub element_text: String,
    pub element_id: String,
    pub element_class: String,
    pub click_x: u16,
    pub click_y: u16,
    pub timestamp: i64,
}

impl From<ClickEvent> for ClickRow {
    fn from(event: ClickEvent) -> Self {
        let position = event.click_position.unwrap_or_default();
        Self {
            id: new_row_id(),
            user_id: user_or_anonymous(event.user_id),
            session_id: event.session_id,
            page_url: event.page_url.unwrap_or_default(),
            element_type: event.element_type.unwrap_or_default(),
            element_text: event.element_text.unwrap_or_default(),
            element_id: event.element_id.unwrap_or_default(),
            element_class: event.element_class.unwrap_or_default(),
            click_x: position.x,
            click_y: position.y,
            timestamp: event.timestamp.timestamp_millis(),
        }
    }
}

/// Row for the scroll_depth_stream table.
#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct ScrollDepthRow {
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    pub page_url: String,
    pub max_scroll_depth: u8,
    /// JSON array of reached milestones, ascending
    pub scroll_milestones: String,
    pub page_height: u32,
    pub viewport_height: u32,
    pub time_to_max_scroll: u32,
    pub timestamp: i64,
}

impl From<ScrollDepthEvent> for ScrollDepthRow {
    fn from(event: ScrollDepthEvent) -> Self {
        let milestones = event.scroll_milestones.unwrap_or_default();
        Self {
            id: new_row_id(),
            user_id: user_or_anonymous(event.user_id),
            session_id: event.session_id,
            page_url: event.page_url.unwrap_or_default(),
            max_scroll_depth: event.max_scroll_depth.min(100),
            scroll_milestones: encode_bounded(&milestones, MAX_CUSTOM_PROPERTIES_BYTES)
                .unwrap_or_else(|_| "[]".to_string()),
            page_height: event.page_height.unwrap_or(0),
            viewport_height: event.viewport_height.unwrap_or(0),
            time_to_max_scroll: event.time_to_max_scroll.unwrap_or(0),
            timestamp: event.timestamp.timestamp_millis(),
        }
    }
}

/// Row for the sessions_stream table.
#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct SessionRow {
    pub session_id: String,
    pub user_id: String,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub duration: u32,
    pub page_count: u32,
    pub initial_referrer: String,
    pub initial_user_agent: String,
    pub ip_address: String,
    pub timestamp: i64,
}

impl From<SessionRecord> for SessionRow {
    fn from(record: SessionRecord) -> Self {
        Self {
            session_id: record.session_id,
            user_id: user_or_anonymous(record.user_id),
            start_time: record.start_time.map(|t| t.timestamp_millis()),
            end_time: record.end_time.map(|t| t.timestamp_millis()),
            duration: record.duration.unwrap_or(0),
            page_count: record.page_count.unwrap_or(DEFAULT_SESSION_PAGE_COUNT),
            initial_referrer: record.initial_referrer.unwrap_or_default(),
            initial_user_agent: record.initial_user_agent.unwrap_or_default(),
            ip_address: record.ip_address.unwrap_or_default(),
            timestamp: record.timestamp.timestamp_millis(),
        }
    }
}

/// Row for the custom_events_stream table.
#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct CustomEventRow {
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    pub page_url: String,
    pub event_type: String,
    pub event_name: String,
    /// Size-bounded JSON object
    pub properties: String,
    pub timestamp: i64,
}

impl From<CustomEvent> for CustomEventRow {
    fn from(event: CustomEvent) -> Self {
        Self {
            id: new_row_id(),
            user_id: user_or_anonymous(event.user_id),
            session_id: event.session_id,
            page_url: event.page_url.unwrap_or_default(),
            event_type: event
                .event_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_CUSTOM_EVENT_TYPE.to_string()),
            event_name: event.event_name.unwrap_or_default(),
            properties: encode_properties(event.properties.as_ref()),
            timestamp: event.timestamp.timestamp_millis(),
        }
    }
}

/// Append one row to a stream table.
pub async fn insert_row<T>(client: &ClickHouseClient, stream: StreamKind, row: &T) -> Result<()>
where
    T: Row + Serialize,
{
    let mut insert = client
        .inner()
        .insert(&client.table(stream))
        .map_err(|e| engine_core::Error::store(format!("Insert error: {}", e)))?;
    insert
        .write(row)
        .await
        .map_err(|e| engine_core::Error::store(format!("Write error: {}", e)))?;
    insert
        .end()
        .await
        .map_err(|e| engine_core::Error::store(format!("End error: {}", e)))?;
    Ok(())
}
