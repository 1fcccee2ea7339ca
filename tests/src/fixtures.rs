//! Test fixtures: tracking payloads as a browser client sends them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

pub fn session_id() -> String {
    format!("sess-{}", uuid::Uuid::new_v4())
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn page_view(session: &str, page_url: &str, at: DateTime<Utc>) -> Value {
    json!({
        "userId": "user-1",
        "sessionId": session,
        "pageUrl": page_url,
        "pageTitle": "Pricing",
        "referrer": "https://search.example/",
        "userAgent": "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
        "timeOnPage": 42,
        "viewport": {"width": 1440, "height": 900},
        "timestamp": ts(at),
    })
}

pub fn click(session: &str, page_url: &str, x: u16, y: u16, at: DateTime<Utc>) -> Value {
    json!({
        "userId": "user-1",
        "sessionId": session,
        "pageUrl": page_url,
        "elementType": "button",
        "elementText": "Start trial",
        "elementId": "cta",
        "elementClass": "btn btn-primary",
        "clickPosition": {"x": x, "y": y},
        "timestamp": ts(at),
    })
}

pub fn scroll(session: &str, page_url: &str, depth: u8, at: DateTime<Utc>) -> Value {
    json!({
        "userId": "user-1",
        "sessionId": session,
        "pageUrl": page_url,
        "maxScrollDepth": depth,
        "pageHeight": 4200,
        "viewportHeight": 900,
        "timeToMaxScroll": 12,
        "timestamp": ts(at),
    })
}

pub fn session(session: &str, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Value {
    let mut body = json!({
        "sessionId": session,
        "userId": "user-1",
        "startTime": ts(start),
        "pageCount": 3,
        "initialReferrer": "https://search.example/",
        "initialUserAgent": "Mozilla/5.0",
        "timestamp": ts(end.unwrap_or(start)),
    });
    if let Some(end) = end {
        body["endTime"] = json!(ts(end));
        body["duration"] = json!((end - start).num_seconds());
    }
    body
}

pub fn custom_event(session: &str, name: &str, at: DateTime<Utc>) -> Value {
    json!({
        "userId": "user-1",
        "sessionId": session,
        "pageUrl": "/checkout",
        "eventType": "conversion",
        "eventName": name,
        "properties": {"plan": "pro", "amount": 49},
        "timestamp": ts(at),
    })
}

/// Decodes a fixture into a typed payload.
pub fn typed<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("fixture matches payload type")
}
