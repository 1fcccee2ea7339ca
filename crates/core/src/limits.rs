//! Size and window limits for the analytics engine.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

// === Payload Limits ===

/// Maximum single tracking payload size in bytes (32KB).
pub const MAX_EVENT_SIZE_BYTES: usize = 32 * 1024;

/// Maximum encoded size of custom event properties and other opaque blobs (16KB).
pub const MAX_CUSTOM_PROPERTIES_BYTES: usize = 16 * 1024;

// === String Field Limits (chars) ===

/// User and session identifier max length.
pub const MAX_ID_LEN: usize = 128;

/// Page URL and referrer max length.
pub const MAX_URL_LEN: usize = 2048;

/// Page title max length.
pub const MAX_TITLE_LEN: usize = 500;

/// User agent string max length.
pub const MAX_USER_AGENT_LEN: usize = 512;

/// IP address max length (IPv6 = 45 chars).
pub const MAX_IP_LEN: usize = 45;

/// Clicked element text max length.
pub const MAX_ELEMENT_TEXT_LEN: usize = 200;

// === Query Windows ===

/// Default realtime window in minutes.
pub const DEFAULT_REALTIME_MINUTES: u32 = 30;

/// Default heatmap and scroll window in minutes.
pub const DEFAULT_PAGE_WINDOW_MINUTES: u32 = 30;

/// Default dashboard window in hours.
pub const DEFAULT_DASHBOARD_HOURS: u32 = 24;

/// Largest accepted query window in minutes (31 days).
pub const MAX_WINDOW_MINUTES: u32 = 31 * 24 * 60;

/// Largest accepted dashboard window in hours (31 days).
pub const MAX_WINDOW_HOURS: u32 = 31 * 24;

/// Top pages returned by the realtime query.
pub const REALTIME_TOP_PAGES: u32 = 20;

/// Top pages returned by the dashboard.
pub const DASHBOARD_TOP_PAGES: u32 = 10;
