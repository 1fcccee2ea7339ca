//! Schema validation for tracked events.

use validator::Validate;

use crate::error::{Error, Result, ValidationErrorCode};
use crate::events::TrackedEvent;
use crate::limits::MAX_EVENT_SIZE_BYTES;

/// Validates a raw tracking payload size BEFORE deserialization.
pub fn validate_event_size(raw_bytes: &[u8]) -> Result<()> {
    if raw_bytes.len() > MAX_EVENT_SIZE_BYTES {
        return Err(Error::validation_code(
            ValidationErrorCode::PayloadTooLarge,
            format!(
                "event {}KB exceeds {}KB limit",
                raw_bytes.len() / 1024,
                MAX_EVENT_SIZE_BYTES / 1024
            ),
        ));
    }
    Ok(())
}

/// Validates an event against its schema.
pub fn validate_event(event: &TrackedEvent) -> Result<()> {
    let result = match event {
        TrackedEvent::PageView(e) => e.validate(),
        TrackedEvent::Click(e) => e.validate(),
        TrackedEvent::ScrollDepth(e) => e.validate(),
        TrackedEvent::Session(e) => e.validate(),
        TrackedEvent::Custom(e) => e.validate(),
    };

    result.map_err(|e| {
        Error::validation_code(
            ValidationErrorCode::InvalidFormat,
            format!("{}: {}", event.stream(), e),
        )
    })
}
