//! Core types, validation, and scroll tracking for the analytics engine.

pub mod device;
pub mod encoding;
pub mod error;
pub mod events;
pub mod limits;
pub mod schema;
pub mod scroll;
pub mod window;

pub use device::DeviceClassifier;
pub use error::{Error, Result, ValidationErrorCode};
pub use events::*;
pub use scroll::{Milestone, MilestoneSet, ScrollTracker};
pub use window::TimeWindow;
