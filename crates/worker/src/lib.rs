//! Scheduled export of aggregated analytics to object storage.
//!
//! - Source (windowed aggregates read from the event store)
//! - Exporter (single-flight cycle runner with all-settled jobs)
//! - Artifact (object keys and JSON manifests)
//! - Sink (OpenDAL-backed object storage)
//! - Watermark (export checkpoint)
//! - Scheduler (warm-up, interval and sink check timers)

pub mod artifact;
pub mod exporter;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod watermark;

pub use artifact::{ExportJob, ExportManifest};
pub use exporter::*;
pub use scheduler::*;
pub use sink::{connectivity_check, ObjectMetadata, ObjectSink, OpendalSink, StorageBackend, StorageConfig};
pub use source::ExportSource;
pub use watermark::{FileWatermark, MemoryWatermark, WatermarkStore};
