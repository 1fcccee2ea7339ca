//! HTTP API layer for the analytics engine.

pub mod extractors;
pub mod response;
pub mod routes;
pub mod scroll;
pub mod state;

pub use routes::router;
pub use state::AppState;
