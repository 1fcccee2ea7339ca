//! ClickHouse event store for the analytics engine.

pub mod client;
pub mod config;
pub mod credentials;
pub mod insert;
pub mod query;
pub mod schema;
pub mod store;

pub use client::*;
pub use config::*;
pub use credentials::{validate_credentials, CredentialIssue};
pub use query::*;
pub use store::*;
