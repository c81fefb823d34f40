//! `mimoid` engine: checks that a live document store conforms to a declared
//! [`DatabaseSchema`](mimoid_core::DatabaseSchema).
//!
//! The engine samples documents through a [`StoreAccessor`](mimoid_core::StoreAccessor),
//! runs the registered document validators, diffs live index catalogs against
//! declared indexes, and returns a structured
//! [`ValidationResult`](mimoid_core::ValidationResult). It never prints; progress
//! is emitted as `tracing` events for whatever subscriber the caller installs.

pub mod config;
pub mod engine;
pub mod error;
pub mod index_diff;
pub mod shape_check;
pub mod store;

pub use config::EngineConfig;
pub use engine::{validate, Engine};
pub use error::{StoreOperation, ValidateError};
pub use store::{MemoryStore, StoreSnapshot};
pub use tokio_util::sync::CancellationToken;
