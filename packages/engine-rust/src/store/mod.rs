//! Store accessor implementations shipped with the engine.
//!
//! Production callers implement [`StoreAccessor`](mimoid_core::StoreAccessor)
//! over their own database driver. [`MemoryStore`] is the in-process
//! implementation used by tests, fixtures and the command-line wrapper.

pub mod memory;

pub use memory::{CollectionSnapshot, MemoryStore, StoreSnapshot};
