use async_trait::async_trait;

use crate::index::CatalogIndex;
use crate::types::Document;

/// Narrow read-only view of a live document store.
///
/// The only component that talks to the database. Implementations own their
/// connection lifecycle; the engine only borrows the accessor for the length
/// of a run. Any `Err` is fatal for the run that made the call.
#[async_trait]
pub trait StoreAccessor: Send + Sync {
    /// Number of documents currently in `collection`.
    async fn document_count(&self, collection: &str) -> anyhow::Result<u64>;

    /// Up to `n` documents from `collection`.
    ///
    /// If the collection holds at most `n` documents, all of them are
    /// returned. Otherwise exactly `n` are chosen uniformly at random without
    /// replacement, independent of physical storage order.
    async fn sample_documents(&self, collection: &str, n: usize) -> anyhow::Result<Vec<Document>>;

    /// The live index catalog of `collection`, including the implicit
    /// identity index.
    async fn list_indexes(&self, collection: &str) -> anyhow::Result<Vec<CatalogIndex>>;
}
