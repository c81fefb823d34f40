use std::fmt;

use mimoid_core::SchemaError;

/// Store accessor call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    DocumentCount,
    SampleDocuments,
    ListIndexes,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOperation::DocumentCount => f.write_str("document_count"),
            StoreOperation::SampleDocuments => f.write_str("sample_documents"),
            StoreOperation::ListIndexes => f.write_str("list_indexes"),
        }
    }
}

/// Fatal errors that abort a validation run.
///
/// A run either returns a complete `ValidationResult` or exactly one of these;
/// partial results are never surfaced. Shape violations and index mismatches
/// are not errors and live in the result instead.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("store unavailable during {operation} on '{collection}': {source}")]
    StoreUnavailable {
        collection: String,
        operation: StoreOperation,
        #[source]
        source: anyhow::Error,
    },
    #[error("validation run cancelled")]
    Cancelled,
    #[error("validation run timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),
}

impl ValidateError {
    pub(crate) fn store(
        collection: &str,
        operation: StoreOperation,
    ) -> impl FnOnce(anyhow::Error) -> Self + '_ {
        move |source| ValidateError::StoreUnavailable {
            collection: collection.to_string(),
            operation,
            source,
        }
    }

    /// Whether the store itself could not be reached (as opposed to the run
    /// being stopped by its caller).
    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, ValidateError::StoreUnavailable { .. })
    }
}
