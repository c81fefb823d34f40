//! Validation engine: orchestrates sampling, shape checks and index diffs.
//!
//! For every declared collection the engine
//!
//! 1. counts documents,
//! 2. samples `min(sample_size, count)` documents and runs the collection's
//!    validator over them (only if one is registered),
//! 3. diffs the live index catalog against the declared indexes,
//!
//! then folds the per-collection reports into one [`ValidationResult`].
//!
//! Collections are independent, so up to
//! [`EngineConfig::max_concurrent_collections`] are validated at once. Results
//! are keyed by name in a `BTreeMap`, which keeps the output identical
//! whatever order the workers finish in. The first store failure drops every
//! outstanding collection and is returned alone.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use mimoid_core::{
    CollectionReport, CollectionSchema, DatabaseSchema, DocumentValidator, ShapeReport,
    StoreAccessor, ValidationResult, ValidatorRegistry,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use crate::config::EngineConfig;
use crate::error::{StoreOperation, ValidateError};
use crate::index_diff::diff_indexes;
use crate::shape_check::check_documents;

/// Validates `schema` against `store` with the default configuration and the
/// given sample size.
///
/// # Errors
///
/// See [`Engine::validate`].
pub async fn validate(
    schema: &DatabaseSchema,
    registry: &ValidatorRegistry,
    store: &dyn StoreAccessor,
    sample_size: usize,
) -> Result<ValidationResult, ValidateError> {
    Engine::new(EngineConfig::default().with_sample_size(sample_size))
        .validate(schema, registry, store)
        .await
}

/// Schema conformance engine.
///
/// Holds no connections or locks of its own; the schema, registry and store
/// are borrowed for the length of one run.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one validation pass over every declared collection.
    ///
    /// # Errors
    ///
    /// - [`ValidateError::InvalidSchema`] if the schema fails its structural
    ///   check (raised before the store is touched).
    /// - [`ValidateError::StoreUnavailable`] if any store call fails.
    /// - [`ValidateError::TimedOut`] if `run_timeout` elapses.
    pub async fn validate(
        &self,
        schema: &DatabaseSchema,
        registry: &ValidatorRegistry,
        store: &dyn StoreAccessor,
    ) -> Result<ValidationResult, ValidateError> {
        self.validate_with_cancel(schema, registry, store, &CancellationToken::new())
            .await
    }

    /// Like [`validate`](Self::validate), but aborts with
    /// [`ValidateError::Cancelled`] as soon as `cancel` fires. Outstanding
    /// store calls are dropped and no partial result is returned.
    ///
    /// # Errors
    ///
    /// See [`validate`](Self::validate), plus [`ValidateError::Cancelled`].
    pub async fn validate_with_cancel(
        &self,
        schema: &DatabaseSchema,
        registry: &ValidatorRegistry,
        store: &dyn StoreAccessor,
        cancel: &CancellationToken,
    ) -> Result<ValidationResult, ValidateError> {
        schema.check()?;

        for name in registry.collections() {
            if schema.collection(name).is_none() {
                debug!(collection = name, "validator registered for undeclared collection");
            }
        }

        let span = info_span!(
            "validate",
            database = %schema.database_name,
            collections = schema.collections.len(),
            sample_size = self.config.sample_size,
        );
        let run = self.run(schema, registry, store).instrument(span);

        let bounded = async {
            match self.config.run_timeout {
                Some(limit) => match tokio::time::timeout(limit, run).await {
                    Ok(result) => result,
                    Err(_elapsed) => Err(ValidateError::TimedOut {
                        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    }),
                },
                None => run.await,
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ValidateError::Cancelled),
            result = bounded => result,
        }
    }

    async fn run(
        &self,
        schema: &DatabaseSchema,
        registry: &ValidatorRegistry,
        store: &dyn StoreAccessor,
    ) -> Result<ValidationResult, ValidateError> {
        let reports: BTreeMap<String, CollectionReport> =
            stream::iter(schema.collections.values())
                .map(move |collection| async move {
                    let span = info_span!("collection", name = %collection.name);
                    let report = self
                        .validate_collection(collection, registry.get(&collection.name), store)
                        .instrument(span)
                        .await?;
                    Ok::<_, ValidateError>((collection.name.clone(), report))
                })
                .buffer_unordered(self.config.concurrency())
                .try_collect()
                .await?;

        let result = ValidationResult::from_reports(schema.database_name.clone(), reports);
        debug!(
            overall_success = result.validation_summary.overall_success,
            total_errors = result.validation_summary.total_validation_errors,
            "validation run complete"
        );
        Ok(result)
    }

    async fn validate_collection(
        &self,
        collection: &CollectionSchema,
        validator: Option<&Arc<dyn DocumentValidator>>,
        store: &dyn StoreAccessor,
    ) -> Result<CollectionReport, ValidateError> {
        let name = collection.name.as_str();

        let document_count = store
            .document_count(name)
            .await
            .map_err(ValidateError::store(name, StoreOperation::DocumentCount))?;

        let (documents_sampled, schema_validation) = match validator {
            None => {
                debug!(collection = name, "no validator registered, shape check skipped");
                (0, ShapeReport::default())
            }
            Some(validator) => {
                let k = usize::try_from(document_count)
                    .map_or(self.config.sample_size, |n| n.min(self.config.sample_size));
                if k == 0 {
                    (0, ShapeReport::default())
                } else {
                    let mut documents = store
                        .sample_documents(name, k)
                        .await
                        .map_err(ValidateError::store(name, StoreOperation::SampleDocuments))?;
                    documents.truncate(k);
                    let report = check_documents(&**validator, &documents);
                    (u64::try_from(documents.len()).unwrap_or(u64::MAX), report)
                }
            }
        };

        let actual = store
            .list_indexes(name)
            .await
            .map_err(ValidateError::store(name, StoreOperation::ListIndexes))?;
        let index_validation =
            diff_indexes(&collection.indexes, &actual, &self.config.id_index_name);

        if !schema_validation.passed {
            warn!(
                collection = name,
                invalid_documents = schema_validation.invalid_documents,
                "shape check failed"
            );
        }
        if !index_validation.passed {
            warn!(
                collection = name,
                missing = ?index_validation.missing_indexes,
                errors = index_validation.errors.len(),
                "index check failed"
            );
        }
        debug!(
            collection = name,
            document_count,
            documents_sampled,
            "collection validated"
        );

        Ok(CollectionReport {
            document_count,
            documents_sampled,
            schema_validation,
            index_validation,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
