use std::time::Duration;

use mimoid_core::ID_INDEX_NAME;

/// Engine-level configuration for a validation run.
///
/// Controls sampling, the width of the collection worker pool, and the run
/// deadline.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of documents sampled per collection.
    pub sample_size: usize,
    /// Maximum number of collections validated concurrently. 0 is treated as 1.
    pub max_concurrent_collections: usize,
    /// Deadline for the whole run. `None` means no deadline.
    pub run_timeout: Option<Duration>,
    /// Name of the implicit identity index every collection is expected to carry.
    pub id_index_name: String,
}

impl EngineConfig {
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, max_concurrent_collections: usize) -> Self {
        self.max_concurrent_collections = max_concurrent_collections;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = Some(run_timeout);
        self
    }

    /// Effective pool width, never zero.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_collections.max(1)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_size: 10,
            max_concurrent_collections: 4,
            run_timeout: None,
            id_index_name: ID_INDEX_NAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_size, 10);
        assert_eq!(config.max_concurrent_collections, 4);
        assert!(config.run_timeout.is_none());
        assert_eq!(config.id_index_name, "_id_");
    }

    #[test]
    fn zero_concurrency_means_sequential() {
        let config = EngineConfig::default().with_concurrency(0);
        assert_eq!(config.concurrency(), 1);
    }

    #[test]
    fn builders_override_fields() {
        let config = EngineConfig::default()
            .with_sample_size(25)
            .with_concurrency(8)
            .with_timeout(Duration::from_secs(3));
        assert_eq!(config.sample_size, 25);
        assert_eq!(config.concurrency(), 8);
        assert_eq!(config.run_timeout, Some(Duration::from_secs(3)));
    }
}
