//! In-memory [`StoreAccessor`] backed by [`DashMap`].
//!
//! Each collection holds its documents in insertion order plus an index
//! catalog. Collections created through the store start with the implicit
//! identity index, the way document databases create them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use mimoid_core::{CatalogIndex, Document, StoreAccessor};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
struct MemoryCollection {
    documents: Vec<Document>,
    indexes: Vec<CatalogIndex>,
}

impl MemoryCollection {
    fn with_identity() -> Self {
        Self {
            documents: Vec::new(),
            indexes: vec![CatalogIndex::identity()],
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot format
// ---------------------------------------------------------------------------

/// Serialisable contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionSnapshot>,
}

/// One collection inside a [`StoreSnapshot`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    #[serde(default)]
    pub documents: Vec<Document>,
    /// Full live catalog. When omitted the collection carries only the
    /// identity index; when present it is taken verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexes: Option<Vec<CatalogIndex>>,
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory document store for tests and offline validation.
///
/// Collections live in a [`DashMap`], so concurrent collection workers never
/// contend on a single lock. Sampling draws from one shared RNG, optionally
/// seeded for reproducible samples.
pub struct MemoryStore {
    collections: DashMap<String, MemoryCollection>,
    rng: Mutex<StdRng>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store sampling from an OS-seeded RNG.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Creates an empty store whose samples are reproducible for `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            collections: DashMap::new(),
            rng: Mutex::new(rng),
            offline: AtomicBool::new(false),
        }
    }

    /// Loads a store from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot, seed: Option<u64>) -> Self {
        let store = match seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        };
        for (name, coll) in snapshot.collections {
            let indexes = coll
                .indexes
                .unwrap_or_else(|| vec![CatalogIndex::identity()]);
            store.collections.insert(
                name,
                MemoryCollection {
                    documents: coll.documents,
                    indexes,
                },
            );
        }
        store
    }

    /// Parses a JSON snapshot and loads it.
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed snapshots.
    pub fn from_json_str(json: &str, seed: Option<u64>) -> serde_json::Result<Self> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot, seed))
    }

    /// Point-in-time copy of the store contents.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let collections = self
            .collections
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    CollectionSnapshot {
                        documents: entry.documents.clone(),
                        indexes: Some(entry.indexes.clone()),
                    },
                )
            })
            .collect();
        StoreSnapshot { collections }
    }

    /// Creates `collection` with its identity index. Returns `false` if it
    /// already existed.
    pub fn create_collection(&self, collection: &str) -> bool {
        if self.collections.contains_key(collection) {
            return false;
        }
        self.collections
            .insert(collection.to_string(), MemoryCollection::with_identity());
        true
    }

    pub fn drop_collection(&self, collection: &str) -> bool {
        self.collections.remove(collection).is_some()
    }

    /// Appends a document, creating the collection if needed.
    pub fn insert(&self, collection: &str, document: Document) {
        self.collections
            .entry(collection.to_string())
            .or_insert_with(MemoryCollection::with_identity)
            .documents
            .push(document);
    }

    /// Appends many documents, creating the collection if needed.
    pub fn insert_many(&self, collection: &str, documents: impl IntoIterator<Item = Document>) {
        self.collections
            .entry(collection.to_string())
            .or_insert_with(MemoryCollection::with_identity)
            .documents
            .extend(documents);
    }

    /// Adds or replaces a catalog entry, returning the entry it replaced.
    pub fn create_index(&self, collection: &str, index: CatalogIndex) -> Option<CatalogIndex> {
        let mut coll = self
            .collections
            .entry(collection.to_string())
            .or_insert_with(MemoryCollection::with_identity);
        if let Some(slot) = coll.indexes.iter_mut().find(|i| i.name == index.name) {
            return Some(std::mem::replace(slot, index));
        }
        coll.indexes.push(index);
        None
    }

    /// Removes a catalog entry by name. Returns whether it existed.
    pub fn drop_index(&self, collection: &str, name: &str) -> bool {
        let Some(mut coll) = self.collections.get_mut(collection) else {
            return false;
        };
        let before = coll.indexes.len();
        coll.indexes.retain(|i| i.name != name);
        coll.indexes.len() != before
    }

    /// While offline every accessor call fails.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            anyhow::bail!("store is offline");
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreAccessor for MemoryStore {
    async fn document_count(&self, collection: &str) -> anyhow::Result<u64> {
        self.ensure_online()?;
        let len = self
            .collections
            .get(collection)
            .map_or(0, |coll| coll.documents.len());
        Ok(len as u64)
    }

    async fn sample_documents(&self, collection: &str, n: usize) -> anyhow::Result<Vec<Document>> {
        self.ensure_online()?;
        let Some(coll) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let documents = &coll.documents;
        if n >= documents.len() {
            return Ok(documents.clone());
        }

        let picked = {
            let mut rng = self.rng.lock();
            rand::seq::index::sample(&mut *rng, documents.len(), n)
        };
        Ok(picked.iter().map(|i| documents[i].clone()).collect())
    }

    async fn list_indexes(&self, collection: &str) -> anyhow::Result<Vec<CatalogIndex>> {
        self.ensure_online()?;
        Ok(self
            .collections
            .get(collection)
            .map(|coll| coll.indexes.clone())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
