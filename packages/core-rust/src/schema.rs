//! Declarative schema model: databases, collections, and their indexes.
//!
//! Schemas are plain data. Callers build one explicitly (or load it from
//! JSON) and hand it to the engine; nothing here holds process-wide state.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::index::IndexSpec;

/// Declared shape and indexes of one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Collection name. May be omitted in JSON; it is then taken from the
    /// key the collection is registered under.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Declared indexes, names unique within the collection.
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    /// Optional `$jsonSchema`-style document shape. Only consumed when the
    /// validator registry is built from the schema; the engine itself never
    /// reads it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<serde_json::Value>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            indexes: Vec::new(),
            shape: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn with_shape(mut self, shape: serde_json::Value) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Looks up a declared index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexSpec> {
        self.indexes.iter().find(|idx| idx.name == name)
    }

    /// Checks index name uniqueness and each index's key list.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn check(&self) -> Result<(), SchemaError> {
        let mut names = HashSet::with_capacity(self.indexes.len());
        for index in &self.indexes {
            if !names.insert(index.name.as_str()) {
                return Err(SchemaError::DuplicateIndex {
                    collection: self.name.clone(),
                    index: index.name.clone(),
                });
            }
            index.check(&self.name)?;
        }
        Ok(())
    }
}

/// Declared structure of a whole database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub database_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Collections keyed by name. Ordered so every traversal is deterministic.
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionSchema>,
}

impl DatabaseSchema {
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            description: String::new(),
            collections: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a collection, replacing any earlier declaration with the same name.
    #[must_use]
    pub fn with_collection(mut self, collection: CollectionSchema) -> Self {
        self.collections.insert(collection.name.clone(), collection);
        self
    }

    /// Adds a collection, refusing to replace an existing declaration.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateCollection`] if the name is taken.
    pub fn insert_collection(&mut self, collection: CollectionSchema) -> Result<(), SchemaError> {
        if self.collections.contains_key(&collection.name) {
            return Err(SchemaError::DuplicateCollection {
                name: collection.name,
            });
        }
        self.collections.insert(collection.name.clone(), collection);
        Ok(())
    }

    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&CollectionSchema> {
        self.collections.get(name)
    }

    /// Iterates collection names in deterministic (lexicographic) order.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Checks every collection, and that each is registered under its own name.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn check(&self) -> Result<(), SchemaError> {
        for (key, collection) in &self.collections {
            if key != &collection.name {
                return Err(SchemaError::CollectionNameMismatch {
                    key: key.clone(),
                    name: collection.name.clone(),
                });
            }
            collection.check()?;
        }
        Ok(())
    }

    /// Parses a schema from JSON and checks it.
    ///
    /// Collections whose `name` is omitted take the name of their map key.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Parse`] for malformed JSON and any structural
    /// error reported by [`DatabaseSchema::check`].
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let mut schema: DatabaseSchema = serde_json::from_str(json)?;
        for (key, collection) in &mut schema.collections {
            if collection.name.is_empty() {
                collection.name.clone_from(key);
            }
        }
        schema.check()?;
        Ok(schema)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
