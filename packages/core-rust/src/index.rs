//! Index declarations and the canonical direction encoding.
//!
//! Declared indexes carry a tagged [`IndexDirection`]. Live index catalogs
//! always report raw encoded values, modelled as [`RawDirection`].
//! [`IndexDirection::encode`] is the single bridge between the two; the
//! engine calls it once per key at comparison time.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SchemaError;
use crate::types::{ID_FIELD, ID_INDEX_NAME};

// ---------------------------------------------------------------------------
// RawDirection
// ---------------------------------------------------------------------------

/// A direction value exactly as a live index catalog reports it.
///
/// Integral floats (`1.0`, `-1.0`) are folded into [`RawDirection::Int`] on
/// deserialisation so that representation alone never produces a mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawDirection {
    /// Numeric direction (`1` ascending, `-1` descending).
    Int(i64),
    /// Special index type token (`"text"`, `"hashed"`, `"2dsphere"`, ...).
    Token(String),
}

impl fmt::Display for RawDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawDirection::Int(n) => write!(f, "{n}"),
            RawDirection::Token(t) => write!(f, "\"{t}\""),
        }
    }
}

impl Serialize for RawDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawDirection::Int(n) => serializer.serialize_i64(*n),
            RawDirection::Token(t) => serializer.serialize_str(t),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireDirection {
    Int(i64),
    Float(f64),
    Token(String),
}

impl From<WireDirection> for RawDirection {
    fn from(wire: WireDirection) -> Self {
        match wire {
            WireDirection::Int(n) => RawDirection::Int(n),
            WireDirection::Float(x) => {
                // |x| < 2^53 keeps the integral value exactly representable.
                if x.fract() == 0.0 && x.abs() < 9_007_199_254_740_992.0 {
                    #[allow(clippy::cast_possible_truncation)]
                    let n = x as i64;
                    RawDirection::Int(n)
                } else {
                    RawDirection::Token(x.to_string())
                }
            }
            WireDirection::Token(t) => RawDirection::Token(t),
        }
    }
}

impl<'de> Deserialize<'de> for RawDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        WireDirection::deserialize(deserializer).map(Into::into)
    }
}

// ---------------------------------------------------------------------------
// IndexDirection
// ---------------------------------------------------------------------------

/// Declared direction or type of one index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexDirection {
    Ascending,
    Descending,
    Text,
    Hashed,
    Geo2DSphere,
}

impl IndexDirection {
    /// Returns the encoded form a live catalog would report for this direction.
    #[must_use]
    pub fn encode(self) -> RawDirection {
        match self {
            IndexDirection::Ascending => RawDirection::Int(1),
            IndexDirection::Descending => RawDirection::Int(-1),
            IndexDirection::Text => RawDirection::Token("text".to_string()),
            IndexDirection::Hashed => RawDirection::Token("hashed".to_string()),
            IndexDirection::Geo2DSphere => RawDirection::Token("2dsphere".to_string()),
        }
    }

    /// Parses a raw encoded value back into a declared direction.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownDirection`] for values outside the
    /// supported encodings.
    pub fn from_raw(raw: &RawDirection) -> Result<Self, SchemaError> {
        match raw {
            RawDirection::Int(1) => Ok(IndexDirection::Ascending),
            RawDirection::Int(-1) => Ok(IndexDirection::Descending),
            RawDirection::Token(t) if t == "text" => Ok(IndexDirection::Text),
            RawDirection::Token(t) if t == "hashed" => Ok(IndexDirection::Hashed),
            RawDirection::Token(t) if t == "2dsphere" => Ok(IndexDirection::Geo2DSphere),
            other => Err(SchemaError::UnknownDirection {
                raw: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for IndexDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl Serialize for IndexDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.encode().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IndexDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawDirection::deserialize(deserializer)?;
        IndexDirection::from_raw(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// IndexSpec
// ---------------------------------------------------------------------------

fn default_background() -> bool {
    true
}

/// Declared index on a collection.
///
/// Key order is significant: compound indexes are compared positionally,
/// never as a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name, unique within its owning collection.
    pub name: String,
    /// Ordered `(field, direction)` pairs.
    pub keys: Vec<(String, IndexDirection)>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub sparse: bool,
    /// Build-mode hint. Not part of the conformance check.
    #[serde(default = "default_background")]
    pub background: bool,
}

impl IndexSpec {
    /// Creates a non-unique, non-sparse index with no keys yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
            unique: false,
            sparse: false,
            background: true,
        }
    }

    /// Appends a key field. Call order is key order.
    #[must_use]
    pub fn key(mut self, field: impl Into<String>, direction: IndexDirection) -> Self {
        self.keys.push((field.into(), direction));
        self
    }

    /// Appends a key field given its raw encoded direction.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownDirection`] if `raw` is not a supported
    /// encoding.
    pub fn raw_key(
        self,
        field: impl Into<String>,
        raw: &RawDirection,
    ) -> Result<Self, SchemaError> {
        let direction = IndexDirection::from_raw(raw)?;
        Ok(self.key(field, direction))
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    #[must_use]
    pub fn foreground(mut self) -> Self {
        self.background = false;
        self
    }

    /// Returns the key list in the encoding a live catalog uses.
    #[must_use]
    pub fn encoded_keys(&self) -> Vec<(String, RawDirection)> {
        self.keys
            .iter()
            .map(|(field, direction)| (field.clone(), direction.encode()))
            .collect()
    }

    /// Checks that the index has at least one key and no repeated field.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyIndexKeys`] or
    /// [`SchemaError::DuplicateKeyField`].
    pub fn check(&self, collection: &str) -> Result<(), SchemaError> {
        if self.keys.is_empty() {
            return Err(SchemaError::EmptyIndexKeys {
                collection: collection.to_string(),
                index: self.name.clone(),
            });
        }
        let mut seen = HashSet::with_capacity(self.keys.len());
        for (field, _) in &self.keys {
            if !seen.insert(field.as_str()) {
                return Err(SchemaError::DuplicateKeyField {
                    collection: collection.to_string(),
                    index: self.name.clone(),
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CatalogIndex
// ---------------------------------------------------------------------------

/// One entry of a live index catalog, as listed by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIndex {
    pub name: String,
    /// Ordered `(field, raw direction)` pairs as the store reports them.
    pub keys: Vec<(String, RawDirection)>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub sparse: bool,
}

impl CatalogIndex {
    pub fn new(name: impl Into<String>, keys: Vec<(String, RawDirection)>) -> Self {
        Self {
            name: name.into(),
            keys,
            unique: false,
            sparse: false,
        }
    }

    /// The implicit identity index every collection carries.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(
            ID_INDEX_NAME,
            vec![(ID_FIELD.to_string(), RawDirection::Int(1))],
        )
    }

    /// The catalog entry a store would report after building `spec` exactly.
    #[must_use]
    pub fn from_spec(spec: &IndexSpec) -> Self {
        Self {
            name: spec.name.clone(),
            keys: spec.encoded_keys(),
            unique: spec.unique,
            sparse: spec.sparse,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
