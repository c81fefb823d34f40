//! Document shape violations and the per-collection validator registry.
//!
//! The engine does not define a shape language. It depends only on the
//! [`DocumentValidator`] capability, looked up by collection name in a
//! [`ValidatorRegistry`]. Collections without a validator skip shape
//! validation entirely.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::json_shape::JsonShapeValidator;
use crate::schema::DatabaseSchema;
use crate::types::Document;

// ---------------------------------------------------------------------------
// ShapeViolation
// ---------------------------------------------------------------------------

/// Category of a shape violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingField,
    UnexpectedField,
    TypeMismatch,
    ConstraintFailed,
    /// The validator itself failed instead of returning a verdict.
    ValidatorCrashed,
}

/// One way a document fails its declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeViolation {
    pub kind: ViolationKind,
    /// Dotted path to the offending field (`address.city`, `tags[2]`).
    /// Empty for document-level problems.
    pub path: String,
    pub message: String,
}

impl ShapeViolation {
    pub fn new(kind: ViolationKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn missing_field(path: impl Into<String>) -> Self {
        Self::new(ViolationKind::MissingField, path, "required field is missing")
    }

    pub fn unexpected_field(path: impl Into<String>) -> Self {
        Self::new(ViolationKind::UnexpectedField, path, "field is not declared")
    }

    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl fmt::Display,
        actual: impl fmt::Display,
    ) -> Self {
        Self::new(
            ViolationKind::TypeMismatch,
            path,
            format!("expected {expected}, got {actual}"),
        )
    }

    pub fn constraint(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ViolationKind::ConstraintFailed, path, message)
    }

    pub fn validator_crashed(message: impl Into<String>) -> Self {
        Self::new(ViolationKind::ValidatorCrashed, "", message)
    }
}

impl fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::ValidatorCrashed => write!(f, "validator crashed: {}", self.message),
            _ if self.path.is_empty() => write!(f, "{}", self.message),
            _ => write!(f, "field '{}': {}", self.path, self.message),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentValidator
// ---------------------------------------------------------------------------

/// Validates one document against a collection's declared shape.
///
/// Returns an empty list when the document conforms. Returning `Err` (or
/// panicking) is treated by the engine as a single
/// [`ViolationKind::ValidatorCrashed`] violation for that document.
///
/// Implementations are assumed to be pure functions of the document.
pub trait DocumentValidator: Send + Sync {
    /// Validate `document`, listing every violation found.
    fn validate(&self, document: &Document) -> anyhow::Result<Vec<ShapeViolation>>;
}

impl<F> DocumentValidator for F
where
    F: Fn(&Document) -> anyhow::Result<Vec<ShapeViolation>> + Send + Sync,
{
    fn validate(&self, document: &Document) -> anyhow::Result<Vec<ShapeViolation>> {
        self(document)
    }
}

// ---------------------------------------------------------------------------
// ValidatorRegistry
// ---------------------------------------------------------------------------

/// Mapping from collection name to its document validator.
///
/// Partial registries are expected: collections without an entry are only
/// index-checked.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn DocumentValidator>>,
}

impl ValidatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry holding a [`JsonShapeValidator`] for every collection
    /// that declares a shape.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidShape`] if a declared shape cannot be
    /// compiled.
    pub fn from_schema(schema: &DatabaseSchema) -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        for (name, collection) in &schema.collections {
            if let Some(shape) = &collection.shape {
                let validator = JsonShapeValidator::compile(shape).map_err(|reason| {
                    SchemaError::InvalidShape {
                        collection: name.clone(),
                        reason,
                    }
                })?;
                registry.register(name.clone(), validator);
            }
        }
        Ok(registry)
    }

    /// Registers a validator, returning the one it replaces.
    pub fn register<V>(
        &mut self,
        collection: impl Into<String>,
        validator: V,
    ) -> Option<Arc<dyn DocumentValidator>>
    where
        V: DocumentValidator + 'static,
    {
        self.validators.insert(collection.into(), Arc::new(validator))
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with<V>(mut self, collection: impl Into<String>, validator: V) -> Self
    where
        V: DocumentValidator + 'static,
    {
        self.register(collection, validator);
        self
    }

    pub fn remove(&mut self, collection: &str) -> Option<Arc<dyn DocumentValidator>> {
        self.validators.remove(collection)
    }

    #[must_use]
    pub fn get(&self, collection: &str) -> Option<&Arc<dyn DocumentValidator>> {
        self.validators.get(collection)
    }

    #[must_use]
    pub fn contains(&self, collection: &str) -> bool {
        self.validators.contains_key(collection)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Registered collection names, sorted.
    #[must_use]
    pub fn collections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.validators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("collections", &self.collections())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::CollectionSchema;

    fn requires_email(doc: &Document) -> anyhow::Result<Vec<ShapeViolation>> {
        if doc.get("email").is_some() {
            Ok(Vec::new())
        } else {
            Ok(vec![ShapeViolation::missing_field("email")])
        }
    }

    #[test]
    fn closures_are_validators() {
        let registry = ValidatorRegistry::new().with("users", requires_email);
        let validator = registry.get("users").unwrap();
        assert!(validator.validate(&json!({"email": "a@b.c"})).unwrap().is_empty());
        assert_eq!(validator.validate(&json!({})).unwrap().len(), 1);
    }

    #[test]
    fn register_replaces_and_reports_previous() {
        let mut registry = ValidatorRegistry::new();
        assert!(registry.register("users", requires_email).is_none());
        assert!(registry.register("users", requires_email).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.remove("users").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn collections_are_sorted() {
        let registry = ValidatorRegistry::new()
            .with("users", requires_email)
            .with("accounts", requires_email);
        assert_eq!(registry.collections(), vec!["accounts", "users"]);
        assert!(format!("{registry:?}").contains("accounts"));
    }

    #[test]
    fn from_schema_skips_collections_without_shape() {
        let schema = DatabaseSchema::new("shop")
            .with_collection(
                CollectionSchema::new("users")
                    .with_shape(json!({"bsonType": "object", "required": ["email"]})),
            )
            .with_collection(CollectionSchema::new("audit_logs"));
        let registry = ValidatorRegistry::from_schema(&schema).unwrap();
        assert!(registry.contains("users"));
        assert!(!registry.contains("audit_logs"));
    }

    #[test]
    fn from_schema_reports_bad_shapes() {
        let schema = DatabaseSchema::new("shop").with_collection(
            CollectionSchema::new("users").with_shape(json!({"bsonType": "quaternion"})),
        );
        let err = ValidatorRegistry::from_schema(&schema).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidShape { collection, .. } if collection == "users"));
    }

    #[test]
    fn violation_display() {
        assert_eq!(
            ShapeViolation::type_mismatch("age", "int", "string").to_string(),
            "field 'age': expected int, got string"
        );
        assert_eq!(
            ShapeViolation::validator_crashed("boom").to_string(),
            "validator crashed: boom"
        );
        assert_eq!(
            ShapeViolation::constraint("", "document must be an object").to_string(),
            "document must be an object"
        );
    }
}
