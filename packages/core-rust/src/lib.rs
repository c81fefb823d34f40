//! `mimoid` core: declarative schema model, index direction encoding,
//! document validator registry, the store accessor seam, and the validation
//! result model.

pub mod error;
pub mod index;
pub mod json_shape;
pub mod result;
pub mod schema;
pub mod shape;
pub mod traits;
pub mod types;

pub use error::SchemaError;
pub use index::{CatalogIndex, IndexDirection, IndexSpec, RawDirection};
pub use json_shape::JsonShapeValidator;
pub use result::{
    CollectionReport, IndexIssue, IndexProperty, IndexReport, ShapeReport, ValidationResult,
    ValidationSummary,
};
pub use schema::{CollectionSchema, DatabaseSchema};
pub use shape::{DocumentValidator, ShapeViolation, ValidatorRegistry, ViolationKind};
pub use traits::StoreAccessor;
pub use types::{Document, ID_FIELD, ID_INDEX_NAME};
