//! Document validator compiled from a `$jsonSchema`-style shape declaration.
//!
//! Standard JSON Schema keywords (`required`, `properties`,
//! `additionalProperties`, `enum`, `minimum`, `pattern`, `items`, ...) are
//! evaluated by the `jsonschema` crate. The document-store specific
//! `bsonType` keyword is registered on top of it as a custom keyword.
//!
//! Validation never stops at the first problem: every violation in the
//! document is reported, with its JSON pointer rewritten as a dotted path
//! (`address.city`, `tags[2]`).

use std::fmt;
use std::sync::LazyLock;

use jsonschema::error::ValidationErrorKind;
use jsonschema::paths::{LazyLocation, Location};
use jsonschema::{Keyword, ValidationError, Validator};
use regex::Regex;
use serde_json::{Map, Value};

use crate::shape::{DocumentValidator, ShapeViolation, ViolationKind};
use crate::types::Document;

static OBJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("static regex"));

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?$")
        .expect("static regex")
});

// ---------------------------------------------------------------------------
// BsonType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BsonType {
    Object,
    String,
    Int,
    Long,
    Double,
    Decimal,
    Number,
    Bool,
    Date,
    ObjectId,
    Array,
    Null,
}

impl BsonType {
    fn parse(name: &str) -> Result<Self, String> {
        Ok(match name {
            "object" => BsonType::Object,
            "string" => BsonType::String,
            "int" => BsonType::Int,
            "long" => BsonType::Long,
            "double" => BsonType::Double,
            "decimal" => BsonType::Decimal,
            "number" => BsonType::Number,
            "bool" => BsonType::Bool,
            "date" => BsonType::Date,
            "objectId" => BsonType::ObjectId,
            "array" => BsonType::Array,
            "null" => BsonType::Null,
            other => return Err(format!("unsupported bsonType '{other}'")),
        })
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            BsonType::Object => value.is_object() && !is_extended_scalar(value),
            BsonType::String => value.is_string(),
            BsonType::Int => value
                .as_i64()
                .is_some_and(|n| i32::try_from(n).is_ok()),
            BsonType::Long => value.is_i64() || value.is_u64(),
            BsonType::Double | BsonType::Number => value.is_number(),
            BsonType::Decimal => value.is_number() || extended(value, "$numberDecimal").is_some(),
            BsonType::Bool => value.is_boolean(),
            BsonType::Date => match value {
                Value::String(s) => ISO_DATE.is_match(s),
                _ => extended(value, "$date").is_some(),
            },
            BsonType::ObjectId => match value {
                Value::String(s) => OBJECT_ID.is_match(s),
                _ => extended(value, "$oid")
                    .and_then(Value::as_str)
                    .is_some_and(|s| OBJECT_ID.is_match(s)),
            },
            BsonType::Array => value.is_array(),
            BsonType::Null => value.is_null(),
        }
    }
}

impl fmt::Display for BsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BsonType::Object => "object",
            BsonType::String => "string",
            BsonType::Int => "int",
            BsonType::Long => "long",
            BsonType::Double => "double",
            BsonType::Decimal => "decimal",
            BsonType::Number => "number",
            BsonType::Bool => "bool",
            BsonType::Date => "date",
            BsonType::ObjectId => "objectId",
            BsonType::Array => "array",
            BsonType::Null => "null",
        };
        f.write_str(name)
    }
}

/// Returns the payload of a single-key extended JSON wrapper such as
/// `{"$oid": "..."}`.
fn extended<'a>(value: &'a Value, tag: &str) -> Option<&'a Value> {
    let obj = value.as_object()?;
    if obj.len() == 1 {
        obj.get(tag)
    } else {
        None
    }
}

fn is_extended_scalar(value: &Value) -> bool {
    ["$oid", "$date", "$numberDecimal"]
        .iter()
        .any(|tag| extended(value, tag).is_some())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "double",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// bsonType keyword
// ---------------------------------------------------------------------------

const BSON_TYPE: &str = "bsonType";

struct BsonTypeKeyword {
    types: Vec<BsonType>,
}

impl BsonTypeKeyword {
    fn parse(value: &Value) -> Result<Self, String> {
        let types = match value {
            Value::String(name) => vec![BsonType::parse(name)?],
            Value::Array(names) => names
                .iter()
                .map(|name| {
                    name.as_str()
                        .ok_or_else(|| "'bsonType' entries must be strings".to_string())
                        .and_then(BsonType::parse)
                })
                .collect::<Result<_, _>>()?,
            _ => return Err("'bsonType' must be a string or list of strings".into()),
        };
        Ok(Self { types })
    }

    fn expected(&self) -> String {
        self.types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl Keyword for BsonTypeKeyword {
    fn validate<'i>(
        &self,
        instance: &'i Value,
        location: &LazyLocation,
    ) -> Result<(), ValidationError<'i>> {
        if self.is_valid(instance) {
            return Ok(());
        }
        Err(ValidationError::custom(
            Location::new(),
            location.into(),
            instance,
            format!("expected {}, got {}", self.expected(), json_type_name(instance)),
        ))
    }

    fn is_valid(&self, instance: &Value) -> bool {
        self.types.iter().any(|t| t.matches(instance))
    }
}

fn bson_type_keyword<'a>(
    _parent: &'a Map<String, Value>,
    value: &'a Value,
    path: Location,
) -> Result<Box<dyn Keyword>, ValidationError<'a>> {
    match BsonTypeKeyword::parse(value) {
        Ok(keyword) => Ok(Box::new(keyword)),
        Err(reason) => Err(ValidationError::custom(Location::new(), path, value, reason)),
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Rewrites a JSON pointer into a dotted path, using `[i]` for segments that
/// index into arrays of `document`.
fn dotted_path(pointer: &str, document: &Value) -> String {
    let mut path = String::new();
    let mut cursor = Some(document);
    for raw in pointer.split('/').skip(1) {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        match (cursor, segment.parse::<usize>()) {
            (Some(Value::Array(items)), Ok(i)) => {
                path.push_str(&format!("[{i}]"));
                cursor = items.get(i);
            }
            _ => {
                path = join_path(&path, &segment);
                cursor = cursor.and_then(|v| v.get(segment.as_str()));
            }
        }
    }
    path
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn push_violations(error: &ValidationError<'_>, document: &Value, out: &mut Vec<ShapeViolation>) {
    let path = dotted_path(&error.instance_path.to_string(), document);
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let field = property
                .as_str()
                .map_or_else(|| property.to_string(), str::to_string);
            out.push(ShapeViolation::missing_field(join_path(&path, &field)));
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            out.extend(
                unexpected
                    .iter()
                    .map(|field| ShapeViolation::unexpected_field(join_path(&path, field))),
            );
        }
        ValidationErrorKind::Custom { message } => {
            out.push(ShapeViolation::new(ViolationKind::TypeMismatch, path, message.clone()));
        }
        ValidationErrorKind::Type { .. } => {
            out.push(ShapeViolation::new(ViolationKind::TypeMismatch, path, error.to_string()));
        }
        _ => out.push(ShapeViolation::constraint(path, error.to_string())),
    }
}

// ---------------------------------------------------------------------------
// JsonShapeValidator
// ---------------------------------------------------------------------------

/// [`DocumentValidator`] backed by a compiled `$jsonSchema`-style shape.
pub struct JsonShapeValidator {
    validator: Validator,
}

impl JsonShapeValidator {
    /// Compiles a shape declaration. A top-level `{"$jsonSchema": {...}}`
    /// wrapper is unwrapped.
    ///
    /// # Errors
    ///
    /// Returns a description of the malformed keyword when the shape is not
    /// a valid schema or names an unsupported `bsonType`.
    pub fn compile(shape: &Value) -> Result<Self, String> {
        let inner = shape.get("$jsonSchema").unwrap_or(shape);
        let validator = jsonschema::options()
            .with_keyword(BSON_TYPE, bson_type_keyword)
            .build(inner)
            .map_err(|err| err.to_string())?;
        Ok(Self { validator })
    }

    /// Lists every violation in `document`.
    #[must_use]
    pub fn violations(&self, document: &Document) -> Vec<ShapeViolation> {
        let mut out = Vec::new();
        for error in self.validator.iter_errors(document) {
            push_violations(&error, document, &mut out);
        }
        out
    }
}

impl fmt::Debug for JsonShapeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonShapeValidator").finish_non_exhaustive()
    }
}

impl DocumentValidator for JsonShapeValidator {
    fn validate(&self, document: &Document) -> anyhow::Result<Vec<ShapeViolation>> {
        Ok(self.violations(document))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
