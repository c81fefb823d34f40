//! Errors raised while building or loading a schema declaration.

/// Structural problems in a [`DatabaseSchema`](crate::schema::DatabaseSchema).
///
/// These are detected before any store access; a schema that fails
/// [`DatabaseSchema::check`](crate::schema::DatabaseSchema::check) cannot be
/// validated against a live database.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("collection '{name}' declared more than once")]
    DuplicateCollection { name: String },
    #[error("collection '{key}' is registered under a different name '{name}'")]
    CollectionNameMismatch { key: String, name: String },
    #[error("index '{index}' declared more than once in collection '{collection}'")]
    DuplicateIndex { collection: String, index: String },
    #[error("index '{index}' in collection '{collection}' has no key fields")]
    EmptyIndexKeys { collection: String, index: String },
    #[error("index '{index}' in collection '{collection}' repeats key field '{field}'")]
    DuplicateKeyField {
        collection: String,
        index: String,
        field: String,
    },
    #[error("unknown index direction: {raw}")]
    UnknownDirection { raw: String },
    #[error("invalid shape for collection '{collection}': {reason}")]
    InvalidShape { collection: String, reason: String },
    #[error("malformed schema document: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = SchemaError::DuplicateIndex {
            collection: "orders".into(),
            index: "by_status".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("orders"));
        assert!(msg.contains("by_status"));
    }

    #[test]
    fn parse_errors_convert() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: SchemaError = parse.into();
        assert!(matches!(err, SchemaError::Parse(_)));
    }
}
