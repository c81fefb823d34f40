//! Runs a collection's document validator over its sampled documents.
//!
//! Every sampled document is checked; one bad document fails the collection
//! but never stops the pass. A validator that returns `Err` or panics yields a
//! single `ValidatorCrashed` violation for that document.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use mimoid_core::{Document, DocumentValidator, ShapeReport, ShapeViolation, ID_FIELD};

/// Validates every document in `documents` and tallies the outcome.
#[must_use]
pub fn check_documents(validator: &dyn DocumentValidator, documents: &[Document]) -> ShapeReport {
    let mut report = ShapeReport::default();

    for (position, document) in documents.iter().enumerate() {
        let violations = run_guarded(validator, document);
        if violations.is_empty() {
            report.valid_documents += 1;
            continue;
        }

        report.invalid_documents += 1;
        report.passed = false;
        let label = document_label(document, position);
        report
            .errors
            .extend(violations.iter().map(|v| format!("{label}: {v}")));
    }

    report
}

/// Calls the validator, converting failures into a crash violation.
fn run_guarded(validator: &dyn DocumentValidator, document: &Document) -> Vec<ShapeViolation> {
    match panic::catch_unwind(AssertUnwindSafe(|| validator.validate(document))) {
        Ok(Ok(violations)) => violations,
        Ok(Err(err)) => vec![ShapeViolation::validator_crashed(format!("{err:#}"))],
        Err(payload) => vec![ShapeViolation::validator_crashed(panic_message(
            payload.as_ref(),
        ))],
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "validator panicked".to_string()
    }
}

/// Identifies a document in error text by its `_id`, falling back to its
/// position in the sample.
fn document_label(document: &Document, position: usize) -> String {
    match document.get(ID_FIELD) {
        Some(serde_json::Value::String(id)) => format!("document {id}"),
        Some(id) => format!("document {id}"),
        None => format!("sampled document #{position}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn requires_email(doc: &Document) -> anyhow::Result<Vec<ShapeViolation>> {
        Ok(if doc.get("email").is_some() {
            Vec::new()
        } else {
            vec![ShapeViolation::missing_field("email")]
        })
    }

    #[test]
    fn counts_valid_and_invalid_documents() {
        let docs = vec![
            json!({"_id": "u1", "email": "a@x.io"}),
            json!({"_id": "u2"}),
            json!({"_id": "u3", "email": "c@x.io"}),
        ];
        let report = check_documents(&requires_email, &docs);
        assert!(!report.passed);
        assert_eq!(report.valid_documents, 2);
        assert_eq!(report.invalid_documents, 1);
        assert_eq!(report.errors, vec!["document u2: field 'email': required field is missing"]);
    }

    #[test]
    fn empty_sample_passes() {
        let report = check_documents(&requires_email, &[]);
        assert!(report.passed);
        assert_eq!(report.valid_documents + report.invalid_documents, 0);
    }

    #[test]
    fn every_violation_is_recorded() {
        let two = |_: &Document| -> anyhow::Result<Vec<ShapeViolation>> {
            Ok(vec![
                ShapeViolation::missing_field("a"),
                ShapeViolation::missing_field("b"),
            ])
        };
        let report = check_documents(&two, &[json!({"_id": 7})]);
        assert_eq!(report.invalid_documents, 1);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].starts_with("document 7:"));
    }

    #[test]
    fn validator_error_becomes_one_crash_violation() {
        let failing = |_: &Document| -> anyhow::Result<Vec<ShapeViolation>> {
            Err(anyhow::anyhow!("decoder exploded"))
        };
        let report = check_documents(&failing, &[json!({}), json!({})]);
        assert!(!report.passed);
        assert_eq!(report.invalid_documents, 2);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("validator crashed: decoder exploded"));
        assert!(report.errors[0].starts_with("sampled document #0"));
    }

    #[test]
    fn validator_panic_is_contained() {
        let panicking = |doc: &Document| -> anyhow::Result<Vec<ShapeViolation>> {
            if doc.get("boom").is_some() {
                panic!("unexpected shape");
            }
            Ok(Vec::new())
        };
        let docs = vec![json!({"_id": "a"}), json!({"_id": "b", "boom": true}), json!({"_id": "c"})];
        let report = check_documents(&panicking, &docs);
        assert_eq!(report.valid_documents, 2);
        assert_eq!(report.invalid_documents, 1);
        assert!(report.errors[0].contains("unexpected shape"));
    }
}
