//! Diff of a collection's live index catalog against its declared indexes.
//!
//! Names decide presence: a declared name absent from the catalog is missing
//! (failure), a catalog name nobody declared is extra (informational). For
//! names present on both sides `unique`, `sparse` and the ordered key list are
//! compared. Declared directions are encoded once, here, and compared
//! positionally against the raw catalog keys.

use std::collections::{HashMap, HashSet};

use mimoid_core::{CatalogIndex, IndexIssue, IndexProperty, IndexReport, IndexSpec, RawDirection};

/// Compares `declared` against `actual`.
///
/// `id_index_name` is always expected, declared or not. When it is not
/// declared explicitly only its presence is checked.
#[must_use]
pub fn diff_indexes(
    declared: &[IndexSpec],
    actual: &[CatalogIndex],
    id_index_name: &str,
) -> IndexReport {
    let mut report = IndexReport::default();

    let mut expected_names: Vec<&str> = Vec::with_capacity(declared.len() + 1);
    if !declared.iter().any(|idx| idx.name == id_index_name) {
        expected_names.push(id_index_name);
    }
    expected_names.extend(declared.iter().map(|idx| idx.name.as_str()));

    let by_name: HashMap<&str, &CatalogIndex> =
        actual.iter().map(|idx| (idx.name.as_str(), idx)).collect();
    let expected_set: HashSet<&str> = expected_names.iter().copied().collect();

    report.expected_indexes = expected_set.len();
    report.found_indexes = actual.len();

    for name in &expected_names {
        if !by_name.contains_key(name) {
            report.record(IndexIssue::Missing {
                index: (*name).to_string(),
            });
        }
    }

    let mut seen_extra = HashSet::new();
    for idx in actual {
        let name = idx.name.as_str();
        if !expected_set.contains(name) && seen_extra.insert(name) {
            report.record(IndexIssue::ExtraObserved {
                index: name.to_string(),
            });
        }
    }

    for spec in declared {
        if let Some(live) = by_name.get(spec.name.as_str()) {
            for issue in compare_index(spec, live) {
                report.record(issue);
            }
        }
    }

    report
}

/// Property mismatches between one declared index and its live counterpart.
fn compare_index(spec: &IndexSpec, live: &CatalogIndex) -> Vec<IndexIssue> {
    let mut issues = Vec::new();

    if spec.unique != live.unique {
        issues.push(mismatch(
            spec,
            IndexProperty::Unique,
            spec.unique.to_string(),
            live.unique.to_string(),
        ));
    }
    if spec.sparse != live.sparse {
        issues.push(mismatch(
            spec,
            IndexProperty::Sparse,
            spec.sparse.to_string(),
            live.sparse.to_string(),
        ));
    }

    let expected_keys = spec.encoded_keys();
    if expected_keys != live.keys {
        issues.push(mismatch(
            spec,
            IndexProperty::Keys,
            render_keys(&expected_keys),
            render_keys(&live.keys),
        ));
    }

    issues
}

fn mismatch(spec: &IndexSpec, property: IndexProperty, expected: String, actual: String) -> IndexIssue {
    IndexIssue::PropertyMismatch {
        index: spec.name.clone(),
        property,
        expected,
        actual,
    }
}

fn render_keys(keys: &[(String, RawDirection)]) -> String {
    let parts: Vec<String> = keys
        .iter()
        .map(|(field, direction)| format!("({field}, {direction})"))
        .collect();
    format!("[{}]", parts.join(", "))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
