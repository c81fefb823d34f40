//! Structured output of one validation run.
//!
//! A [`ValidationResult`] is built fresh per run, mutated only by the engine
//! while the run is in progress, and immutable once returned. Its JSON form
//! (`collections` + `validation_summary`) is the reporting contract callers
//! render from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Shape report
// ---------------------------------------------------------------------------

/// Outcome of sampling a collection and checking each document's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeReport {
    pub passed: bool,
    /// One entry per violation, across all sampled documents.
    pub errors: Vec<String>,
    pub valid_documents: u64,
    pub invalid_documents: u64,
}

impl Default for ShapeReport {
    /// A skipped check: nothing sampled, nothing failed.
    fn default() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
            valid_documents: 0,
            invalid_documents: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Index report
// ---------------------------------------------------------------------------

/// Index attribute compared between declaration and live catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexProperty {
    Unique,
    Sparse,
    Keys,
}

impl fmt::Display for IndexProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexProperty::Unique => f.write_str("unique"),
            IndexProperty::Sparse => f.write_str("sparse"),
            IndexProperty::Keys => f.write_str("keys"),
        }
    }
}

/// One index finding for a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexIssue {
    /// A declared index is absent from the live catalog. Fails the check.
    Missing { index: String },
    /// A declared index exists but differs in one property. Fails the check.
    PropertyMismatch {
        index: String,
        property: IndexProperty,
        expected: String,
        actual: String,
    },
    /// The live catalog holds an index nobody declared. Informational.
    ExtraObserved { index: String },
}

impl IndexIssue {
    /// Whether this finding fails the collection's index check.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !matches!(self, IndexIssue::ExtraObserved { .. })
    }

    #[must_use]
    pub fn index(&self) -> &str {
        match self {
            IndexIssue::Missing { index }
            | IndexIssue::PropertyMismatch { index, .. }
            | IndexIssue::ExtraObserved { index } => index,
        }
    }
}

impl fmt::Display for IndexIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexIssue::Missing { index } => write!(f, "index '{index}' is missing"),
            IndexIssue::PropertyMismatch {
                index,
                property,
                expected,
                actual,
            } => write!(
                f,
                "index '{index}' {property} mismatch: expected {expected}, found {actual}"
            ),
            IndexIssue::ExtraObserved { index } => {
                write!(f, "index '{index}' exists but is not declared")
            }
        }
    }
}

/// Outcome of diffing a collection's live index catalog against its declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub passed: bool,
    /// One line per failing finding: missing indexes and property mismatches.
    pub errors: Vec<String>,
    /// Declared index names plus the implicit identity index.
    pub expected_indexes: usize,
    /// Entries in the live catalog.
    pub found_indexes: usize,
    pub missing_indexes: Vec<String>,
    pub extra_indexes: Vec<String>,
    /// Every finding in structured form, including informational ones.
    #[serde(default)]
    pub issues: Vec<IndexIssue>,
}

impl Default for IndexReport {
    fn default() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
            expected_indexes: 0,
            found_indexes: 0,
            missing_indexes: Vec::new(),
            extra_indexes: Vec::new(),
            issues: Vec::new(),
        }
    }
}

impl IndexReport {
    /// Records one finding, keeping `passed`, the name lists and `errors`
    /// consistent with it.
    pub fn record(&mut self, issue: IndexIssue) {
        match &issue {
            IndexIssue::Missing { index } => {
                self.missing_indexes.push(index.clone());
                self.errors.push(issue.to_string());
                self.passed = false;
            }
            IndexIssue::PropertyMismatch { .. } => {
                self.errors.push(issue.to_string());
                self.passed = false;
            }
            IndexIssue::ExtraObserved { index } => self.extra_indexes.push(index.clone()),
        }
        self.issues.push(issue);
    }

    /// Property mismatches recorded against `index`.
    #[must_use]
    pub fn mismatches_for(&self, index: &str) -> Vec<&IndexIssue> {
        self.issues
            .iter()
            .filter(|i| matches!(i, IndexIssue::PropertyMismatch { .. }) && i.index() == index)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Collection report
// ---------------------------------------------------------------------------

/// Everything learned about one collection during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub document_count: u64,
    pub documents_sampled: u64,
    pub schema_validation: ShapeReport,
    pub index_validation: IndexReport,
}

impl CollectionReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.schema_validation.passed && self.index_validation.passed
    }

    /// Shape errors plus index errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.schema_validation.errors.len() + self.index_validation.errors.len()
    }
}

// ---------------------------------------------------------------------------
// Summary and result
// ---------------------------------------------------------------------------

/// Aggregate counters over every collection of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_collections: usize,
    /// Collections whose shape check passed, including those with no validator.
    pub schema_validation_passed: usize,
    pub index_validation_passed: usize,
    pub total_documents_sampled: u64,
    pub total_validation_errors: usize,
    pub overall_success: bool,
}

impl ValidationSummary {
    /// Folds per-collection reports into the run summary.
    pub fn fold<'a>(reports: impl IntoIterator<Item = &'a CollectionReport>) -> Self {
        let mut summary = reports
            .into_iter()
            .fold(Self::default(), |mut acc, report| {
                acc.total_collections += 1;
                if report.schema_validation.passed {
                    acc.schema_validation_passed += 1;
                }
                if report.index_validation.passed {
                    acc.index_validation_passed += 1;
                }
                acc.total_documents_sampled += report.documents_sampled;
                acc.total_validation_errors += report.error_count();
                acc
            });
        summary.overall_success = summary.schema_validation_passed == summary.total_collections
            && summary.index_validation_passed == summary.total_collections;
        summary
    }
}

/// Structured conformance report for one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub database_name: String,
    pub collections: BTreeMap<String, CollectionReport>,
    pub validation_summary: ValidationSummary,
}

impl ValidationResult {
    /// Builds the result and its summary from completed collection reports.
    #[must_use]
    pub fn from_reports(
        database_name: impl Into<String>,
        collections: BTreeMap<String, CollectionReport>,
    ) -> Self {
        let validation_summary = ValidationSummary::fold(collections.values());
        Self {
            database_name: database_name.into(),
            collections,
            validation_summary,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.validation_summary.overall_success
    }

    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&CollectionReport> {
        self.collections.get(name)
    }

    /// Names of collections that failed either check, in sorted order.
    #[must_use]
    pub fn failed_collections(&self) -> Vec<&str> {
        self.collections
            .iter()
            .filter(|(_, report)| !report.passed())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn report(shape_passed: bool, index_passed: bool, sampled: u64) -> CollectionReport {
        let mut schema_validation = ShapeReport::default();
        if !shape_passed {
            schema_validation.passed = false;
            schema_validation.errors.push("field 'email': required field is missing".into());
            schema_validation.invalid_documents = 1;
        }
        let mut index_validation = IndexReport::default();
        if !index_passed {
            index_validation.record(IndexIssue::Missing {
                index: "by_status".into(),
            });
        }
        CollectionReport {
            document_count: sampled,
            documents_sampled: sampled,
            schema_validation,
            index_validation,
        }
    }

    #[test]
    fn empty_run_is_successful() {
        let result = ValidationResult::from_reports("shop", BTreeMap::new());
        assert!(result.is_success());
        assert_eq!(result.validation_summary.total_collections, 0);
    }

    #[test]
    fn summary_counts_each_check_separately() {
        let mut collections = BTreeMap::new();
        collections.insert("users".to_string(), report(true, true, 5));
        collections.insert("orders".to_string(), report(false, true, 10));
        collections.insert("facilities".to_string(), report(true, false, 0));
        let result = ValidationResult::from_reports("shop", collections);

        let summary = result.validation_summary;
        assert_eq!(summary.total_collections, 3);
        assert_eq!(summary.schema_validation_passed, 2);
        assert_eq!(summary.index_validation_passed, 2);
        assert_eq!(summary.total_documents_sampled, 15);
        assert_eq!(summary.total_validation_errors, 2);
        assert!(!summary.overall_success);
        assert_eq!(result.failed_collections(), vec!["facilities", "orders"]);
    }

    #[test]
    fn record_keeps_lists_consistent() {
        let mut report = IndexReport::default();
        report.record(IndexIssue::ExtraObserved {
            index: "legacy".into(),
        });
        assert!(report.passed);
        assert_eq!(report.extra_indexes, vec!["legacy"]);

        report.record(IndexIssue::PropertyMismatch {
            index: "email_unique".into(),
            property: IndexProperty::Unique,
            expected: "true".into(),
            actual: "false".into(),
        });
        assert!(!report.passed);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("email_unique"));
        assert_eq!(report.mismatches_for("email_unique").len(), 1);
        assert!(report.mismatches_for("legacy").is_empty());
    }

    #[test]
    fn missing_index_is_counted_as_an_error() {
        let mut report = IndexReport::default();
        report.record(IndexIssue::Missing {
            index: "by_status".into(),
        });
        assert!(!report.passed);
        assert_eq!(report.missing_indexes, vec!["by_status"]);
        assert_eq!(report.errors, vec!["index 'by_status' is missing"]);
    }

    #[test]
    fn issue_failure_classification() {
        assert!(IndexIssue::Missing { index: "a".into() }.is_failure());
        assert!(!IndexIssue::ExtraObserved { index: "a".into() }.is_failure());
    }

    #[test]
    fn serializes_in_reporting_shape() {
        let mut collections = BTreeMap::new();
        collections.insert("users".to_string(), report(true, true, 5));
        let result = ValidationResult::from_reports("shop", collections);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["validation_summary"]["overall_success"], true);
        assert_eq!(json["collections"]["users"]["documents_sampled"], 5);
        assert_eq!(
            json["collections"]["users"]["index_validation"]["missing_indexes"],
            serde_json::json!([])
        );
        let back: ValidationResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    proptest::proptest! {
        #[test]
        fn overall_success_iff_every_check_passed(
            flags in proptest::collection::vec((proptest::bool::ANY, proptest::bool::ANY), 0..12)
        ) {
            let collections: BTreeMap<String, CollectionReport> = flags
                .iter()
                .enumerate()
                .map(|(i, (shape, index))| (format!("c{i}"), report(*shape, *index, 1)))
                .collect();
            let result = ValidationResult::from_reports("db", collections);
            let all_passed = flags.iter().all(|(shape, index)| *shape && *index);
            proptest::prop_assert_eq!(result.is_success(), all_passed);
            proptest::prop_assert_eq!(result.failed_collections().is_empty(), all_passed);
        }
    }
}
