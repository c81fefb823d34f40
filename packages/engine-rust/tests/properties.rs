use std::collections::HashSet;

use mimoid_core::{
    CatalogIndex, CollectionSchema, DatabaseSchema, Document, IndexDirection, IndexSpec,
    RawDirection, ShapeViolation, ValidatorRegistry,
};
use mimoid_engine::index_diff::diff_indexes;
use mimoid_engine::{validate, MemoryStore};
use proptest::prelude::*;
use serde_json::json;

fn accept_all(_: &Document) -> anyhow::Result<Vec<ShapeViolation>> {
    Ok(Vec::new())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn arb_index_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-e]", 0..5)
}

proptest! {
    #[test]
    fn sampled_is_min_of_count_and_sample_size(count in 0usize..40, sample_size in 0usize..25, seed in any::<u64>()) {
        let store = MemoryStore::with_seed(seed);
        store.create_collection("items");
        store.insert_many("items", (0..count).map(|i| json!({"_id": i})));
        let schema = DatabaseSchema::new("db").with_collection(CollectionSchema::new("items"));
        let registry = ValidatorRegistry::new().with("items", accept_all);

        let result = runtime()
            .block_on(validate(&schema, &registry, &store, sample_size))
            .unwrap();

        let items = result.collection("items").unwrap();
        prop_assert!(items.documents_sampled <= items.document_count);
        prop_assert_eq!(items.documents_sampled, count.min(sample_size) as u64);
        prop_assert_eq!(
            items.schema_validation.valid_documents,
            items.documents_sampled
        );
    }

    #[test]
    fn missing_and_extra_never_overlap(declared in arb_index_names(), live in arb_index_names()) {
        let unique: HashSet<&String> = declared.iter().collect();
        let specs: Vec<IndexSpec> = unique
            .into_iter()
            .map(|name| IndexSpec::new(name.clone()).key(name.clone(), IndexDirection::Ascending))
            .collect();
        let catalog: Vec<CatalogIndex> = live
            .iter()
            .map(|name| CatalogIndex::new(name.clone(), vec![(name.clone(), RawDirection::Int(1))]))
            .collect();

        let report = diff_indexes(&specs, &catalog, "_id_");

        let missing: HashSet<&String> = report.missing_indexes.iter().collect();
        let extra: HashSet<&String> = report.extra_indexes.iter().collect();
        prop_assert!(missing.is_disjoint(&extra));
        prop_assert_eq!(report.passed, report.missing_indexes.is_empty() && report.errors.is_empty());
    }

    #[test]
    fn ascending_matches_any_integral_one(field in "[a-z]{1,8}", as_float in any::<bool>()) {
        let raw = if as_float { "1.0" } else { "1" };
        let live: CatalogIndex = serde_json::from_str(&format!(
            r#"{{"name": "by_field", "keys": [["{field}", {raw}]]}}"#
        ))
        .unwrap();
        let spec = IndexSpec::new("by_field").key(field, IndexDirection::Ascending);

        let report = diff_indexes(&[spec], &[CatalogIndex::identity(), live], "_id_");
        prop_assert!(report.passed);
    }
}
