//! End-to-end clone runs against the SQLite backend in a tempdir.

use clonetax_core::{
    CloneError, CloneRequest, ContentStore, NullProgress, SqliteStore, TaxonomyCloner,
};
use serde_json::json;
use tempfile::TempDir;

const SOURCE: &str = "product_category";
const TARGET: &str = "new_product_category";

fn open_store(dir: &TempDir) -> SqliteStore {
    let store = SqliteStore::open(dir.path().join("content.db")).unwrap();
    store.register_taxonomy(SOURCE).unwrap();
    store.register_taxonomy(TARGET).unwrap();
    store.register_post_type("product").unwrap();
    store
}

#[test]
fn full_clone_round_trip_on_disk() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let root = store
        .create_term(SOURCE, "Drinks", "drinks", "Beverages", 0)
        .unwrap();
    let child = store
        .create_term(SOURCE, "Coffee", "coffee", "", root.term_id)
        .unwrap();
    store
        .add_term_meta(root.term_id, "category_colour", &json!("brown"))
        .unwrap();
    store
        .add_term_meta(root.term_id, "category_colour", &json!("black"))
        .unwrap();
    store
        .add_term_meta(child.term_id, "category_alt_name", &json!("Kaffee"))
        .unwrap();

    let post = store.insert_post("product", "Espresso beans").unwrap();
    store
        .append_post_terms(post, &[child.term_id], SOURCE)
        .unwrap();

    let request = CloneRequest::new(SOURCE, TARGET)
        .with_post_type("product")
        .with_skip_meta_keys(["category_alt_name"]);
    let stats = TaxonomyCloner::new(&store)
        .run(&request, &mut NullProgress)
        .unwrap();

    assert_eq!(stats.terms, 2);
    assert_eq!(stats.meta_values, 2);
    assert_eq!(stats.meta_values_skipped, 1);
    assert_eq!(stats.meta_groups, 2);
    assert_eq!(stats.relationships, 1);

    let cloned = store.list_terms(TARGET).unwrap();
    assert_eq!(cloned.len(), 2);
    let new_root = cloned.iter().find(|t| t.slug == "drinks").unwrap();
    let new_child = cloned.iter().find(|t| t.slug == "coffee").unwrap();
    assert_eq!(new_root.description, "Beverages");
    assert!(new_root.is_root());
    assert_eq!(new_child.parent, new_root.term_id);

    // Meta multiplicity survives; the excluded key does not cross over.
    let meta = store.term_meta(new_root.term_id).unwrap();
    assert_eq!(meta["category_colour"], vec![json!("brown"), json!("black")]);
    let child_meta = store.term_meta(new_child.term_id).unwrap();
    assert!(child_meta.is_empty());

    // The post now belongs to the new term in the target taxonomy, and
    // still to the old one in the source taxonomy.
    let in_target = store
        .posts_for_term("product", TARGET, new_child.term_id)
        .unwrap();
    assert_eq!(in_target, vec![post]);
    let in_source = store
        .posts_for_term("product", SOURCE, child.term_id)
        .unwrap();
    assert_eq!(in_source, vec![post]);
}

#[test]
fn reparented_child_with_smaller_id_keeps_its_parent() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let child = store.create_term(SOURCE, "Coffee", "coffee", "", 0).unwrap();
    let parent = store.create_term(SOURCE, "Drinks", "drinks", "", 0).unwrap();
    store
        .set_term_parent(SOURCE, child.term_id, parent.term_id)
        .unwrap();

    let request = CloneRequest::new(SOURCE, TARGET).with_post_type("product");
    TaxonomyCloner::new(&store)
        .run(&request, &mut NullProgress)
        .unwrap();

    let cloned = store.list_terms(TARGET).unwrap();
    let new_parent = cloned.iter().find(|t| t.slug == "drinks").unwrap();
    let new_child = cloned.iter().find(|t| t.slug == "coffee").unwrap();
    assert_eq!(new_child.parent, new_parent.term_id);
}

#[test]
fn populated_target_fails_the_empty_guard() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.create_term(SOURCE, "Drinks", "drinks", "", 0).unwrap();
    store.create_term(TARGET, "Leftover", "leftover", "", 0).unwrap();

    let request = CloneRequest::new(SOURCE, TARGET).with_post_type("product");
    let err = TaxonomyCloner::new(&store)
        .run(&request, &mut NullProgress)
        .unwrap_err();
    assert!(matches!(err, CloneError::TargetTaxonomyNotEmpty { .. }));
    assert_eq!(store.count_terms(TARGET).unwrap(), 1);
}

#[test]
fn duplicate_slug_within_a_taxonomy_is_a_creation_error() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.create_term(SOURCE, "Snacks", "snacks", "", 0).unwrap();
    let err = store
        .create_term(SOURCE, "Snacks again", "snacks", "", 0)
        .unwrap_err();
    assert!(matches!(err, CloneError::TermCreation { .. }));
}

#[test]
fn stats_serialize_to_json() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    store.create_term(SOURCE, "Drinks", "drinks", "", 0).unwrap();

    let request = CloneRequest::new(SOURCE, TARGET).with_post_type("product");
    let stats = TaxonomyCloner::new(&store)
        .run(&request, &mut NullProgress)
        .unwrap();

    let encoded = serde_json::to_value(&stats).unwrap();
    assert_eq!(encoded["terms"], 1);
    assert_eq!(encoded["relationships"], 0);
}
