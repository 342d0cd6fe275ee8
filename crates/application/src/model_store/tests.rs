use std::sync::{Arc, Mutex};

use formweave_core::AppError;
use formweave_domain::{ModelPath, ModelSnapshot};
use serde_json::{Value, json};

use crate::field_validators::FieldValidator;

use super::{EntryShape, ModelStore};

fn path(raw: &str) -> ModelPath {
    let parsed = ModelPath::parse(raw);
    assert!(parsed.is_ok());
    parsed.unwrap_or_else(|_| unreachable!())
}

#[test]
fn get_or_create_is_idempotent() {
    let mut store = ModelStore::new();
    let name = path("contact.name");

    let first = store.get_or_create(&name, json!("Ada"), false, Vec::new()).clone();
    let second = store.get_or_create(&name, json!("Grace"), true, vec![FieldValidator::Required]);

    assert_eq!(second.value(), &json!("Ada"));
    assert_eq!(second.shape(), EntryShape::Scalar);
    assert_eq!(first.value(), second.value());
    assert!(second.is_valid());
    assert_eq!(store.len(), 1);
}

#[test]
fn list_entries_keep_a_scalar_default_as_their_only_item() {
    let mut store = ModelStore::new();

    let tags = store.get_or_create(&path("tags"), json!("de"), true, Vec::new());
    assert_eq!(tags.value(), &json!(["de"]));
    assert_eq!(tags.shape(), EntryShape::List);

    let empty = store.get_or_create(&path("labels"), Value::Null, true, Vec::new());
    assert_eq!(empty.value(), &json!([]));

    let listed = store.get_or_create(&path("codes"), json!(["a", "b"]), true, Vec::new());
    assert_eq!(listed.value(), &json!(["a", "b"]));
}

#[test]
fn array_entries_default_to_an_empty_list() {
    let mut store = ModelStore::new();
    let entry = store.get_or_create(&path("tags"), Value::Null, true, Vec::new());

    assert_eq!(entry.value(), &json!([]));
    assert_eq!(entry.shape(), EntryShape::List);
}

#[test]
fn set_value_rejects_missing_entries_and_shape_mismatches() {
    let mut store = ModelStore::new();
    let name = path("name");

    let missing = store.set_value(&name, json!("x"));
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    store.get_or_create(&name, json!("Ada"), false, Vec::new());
    let mismatch = store.set_value(&name, json!({"first": "Ada"}));
    assert!(matches!(mismatch, Err(AppError::Conflict(_))));

    assert!(store.set_value(&name, Value::Null).is_ok());
    assert!(store.set_value(&name, json!(42)).is_ok());
    assert_eq!(store.entry(&name).map(|entry| entry.value()), Some(&json!(42)));
}

#[test]
fn shape_mismatch_recovers_through_remove_and_recreate() {
    let mut store = ModelStore::new();
    let address = path("address");
    store.get_or_create(&address, json!("Main street 1"), false, Vec::new());
    store.set_owner(&address, "address");

    let incoming = json!({"street": "Main street", "number": 1});
    assert!(store.set_value(&address, incoming.clone()).is_err());

    let recreated = store.remove_and_recreate(&address, incoming.clone(), Vec::new());
    assert_eq!(recreated.shape(), EntryShape::Group);
    assert_eq!(recreated.owner(), Some("address"));
    assert!(recreated.is_dirty());

    assert_eq!(store.len(), 1);
    assert_eq!(store.entry(&address).map(|entry| entry.value()), Some(&incoming));
}

#[test]
fn listeners_only_hear_their_own_path() {
    let mut store = ModelStore::new();
    let first = path("first");
    let second = path("second");
    store.get_or_create(&first, Value::Null, false, Vec::new());
    store.get_or_create(&second, Value::Null, false, Vec::new());

    let heard = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&heard);
    let subscription = store.subscribe(
        &first,
        Box::new(move |changed: &ModelPath, value: &Value| {
            if let Ok(mut heard) = sink.lock() {
                heard.push((changed.to_string(), value.clone()));
            }
        }),
    );

    assert!(store.set_value(&first, json!("a")).is_ok());
    assert!(store.set_value(&second, json!("b")).is_ok());
    assert!(store.unsubscribe(subscription));
    assert!(!store.unsubscribe(subscription));
    assert!(store.set_value(&first, json!("c")).is_ok());

    let heard = heard.lock().map(|heard| heard.clone()).unwrap_or_default();
    assert_eq!(heard, vec![("first".to_owned(), json!("a"))]);
}

#[test]
fn validation_failures_are_recorded_not_raised() {
    let mut store = ModelStore::new();
    let name = path("name");
    let hidden = path("hidden");
    store.get_or_create(&name, json!("Ada"), false, vec![FieldValidator::Required]);
    store.get_or_create(&hidden, Value::Null, false, vec![FieldValidator::Required]);
    store.set_enabled(&hidden, false);

    assert!(store.validate_all());
    assert!(store.set_value(&name, json!("")).is_ok());
    assert!(!store.validate_all());
    assert_eq!(store.invalid_paths(), vec![name.clone()]);

    let entry = store.entry(&name);
    assert!(entry.is_some_and(|entry| !entry.is_touched()));
    store.mark_all_touched();
    assert!(store.entry(&name).is_some_and(|entry| entry.is_touched()));
}

#[test]
fn seed_lookup_is_case_insensitive() {
    let seed = json!({"Contact": {"Email": "ada@example.com", "phone": null}});

    assert_eq!(
        ModelStore::get_model_field_value(&seed, &path("contact.email")),
        Some(json!("ada@example.com"))
    );
    assert_eq!(ModelStore::get_model_field_value(&seed, &path("contact.phone")), None);
}

#[test]
fn snapshots_resolve_through_the_deepest_ancestor_entry() {
    let mut store = ModelStore::new();
    store.get_or_create(&path("lines"), json!([{"street": "Main"}]), true, Vec::new());
    store.get_or_create(&path("lines[0].street"), json!("Side"), false, Vec::new());

    assert_eq!(store.value_at(&path("lines[0].street")), Some(&json!("Side")));
    assert_eq!(store.value_at(&path("lines[0]")), Some(&json!({"street": "Main"})));
    assert_eq!(store.value_at(&path("missing")), None);
}

#[test]
fn restore_returns_to_the_captured_state() {
    let mut store = ModelStore::new();
    let name = path("name");
    store.get_or_create(&name, json!("Ada"), false, Vec::new());
    store.mirror_raw("name", json!("Ada"));
    let snapshot = store.capture();

    assert!(store.set_value(&name, json!("Grace")).is_ok());
    store.mirror_raw("name", json!("Grace"));
    store.get_or_create(&path("late"), json!(1), false, Vec::new());
    assert!(store.is_dirty());

    store.restore(&snapshot);
    assert_eq!(store.entry(&name).map(|entry| entry.value()), Some(&json!("Ada")));
    assert!(!store.contains(&path("late")));
    assert!(!store.is_dirty());
    assert_eq!(store.raw_document().get("name"), Some(&json!("Ada")));
}

#[test]
fn values_under_a_prefix_are_grouped() {
    let mut store = ModelStore::new();
    store.get_or_create(&path("rows[0].a"), json!(1), false, Vec::new());
    store.get_or_create(&path("rows[0].b"), json!(2), false, Vec::new());
    store.get_or_create(&path("rows[1].a"), json!(3), false, Vec::new());
    store.get_or_create(&path("title"), json!("x"), false, Vec::new());

    let row = store.values_under(&path("rows[0]"));
    assert_eq!(row.len(), 2);
    assert_eq!(row.get(&path("rows[0].b")), Some(&json!(2)));
    assert_eq!(store.paths_under(&path("rows")).len(), 3);
}
