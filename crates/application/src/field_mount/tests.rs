use formweave_core::NonEmptyString;
use formweave_domain::{FieldMetadata, FieldNode, ModelPath, RenderMode};
use serde_json::{Value, json};

use crate::field_widget::NativeValue;
use crate::model_store::{EntryShape, ModelStore};
use crate::render_model::RenderedNode;
use crate::test_support::stub_registry;

use super::{FieldMount, MountSpec, MountState, ResyncQueue};

fn field(name: &str, field_type: &str) -> FieldNode {
    let name = NonEmptyString::new(name);
    assert!(name.is_ok());
    FieldNode::new(
        name.unwrap_or_else(|_| unreachable!()),
        "",
        field_type,
        FieldMetadata::default(),
    )
}

fn path(raw: &str) -> ModelPath {
    let parsed = ModelPath::parse(raw);
    assert!(parsed.is_ok());
    parsed.unwrap_or_else(|_| unreachable!())
}

fn stored(store: &ModelStore, raw: &str) -> Option<Value> {
    store.entry(&path(raw)).map(|entry| entry.value().clone())
}

#[test]
fn mount_binds_seed_value_and_signals_readiness_once() {
    let registry = stub_registry();
    let mut store = ModelStore::new();
    let seed = json!({"Contact": {"Name": "Ada"}});
    let mut mount = FieldMount::new(MountSpec::scalar(
        field("name", "text"),
        path("contact.name"),
        Vec::new(),
    ));

    assert!(mount.mount(&mut store, &seed, &registry));
    assert!(!mount.mount(&mut store, &seed, &registry));
    assert_eq!(mount.state(), MountState::Subscribed);
    assert_eq!(stored(&store, "contact.name"), Some(json!("Ada")));
    assert_eq!(store.raw_document().get("name"), Some(&json!("Ada")));
    assert_eq!(
        mount.widget().map(|widget| widget.value().clone()),
        Some(NativeValue::Text("Ada".to_owned()))
    );
}

#[test]
fn defaults_fall_back_from_seed_to_row_item_to_metadata_to_widget() {
    let registry = stub_registry();
    let mut store = ModelStore::new();
    let seed = json!({});

    let mut row = MountSpec::scalar(field("street", "text"), path("lines[0].street"), Vec::new());
    row.fallback_seed = Some(json!("Main"));
    let mut row = FieldMount::new(row);
    assert!(row.mount(&mut store, &seed, &registry));

    let declared = FieldNode::new(
        NonEmptyString::new("city").unwrap_or_else(|_| unreachable!()),
        "City",
        "text",
        FieldMetadata::default().with_attribute("defaultValue", json!("Berlin")),
    );
    let mut declared = FieldMount::new(MountSpec::scalar(declared, path("city"), Vec::new()));
    assert!(declared.mount(&mut store, &seed, &registry));

    let mut tags = FieldMount::new(MountSpec::scalar(field("tags", "tags"), path("tags"), Vec::new()));
    assert!(tags.mount(&mut store, &seed, &registry));

    assert_eq!(stored(&store, "lines[0].street"), Some(json!("Main")));
    assert_eq!(stored(&store, "city"), Some(json!("Berlin")));
    assert_eq!(stored(&store, "tags"), Some(json!([])));
    assert_eq!(
        store.entry(&path("tags")).map(|entry| entry.shape()),
        Some(EntryShape::List)
    );
}

#[test]
fn unregistered_types_render_a_placeholder_and_still_signal() {
    let registry = stub_registry();
    let mut store = ModelStore::new();
    let mut mount = FieldMount::new(MountSpec::scalar(
        field("signature", "signature-pad"),
        path("signature"),
        Vec::new(),
    ));

    assert!(mount.mount(&mut store, &json!({}), &registry));
    assert_eq!(mount.state(), MountState::Placeholder);
    assert!(store.entry(&path("signature")).is_some_and(|entry| !entry.is_enabled()));

    match mount.render(RenderMode::Edit, &store) {
        RenderedNode::Placeholder { id, message } => {
            assert_eq!(id, "signature");
            assert_eq!(message, "unregistered field type 'signature-pad'");
        }
        other => panic!("expected placeholder, got {other:?}"),
    }
}

#[test]
fn changes_flow_into_the_store_in_emission_order() {
    let registry = stub_registry();
    let mut store = ModelStore::new();
    let mut mount = FieldMount::new(MountSpec::scalar(field("name", "text"), path("name"), Vec::new()));
    assert!(mount.mount(&mut store, &json!({}), &registry));

    mount.input(NativeValue::Text("A".to_owned()));
    mount.input(NativeValue::Text("Ad".to_owned()));
    mount.input(NativeValue::Text("Ada".to_owned()));
    assert_eq!(mount.flush_changes(&mut store), 3);

    assert_eq!(stored(&store, "name"), Some(json!("Ada")));
    assert_eq!(store.raw_document().get("name"), Some(&json!("Ada")));
    assert!(store.entry(&path("name")).is_some_and(|entry| entry.is_dirty()));
}

#[test]
fn shape_change_replaces_the_entry_once() {
    let registry = stub_registry();
    let mut store = ModelStore::new();
    let seed = json!({"address": "Main street 1"});
    let mut mount = FieldMount::new(MountSpec::scalar(
        field("address", "text"),
        path("address"),
        Vec::new(),
    ));
    assert!(mount.mount(&mut store, &seed, &registry));

    let structured = json!({"street": "Main street", "number": 1});
    mount.input(NativeValue::Json(structured.clone()));
    assert_eq!(mount.flush_changes(&mut store), 1);

    assert_eq!(stored(&store, "address"), Some(structured));
    assert_eq!(store.paths_under(&path("address")).len(), 1);
    assert_eq!(
        store.entry(&path("address")).map(|entry| entry.shape()),
        Some(EntryShape::Group)
    );
}

#[test]
fn destroyed_mounts_never_touch_the_store_again() {
    let registry = stub_registry();
    let mut store = ModelStore::new();
    let mut mount = FieldMount::new(MountSpec::scalar(field("name", "text"), path("name"), Vec::new()));
    assert!(mount.mount(&mut store, &json!({"name": "Ada"}), &registry));

    mount.input(NativeValue::Text("pending".to_owned()));
    mount.destroy(&mut store);
    mount.input(NativeValue::Text("late".to_owned()));
    assert_eq!(mount.flush_changes(&mut store), 0);

    assert!(mount.is_destroyed());
    assert_eq!(stored(&store, "name"), Some(json!("Ada")));
    assert!(store.entry(&path("name")).is_some_and(|entry| !entry.is_dirty()));
}

#[test]
fn unconvertible_stored_values_show_as_empty() {
    let registry = stub_registry();
    let mut store = ModelStore::new();
    let mut mount = FieldMount::new(MountSpec::scalar(field("age", "number"), path("age"), Vec::new()));

    assert!(mount.mount(&mut store, &json!({"age": "forty"}), &registry));
    assert_eq!(mount.widget().map(|widget| widget.value().clone()), Some(NativeValue::Null));
    assert_eq!(stored(&store, "age"), Some(json!("forty")));

    mount.input(NativeValue::Text("not a number".to_owned()));
    assert_eq!(mount.flush_changes(&mut store), 0);
    assert_eq!(stored(&store, "age"), Some(json!("forty")));
}

#[test]
fn later_mounts_overwrite_and_remounts_keep_store_values() {
    let registry = stub_registry();
    let mut store = ModelStore::new();
    let seed = json!({});

    let first = FieldNode::new(
        NonEmptyString::new("status").unwrap_or_else(|_| unreachable!()),
        "",
        "text",
        FieldMetadata::default().with_attribute("defaultValue", json!("draft")),
    );
    let second = FieldNode::new(
        NonEmptyString::new("status_copy").unwrap_or_else(|_| unreachable!()),
        "",
        "text",
        FieldMetadata::default().with_attribute("defaultValue", json!("final")),
    );

    let mut first_mount = FieldMount::new(MountSpec::scalar(first, path("status"), Vec::new()));
    assert!(first_mount.mount(&mut store, &seed, &registry));
    let mut second_mount = FieldMount::new(MountSpec::scalar(second, path("status"), Vec::new()));
    assert!(second_mount.mount(&mut store, &seed, &registry));
    assert_eq!(stored(&store, "status"), Some(json!("final")));
    assert_eq!(store.len(), 1);

    second_mount.input(NativeValue::Text("edited".to_owned()));
    second_mount.flush_changes(&mut store);
    second_mount.destroy(&mut store);

    let mut remount = FieldMount::new(MountSpec::scalar(
        FieldNode::new(
            NonEmptyString::new("status_copy").unwrap_or_else(|_| unreachable!()),
            "",
            "text",
            FieldMetadata::default(),
        ),
        path("status"),
        Vec::new(),
    ));
    assert!(remount.mount(&mut store, &seed, &registry));
    assert_eq!(stored(&store, "status"), Some(json!("edited")));
}

#[test]
fn external_writes_queue_a_resync_until_destroyed() {
    let registry = stub_registry();
    let mut store = ModelStore::new();
    let queue = ResyncQueue::new();
    let mut mount = FieldMount::new(MountSpec::scalar(field("name", "text"), path("name"), Vec::new()))
        .with_resync(7, queue.clone());
    assert!(mount.mount(&mut store, &json!({"name": "Ada"}), &registry));
    assert!(queue.drain().is_empty());

    mount.input(NativeValue::Text("Grace".to_owned()));
    assert_eq!(mount.flush_changes(&mut store), 1);
    assert!(queue.drain().is_empty());

    assert!(store.set_value(&path("name"), json!("Lin")).is_ok());
    assert_eq!(queue.drain(), vec![7]);
    mount.sync_from_store(&store);
    assert_eq!(
        mount.widget().map(|widget| widget.value().clone()),
        Some(NativeValue::Text("Lin".to_owned()))
    );

    mount.destroy(&mut store);
    assert!(store.set_value(&path("name"), json!("Ada")).is_ok());
    assert!(queue.drain().is_empty());
}
