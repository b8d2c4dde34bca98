//! Tests for longer mutation sequences
//!
//! This tests:
//! - Undo/redo chains and batches
//! - Render-data staleness across overlapping refetches
//! - Page integrity after mixed operations

use std::collections::BTreeMap;

use pagewright_editor::{
    DataSource, EditorEvent, PageConfig, PageConfigStore, RenderData, RenderStatus, Section,
    SectionInstantiator, StaticLibrary, Widget,
};
use serde_json::json;

fn ids(store: &PageConfigStore) -> Vec<String> {
    store.page().sections.iter().map(|s| s.id.clone()).collect()
}

fn data(key: &str) -> RenderData {
    let mut data = RenderData::new();
    data.insert(key.to_string(), json!([{ "title": "Tee" }]));
    data
}

fn library() -> StaticLibrary {
    StaticLibrary::from_json(
        json!({
            "grid": {
                "id": "grid",
                "name": "Product grid",
                "widgets": [{
                    "id": "list",
                    "type": "product-list",
                    "dataSourceTemplate": { "type": "products" }
                }]
            }
        }),
        json!({}),
    )
    .unwrap()
}

#[test]
fn test_move_then_delete_then_undo_all() {
    let mut store = PageConfigStore::new(PageConfig::new());
    for id in ["a", "b", "c"] {
        store.add_section(Section::new(id, "text"), None, BTreeMap::new());
    }
    let original = ids(&store);

    store.move_section("c", "a");
    assert_eq!(ids(&store), vec!["c", "a", "b"]);
    store.remove_section("a");
    assert_eq!(ids(&store), vec!["c", "b"]);

    assert!(store.undo());
    assert_eq!(ids(&store), vec!["c", "a", "b"]);
    assert!(store.undo());
    assert_eq!(ids(&store), original);

    assert!(store.redo());
    assert!(store.redo());
    assert_eq!(ids(&store), vec!["c", "b"]);
}

#[test]
fn test_batched_library_inserts_undo_together() {
    let library = library();
    let mut store =
        PageConfigStore::new(PageConfig::new()).with_instantiator(SectionInstantiator::sequential("n"));

    store.begin_batch("two grids");
    store.add_section_from_library(&library, "grid", None, None).unwrap();
    store.add_section_from_library(&library, "grid", None, None).unwrap();
    store.end_batch();

    assert_eq!(store.page().sections.len(), 2);
    assert_eq!(store.page().data_sources.len(), 2);
    assert_eq!(store.history().undo_descriptions(), vec![Some("two grids")]);

    assert!(store.undo());
    assert!(store.page().sections.is_empty());
    assert!(store.page().data_sources.is_empty());
}

#[test]
fn test_undo_reconciles_selection() {
    let mut store = PageConfigStore::new(PageConfig::new());
    store.add_section(
        Section::new("a", "text").with_widget(Widget::new("w", "text")),
        None,
        BTreeMap::new(),
    );
    assert_eq!(store.selection().widget_id.as_deref(), Some("w"));

    store.undo();
    assert!(store.selection().section_id.is_none());
    assert!(store.selection().widget_id.is_none());
}

#[test]
fn test_refetch_promotes_pending_edits() {
    let mut store = PageConfigStore::new(PageConfig::new());
    store.add_data_source("p", DataSource::new("products"));

    let ticket = store.begin_refetch();
    assert_eq!(store.render_status(), RenderStatus::Refetching);

    // Structure-only edit while the fetch is in flight
    store.add_section(Section::new("a", "text"), None, BTreeMap::new());
    assert_eq!(store.committed().sections.len(), 0);
    assert_eq!(store.page().sections.len(), 1);

    assert!(store.complete_refetch(&ticket, data("p")));
    assert_eq!(store.render_status(), RenderStatus::Clean);
    assert_eq!(store.committed().sections.len(), 1);
    assert!(store.render_data().unwrap().contains_key("p"));
}

#[test]
fn test_invalidating_edit_during_refetch_leaves_stale() {
    let mut store = PageConfigStore::new(PageConfig::new());
    store.add_data_source("p", DataSource::new("products"));
    let ticket = store.begin_refetch();

    store.add_data_source("q", DataSource::new("articles"));

    assert!(store.complete_refetch(&ticket, data("p")));
    assert_eq!(store.render_status(), RenderStatus::Stale);
    assert!(!store.committed().data_sources.contains_key("q"));
    assert!(store.page().data_sources.contains_key("q"));

    let ticket = store.begin_refetch();
    assert!(ticket.config().data_sources.contains_key("q"));
    assert!(store.complete_refetch(&ticket, data("q")));
    assert_eq!(store.render_status(), RenderStatus::Clean);
}

#[test]
fn test_late_refetch_response_is_dropped() {
    let mut store = PageConfigStore::new(PageConfig::new());
    let first = store.begin_refetch();
    let second = store.begin_refetch();

    assert!(store.complete_refetch(&second, data("new")));
    assert!(!store.complete_refetch(&first, data("old")));

    let render_data = store.render_data().unwrap();
    assert!(render_data.contains_key("new"));
    assert!(!render_data.contains_key("old"));
}

#[test]
fn test_failed_refetch_records_error() {
    let mut store = PageConfigStore::new(PageConfig::new());
    let mut events = store.subscribe();

    let ticket = store.begin_refetch();
    assert!(store.fail_refetch(&ticket, "upstream 502"));

    assert_eq!(store.render_status(), RenderStatus::Stale);
    assert_eq!(store.render_error(), Some("upstream 502"));
    assert_eq!(
        events.try_recv().unwrap(),
        EditorEvent::RenderStatusChanged(RenderStatus::Refetching)
    );
    assert_eq!(
        events.try_recv().unwrap(),
        EditorEvent::RenderStatusChanged(RenderStatus::Stale)
    );
}

#[test]
fn test_integrity_after_mixed_operations() {
    let library = library();
    let mut store =
        PageConfigStore::new(PageConfig::new()).with_instantiator(SectionInstantiator::sequential("m"));

    let first = store.add_section_from_library(&library, "grid", None, None).unwrap();
    let second = store
        .add_section_from_library(&library, "grid", Some(0), None)
        .unwrap();
    store.move_section(&second.section_id, &first.section_id);

    let key = store.page().sections[0].widgets[0]
        .data_source_key
        .clone()
        .unwrap();
    store.remove_data_source(&key);
    store.remove_widget(&first.section_id, "list-m1");

    let page = store.page();
    assert!(page.dangling_bindings().is_empty());
    assert_eq!(page.data_sources.len(), 1);

    let mut section_ids: Vec<_> = page.sections.iter().map(|s| s.id.as_str()).collect();
    section_ids.dedup();
    assert_eq!(section_ids.len(), 2);
}
