//! Integration tests for editor crate

use std::sync::Arc;

use pagewright_editor::{
    EditOutcome, EditSession, EditorEvent, PageConfig, PageConfigStore, Provenance, RenderStatus,
    Section, SectionInstantiator, StaticLibrary, TranslationError, TranslationPath,
    TranslationScope,
};
use serde_json::json;

fn library() -> StaticLibrary {
    StaticLibrary::from_json(
        json!({
            "hero": {
                "id": "hero",
                "name": "Hero banner",
                "settings": {
                    "title": "t:library.sections.hero.title",
                    "tagline": "t:common.tagline"
                },
                "widgets": [
                    {
                        "id": "featured-products",
                        "type": "product-list",
                        "settings": { "heading": "t:library.sections.hero.products.heading" },
                        "dataSourceTemplate": { "type": "products", "params": { "limit": 4 } }
                    },
                    { "id": "cta", "type": "button" }
                ]
            }
        }),
        json!({
            "library": {
                "sections": {
                    "hero": {
                        "title": "Welcome",
                        "products": { "heading": "Best sellers" }
                    }
                }
            }
        }),
    )
    .unwrap()
}

fn session_with(page: PageConfig) -> EditSession {
    EditSession::new(
        "test-client",
        PageConfig::new(),
        TranslationScope::new("dawn", "home", "en"),
        Arc::new(library()),
    )
    .with_page_store(PageConfigStore::new(page).with_instantiator(SectionInstantiator::sequential("x")))
}

fn page_with(ids: &[&str]) -> PageConfig {
    let mut page = PageConfig::new();
    for id in ids {
        page.sections.push(Section::new(*id, "text"));
    }
    page
}

#[test]
fn test_library_insert_into_empty_page() {
    let mut session = session_with(PageConfig::new());

    let insert = session.add_section_from_library("hero", None).unwrap();

    let page = session.page.page();
    assert_eq!(page.sections.len(), 1);
    assert_eq!(page.sections[0].id, "hero-x1");
    assert_eq!(session.page.selection().section_id.as_deref(), Some("hero-x1"));
    assert_eq!(
        session.page.selection().widget_id.as_deref(),
        Some("featured-products-x1")
    );
    assert_eq!(insert.section_id, "hero-x1");
    assert_eq!(session.page.render_status(), RenderStatus::Stale);
}

#[test]
fn test_library_insert_after_index() {
    let mut session = session_with(PageConfig::new());
    session.replace_page(page_with(&["a", "b", "c"]));

    session.add_section_from_library("hero", Some(1)).unwrap();

    let ids: Vec<_> = session
        .page
        .page()
        .sections
        .iter()
        .map(|s| s.id.clone())
        .collect();
    assert_eq!(ids, vec!["a", "b", "hero-x1", "c"]);
}

#[test]
fn test_library_insert_rewires_references_and_seeds_strings() {
    let mut session = session_with(PageConfig::new());
    session.translations.load(json!({ "common": { "tagline": "Shop local" } }), json!({}));

    let insert = session.add_section_from_library("hero", None).unwrap();
    assert_eq!(insert.remaps.len(), 2);

    let page = session.page.page();
    let section = &page.sections[0];
    assert_eq!(section.settings["title"], json!("t:home.sections.hero-x1.title"));
    assert_eq!(section.settings["tagline"], json!("t:common.tagline"));
    assert_eq!(
        section.widgets[0].settings["heading"],
        json!("t:home.sections.hero-x1.products.heading")
    );

    assert_eq!(
        session.resolve_section_setting("hero-x1", "title"),
        Some(json!("Welcome"))
    );
    assert_eq!(
        session.resolve_widget_setting("hero-x1", "featured-products-x1", "heading"),
        Some(json!("Best sellers"))
    );
    assert_eq!(
        session.resolve_section_setting("hero-x1", "tagline"),
        Some(json!("Shop local"))
    );
    assert_eq!(
        session
            .translations
            .provenance_of(&TranslationPath::parse("home.sections.hero-x1.title")),
        Some(Provenance::Template)
    );
    assert!(session.dangling_references().is_empty());
    assert!(session.translations.has_unsaved_changes());
}

#[test]
fn test_library_insert_binds_fresh_data_source() {
    let mut session = session_with(PageConfig::new());
    session.add_section_from_library("hero", None).unwrap();
    session.add_section_from_library("hero", None).unwrap();

    let page = session.page.page();
    assert_eq!(page.sections.len(), 2);
    assert_ne!(page.sections[0].id, page.sections[1].id);
    assert_eq!(page.data_sources.len(), 2);
    assert!(page.data_sources.contains_key("featured_products_x1"));
    assert!(page.data_sources.contains_key("featured_products_x2"));
    assert!(page.dangling_bindings().is_empty());
}

#[test]
fn test_unknown_library_key_is_noop() {
    let mut session = session_with(page_with(&["a"]));
    let version = session.page.version();

    assert!(session.add_section_from_library("missing", None).is_none());
    assert_eq!(session.page.version(), version);
    assert_eq!(session.page.page().sections.len(), 1);
}

#[test]
fn test_chained_reference_scenario() {
    let mut session = session_with(PageConfig::new());
    session.translations.load(
        json!({ "common": { "title": "Hi" } }),
        json!({ "home": { "heading": "t:common.title" } }),
    );

    let heading = TranslationPath::parse("home.heading");
    assert_eq!(session.translations.resolve(&heading), Some(&json!("Hi")));

    let (target, provenance) = session
        .translations
        .update_resolved(&heading, json!("Hello"))
        .unwrap();

    assert_eq!(target.dotted(), "common.title");
    assert_eq!(provenance, Provenance::Common);
    assert_eq!(session.translations.common(), &json!({ "common": { "title": "Hello" } }));
    assert_eq!(
        session.translations.template(),
        &json!({ "home": { "heading": "t:common.title" } })
    );
    assert_eq!(session.translations.resolve(&heading), Some(&json!("Hello")));
}

#[test]
fn test_section_setting_edit_through_reference() {
    let mut page = PageConfig::new();
    page.sections
        .push(Section::new("intro", "text").with_setting("title", json!("t:home.heading")));
    let mut session = session_with(page);
    session.translations.load(
        json!({ "common": { "title": "Hi" } }),
        json!({ "home": { "heading": "t:common.title" } }),
    );

    let outcome = session.edit_section_setting("intro", "title", json!("Howdy"));

    assert_eq!(
        outcome,
        EditOutcome::Translation {
            path: TranslationPath::parse("common.title"),
            provenance: Provenance::Common,
        }
    );
    assert_eq!(session.page.page().sections[0].settings["title"], json!("t:home.heading"));
}

#[test]
fn test_remove_library_section_drops_strings() {
    let mut session = session_with(PageConfig::new());
    let insert = session.add_section_from_library("hero", None).unwrap();

    assert!(session.remove_section(&insert.section_id).is_applied());
    assert!(session
        .translations
        .resolve(&TranslationPath::parse("home.sections.hero-x1.title"))
        .is_none());
    assert!(session.page.selection().section_id.is_none());
}

#[test]
fn test_save_during_edit_keeps_store_dirty() {
    let mut session = session_with(PageConfig::new());
    session.translations.load(json!({}), json!({}));
    let path = TranslationPath::parse("home.heading");

    session.translations.update_translation(&path, json!("a")).unwrap();
    let snapshot = session.translations.save_snapshot().unwrap();

    session.translations.update_translation(&path, json!("b")).unwrap();
    session.translations.finish_save(&snapshot, Ok(()));
    assert!(session.translations.has_unsaved_changes());

    let snapshot = session.translations.save_snapshot().unwrap();
    session
        .translations
        .finish_save(&snapshot, Err(TranslationError::SaveFailed("offline".into())));
    assert!(session.translations.has_unsaved_changes());
    assert!(session.translations.error().is_some());

    let snapshot = session.translations.save_snapshot().unwrap();
    session.translations.finish_save(&snapshot, Ok(()));
    assert!(!session.translations.has_unsaved_changes());
    assert!(session.translations.save_snapshot().is_none());
}

#[test]
fn test_session_events_share_one_bus() {
    let mut session = session_with(PageConfig::new());
    let mut events = session.subscribe();

    session.translations.load(json!({}), json!({}));
    session.add_section_from_library("hero", None).unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    assert!(matches!(seen[0], EditorEvent::TranslationsLoaded(_)));
    assert!(seen.contains(&EditorEvent::PageChanged {
        version: 1,
        mutation: "add_section"
    }));
    assert!(seen
        .iter()
        .any(|e| matches!(e, EditorEvent::TranslationChanged { .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, EditorEvent::SelectionChanged(_))));
}
