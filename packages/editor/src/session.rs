//! # Edit Session
//!
//! Binds a page store and a translation store that share one event bus,
//! and routes edits that cross between them.
//!
//! A settings field holding `t:<path>` is edited through the translation
//! store so the reference survives. Any other field is written into the
//! page config as a literal.

use std::sync::Arc;

use pagewright_common::{PageConfig, Settings};
use serde_json::{Map, Value};
use tracing::error;

use crate::document::{LibraryInsert, PageConfigStore};
use crate::events::{EditorEvent, EventBus};
use crate::library::LibraryRegistry;
use crate::mutations::{MutationResult, SectionPatch, WidgetPatch};
use crate::reference::{collect_references, is_reference, SettingValue, TranslationPath};
use crate::translations::{Provenance, TranslationScope, TranslationStore};
use crate::tree::{deep_merge, get_path};

/// Where a settings edit ended up
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The field holds a reference; the string behind it was rewritten
    Translation {
        path: TranslationPath,
        provenance: Provenance,
    },

    /// The field was written into the page config
    Literal { version: u64 },

    Rejected(String),
}

/// One editor's view of a page and its strings
pub struct EditSession {
    pub id: String,
    pub page: PageConfigStore,
    pub translations: TranslationStore,
    library: Arc<dyn LibraryRegistry>,
    events: EventBus,
}

impl EditSession {
    pub fn new(
        id: impl Into<String>,
        page: PageConfig,
        scope: TranslationScope,
        library: Arc<dyn LibraryRegistry>,
    ) -> Self {
        let events = EventBus::new();
        Self {
            id: id.into(),
            page: PageConfigStore::new(page).with_events(events.clone()),
            translations: TranslationStore::new(scope).with_events(events.clone()),
            library,
            events,
        }
    }

    /// Swap in a preconfigured page store; it is attached to this session's bus
    pub fn with_page_store(mut self, store: PageConfigStore) -> Self {
        self.page = store.with_events(self.events.clone());
        self
    }

    pub fn library(&self) -> &Arc<dyn LibraryRegistry> {
        &self.library
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    /// Insert a library section and seed its strings from the library bundle
    pub fn add_section_from_library(
        &mut self,
        library_key: &str,
        insert_after: Option<usize>,
    ) -> Option<LibraryInsert> {
        let library = Arc::clone(&self.library);
        let template_id = self.translations.scope().template_id.clone();

        let insert = self.page.add_section_from_library(
            library.as_ref(),
            library_key,
            insert_after,
            Some(&template_id),
        )?;

        let defaults = library.default_translations();
        let mut seeded: Vec<&[String]> = Vec::new();
        let mut subtree = Value::Object(Map::new());
        for remap in &insert.remaps {
            let Some(prefix) = remap.from.segments().get(..3) else {
                continue;
            };
            if seeded.contains(&prefix) {
                continue;
            }
            seeded.push(prefix);
            if let Some(strings) = get_path(defaults, prefix) {
                subtree = deep_merge(&subtree, strings);
            }
        }

        if subtree.as_object().is_some_and(|map| !map.is_empty()) {
            self.translations
                .create_section_translations(&insert.section_id, subtree);
        }

        Some(insert)
    }

    /// Remove a section together with its strings
    pub fn remove_section(&mut self, section_id: &str) -> MutationResult {
        let result = self.page.remove_section(section_id);
        if result.is_applied() {
            self.translations.remove_section_translations(section_id);
        }
        result
    }

    pub fn edit_section_setting(&mut self, section_id: &str, key: &str, value: Value) -> EditOutcome {
        let page = self.page.page();
        let Some(section) = page.find_section(section_id) else {
            error!(section_id, "cannot edit setting of unknown section");
            return EditOutcome::Rejected(format!("Section not found: {}", section_id));
        };

        if let Some(path) = reference_to_follow(section.settings.get(key), &value) {
            return self.edit_translation(&path, value);
        }

        let settings = with_setting(&section.settings, key, value);
        literal_outcome(self.page.update_section(section_id, SectionPatch::settings(settings)))
    }

    pub fn edit_widget_setting(
        &mut self,
        section_id: &str,
        widget_id: &str,
        key: &str,
        value: Value,
    ) -> EditOutcome {
        let page = self.page.page();
        let Some(widget) = page.find_widget(section_id, widget_id) else {
            error!(section_id, widget_id, "cannot edit setting of unknown widget");
            return EditOutcome::Rejected(format!(
                "Widget not found: {} in section {}",
                widget_id, section_id
            ));
        };

        if let Some(path) = reference_to_follow(widget.settings.get(key), &value) {
            return self.edit_translation(&path, value);
        }

        let settings = with_setting(&widget.settings, key, value);
        literal_outcome(
            self.page
                .update_widget(section_id, widget_id, WidgetPatch::settings(settings)),
        )
    }

    fn edit_translation(&mut self, path: &TranslationPath, value: Value) -> EditOutcome {
        match self.translations.update_resolved(path, value) {
            Ok((path, provenance)) => EditOutcome::Translation { path, provenance },
            Err(err) => EditOutcome::Rejected(err.to_string()),
        }
    }

    /// Displayed value of a section setting
    pub fn resolve_section_setting(&self, section_id: &str, key: &str) -> Option<Value> {
        let page = self.page.page();
        let value = page.find_section(section_id)?.settings.get(key)?;
        self.translations.resolve_value(value)
    }

    /// Displayed value of a widget setting
    pub fn resolve_widget_setting(&self, section_id: &str, widget_id: &str, key: &str) -> Option<Value> {
        let page = self.page.page();
        let value = page.find_widget(section_id, widget_id)?.settings.get(key)?;
        self.translations.resolve_value(value)
    }

    /// References in the page with nothing behind them
    pub fn dangling_references(&self) -> Vec<TranslationPath> {
        collect_references(&self.page.page())
            .into_iter()
            .filter(|path| self.translations.resolve(path).is_none())
            .collect()
    }

    pub fn replace_page(&mut self, config: PageConfig) {
        self.page.replace(config);
    }
}

/// The reference to edit through, unless the new value rebinds the field
fn reference_to_follow(current: Option<&Value>, next: &Value) -> Option<TranslationPath> {
    if is_reference(next) {
        return None;
    }
    current.map(SettingValue::classify)?.reference().cloned()
}

fn with_setting(settings: &Settings, key: &str, value: Value) -> Settings {
    let mut next = settings.clone();
    next.insert(key.to_string(), value);
    next
}

fn literal_outcome(result: MutationResult) -> EditOutcome {
    match result {
        MutationResult::Applied { version } => EditOutcome::Literal { version },
        MutationResult::Noop { reason } => EditOutcome::Rejected(reason.to_string()),
    }
}
