//! # Page Config Store
//!
//! Owner of the editable page configuration.
//!
//! Every mutation runs against a working copy of the latest snapshot and
//! commits a fresh `Arc<PageConfig>`. Snapshots already handed to readers
//! are never touched.
//!
//! ## Lifecycle
//!
//! ```text
//! Mutation → validate → apply + post-effects → commit snapshot
//!                ↓                                  ↓
//!        logged no-op              history, staleness, selection, events
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use pagewright_common::{DataSource, DataSourceKey, PageConfig, Section, Widget};
use serde::Serialize;
use tracing::{error, warn};

use crate::events::{EditorEvent, EventBus};
use crate::instantiate::{remap_section_translation_keys, Remap, SectionInstantiator};
use crate::library::LibraryRegistry;
use crate::mutations::{DataSourcePatch, Mutation, MutationResult, SectionPatch, WidgetPatch};
use crate::post_effects::PostEffectEngine;
use crate::staleness::{RefetchTicket, RenderData, RenderStatus, StalenessCoordinator};
use crate::undo_stack::UndoStack;

/// What the editor has focused. A widget is only ever selected together
/// with the section holding it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub section_id: Option<String>,
    pub widget_id: Option<String>,
    pub settings_open: bool,
}

/// Outcome of a successful library insert
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryInsert {
    pub section_id: String,
    pub version: u64,
    /// References rewritten to the new section's translation namespace
    pub remaps: Vec<Remap>,
}

#[derive(Debug)]
pub struct PageConfigStore {
    render: StalenessCoordinator,
    selection: Selection,

    /// Increments on each committed change
    version: u64,

    history: UndoStack,
    effects: PostEffectEngine,
    instantiator: SectionInstantiator,
    events: EventBus,
}

impl PageConfigStore {
    pub fn new(config: PageConfig) -> Self {
        Self {
            render: StalenessCoordinator::new(config),
            selection: Selection::default(),
            version: 0,
            history: UndoStack::new(),
            effects: PostEffectEngine::new(),
            instantiator: SectionInstantiator::default(),
            events: EventBus::new(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_history_limit(mut self, max_levels: usize) -> Self {
        self.history = UndoStack::with_max_levels(max_levels);
        self
    }

    pub fn with_instantiator(mut self, instantiator: SectionInstantiator) -> Self {
        self.instantiator = instantiator;
        self
    }

    pub fn with_effects(mut self, effects: PostEffectEngine) -> Self {
        self.effects = effects;
        self
    }

    /// Latest snapshot
    pub fn page(&self) -> Arc<PageConfig> {
        Arc::clone(self.render.current())
    }

    /// Snapshot the current render data was fetched for
    pub fn committed(&self) -> Arc<PageConfig> {
        Arc::clone(self.render.committed())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn render_status(&self) -> RenderStatus {
        self.render.status()
    }

    pub fn render_data(&self) -> Option<Arc<RenderData>> {
        self.render.render_data().cloned()
    }

    pub fn render_error(&self) -> Option<&str> {
        self.render.last_error()
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    /// Apply a mutation with post-effects
    ///
    /// Rejected mutations are logged and leave the store unchanged.
    pub fn apply(&mut self, mutation: Mutation) -> MutationResult {
        self.commit(mutation, false)
    }

    /// Apply and mark render data stale regardless of the mutation kind
    pub fn apply_invalidating(&mut self, mutation: Mutation) -> MutationResult {
        self.commit(mutation, true)
    }

    fn commit(&mut self, mutation: Mutation, force_invalidate: bool) -> MutationResult {
        let before = Arc::clone(self.render.current());
        let mut working = PageConfig::clone(&before);

        let applied = match self.effects.apply_with_effects(&mutation, &mut working) {
            Ok(applied) => applied,
            Err(reason) => {
                error!(mutation = mutation.name(), error = %reason, "mutation rejected");
                return MutationResult::Noop { reason };
            }
        };

        let invalidates = force_invalidate || applied.iter().any(Mutation::invalidates_render_data);
        let status = self.render.status();
        let after = Arc::new(working);

        self.history
            .record(before, Arc::clone(&after), mutation.name());
        self.render.commit(after, invalidates);
        self.version += 1;

        self.events.emit(EditorEvent::PageChanged {
            version: self.version,
            mutation: mutation.name(),
        });
        self.emit_status_change(status);
        self.follow_selection(&mutation);

        MutationResult::Applied {
            version: self.version,
        }
    }

    pub fn add_section(
        &mut self,
        section: Section,
        index: Option<usize>,
        extra_data_sources: BTreeMap<DataSourceKey, DataSource>,
    ) -> MutationResult {
        self.apply(Mutation::AddSection {
            section,
            index,
            extra_data_sources,
        })
    }

    /// Instantiate a library block and insert it after `insert_after`
    ///
    /// Appends when `insert_after` is `None`. With a `template_id`, the
    /// instance's references into the block's translation namespace are
    /// rewritten to `<template_id>.sections.<new section id>`.
    pub fn add_section_from_library(
        &mut self,
        library: &dyn LibraryRegistry,
        library_key: &str,
        insert_after: Option<usize>,
        template_id: Option<&str>,
    ) -> Option<LibraryInsert> {
        let Some(block) = library.block(library_key) else {
            warn!(library_key, "unknown library section");
            return None;
        };

        let mut instance = match self.instantiator.instantiate(block, self.render.current()) {
            Ok(instance) => instance,
            Err(err) => {
                error!(library_key, error = %err, "could not instantiate library section");
                return None;
            }
        };

        let section_id = instance.section.id.clone();
        let remaps = match template_id {
            Some(template_id) => remap_section_translation_keys(
                &mut instance.section,
                &block.id,
                &section_id,
                template_id,
            ),
            None => Vec::new(),
        };

        let index = insert_after.map(|i| i.saturating_add(1));
        let version = self
            .apply_invalidating(instance.into_mutation(index))
            .version()?;

        Some(LibraryInsert {
            section_id,
            version,
            remaps,
        })
    }

    pub fn update_section(&mut self, section_id: &str, patch: SectionPatch) -> MutationResult {
        self.apply(Mutation::UpdateSection {
            section_id: section_id.to_string(),
            patch,
        })
    }

    pub fn remove_section(&mut self, section_id: &str) -> MutationResult {
        self.apply(Mutation::RemoveSection {
            section_id: section_id.to_string(),
        })
    }

    pub fn move_section(&mut self, from_id: &str, to_id: &str) -> MutationResult {
        self.apply(Mutation::MoveSection {
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
        })
    }

    pub fn add_widget(&mut self, section_id: &str, widget: Widget, index: Option<usize>) -> MutationResult {
        self.apply(Mutation::AddWidget {
            section_id: section_id.to_string(),
            widget,
            index,
        })
    }

    pub fn update_widget(
        &mut self,
        section_id: &str,
        widget_id: &str,
        patch: WidgetPatch,
    ) -> MutationResult {
        self.apply(Mutation::UpdateWidget {
            section_id: section_id.to_string(),
            widget_id: widget_id.to_string(),
            patch,
        })
    }

    pub fn remove_widget(&mut self, section_id: &str, widget_id: &str) -> MutationResult {
        self.apply(Mutation::RemoveWidget {
            section_id: section_id.to_string(),
            widget_id: widget_id.to_string(),
        })
    }

    pub fn move_widget(&mut self, section_id: &str, from_id: &str, to_id: &str) -> MutationResult {
        self.apply(Mutation::MoveWidget {
            section_id: section_id.to_string(),
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
        })
    }

    pub fn add_data_source(&mut self, key: &str, data_source: DataSource) -> MutationResult {
        self.apply(Mutation::AddDataSource {
            key: key.to_string(),
            data_source,
        })
    }

    pub fn update_data_source(&mut self, key: &str, patch: DataSourcePatch) -> MutationResult {
        self.apply(Mutation::UpdateDataSource {
            key: key.to_string(),
            patch,
        })
    }

    /// Removes the source and unbinds every widget bound to it
    pub fn remove_data_source(&mut self, key: &str) -> MutationResult {
        self.apply(Mutation::RemoveDataSource {
            key: key.to_string(),
        })
    }

    pub fn select_section(&mut self, section_id: &str) -> bool {
        if !self.render.current().contains_section(section_id) {
            warn!(section_id, "cannot select unknown section");
            return false;
        }
        self.set_selection(Selection {
            section_id: Some(section_id.to_string()),
            widget_id: None,
            settings_open: self.selection.settings_open,
        });
        true
    }

    pub fn select_widget(&mut self, section_id: &str, widget_id: &str) -> bool {
        if self.render.current().find_widget(section_id, widget_id).is_none() {
            warn!(section_id, widget_id, "cannot select unknown widget");
            return false;
        }
        self.set_selection(Selection {
            section_id: Some(section_id.to_string()),
            widget_id: Some(widget_id.to_string()),
            settings_open: self.selection.settings_open,
        });
        true
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(Selection::default());
    }

    pub fn open_settings(&mut self) {
        let mut next = self.selection.clone();
        next.settings_open = true;
        self.set_selection(next);
    }

    pub fn close_settings(&mut self) {
        let mut next = self.selection.clone();
        next.settings_open = false;
        self.set_selection(next);
    }

    fn set_selection(&mut self, next: Selection) {
        if next != self.selection {
            self.selection = next;
            self.events
                .emit(EditorEvent::SelectionChanged(self.selection.clone()));
        }
    }

    fn follow_selection(&mut self, mutation: &Mutation) {
        let next = match mutation {
            Mutation::AddSection { section, .. } => Selection {
                section_id: Some(section.id.clone()),
                widget_id: section.first_widget_id().map(str::to_string),
                settings_open: self.selection.settings_open,
            },
            Mutation::RemoveSection { .. } => Selection::default(),
            Mutation::RemoveWidget { .. } => Selection {
                widget_id: None,
                ..self.selection.clone()
            },
            Mutation::MoveSection { from_id, .. }
                if self.selection.section_id.as_deref() != Some(from_id.as_str()) =>
            {
                Selection {
                    section_id: Some(from_id.clone()),
                    widget_id: None,
                    settings_open: self.selection.settings_open,
                }
            }
            _ => self.reconciled_selection(),
        };
        self.set_selection(next);
    }

    /// Selection with ids that no longer exist dropped
    fn reconciled_selection(&self) -> Selection {
        let page = self.render.current();
        let mut next = self.selection.clone();

        match next.section_id.as_deref().and_then(|id| page.find_section(id)) {
            None => next = Selection::default(),
            Some(section) => {
                if let Some(widget_id) = next.widget_id.as_deref() {
                    if section.find_widget(widget_id).is_none() {
                        next.widget_id = None;
                    }
                }
            }
        }
        next
    }

    pub fn mark_stale(&mut self) {
        let status = self.render.status();
        self.render.mark_stale();
        self.emit_status_change(status);
    }

    pub fn begin_refetch(&mut self) -> RefetchTicket {
        let status = self.render.status();
        let ticket = self.render.begin_refetch();
        self.emit_status_change(status);
        ticket
    }

    pub fn complete_refetch(&mut self, ticket: &RefetchTicket, data: RenderData) -> bool {
        let status = self.render.status();
        let accepted = self.render.complete_refetch(ticket, data);
        self.emit_status_change(status);
        accepted
    }

    pub fn fail_refetch(&mut self, ticket: &RefetchTicket, error: impl Into<String>) -> bool {
        let status = self.render.status();
        let accepted = self.render.fail_refetch(ticket, error);
        self.emit_status_change(status);
        accepted
    }

    pub fn cancel_refetch(&mut self) {
        let status = self.render.status();
        self.render.cancel_refetch();
        self.emit_status_change(status);
    }

    fn emit_status_change(&self, previous: RenderStatus) {
        let status = self.render.status();
        if status != previous {
            self.events.emit(EditorEvent::RenderStatusChanged(status));
        }
    }

    pub fn begin_batch(&mut self, description: impl Into<String>) {
        self.history.begin_batch();
        self.history.set_batch_description(description);
    }

    pub fn end_batch(&mut self) {
        self.history.end_batch();
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(config) => {
                self.restore(config);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(config) => {
                self.restore(config);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, config: Arc<PageConfig>) {
        let status = self.render.status();
        self.render.commit(config, true);
        self.version += 1;

        self.events.emit(EditorEvent::PageReplaced {
            version: self.version,
        });
        self.emit_status_change(status);
        let next = self.reconciled_selection();
        self.set_selection(next);
    }

    /// Swap in a freshly loaded page, dropping history and render data
    pub fn replace(&mut self, config: PageConfig) {
        let status = self.render.status();
        self.render.replace(config);
        self.history.clear();
        self.version += 1;

        self.events.emit(EditorEvent::PageReplaced {
            version: self.version,
        });
        self.emit_status_change(status);
        self.set_selection(Selection::default());
    }
}

impl Default for PageConfigStore {
    fn default() -> Self {
        Self::new(PageConfig::new())
    }
}
