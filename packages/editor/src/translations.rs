//! # Translation Merge Store
//!
//! Owns the two source translation trees of the active page and the merged
//! read view built from them.
//!
//! - **common**: strings shared by every template of a theme
//! - **template**: strings scoped to the active template, overriding common
//!
//! ## Invariants
//!
//! 1. `merged` is always exactly `deep_merge(common, template)`. It is never
//!    patched on its own.
//! 2. The provenance map is always the flattening of `common` followed by
//!    the flattening of `template`, so a path present in both is owned by
//!    the template tree.
//! 3. Writes go to the tree that owns the path. Unknown paths are template
//!    scoped.
//!
//! Persistence is asynchronous and lives outside this crate; the store only
//! hands out load tickets and save snapshots and accepts their results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::events::{EditorEvent, EventBus};
use crate::reference::{path_of, TranslationPath};
use crate::tree::{deep_merge, get_path, leaf_paths, remove_path, set_path};

/// Pseudo template id under which the common tree is stored
pub const COMMON_TEMPLATE_ID: &str = "common";

/// Follow at most this many chained references before giving up
const MAX_REFERENCE_HOPS: usize = 8;

/// Which source tree owns a translation path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Common,
    Template,
}

/// The (theme, template, locale) a pair of trees was loaded for
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationScope {
    pub theme_id: String,
    pub template_id: String,
    pub language: String,
}

impl TranslationScope {
    pub fn new(
        theme_id: impl Into<String>,
        template_id: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            theme_id: theme_id.into(),
            template_id: template_id.into(),
            language: language.into(),
        }
    }

    /// Same theme and locale, addressed at the shared common tree
    pub fn common(&self) -> Self {
        Self {
            template_id: COMMON_TEMPLATE_ID.to_string(),
            ..self.clone()
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    #[error("Translation path is empty")]
    EmptyPath,

    #[error("Failed to load translations: {0}")]
    LoadFailed(String),

    #[error("Failed to save translations: {0}")]
    SaveFailed(String),
}

/// Handed out by [`TranslationStore::begin_load`]
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    scope: TranslationScope,
}

impl LoadTicket {
    pub fn scope(&self) -> &TranslationScope {
        &self.scope
    }
}

/// Both trees as they were when a save started
#[derive(Debug, Clone)]
pub struct SaveSnapshot {
    pub scope: TranslationScope,
    pub common: Value,
    pub template: Value,
    revision: u64,
}

#[derive(Debug)]
pub struct TranslationStore {
    scope: TranslationScope,
    common: Value,
    template: Value,
    merged: Value,
    provenance: HashMap<String, Provenance>,
    has_unsaved_changes: bool,
    /// Bumped on every write; a save only clears the dirty flag if nothing
    /// was written after its snapshot was taken.
    revision: u64,
    load_generation: u64,
    loading: bool,
    error: Option<String>,
    events: EventBus,
}

impl TranslationStore {
    pub fn new(scope: TranslationScope) -> Self {
        Self {
            scope,
            common: Value::Object(Map::new()),
            template: Value::Object(Map::new()),
            merged: Value::Object(Map::new()),
            provenance: HashMap::new(),
            has_unsaved_changes: false,
            revision: 0,
            load_generation: 0,
            loading: false,
            error: None,
            events: EventBus::new(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn scope(&self) -> &TranslationScope {
        &self.scope
    }

    pub fn common(&self) -> &Value {
        &self.common
    }

    pub fn template(&self) -> &Value {
        &self.template
    }

    pub fn merged(&self) -> &Value {
        &self.merged
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last load or save failure, cleared by the next success
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn provenance_of(&self, path: &TranslationPath) -> Option<Provenance> {
        self.provenance.get(&path.dotted()).copied()
    }

    /// Replace both trees wholesale
    pub fn load(&mut self, common: Value, template: Value) {
        self.common = common;
        self.template = template;
        self.rebuild();
        self.has_unsaved_changes = false;
        self.error = None;
        info!(
            template_id = %self.scope.template_id,
            language = %self.scope.language,
            paths = self.provenance.len(),
            "Translations loaded"
        );
        self.events.emit(EditorEvent::TranslationsLoaded(self.scope.clone()));
    }

    /// Start loading trees for `scope`; supersedes any load in flight
    pub fn begin_load(&mut self, scope: TranslationScope) -> LoadTicket {
        self.load_generation += 1;
        self.loading = true;
        LoadTicket {
            generation: self.load_generation,
            scope,
        }
    }

    /// Apply the result of a load. Returns `false` when the ticket was
    /// superseded and the result dropped.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<(Value, Value), TranslationError>,
    ) -> bool {
        if ticket.generation != self.load_generation {
            debug!(
                generation = ticket.generation,
                current = self.load_generation,
                "Dropping superseded translation load"
            );
            return false;
        }

        self.loading = false;
        match result {
            Ok((common, template)) => {
                self.scope = ticket.scope;
                self.load(common, template);
            }
            Err(err) => {
                error!(error = %err, "Translation load failed");
                self.error = Some(err.to_string());
                self.events.emit(EditorEvent::TranslationError(err.to_string()));
            }
        }
        true
    }

    /// Value at `path` in the merged tree, following chained references
    ///
    /// Dangling paths and reference cycles resolve to `None`.
    pub fn resolve(&self, path: &TranslationPath) -> Option<&Value> {
        let mut current = path.clone();
        for _ in 0..MAX_REFERENCE_HOPS {
            let value = get_path(&self.merged, current.segments())?;
            match value.as_str().and_then(path_of) {
                Some(next) => current = next,
                None => return Some(value),
            }
        }
        debug!(path = %path, "Reference chain too long, treating as dangling");
        None
    }

    /// Resolve a settings value: references are looked up, literals pass through
    pub fn resolve_value(&self, value: &Value) -> Option<Value> {
        match value.as_str().and_then(path_of) {
            Some(path) => self.resolve(&path).cloned(),
            None => Some(value.clone()),
        }
    }

    /// Write `value` at `path` into the tree that owns the path
    pub fn update_translation(
        &mut self,
        path: &TranslationPath,
        value: Value,
    ) -> Result<Provenance, TranslationError> {
        if path.is_empty() {
            return Err(TranslationError::EmptyPath);
        }

        let owner = self.owner_of(path);

        match owner {
            Provenance::Common => {
                self.common = set_path(&self.common, path.segments(), value);
            }
            Provenance::Template => {
                self.template = set_path(&self.template, path.segments(), value);
            }
        }

        self.touch();
        self.events.emit(EditorEvent::TranslationChanged {
            path: path.dotted(),
            provenance: owner,
        });
        Ok(owner)
    }

    /// Edit whatever `path` ultimately points at
    ///
    /// When the value at `path` is itself a reference, the write lands on
    /// the end of the chain, in the tree owning that final path.
    pub fn update_resolved(
        &mut self,
        path: &TranslationPath,
        value: Value,
    ) -> Result<(TranslationPath, Provenance), TranslationError> {
        let target = self.reference_target(path);
        let owner = self.update_translation(&target, value)?;
        Ok((target, owner))
    }

    fn reference_target(&self, path: &TranslationPath) -> TranslationPath {
        let mut current = path.clone();
        for _ in 0..MAX_REFERENCE_HOPS {
            let next = get_path(&self.merged, current.segments())
                .and_then(Value::as_str)
                .and_then(path_of);
            match next {
                Some(next) if !next.is_empty() => current = next,
                _ => break,
            }
        }
        current
    }

    /// Path of the subtree holding a section's own strings
    pub fn section_path(&self, section_key: &str) -> TranslationPath {
        TranslationPath::new([self.scope.template_id.as_str(), "sections", section_key])
    }

    /// Write a section's strings; section strings are always template scoped
    pub fn create_section_translations(&mut self, section_key: &str, subtree: Value) {
        let path = self.section_path(section_key);
        self.template = set_path(&self.template, path.segments(), subtree);
        self.touch();
        self.events.emit(EditorEvent::TranslationChanged {
            path: path.dotted(),
            provenance: Provenance::Template,
        });
    }

    /// Drop a section's strings, returning them if there were any
    pub fn remove_section_translations(&mut self, section_key: &str) -> Option<Value> {
        let path = self.section_path(section_key);
        let (next, removed) = remove_path(&self.template, path.segments());
        if removed.is_some() {
            self.template = next;
            self.touch();
            self.events.emit(EditorEvent::TranslationChanged {
                path: path.dotted(),
                provenance: Provenance::Template,
            });
        }
        removed
    }

    /// Trees to persist, or `None` when there is nothing unsaved
    pub fn save_snapshot(&self) -> Option<SaveSnapshot> {
        if !self.has_unsaved_changes {
            return None;
        }
        Some(SaveSnapshot {
            scope: self.scope.clone(),
            common: self.common.clone(),
            template: self.template.clone(),
            revision: self.revision,
        })
    }

    /// Record the outcome of persisting a snapshot
    ///
    /// Any failure keeps the store dirty so the save can be retried.
    pub fn finish_save(&mut self, snapshot: &SaveSnapshot, result: Result<(), TranslationError>) {
        match result {
            Ok(()) => {
                self.error = None;
                if snapshot.revision == self.revision {
                    self.has_unsaved_changes = false;
                }
                info!(template_id = %snapshot.scope.template_id, "Translations saved");
                self.events.emit(EditorEvent::TranslationsSaved);
            }
            Err(err) => {
                error!(error = %err, "Translation save failed");
                self.error = Some(err.to_string());
                self.has_unsaved_changes = true;
                self.events.emit(EditorEvent::TranslationError(err.to_string()));
            }
        }
    }

    fn touch(&mut self) {
        self.rebuild();
        self.has_unsaved_changes = true;
        self.revision += 1;
    }

    /// Tree a write to `path` must land in for the merged view to show it
    ///
    /// A leaf on the way down (an array, or a scalar the write will replace)
    /// decides: template shadows common there, so the template owns the write
    /// whenever it has a value at that prefix.
    fn owner_of(&self, path: &TranslationPath) -> Provenance {
        let segments = path.segments();
        for end in 1..segments.len() {
            let prefix = &segments[..end];
            if self.provenance.contains_key(&prefix.join(".")) {
                return if get_path(&self.template, prefix).is_some() {
                    Provenance::Template
                } else {
                    Provenance::Common
                };
            }
        }
        self.provenance_of(path).unwrap_or(Provenance::Template)
    }

    fn rebuild(&mut self) {
        self.merged = deep_merge(&self.common, &self.template);
        self.provenance.clear();
        for path in leaf_paths(&self.common) {
            self.provenance.insert(path, Provenance::Common);
        }
        for path in leaf_paths(&self.template) {
            self.provenance.insert(path, Provenance::Template);
        }
    }
}
