//! # Pagewright Editor
//!
//! Editing core for page-builder documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ common: PageConfig model + visitors         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor                                      │
//! │  - PageConfigStore: mutations, post-effects │
//! │    selection, history, render staleness     │
//! │  - TranslationStore: common + template      │
//! │    trees, merged view, provenance           │
//! │  - SectionInstantiator: library → section   │
//! │  - EditSession: routes `t:` edits           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ workspace: async load/save/refetch flows    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Snapshots are immutable**: every commit produces a new `Arc<PageConfig>`
//! 2. **Integrity first**: a mutation that would leave a dangling id or
//!    binding is rejected, and removals cascade through post-effects
//! 3. **Failures degrade**: rejected edits are logged no-ops, never panics
//! 4. **Single writer**: stores are owned; readers subscribe to events
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pagewright_editor::{EditSession, StaticLibrary, TranslationScope};
//!
//! let mut session = EditSession::new(
//!     "editor-1",
//!     page,
//!     TranslationScope::new("dawn", "home", "en"),
//!     Arc::new(library),
//! );
//! session.translations.load(common, template);
//!
//! // Stamp a library section after the first one
//! let insert = session.add_section_from_library("hero", Some(0));
//!
//! // Edits to `t:` fields land in the translation tree owning the path
//! session.edit_section_setting(&insert.unwrap().section_id, "title", json!("Welcome"));
//! ```

mod document;
mod errors;
mod events;
mod instantiate;
mod library;
mod mutations;
mod post_effects;
mod reference;
mod session;
mod staleness;
mod translations;
mod tree;
mod undo_stack;

pub use document::{LibraryInsert, PageConfigStore, Selection};
pub use errors::EditorError;
pub use events::{EditorEvent, EventBus};
pub use instantiate::{
    remap_section_translation_keys, remap_translation_keys, Instance, RandomSuffix, Remap,
    SectionInstantiator, SequentialSuffix, SuffixGenerator, DEFAULT_SUFFIX_LEN,
};
pub use library::{DataSourceTemplate, LibraryBlock, LibraryRegistry, LibraryWidget, StaticLibrary};
pub use mutations::{
    DataSourcePatch, Mutation, MutationError, MutationResult, SectionPatch, WidgetPatch,
};
pub use post_effects::{PostEffect, PostEffectEngine, UnbindRemovedDataSource};
pub use reference::{
    collect_references, is_reference, is_reference_str, path_of, to_reference, SettingValue,
    TranslationPath, REFERENCE_PREFIX,
};
pub use session::{EditOutcome, EditSession};
pub use staleness::{RefetchTicket, RenderData, RenderStatus, StalenessCoordinator};
pub use translations::{
    LoadTicket, Provenance, SaveSnapshot, TranslationError, TranslationScope, TranslationStore,
    COMMON_TEMPLATE_ID,
};
pub use tree::{deep_merge, get_path, leaf_paths, remove_path, set_path};
pub use undo_stack::{HistoryEntry, UndoStack};

// Re-export common types for convenience
pub use pagewright_common::{DataSource, DataSourceKey, PageConfig, Section, Settings, Widget};
