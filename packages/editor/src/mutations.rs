//! # Page Mutations
//!
//! Semantic operations on a page configuration.
//!
//! ## Design Principles
//!
//! 1. **Intent-preserving**: Each mutation represents one editor gesture
//! 2. **Validated**: A mutation that would break referential integrity is
//!    rejected before anything is touched
//! 3. **Serializable**: Mutations can be recorded, replayed and scripted
//!
//! ## Mutation Semantics
//!
//! ### Insert
//! - Out-of-bounds or missing index appends
//! - Ids must be unique (sections in the page, widgets in their section)
//! - Every widget binding must name an existing data source
//!
//! ### Move
//! - Reorder, not exchange: the item is removed at the source position and
//!   reinserted at the target's position
//!
//! ### RemoveDataSource
//! - Removes the map entry only. Widgets bound to it are unbound by the
//!   post-effect engine, see `post_effects`.

use std::collections::BTreeMap;

use pagewright_common::{DataSource, DataSourceKey, PageConfig, Section, Settings, Widget};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Semantic mutations (intent-preserving operations)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Insert a section and merge the data sources it brings along
    AddSection {
        section: Section,
        #[serde(default)]
        index: Option<usize>,
        #[serde(default)]
        extra_data_sources: BTreeMap<DataSourceKey, DataSource>,
    },

    UpdateSection {
        section_id: String,
        patch: SectionPatch,
    },

    RemoveSection {
        section_id: String,
    },

    /// Move `from_id` to the position currently held by `to_id`
    MoveSection {
        from_id: String,
        to_id: String,
    },

    AddWidget {
        section_id: String,
        widget: Widget,
        #[serde(default)]
        index: Option<usize>,
    },

    UpdateWidget {
        section_id: String,
        widget_id: String,
        patch: WidgetPatch,
    },

    RemoveWidget {
        section_id: String,
        widget_id: String,
    },

    MoveWidget {
        section_id: String,
        from_id: String,
        to_id: String,
    },

    AddDataSource {
        key: DataSourceKey,
        data_source: DataSource,
    },

    UpdateDataSource {
        key: DataSourceKey,
        patch: DataSourcePatch,
    },

    RemoveDataSource {
        key: DataSourceKey,
    },
}

/// Shallow update of a section's fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widgets: Option<Vec<Widget>>,
}

/// Shallow update of a widget's fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,

    /// `Some(None)` unbinds, `None` leaves the binding alone
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "explicit_null"
    )]
    pub data_source_key: Option<Option<DataSourceKey>>,
}

/// Shallow update of a data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSourcePatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Settings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Widget not found: {widget_id} in section {section_id}")]
    WidgetNotFound {
        section_id: String,
        widget_id: String,
    },

    #[error("Data source not found: {0}")]
    DataSourceNotFound(String),

    #[error("Section id already in use: {0}")]
    DuplicateSection(String),

    #[error("Widget id already in use: {widget_id} in section {section_id}")]
    DuplicateWidget {
        section_id: String,
        widget_id: String,
    },

    #[error("Data source key already in use: {0}")]
    DuplicateDataSource(String),

    #[error("Widget {widget_id} is bound to unknown data source {key}")]
    UnknownBinding { widget_id: String, key: String },

    #[error("Could not find a free instance suffix for {0}")]
    SuffixExhausted(String),
}

impl SectionPatch {
    pub fn settings(settings: Settings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    fn apply_to(&self, section: &mut Section) {
        if let Some(kind) = &self.kind {
            section.kind = kind.clone();
        }
        if let Some(settings) = &self.settings {
            section.settings = settings.clone();
        }
        if let Some(widgets) = &self.widgets {
            section.widgets = widgets.clone();
        }
    }
}

impl WidgetPatch {
    pub fn settings(settings: Settings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn bind(key: impl Into<String>) -> Self {
        Self {
            data_source_key: Some(Some(key.into())),
            ..Self::default()
        }
    }

    pub fn unbind() -> Self {
        Self {
            data_source_key: Some(None),
            ..Self::default()
        }
    }

    fn apply_to(&self, widget: &mut Widget) {
        if let Some(kind) = &self.kind {
            widget.kind = kind.clone();
        }
        if let Some(name) = &self.name {
            widget.name = Some(name.clone());
        }
        if let Some(settings) = &self.settings {
            widget.settings = settings.clone();
        }
        if let Some(binding) = &self.data_source_key {
            widget.data_source_key = binding.clone();
        }
    }
}

impl DataSourcePatch {
    fn apply_to(&self, data_source: &mut DataSource) {
        if let Some(kind) = &self.kind {
            data_source.kind = kind.clone();
        }
        if let Some(params) = &self.params {
            data_source.params = params.clone();
        }
        if let Some(required) = self.required {
            data_source.required = required;
        }
    }
}

impl Mutation {
    /// Get a debug name for this mutation
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::AddSection { .. } => "add_section",
            Mutation::UpdateSection { .. } => "update_section",
            Mutation::RemoveSection { .. } => "remove_section",
            Mutation::MoveSection { .. } => "move_section",
            Mutation::AddWidget { .. } => "add_widget",
            Mutation::UpdateWidget { .. } => "update_widget",
            Mutation::RemoveWidget { .. } => "remove_widget",
            Mutation::MoveWidget { .. } => "move_widget",
            Mutation::AddDataSource { .. } => "add_data_source",
            Mutation::UpdateDataSource { .. } => "update_data_source",
            Mutation::RemoveDataSource { .. } => "remove_data_source",
        }
    }

    /// Whether previously fetched render data no longer matches after this
    pub fn invalidates_render_data(&self) -> bool {
        match self {
            Mutation::AddSection {
                section,
                extra_data_sources,
                ..
            } => {
                !extra_data_sources.is_empty()
                    || section.widgets.iter().any(|w| w.data_source_key.is_some())
            }
            Mutation::UpdateSection { patch, .. } => patch.widgets.is_some(),
            Mutation::AddWidget { widget, .. } => widget.data_source_key.is_some(),
            Mutation::UpdateWidget { patch, .. } => patch.data_source_key.is_some(),
            Mutation::AddDataSource { .. }
            | Mutation::UpdateDataSource { .. }
            | Mutation::RemoveDataSource { .. } => true,
            Mutation::RemoveSection { .. }
            | Mutation::MoveSection { .. }
            | Mutation::RemoveWidget { .. }
            | Mutation::MoveWidget { .. } => false,
        }
    }

    /// Apply mutation to the page with validation
    ///
    /// On error the page is left untouched.
    pub fn apply(&self, page: &mut PageConfig) -> Result<(), MutationError> {
        self.validate(page)?;

        match self {
            Mutation::AddSection {
                section,
                index,
                extra_data_sources,
            } => {
                let at = clamp_index(*index, page.sections.len());
                page.sections.insert(at, section.clone());
                page.data_sources.extend(
                    extra_data_sources
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone())),
                );
            }

            Mutation::UpdateSection { section_id, patch } => {
                let section = find_section_mut(page, section_id)?;
                patch.apply_to(section);
            }

            Mutation::RemoveSection { section_id } => {
                let index = section_index(page, section_id)?;
                page.sections.remove(index);
            }

            Mutation::MoveSection { from_id, to_id } => {
                let from = section_index(page, from_id)?;
                let to = section_index(page, to_id)?;
                let section = page.sections.remove(from);
                page.sections.insert(to, section);
            }

            Mutation::AddWidget {
                section_id,
                widget,
                index,
            } => {
                let section = find_section_mut(page, section_id)?;
                let at = clamp_index(*index, section.widgets.len());
                section.widgets.insert(at, widget.clone());
            }

            Mutation::UpdateWidget {
                section_id,
                widget_id,
                patch,
            } => {
                let widget = page.find_widget_mut(section_id, widget_id).ok_or_else(|| {
                    MutationError::WidgetNotFound {
                        section_id: section_id.clone(),
                        widget_id: widget_id.clone(),
                    }
                })?;
                patch.apply_to(widget);
            }

            Mutation::RemoveWidget {
                section_id,
                widget_id,
            } => {
                let section = find_section_mut(page, section_id)?;
                let index = widget_index(section, widget_id)?;
                section.widgets.remove(index);
            }

            Mutation::MoveWidget {
                section_id,
                from_id,
                to_id,
            } => {
                let section = find_section_mut(page, section_id)?;
                let from = widget_index(section, from_id)?;
                let to = widget_index(section, to_id)?;
                let widget = section.widgets.remove(from);
                section.widgets.insert(to, widget);
            }

            Mutation::AddDataSource { key, data_source } => {
                page.data_sources.insert(key.clone(), data_source.clone());
            }

            Mutation::UpdateDataSource { key, patch } => {
                let data_source = page
                    .data_sources
                    .get_mut(key)
                    .ok_or_else(|| MutationError::DataSourceNotFound(key.clone()))?;
                patch.apply_to(data_source);
            }

            Mutation::RemoveDataSource { key } => {
                page.data_sources.remove(key);
            }
        }

        Ok(())
    }

    /// Validate without applying
    pub fn validate(&self, page: &PageConfig) -> Result<(), MutationError> {
        match self {
            Mutation::AddSection {
                section,
                extra_data_sources,
                ..
            } => {
                if page.contains_section(&section.id) {
                    return Err(MutationError::DuplicateSection(section.id.clone()));
                }
                if let Some(key) = extra_data_sources
                    .keys()
                    .find(|key| page.contains_data_source(key))
                {
                    return Err(MutationError::DuplicateDataSource(key.clone()));
                }
                check_widgets(&section.id, &section.widgets, |key| {
                    page.contains_data_source(key) || extra_data_sources.contains_key(key)
                })
            }

            Mutation::UpdateSection { section_id, patch } => {
                section_index(page, section_id)?;
                match &patch.widgets {
                    Some(widgets) => {
                        check_widgets(section_id, widgets, |key| page.contains_data_source(key))
                    }
                    None => Ok(()),
                }
            }

            Mutation::RemoveSection { section_id } => section_index(page, section_id).map(drop),

            Mutation::MoveSection { from_id, to_id } => {
                section_index(page, from_id)?;
                section_index(page, to_id).map(drop)
            }

            Mutation::AddWidget {
                section_id, widget, ..
            } => {
                let section = find_section(page, section_id)?;
                if section.find_widget(&widget.id).is_some() {
                    return Err(MutationError::DuplicateWidget {
                        section_id: section_id.clone(),
                        widget_id: widget.id.clone(),
                    });
                }
                check_binding(widget, |key| page.contains_data_source(key))
            }

            Mutation::UpdateWidget {
                section_id,
                widget_id,
                patch,
            } => {
                let section = find_section(page, section_id)?;
                widget_index(section, widget_id)?;
                match &patch.data_source_key {
                    Some(Some(key)) if !page.contains_data_source(key) => {
                        Err(MutationError::UnknownBinding {
                            widget_id: widget_id.clone(),
                            key: key.clone(),
                        })
                    }
                    _ => Ok(()),
                }
            }

            Mutation::RemoveWidget {
                section_id,
                widget_id,
            } => widget_index(find_section(page, section_id)?, widget_id).map(drop),

            Mutation::MoveWidget {
                section_id,
                from_id,
                to_id,
            } => {
                let section = find_section(page, section_id)?;
                widget_index(section, from_id)?;
                widget_index(section, to_id).map(drop)
            }

            Mutation::AddDataSource { key, .. } => {
                if page.contains_data_source(key) {
                    Err(MutationError::DuplicateDataSource(key.clone()))
                } else {
                    Ok(())
                }
            }

            Mutation::UpdateDataSource { key, .. } | Mutation::RemoveDataSource { key } => {
                if page.contains_data_source(key) {
                    Ok(())
                } else {
                    Err(MutationError::DataSourceNotFound(key.clone()))
                }
            }
        }
    }
}

fn clamp_index(index: Option<usize>, len: usize) -> usize {
    index.filter(|i| *i <= len).unwrap_or(len)
}

fn section_index(page: &PageConfig, section_id: &str) -> Result<usize, MutationError> {
    page.section_index(section_id)
        .ok_or_else(|| MutationError::SectionNotFound(section_id.to_string()))
}

fn find_section<'a>(page: &'a PageConfig, section_id: &str) -> Result<&'a Section, MutationError> {
    page.find_section(section_id)
        .ok_or_else(|| MutationError::SectionNotFound(section_id.to_string()))
}

fn find_section_mut<'a>(
    page: &'a mut PageConfig,
    section_id: &str,
) -> Result<&'a mut Section, MutationError> {
    page.find_section_mut(section_id)
        .ok_or_else(|| MutationError::SectionNotFound(section_id.to_string()))
}

fn widget_index(section: &Section, widget_id: &str) -> Result<usize, MutationError> {
    section
        .widget_index(widget_id)
        .ok_or_else(|| MutationError::WidgetNotFound {
            section_id: section.id.clone(),
            widget_id: widget_id.to_string(),
        })
}

fn check_binding(widget: &Widget, exists: impl Fn(&str) -> bool) -> Result<(), MutationError> {
    match &widget.data_source_key {
        Some(key) if !exists(key) => Err(MutationError::UnknownBinding {
            widget_id: widget.id.clone(),
            key: key.clone(),
        }),
        _ => Ok(()),
    }
}

fn check_widgets(
    section_id: &str,
    widgets: &[Widget],
    exists: impl Fn(&str) -> bool,
) -> Result<(), MutationError> {
    for (i, widget) in widgets.iter().enumerate() {
        if widgets[..i].iter().any(|w| w.id == widget.id) {
            return Err(MutationError::DuplicateWidget {
                section_id: section_id.to_string(),
                widget_id: widget.id.clone(),
            });
        }
        check_binding(widget, &exists)?;
    }
    Ok(())
}

/// Result of applying a mutation through a store
#[derive(Debug, Clone, PartialEq)]
pub enum MutationResult {
    /// Committed; `version` is the store version after the commit
    Applied { version: u64 },

    /// Rejected and logged; nothing changed
    Noop { reason: MutationError },
}

impl MutationResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationResult::Applied { .. })
    }

    pub fn version(&self) -> Option<u64> {
        match self {
            MutationResult::Applied { version } => Some(*version),
            MutationResult::Noop { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> PageConfig {
        let mut page = PageConfig::new();
        page.data_sources.insert("products_1".into(), DataSource::new("products"));
        for id in ["a", "b", "c"] {
            page.sections.push(Section::new(id, "text"));
        }
        page.sections[0]
            .widgets
            .push(Widget::new("w1", "list").bound_to("products_1"));
        page.sections[0].widgets.push(Widget::new("w2", "text"));
        page
    }

    fn ids(page: &PageConfig) -> Vec<&str> {
        page.sections.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_mutation_serialization() {
        let mutation = Mutation::UpdateWidget {
            section_id: "a".into(),
            widget_id: "w1".into(),
            patch: WidgetPatch::unbind(),
        };

        let json = serde_json::to_value(&mutation).unwrap();
        assert_eq!(json["UpdateWidget"]["patch"]["dataSourceKey"], json!(null));

        let deserialized: Mutation = serde_json::from_value(json).unwrap();
        assert_eq!(mutation, deserialized);
    }

    #[test]
    fn test_absent_binding_in_patch_means_keep() {
        let patch: WidgetPatch = serde_json::from_value(json!({ "name": "Hero" })).unwrap();
        assert_eq!(patch.data_source_key, None);
        let patch: WidgetPatch =
            serde_json::from_value(json!({ "dataSourceKey": "products_1" })).unwrap();
        assert_eq!(patch.data_source_key, Some(Some("products_1".into())));
    }

    #[test]
    fn test_add_section_clamps_index() {
        let mut page = page();
        Mutation::AddSection {
            section: Section::new("d", "text"),
            index: Some(99),
            extra_data_sources: BTreeMap::new(),
        }
        .apply(&mut page)
        .unwrap();
        assert_eq!(ids(&page), vec!["a", "b", "c", "d"]);

        Mutation::AddSection {
            section: Section::new("e", "text"),
            index: Some(1),
            extra_data_sources: BTreeMap::new(),
        }
        .apply(&mut page)
        .unwrap();
        assert_eq!(ids(&page), vec!["a", "e", "b", "c", "d"]);
    }

    #[test]
    fn test_add_section_rejects_duplicates_and_dangling_bindings() {
        let mut page = page();
        let duplicate = Mutation::AddSection {
            section: Section::new("a", "text"),
            index: None,
            extra_data_sources: BTreeMap::new(),
        };
        assert_eq!(
            duplicate.apply(&mut page),
            Err(MutationError::DuplicateSection("a".into()))
        );

        let dangling = Mutation::AddSection {
            section: Section::new("d", "grid").with_widget(Widget::new("w", "list").bound_to("nope")),
            index: None,
            extra_data_sources: BTreeMap::new(),
        };
        assert!(matches!(
            dangling.apply(&mut page),
            Err(MutationError::UnknownBinding { .. })
        ));

        let mut extra = BTreeMap::new();
        extra.insert("nope".to_string(), DataSource::new("products"));
        let carried = Mutation::AddSection {
            section: Section::new("d", "grid").with_widget(Widget::new("w", "list").bound_to("nope")),
            index: None,
            extra_data_sources: extra,
        };
        carried.apply(&mut page).unwrap();
        assert!(page.contains_data_source("nope"));
        assert!(page.dangling_bindings().is_empty());
    }

    #[test]
    fn test_move_section_is_a_reorder() {
        let mut page = page();
        Mutation::MoveSection {
            from_id: "a".into(),
            to_id: "c".into(),
        }
        .apply(&mut page)
        .unwrap();
        assert_eq!(ids(&page), vec!["b", "c", "a"]);

        Mutation::MoveSection {
            from_id: "a".into(),
            to_id: "b".into(),
        }
        .apply(&mut page)
        .unwrap();
        assert_eq!(ids(&page), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_move_with_missing_id_leaves_page_untouched() {
        let mut page = page();
        let before = page.clone();
        let result = Mutation::MoveSection {
            from_id: "a".into(),
            to_id: "zzz".into(),
        }
        .apply(&mut page);
        assert_eq!(result, Err(MutationError::SectionNotFound("zzz".into())));
        assert_eq!(page, before);
    }

    #[test]
    fn test_update_widget_is_shallow() {
        let mut page = page();
        let mut settings = Settings::new();
        settings.insert("text".into(), json!("Hello"));

        Mutation::UpdateWidget {
            section_id: "a".into(),
            widget_id: "w1".into(),
            patch: WidgetPatch::settings(settings),
        }
        .apply(&mut page)
        .unwrap();

        let widget = page.find_widget("a", "w1").unwrap();
        assert_eq!(widget.settings["text"], json!("Hello"));
        assert_eq!(widget.data_source_key.as_deref(), Some("products_1"));
    }

    #[test]
    fn test_update_widget_rejects_unknown_binding() {
        let mut page = page();
        let result = Mutation::UpdateWidget {
            section_id: "a".into(),
            widget_id: "w2".into(),
            patch: WidgetPatch::bind("missing"),
        }
        .apply(&mut page);
        assert!(matches!(result, Err(MutationError::UnknownBinding { .. })));
    }

    #[test]
    fn test_widget_operations() {
        let mut page = page();
        Mutation::AddWidget {
            section_id: "a".into(),
            widget: Widget::new("w3", "image"),
            index: Some(0),
        }
        .apply(&mut page)
        .unwrap();
        Mutation::MoveWidget {
            section_id: "a".into(),
            from_id: "w3".into(),
            to_id: "w2".into(),
        }
        .apply(&mut page)
        .unwrap();
        let order: Vec<_> = page.sections[0].widgets.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(order, vec!["w1", "w2", "w3"]);

        Mutation::RemoveWidget {
            section_id: "a".into(),
            widget_id: "w2".into(),
        }
        .apply(&mut page)
        .unwrap();
        assert!(page.find_widget("a", "w2").is_none());

        let result = Mutation::RemoveWidget {
            section_id: "b".into(),
            widget_id: "w1".into(),
        }
        .apply(&mut page);
        assert!(matches!(result, Err(MutationError::WidgetNotFound { .. })));
    }

    #[test]
    fn test_data_source_operations() {
        let mut page = page();
        let add = Mutation::AddDataSource {
            key: "products_1".into(),
            data_source: DataSource::new("products"),
        };
        assert_eq!(
            add.apply(&mut page),
            Err(MutationError::DuplicateDataSource("products_1".into()))
        );

        Mutation::UpdateDataSource {
            key: "products_1".into(),
            patch: DataSourcePatch {
                required: Some(true),
                ..Default::default()
            },
        }
        .apply(&mut page)
        .unwrap();
        assert!(page.data_sources["products_1"].required);

        let remove = Mutation::RemoveDataSource { key: "nope".into() };
        assert!(remove.invalidates_render_data());
        assert_eq!(
            remove.apply(&mut page),
            Err(MutationError::DataSourceNotFound("nope".into()))
        );
    }
}
