//! # Page Model
//!
//! The editable document tree of a page: ordered sections, each holding
//! ordered widgets, plus a page-wide map of named data sources.
//!
//! Section order is render order, and so is widget order within a section.
//! Wire names are camelCase; the `kind` fields travel as `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form settings object attached to sections and widgets
pub type Settings = serde_json::Map<String, Value>;

/// Key of a data source, unique within a page
pub type DataSourceKey = String;

/// Editable page configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    #[serde(default)]
    pub sections: Vec<Section>,

    #[serde(default)]
    pub data_sources: BTreeMap<DataSourceKey, DataSource>,
}

/// A top-level block of the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub widgets: Vec<Widget>,
}

/// A leaf block inside a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub settings: Settings,

    /// Binding into `PageConfig::data_sources`; `null` once the source is removed
    #[serde(default)]
    pub data_source_key: Option<DataSourceKey>,
}

/// Named, typed fetch specification a widget can bind to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub params: Settings,

    #[serde(default)]
    pub required: bool,
}

impl PageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of a section in render order
    pub fn section_index(&self, section_id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == section_id)
    }

    pub fn find_section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn find_section_mut(&mut self, section_id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == section_id)
    }

    pub fn find_widget(&self, section_id: &str, widget_id: &str) -> Option<&Widget> {
        self.find_section(section_id)?.find_widget(widget_id)
    }

    pub fn find_widget_mut(&mut self, section_id: &str, widget_id: &str) -> Option<&mut Widget> {
        self.find_section_mut(section_id)?.find_widget_mut(widget_id)
    }

    pub fn contains_section(&self, section_id: &str) -> bool {
        self.section_index(section_id).is_some()
    }

    pub fn contains_data_source(&self, key: &str) -> bool {
        self.data_sources.contains_key(key)
    }

    /// All widgets in render order, paired with their section id
    pub fn widgets(&self) -> impl Iterator<Item = (&str, &Widget)> {
        self.sections
            .iter()
            .flat_map(|s| s.widgets.iter().map(move |w| (s.id.as_str(), w)))
    }

    /// Widgets bound to a data source key that is not in `data_sources`
    ///
    /// Returns `(section_id, widget_id, key)` triples. Empty for a page that
    /// holds the referential-integrity invariant.
    pub fn dangling_bindings(&self) -> Vec<(String, String, DataSourceKey)> {
        self.widgets()
            .filter_map(|(section_id, widget)| {
                let key = widget.data_source_key.as_ref()?;
                if self.data_sources.contains_key(key) {
                    None
                } else {
                    Some((section_id.to_string(), widget.id.clone(), key.clone()))
                }
            })
            .collect()
    }
}

impl Section {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            settings: Settings::new(),
            widgets: Vec::new(),
        }
    }

    pub fn with_widget(mut self, widget: Widget) -> Self {
        self.widgets.push(widget);
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    pub fn widget_index(&self, widget_id: &str) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == widget_id)
    }

    pub fn find_widget(&self, widget_id: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id == widget_id)
    }

    pub fn find_widget_mut(&mut self, widget_id: &str) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|w| w.id == widget_id)
    }

    pub fn first_widget_id(&self) -> Option<&str> {
        self.widgets.first().map(|w| w.id.as_str())
    }
}

impl Widget {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            name: None,
            settings: Settings::new(),
            data_source_key: None,
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    pub fn bound_to(mut self, key: impl Into<String>) -> Self {
        self.data_source_key = Some(key.into());
        self
    }
}

impl DataSource {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Settings::new(),
            required: false,
        }
    }
}
