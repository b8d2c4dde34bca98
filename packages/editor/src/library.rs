//! Read-only registry of reusable section templates.

use std::collections::BTreeMap;

use pagewright_common::{DataSource, Settings};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EditorError;

/// A parametrized section from which page sections are stamped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryBlock {
    /// Base id; instances are `${id}-${suffix}`
    pub id: String,

    pub name: String,

    /// Section type of the instances, defaults to `id`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub widgets: Vec<LibraryWidget>,

    #[serde(default)]
    pub settings_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryWidget {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub settings: Settings,

    /// Stencil for the data source each instance gets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_template: Option<DataSourceTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceTemplate {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub params: Settings,

    #[serde(default)]
    pub required: bool,
}

impl DataSourceTemplate {
    pub fn materialize(&self) -> DataSource {
        DataSource {
            kind: self.kind.clone(),
            params: self.params.clone(),
            required: self.required,
        }
    }
}

impl LibraryBlock {
    pub fn section_kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(&self.id)
    }
}

/// Lookup of library blocks by key, plus the bundle of default strings
/// their references point into
pub trait LibraryRegistry: Send + Sync {
    fn block(&self, key: &str) -> Option<&LibraryBlock>;

    fn default_translations(&self) -> &Value;

    fn keys(&self) -> Vec<String>;
}

/// In-memory registry
#[derive(Debug, Clone, Default)]
pub struct StaticLibrary {
    blocks: BTreeMap<String, LibraryBlock>,
    translations: Value,
}

impl StaticLibrary {
    pub fn new() -> Self {
        Self {
            blocks: BTreeMap::new(),
            translations: Value::Object(Default::default()),
        }
    }

    pub fn with_block(mut self, key: impl Into<String>, block: LibraryBlock) -> Self {
        self.blocks.insert(key.into(), block);
        self
    }

    pub fn with_translations(mut self, translations: Value) -> Self {
        self.translations = translations;
        self
    }

    /// Build from `{ key: block }` and a default-translation tree
    pub fn from_json(blocks: Value, translations: Value) -> Result<Self, EditorError> {
        let blocks: BTreeMap<String, LibraryBlock> = serde_json::from_value(blocks)?;
        Ok(Self {
            blocks,
            translations,
        })
    }
}

impl LibraryRegistry for StaticLibrary {
    fn block(&self, key: &str) -> Option<&LibraryBlock> {
        self.blocks.get(key)
    }

    fn default_translations(&self) -> &Value {
        &self.translations
    }

    fn keys(&self) -> Vec<String> {
        self.blocks.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let library = StaticLibrary::from_json(
            json!({
                "hero": {
                    "id": "hero",
                    "name": "Hero banner",
                    "settings": { "title": "t:library.sections.hero.title" },
                    "widgets": [{
                        "id": "featured-products",
                        "type": "product-list",
                        "dataSourceTemplate": { "type": "products", "params": { "limit": 4 }, "required": true }
                    }],
                    "settingsSchema": { "title": "text" }
                }
            }),
            json!({ "library": { "sections": { "hero": { "title": "Welcome" } } } }),
        )
        .unwrap();

        let block = library.block("hero").unwrap();
        assert_eq!(block.section_kind(), "hero");
        let template = block.widgets[0].data_source_template.as_ref().unwrap();
        assert_eq!(template.materialize().params["limit"], json!(4));
        assert!(library.block("missing").is_none());
        assert_eq!(library.keys(), vec!["hero".to_string()]);
    }

    #[test]
    fn test_from_json_rejects_malformed_blocks() {
        let result = StaticLibrary::from_json(json!({ "hero": { "name": "no id" } }), json!({}));
        assert!(matches!(result, Err(EditorError::Json(_))));
    }
}
