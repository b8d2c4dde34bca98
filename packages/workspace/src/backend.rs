//! Contracts of the collaborators the editor loads from and saves to.
//!
//! The editing core never persists anything itself. Templates, translation
//! trees and render data are reached through these traits; the in-memory
//! and on-disk implementations live next to them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagewright_common::{CommonError, DataSource, DataSourceKey, PageConfig, Section};
use pagewright_editor::{RenderData, TranslationScope};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Identifies one template of a merchant's storefront
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest {
    pub merchant_name: String,
    pub route_context: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMetadata {
    /// Bumped by the store on every save; a save must carry the current one
    #[serde(default)]
    pub version: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Fields owned by the store, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A stored template: metadata plus the page config fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    #[serde(default)]
    pub metadata: TemplateMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Value>,

    #[serde(default)]
    pub sections: Vec<Section>,

    #[serde(default)]
    pub data_sources: BTreeMap<DataSourceKey, DataSource>,
}

impl TemplateDocument {
    pub fn page_config(&self) -> PageConfig {
        PageConfig {
            sections: self.sections.clone(),
            data_sources: self.data_sources.clone(),
        }
    }

    /// Same metadata and layout around a new page config
    pub fn with_page(&self, page: &PageConfig) -> Self {
        Self {
            metadata: self.metadata.clone(),
            layout: self.layout.clone(),
            sections: page.sections.clone(),
            data_sources: page.data_sources.clone(),
        }
    }
}

/// Body of a translation save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationPayload {
    pub translations: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub page_config: PageConfig,
    pub route_context: String,
    pub merchant_name: String,
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version conflict: expected {expected}, store has {found}")]
    VersionConflict { expected: u64, found: u64 },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] CommonError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait TemplateBackend: Send + Sync {
    async fn load_template(&self, request: &TemplateRequest) -> Result<TemplateDocument, BackendError>;

    /// Returns the metadata the store now holds
    async fn save_template(
        &self,
        request: &TemplateRequest,
        document: &TemplateDocument,
    ) -> Result<TemplateMetadata, BackendError>;
}

#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// A scope with nothing stored yet loads as an empty object
    async fn load_translations(&self, scope: &TranslationScope) -> Result<Value, BackendError>;

    async fn save_translations(
        &self,
        scope: &TranslationScope,
        payload: &TranslationPayload,
    ) -> Result<(), BackendError>;
}

#[async_trait]
pub trait RenderDataFetcher: Send + Sync {
    async fn fetch_render_data(&self, request: &RenderRequest) -> Result<RenderData, BackendError>;
}
