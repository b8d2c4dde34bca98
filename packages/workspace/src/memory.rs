//! In-memory backend for tests and embedding.
//!
//! Failures and delays can be injected per operation to drive the async
//! flows through their error and race paths.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pagewright_editor::{RenderData, TranslationScope};
use serde_json::{json, Map, Value};

use crate::backend::{
    BackendError, RenderDataFetcher, RenderRequest, TemplateBackend, TemplateDocument,
    TemplateMetadata, TemplateRequest, TranslationBackend, TranslationPayload,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadTemplate,
    SaveTemplate,
    LoadTranslations,
    SaveTranslations,
    FetchRenderData,
}

#[derive(Debug, Default)]
struct MemoryState {
    templates: HashMap<TemplateRequest, TemplateDocument>,
    translations: HashMap<TranslationScope, Value>,
    failing: HashSet<Operation>,
    delays: HashMap<Operation, VecDeque<Duration>>,
    calls: HashMap<Operation, usize>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_template(self, request: TemplateRequest, document: TemplateDocument) -> Self {
        self.state().templates.insert(request, document);
        self
    }

    pub fn with_translations(self, scope: TranslationScope, tree: Value) -> Self {
        self.state().translations.insert(scope, tree);
        self
    }

    /// Make every call of `operation` fail until [`MemoryBackend::heal`]
    pub fn fail(&self, operation: Operation) {
        self.state().failing.insert(operation);
    }

    pub fn heal(&self, operation: Operation) {
        self.state().failing.remove(&operation);
    }

    /// Delay the next call of `operation`; queued delays apply in order
    pub fn delay_next(&self, operation: Operation, delay: Duration) {
        self.state()
            .delays
            .entry(operation)
            .or_default()
            .push_back(delay);
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn template(&self, request: &TemplateRequest) -> Option<TemplateDocument> {
        self.state().templates.get(request).cloned()
    }

    pub fn translations(&self, scope: &TranslationScope) -> Option<Value> {
        self.state().translations.get(scope).cloned()
    }

    /// Count the call and apply any injected delay or failure
    async fn enter(&self, operation: Operation) -> Result<(), BackendError> {
        let (delay, failing) = {
            let mut state = self.state();
            *state.calls.entry(operation).or_default() += 1;
            let delay = state
                .delays
                .get_mut(&operation)
                .and_then(VecDeque::pop_front);
            (delay, state.failing.contains(&operation))
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(BackendError::Unavailable(format!("{:?} failed", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl TemplateBackend for MemoryBackend {
    async fn load_template(&self, request: &TemplateRequest) -> Result<TemplateDocument, BackendError> {
        self.enter(Operation::LoadTemplate).await?;
        self.template(request)
            .ok_or_else(|| BackendError::NotFound(request.route_context.clone()))
    }

    async fn save_template(
        &self,
        request: &TemplateRequest,
        document: &TemplateDocument,
    ) -> Result<TemplateMetadata, BackendError> {
        self.enter(Operation::SaveTemplate).await?;

        let mut state = self.state();
        let found = state
            .templates
            .get(request)
            .map(|stored| stored.metadata.version)
            .unwrap_or(0);
        if found != document.metadata.version {
            return Err(BackendError::VersionConflict {
                expected: document.metadata.version,
                found,
            });
        }

        let mut stored = document.clone();
        stored.metadata.version = found + 1;
        stored.metadata.updated_at = Some(Utc::now());
        let metadata = stored.metadata.clone();
        state.templates.insert(request.clone(), stored);
        Ok(metadata)
    }
}

#[async_trait]
impl TranslationBackend for MemoryBackend {
    async fn load_translations(&self, scope: &TranslationScope) -> Result<Value, BackendError> {
        self.enter(Operation::LoadTranslations).await?;
        Ok(self
            .translations(scope)
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    async fn save_translations(
        &self,
        scope: &TranslationScope,
        payload: &TranslationPayload,
    ) -> Result<(), BackendError> {
        self.enter(Operation::SaveTranslations).await?;
        self.state()
            .translations
            .insert(scope.clone(), payload.translations.clone());
        Ok(())
    }
}

/// Echoes each data source back as its render data
#[async_trait]
impl RenderDataFetcher for MemoryBackend {
    async fn fetch_render_data(&self, request: &RenderRequest) -> Result<RenderData, BackendError> {
        self.enter(Operation::FetchRenderData).await?;
        Ok(request
            .page_config
            .data_sources
            .iter()
            .map(|(key, source)| {
                (
                    key.clone(),
                    json!({ "type": source.kind, "params": source.params }),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_common::{DataSource, PageConfig};

    fn request() -> TemplateRequest {
        TemplateRequest {
            merchant_name: "acme".into(),
            route_context: "/".into(),
            variant: None,
        }
    }

    #[tokio::test]
    async fn test_template_round_trip_bumps_version() {
        let backend = MemoryBackend::new().with_template(request(), TemplateDocument::default());

        let mut document = backend.load_template(&request()).await.unwrap();
        let metadata = backend.save_template(&request(), &document).await.unwrap();
        assert_eq!(metadata.version, 1);
        assert!(metadata.updated_at.is_some());

        // Saving the stale version again conflicts
        let result = backend.save_template(&request(), &document).await;
        assert!(matches!(
            result,
            Err(BackendError::VersionConflict { expected: 0, found: 1 })
        ));

        document.metadata = metadata;
        assert!(backend.save_template(&request(), &document).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_translations_load_empty() {
        let backend = MemoryBackend::new();
        let tree = backend
            .load_translations(&TranslationScope::new("t", "home", "en"))
            .await
            .unwrap();
        assert_eq!(tree, json!({}));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let backend = MemoryBackend::new();
        backend.fail(Operation::LoadTemplate);
        assert!(matches!(
            backend.load_template(&request()).await,
            Err(BackendError::Unavailable(_))
        ));
        backend.heal(Operation::LoadTemplate);
        assert!(matches!(
            backend.load_template(&request()).await,
            Err(BackendError::NotFound(_))
        ));
        assert_eq!(backend.calls(Operation::LoadTemplate), 2);
    }

    #[tokio::test]
    async fn test_render_echo() {
        let backend = MemoryBackend::new();
        let mut page = PageConfig::new();
        page.data_sources
            .insert("products_1".into(), DataSource::new("products"));

        let data = backend
            .fetch_render_data(&RenderRequest {
                page_config: page,
                route_context: "/".into(),
                merchant_name: "acme".into(),
            })
            .await
            .unwrap();

        assert_eq!(data["products_1"]["type"], json!("products"));
    }
}
