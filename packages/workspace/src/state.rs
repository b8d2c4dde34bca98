//! Async flows around one shared [`EditSession`].
//!
//! The session sits behind a std `Mutex` and is only locked between awaits.
//! Each flow takes a ticket before calling out and hands the result back
//! with it, so a response that lost a race is dropped by the store instead
//! of overwriting newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use pagewright_editor::{
    EditSession, LibraryRegistry, PageConfig, PageConfigStore, SectionInstantiator,
    TranslationError, TranslationScope,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{
    BackendError, RenderDataFetcher, RenderRequest, TemplateBackend, TemplateDocument,
    TemplateMetadata, TemplateRequest, TranslationBackend, TranslationPayload,
};
use crate::config::WorkspaceConfig;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error("Render data fetch failed: {0}")]
    Render(String),
}

/// The collaborators a workspace talks to
#[derive(Clone)]
pub struct Backends {
    pub templates: Arc<dyn TemplateBackend>,
    pub translations: Arc<dyn TranslationBackend>,
    pub render: Arc<dyn RenderDataFetcher>,
}

impl Backends {
    /// One backend serving all three roles
    pub fn uniform<B>(backend: Arc<B>) -> Self
    where
        B: TemplateBackend + TranslationBackend + RenderDataFetcher + 'static,
    {
        Self {
            templates: backend.clone(),
            translations: backend.clone(),
            render: backend,
        }
    }
}

pub struct Workspace {
    session: Arc<Mutex<EditSession>>,
    backends: Backends,
    request: Mutex<TemplateRequest>,
    /// Metadata and layout of the loaded template; sections live in the session
    document: Mutex<TemplateDocument>,
    template_generation: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Workspace {
    pub fn new(
        session: EditSession,
        backends: Backends,
        request: TemplateRequest,
        document: TemplateDocument,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            backends,
            request: Mutex::new(request),
            document: Mutex::new(document),
            template_generation: AtomicU64::new(0),
        }
    }

    /// Load the configured template and its translations
    ///
    /// A template the store has never seen opens as an empty page.
    pub async fn open(
        config: &WorkspaceConfig,
        backends: Backends,
        library: Arc<dyn LibraryRegistry>,
    ) -> Result<Self, WorkspaceError> {
        let request = config.template_request();
        let document = match backends.templates.load_template(&request).await {
            Ok(document) => document,
            Err(BackendError::NotFound(what)) => {
                info!(template = %what, "Template not found, starting empty");
                TemplateDocument::default()
            }
            Err(err) => return Err(err.into()),
        };

        let store = PageConfigStore::new(document.page_config())
            .with_history_limit(config.history_limit)
            .with_instantiator(SectionInstantiator::random(config.suffix_length));
        let session = EditSession::new(
            format!("{}{}", request.merchant_name, request.route_context),
            PageConfig::new(),
            config.translation_scope(),
            library,
        )
        .with_page_store(store);

        let workspace = Self::new(session, backends, request, document);
        workspace.load_translations(config.translation_scope()).await?;
        Ok(workspace)
    }

    /// Run `f` with the session locked; never call this across an await
    pub fn with_session<R>(&self, f: impl FnOnce(&mut EditSession) -> R) -> R {
        f(&mut lock(&self.session))
    }

    pub fn session(&self) -> Arc<Mutex<EditSession>> {
        Arc::clone(&self.session)
    }

    pub fn request(&self) -> TemplateRequest {
        lock(&self.request).clone()
    }

    pub fn metadata(&self) -> TemplateMetadata {
        lock(&self.document).metadata.clone()
    }

    pub fn scope(&self) -> TranslationScope {
        self.with_session(|s| s.translations.scope().clone())
    }

    /// Load the common and template trees for `scope` concurrently
    ///
    /// Returns `Ok(false)` when a newer load superseded this one.
    pub async fn load_translations(&self, scope: TranslationScope) -> Result<bool, WorkspaceError> {
        let ticket = self.with_session(|s| s.translations.begin_load(scope.clone()));

        let common_scope = scope.common();
        let (common, template) = tokio::join!(
            self.backends.translations.load_translations(&common_scope),
            self.backends.translations.load_translations(&scope),
        );
        let result = common
            .and_then(|common| template.map(|template| (common, template)))
            .map_err(|err| TranslationError::LoadFailed(err.to_string()));
        let failure = result.as_ref().err().cloned();

        let applied = self.with_session(|s| s.translations.finish_load(ticket, result));
        match failure {
            Some(err) if applied => Err(err.into()),
            _ => Ok(applied),
        }
    }

    /// Persist both trees. Returns `Ok(false)` when there was nothing to save.
    ///
    /// Edits made while the save is in flight keep the store dirty.
    pub async fn save_translations(&self) -> Result<bool, WorkspaceError> {
        let Some(snapshot) = self.with_session(|s| s.translations.save_snapshot()) else {
            return Ok(false);
        };

        let common_scope = snapshot.scope.common();
        let common = TranslationPayload {
            translations: snapshot.common.clone(),
        };
        let template = TranslationPayload {
            translations: snapshot.template.clone(),
        };
        let (common_saved, template_saved) = tokio::join!(
            self.backends.translations.save_translations(&common_scope, &common),
            self.backends.translations.save_translations(&snapshot.scope, &template),
        );

        let result = common_saved
            .and(template_saved)
            .map_err(|err| TranslationError::SaveFailed(err.to_string()));
        self.with_session(|s| s.translations.finish_save(&snapshot, result.clone()));
        result?;
        Ok(true)
    }

    /// Fetch render data for the config the ticket captured
    ///
    /// Returns `Ok(false)` when the response arrived for a superseded ticket.
    pub async fn refetch_render_data(&self) -> Result<bool, WorkspaceError> {
        let ticket = self.with_session(|s| s.page.begin_refetch());
        let request = {
            let template = lock(&self.request);
            RenderRequest {
                page_config: PageConfig::clone(ticket.config()),
                route_context: template.route_context.clone(),
                merchant_name: template.merchant_name.clone(),
            }
        };

        match self.backends.render.fetch_render_data(&request).await {
            Ok(data) => Ok(self.with_session(|s| s.page.complete_refetch(&ticket, data))),
            Err(err) => {
                let message = err.to_string();
                if self.with_session(|s| s.page.fail_refetch(&ticket, message.clone())) {
                    Err(WorkspaceError::Render(message))
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Save the current page under the loaded template's version
    pub async fn save_template(&self) -> Result<TemplateMetadata, WorkspaceError> {
        let page = self.with_session(|s| s.page.page());
        let document = lock(&self.document).with_page(&page);
        let request = self.request();

        let metadata = self
            .backends
            .templates
            .save_template(&request, &document)
            .await
            .inspect_err(|err| warn!(error = %err, "Template save failed"))?;

        lock(&self.document).metadata = metadata.clone();
        info!(
            merchant = %request.merchant_name,
            route = %request.route_context,
            version = metadata.version,
            "Template saved"
        );
        Ok(metadata)
    }

    /// Load another template into the session along with its translations
    ///
    /// Returns `Ok(false)` when a later switch superseded this one.
    pub async fn switch_template(
        &self,
        request: TemplateRequest,
        template_id: impl Into<String>,
    ) -> Result<bool, WorkspaceError> {
        let generation = self.template_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let document = self.backends.templates.load_template(&request).await?;
        if self.template_generation.load(Ordering::SeqCst) != generation {
            return Ok(false);
        }

        let scope = self.with_session(|s| {
            s.replace_page(document.page_config());
            TranslationScope {
                template_id: template_id.into(),
                ..s.translations.scope().clone()
            }
        });
        *lock(&self.request) = request;
        *lock(&self.document) = document;

        self.load_translations(scope).await
    }

    /// Reload translations for another locale
    pub async fn set_language(&self, language: impl Into<String>) -> Result<bool, WorkspaceError> {
        let scope = TranslationScope {
            language: language.into(),
            ..self.scope()
        };
        self.load_translations(scope).await
    }
}
