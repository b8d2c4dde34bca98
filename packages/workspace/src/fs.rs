//! JSON-on-disk backend.
//!
//! ```text
//! <root>/
//!   library.json                                  { blocks, translations }
//!   <merchant>/templates/<route>[.<variant>].json TemplateDocument
//!   translations/<theme>/<template>/<lang>.json   translation tree
//!   render/<data source type>.json                canned render data
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pagewright_common::{FileSystem, RealFileSystem};
use pagewright_editor::{LibraryBlock, RenderData, StaticLibrary, TranslationScope};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::backend::{
    BackendError, RenderDataFetcher, RenderRequest, TemplateBackend, TemplateDocument,
    TemplateMetadata, TemplateRequest, TranslationBackend, TranslationPayload,
};

pub const LIBRARY_FILE_NAME: &str = "library.json";

#[derive(Debug, Default, Deserialize)]
struct LibraryFile {
    #[serde(default)]
    blocks: BTreeMap<String, LibraryBlock>,

    #[serde(default)]
    translations: Value,
}

pub struct FsBackend {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl FsBackend {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    /// Backend over the real file system
    pub fn real(root: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(RealFileSystem), root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn template_path(&self, request: &TemplateRequest) -> PathBuf {
        let mut name = route_slug(&request.route_context);
        if let Some(variant) = &request.variant {
            name.push('.');
            name.push_str(&path_segment(variant));
        }
        self.root
            .join(path_segment(&request.merchant_name))
            .join("templates")
            .join(format!("{}.json", name))
    }

    pub fn translations_path(&self, scope: &TranslationScope) -> PathBuf {
        self.root
            .join("translations")
            .join(path_segment(&scope.theme_id))
            .join(path_segment(&scope.template_id))
            .join(format!("{}.json", path_segment(&scope.language)))
    }

    pub fn library_path(&self) -> PathBuf {
        self.root.join(LIBRARY_FILE_NAME)
    }

    /// Library registry from `library.json`; empty when the file is absent
    pub fn load_library(&self) -> Result<StaticLibrary, BackendError> {
        let file: LibraryFile = self.read_json(&self.library_path())?.unwrap_or_default();
        let translations = match file.translations {
            Value::Null => Value::Object(Map::new()),
            tree => tree,
        };

        Ok(file
            .blocks
            .into_iter()
            .fold(StaticLibrary::new().with_translations(translations), |library, (key, block)| {
                library.with_block(key, block)
            }))
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, BackendError> {
        if !self.fs.exists(path) {
            return Ok(None);
        }
        let contents = self.fs.read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), BackendError> {
        let contents = serde_json::to_string_pretty(value)?;
        self.fs.write(path, &contents)?;
        debug!(path = %path.display(), "wrote");
        Ok(())
    }
}

/// `/` is `index`, `/collections/all` is `collections_all`
fn route_slug(route: &str) -> String {
    let trimmed = route.trim_matches('/');
    if trimmed.is_empty() {
        return "index".to_string();
    }
    path_segment(&trimmed.replace('/', "_"))
}

fn path_segment(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl TemplateBackend for FsBackend {
    async fn load_template(&self, request: &TemplateRequest) -> Result<TemplateDocument, BackendError> {
        let path = self.template_path(request);
        self.read_json(&path)?
            .ok_or_else(|| BackendError::NotFound(path.display().to_string()))
    }

    async fn save_template(
        &self,
        request: &TemplateRequest,
        document: &TemplateDocument,
    ) -> Result<TemplateMetadata, BackendError> {
        let path = self.template_path(request);
        let found = self
            .read_json::<TemplateDocument>(&path)?
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
        self.write_json(&path, &stored)?;

        info!(path = %path.display(), version = stored.metadata.version, "Template saved");
        Ok(stored.metadata)
    }
}

#[async_trait]
impl TranslationBackend for FsBackend {
    async fn load_translations(&self, scope: &TranslationScope) -> Result<Value, BackendError> {
        Ok(self
            .read_json(&self.translations_path(scope))?
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    async fn save_translations(
        &self,
        scope: &TranslationScope,
        payload: &TranslationPayload,
    ) -> Result<(), BackendError> {
        self.write_json(&self.translations_path(scope), &payload.translations)
    }
}

/// Canned data per data source type; unknown types render as `null`
#[async_trait]
impl RenderDataFetcher for FsBackend {
    async fn fetch_render_data(&self, request: &RenderRequest) -> Result<RenderData, BackendError> {
        let mut data = RenderData::new();
        for (key, source) in &request.page_config.data_sources {
            let path = self
                .root
                .join("render")
                .join(format!("{}.json", path_segment(&source.kind)));
            let value = self.read_json(&path)?.unwrap_or(Value::Null);
            data.insert(key.clone(), value);
        }
        Ok(data)
    }
}
