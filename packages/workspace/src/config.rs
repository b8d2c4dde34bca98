use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::backend::TemplateRequest;
use pagewright_editor::TranslationScope;

pub const CONFIG_FILE_NAME: &str = "pagewright.json";

/// Pagewright workspace configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub theme_id: String,

    #[serde(default)]
    pub template_id: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub merchant_name: String,

    #[serde(default = "default_route_context")]
    pub route_context: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,

    /// Relative paths are resolved against the directory holding the config
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default = "default_suffix_length")]
    pub suffix_length: usize,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_route_context() -> String {
    "/".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_history_limit() -> usize {
    100
}

fn default_suffix_length() -> usize {
    6
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            theme_id: String::new(),
            template_id: String::new(),
            language: default_language(),
            merchant_name: String::new(),
            route_context: default_route_context(),
            variant: None,
            data_dir: default_data_dir(),
            history_limit: default_history_limit(),
            suffix_length: default_suffix_length(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No {CONFIG_FILE_NAME} found in {} or any parent directory", start.display())]
    NotFound { start: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Config file and the directory it was found in
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: WorkspaceConfig,
}

impl LoadedConfig {
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base_dir().join(&self.config.data_dir)
    }
}

impl WorkspaceConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find and load the nearest config at or above `start`
    pub fn discover(start: &Path) -> Result<LoadedConfig, ConfigError> {
        let path = find_config(start).ok_or_else(|| ConfigError::NotFound {
            start: start.to_path_buf(),
        })?;
        let config = Self::load(&path)?;
        Ok(LoadedConfig { path, config })
    }

    pub fn translation_scope(&self) -> TranslationScope {
        TranslationScope::new(&self.theme_id, &self.template_id, &self.language)
    }

    pub fn template_request(&self) -> TemplateRequest {
        TemplateRequest {
            merchant_name: self.merchant_name.clone(),
            route_context: self.route_context.clone(),
            variant: self.variant.clone(),
        }
    }
}

/// Walk upward from `start` looking for `pagewright.json`
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}
