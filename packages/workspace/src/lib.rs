pub mod backend;
pub mod config;
pub mod fs;
pub mod memory;
pub mod state;

pub use backend::{
    BackendError, RenderDataFetcher, RenderRequest, TemplateBackend, TemplateDocument,
    TemplateMetadata, TemplateRequest, TranslationBackend, TranslationPayload,
};
pub use config::{find_config, ConfigError, LoadedConfig, WorkspaceConfig, CONFIG_FILE_NAME};
pub use fs::{FsBackend, LIBRARY_FILE_NAME};
pub use memory::{MemoryBackend, Operation};
pub use state::{Backends, Workspace, WorkspaceError};
