pub mod add_section;
pub mod check;
#[cfg(test)]
mod fixtures;
pub mod init;
pub mod resolve;
pub mod sections;
pub mod set_text;

pub use add_section::{add_section, AddSectionArgs};
pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use resolve::{resolve, ResolveArgs};
pub use sections::{sections, SectionsArgs};
pub use set_text::{set_text, SetTextArgs};

use anyhow::{ensure, Context, Result};
use pagewright_editor::{path_of, Provenance, TranslationPath};
use pagewright_workspace::{Backends, FsBackend, LoadedConfig, Workspace};
use std::sync::Arc;

/// Open the configured template from the data directory
pub async fn open_workspace(loaded: &LoadedConfig) -> Result<Workspace> {
    let config = &loaded.config;
    ensure!(
        !config.theme_id.is_empty(),
        "No theme configured; set themeId in {} or pass --theme",
        loaded.path.display()
    );
    ensure!(
        !config.template_id.is_empty(),
        "No template configured; set templateId in {} or pass --template",
        loaded.path.display()
    );

    let data_dir = loaded.data_dir();
    let backend = Arc::new(FsBackend::real(&data_dir));
    let library = backend
        .load_library()
        .with_context(|| format!("Failed to load library from {}", data_dir.display()))?;

    Workspace::open(config, Backends::uniform(backend), Arc::new(library))
        .await
        .with_context(|| format!("Failed to open template in {}", data_dir.display()))
}

/// Accepts both `t:common.title` and `common.title`
pub fn parse_path(input: &str) -> TranslationPath {
    path_of(input).unwrap_or_else(|| TranslationPath::parse(input))
}

pub fn provenance_label(provenance: Provenance) -> &'static str {
    match provenance {
        Provenance::Common => "common",
        Provenance::Template => "template",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_with_and_without_prefix() {
        assert_eq!(parse_path("t:common.title").dotted(), "common.title");
        assert_eq!(parse_path("common.title").dotted(), "common.title");
    }
}
