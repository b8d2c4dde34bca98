use anyhow::{Context, Result};
use clap::Args;
use pagewright_workspace::{ConfigError, LoadedConfig, WorkspaceConfig, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

/// Flags shared by every command; each one overrides `pagewright.json`
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Config file to use instead of searching upward from the working directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding templates, translations and the library
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    pub theme: Option<String>,

    #[arg(long, global = true)]
    pub template: Option<String>,

    #[arg(long, global = true)]
    pub language: Option<String>,

    #[arg(long, global = true)]
    pub merchant: Option<String>,

    #[arg(long, global = true)]
    pub route: Option<String>,

    #[arg(long, global = true)]
    pub variant: Option<String>,
}

/// Load the config the command should run with
///
/// Without a config file anywhere above `cwd`, defaults rooted at `cwd`
/// are used so every field can still come from flags.
pub fn resolve(args: &ConfigArgs, cwd: &Path) -> Result<LoadedConfig> {
    let mut loaded = match &args.config {
        Some(path) => LoadedConfig {
            path: path.clone(),
            config: WorkspaceConfig::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
        },
        None => match WorkspaceConfig::discover(cwd) {
            Ok(loaded) => loaded,
            Err(ConfigError::NotFound { .. }) => LoadedConfig {
                path: cwd.join(CONFIG_FILE_NAME),
                config: WorkspaceConfig::default(),
            },
            Err(err) => return Err(err.into()),
        },
    };

    apply_overrides(&mut loaded.config, args);
    Ok(loaded)
}

fn apply_overrides(config: &mut WorkspaceConfig, args: &ConfigArgs) {
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(theme) = &args.theme {
        config.theme_id = theme.clone();
    }
    if let Some(template) = &args.template {
        config.template_id = template.clone();
    }
    if let Some(language) = &args.language {
        config.language = language.clone();
    }
    if let Some(merchant) = &args.merchant {
        config.merchant_name = merchant.clone();
    }
    if let Some(route) = &args.route {
        config.route_context = route.clone();
    }
    if args.variant.is_some() {
        config.variant = args.variant.clone();
    }
}
