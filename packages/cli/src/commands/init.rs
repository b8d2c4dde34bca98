use crate::config::ConfigArgs;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use pagewright_workspace::{WorkspaceConfig, CONFIG_FILE_NAME, LIBRARY_FILE_NAME};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

/// Theme, template, merchant and data dir come from the global flags
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, flags: &ConfigArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(CONFIG_FILE_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            CONFIG_FILE_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Pagewright workspace...".bright_blue().bold());

    let relative_data_dir = flags.data_dir.clone().unwrap_or_else(|| PathBuf::from("data"));
    let data_dir = cwd.join(&relative_data_dir);
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        println!("  {} Created {}/", "✓".green(), relative_data_dir.display());
    }

    let library_path = data_dir.join(LIBRARY_FILE_NAME);
    if !library_path.exists() {
        let library = json!({ "blocks": {}, "translations": {} });
        fs::write(&library_path, serde_json::to_string_pretty(&library)?)?;
        println!("  {} Created {}", "✓".green(), LIBRARY_FILE_NAME);
    }

    let defaults = WorkspaceConfig::default();
    let config = WorkspaceConfig {
        theme_id: flags.theme.clone().unwrap_or_default(),
        template_id: flags.template.clone().unwrap_or_else(|| "index".to_string()),
        language: flags.language.clone().unwrap_or(defaults.language),
        merchant_name: flags.merchant.clone().unwrap_or_default(),
        route_context: flags.route.clone().unwrap_or(defaults.route_context),
        variant: flags.variant.clone(),
        data_dir: relative_data_dir,
        ..defaults
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("  {} Created {}", "✓".green(), CONFIG_FILE_NAME);

    println!();
    println!("{}", "✨ Ready!".green().bold());
    println!("  List sections with: {}", "pagewright sections".bright_white());

    Ok(())
}
