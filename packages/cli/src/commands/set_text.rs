use super::{open_workspace, parse_path, provenance_label};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use pagewright_workspace::LoadedConfig;
use serde_json::Value;

#[derive(Args, Debug)]
pub struct SetTextArgs {
    /// Translation path, with or without the `t:` prefix
    pub path: String,

    pub value: String,
}

/// Rewrite the string behind a path and save both translation trees
///
/// A path holding a reference is followed; the write lands on the end of
/// the chain in whichever tree owns it.
pub async fn set_text(args: SetTextArgs, loaded: &LoadedConfig) -> Result<()> {
    let workspace = open_workspace(loaded).await?;
    let path = parse_path(&args.path);

    let (written, provenance) = workspace
        .with_session(|s| s.translations.update_resolved(&path, Value::String(args.value)))
        .with_context(|| format!("Failed to update {}", path))?;
    workspace
        .save_translations()
        .await
        .context("Failed to save translations")?;

    println!(
        "  {} {} {}",
        "✓".green(),
        written,
        format!("({})", provenance_label(provenance)).dimmed()
    );
    Ok(())
}
