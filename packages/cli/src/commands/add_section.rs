use super::open_workspace;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use pagewright_editor::LibraryRegistry;
use pagewright_workspace::LoadedConfig;

#[derive(Args, Debug)]
pub struct AddSectionArgs {
    /// Library key of the block to insert
    pub key: String,

    /// Insert after the section at this index; appends when omitted
    #[arg(long)]
    pub after: Option<usize>,
}

pub async fn add_section(args: AddSectionArgs, loaded: &LoadedConfig) -> Result<()> {
    let workspace = open_workspace(loaded).await?;

    let insert = workspace.with_session(|s| {
        s.add_section_from_library(&args.key, args.after)
            .ok_or_else(|| insert_failed(s.library().as_ref(), &args.key))
    })?;

    let metadata = workspace
        .save_template()
        .await
        .context("Failed to save template")?;
    workspace
        .save_translations()
        .await
        .context("Failed to save translations")?;

    println!(
        "  {} Added {} {}",
        "✓".green(),
        insert.section_id.bright_white(),
        format!("(v{})", metadata.version).dimmed()
    );
    for remap in &insert.remaps {
        println!("      {} → {}", remap.from, remap.to);
    }

    Ok(())
}

/// Error for a library insert that added nothing
fn insert_failed(library: &dyn LibraryRegistry, key: &str) -> anyhow::Error {
    if library.block(key).is_none() {
        anyhow!("Unknown library section: {}", key)
    } else {
        anyhow!("Could not insert library section {}; see log output", key)
    }
}
