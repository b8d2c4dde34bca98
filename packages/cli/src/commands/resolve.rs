use super::{open_workspace, parse_path, provenance_label};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use pagewright_workspace::LoadedConfig;
use serde_json::Value;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Translation path, with or without the `t:` prefix
    pub path: String,
}

pub async fn resolve(args: ResolveArgs, loaded: &LoadedConfig) -> Result<()> {
    let workspace = open_workspace(loaded).await?;
    let path = parse_path(&args.path);

    let (value, provenance) = workspace.with_session(|s| {
        let value = s.translations.resolve(&path).cloned();
        (value, s.translations.provenance_of(&path))
    });
    let value = value.ok_or_else(|| anyhow!("Nothing at {}", path))?;

    let rendered = match &value {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other)?,
    };
    match provenance {
        Some(provenance) => println!(
            "{} {}",
            rendered,
            format!("({})", provenance_label(provenance)).dimmed()
        ),
        None => println!("{}", rendered),
    }

    Ok(())
}
