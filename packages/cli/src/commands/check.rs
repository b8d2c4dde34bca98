use super::open_workspace;
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use pagewright_editor::to_reference;
use pagewright_workspace::{LoadedConfig, Workspace};

#[derive(Args, Debug)]
pub struct CheckArgs {}

#[derive(Debug, Clone, PartialEq)]
enum Problem {
    /// A `t:` reference with no string behind it
    DanglingReference(String),

    /// A widget bound to a data source the page does not have
    DanglingBinding {
        section_id: String,
        widget_id: String,
        key: String,
    },
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Problem::DanglingReference(reference) => {
                write!(f, "{} resolves to nothing", reference)
            }
            Problem::DanglingBinding {
                section_id,
                widget_id,
                key,
            } => write!(
                f,
                "widget {} in section {} is bound to missing data source {}",
                widget_id, section_id, key
            ),
        }
    }
}

pub async fn check(_args: CheckArgs, loaded: &LoadedConfig) -> Result<()> {
    println!("🔍 {} {}", "Checking".green().bold(), loaded.config.template_id);

    let workspace = open_workspace(loaded).await?;
    let problems = problems(&workspace);

    for problem in &problems {
        println!("   {} {}", "✗".red(), problem);
    }

    if !problems.is_empty() {
        bail!("{} problem(s) found", problems.len());
    }

    println!("✨ {} No problems found", "Done".green().bold());
    Ok(())
}

fn problems(workspace: &Workspace) -> Vec<Problem> {
    workspace.with_session(|session| {
        let references = session
            .dangling_references()
            .into_iter()
            .map(|path| Problem::DanglingReference(to_reference(&path)));

        let bindings = session.page.page().dangling_bindings().into_iter().map(
            |(section_id, widget_id, key)| Problem::DanglingBinding {
                section_id,
                widget_id,
                key,
            },
        );

        references.chain(bindings).collect()
    })
}
