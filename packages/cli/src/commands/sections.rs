use super::open_workspace;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use pagewright_editor::PageConfig;
use pagewright_workspace::LoadedConfig;

#[derive(Args, Debug)]
pub struct SectionsArgs {
    /// Print the page config as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn sections(args: SectionsArgs, loaded: &LoadedConfig) -> Result<()> {
    let workspace = open_workspace(loaded).await?;
    let page = workspace.with_session(|s| s.page.page());

    if args.json {
        println!("{}", serde_json::to_string_pretty(page.as_ref())?);
        return Ok(());
    }

    let request = workspace.request();
    println!(
        "📄 {} {} {}",
        request.merchant_name.bright_white().bold(),
        request.route_context,
        format!("(v{})", workspace.metadata().version).dimmed()
    );
    for line in outline(&page) {
        println!("{}", line);
    }

    Ok(())
}

/// One line per section, widget and data source
fn outline(page: &PageConfig) -> Vec<String> {
    let mut lines = Vec::new();

    if page.sections.is_empty() {
        lines.push(format!("   {}", "No sections".dimmed()));
    }
    for (index, section) in page.sections.iter().enumerate() {
        lines.push(format!(
            "  {:>2}  {}  {}",
            index,
            section.id.bright_white(),
            section.kind.cyan()
        ));
        for widget in &section.widgets {
            let binding = match &widget.data_source_key {
                Some(key) => format!(" → {}", key),
                None => String::new(),
            };
            lines.push(format!("        • {} {}{}", widget.id, widget.kind.dimmed(), binding));
        }
    }

    if !page.data_sources.is_empty() {
        lines.push(String::new());
        lines.push(format!("  {}", "Data sources".bold()));
        for (key, source) in &page.data_sources {
            lines.push(format!("        {} {}", key, source.kind.cyan()));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn test_outline_lists_widgets_and_bindings() {
        colored::control::set_override(false);
        let page: PageConfig = serde_json::from_value(serde_json::json!({
            "sections": [{
                "id": "hero-1",
                "type": "hero",
                "widgets": [{ "id": "list", "type": "product-list", "dataSourceKey": "p" }]
            }],
            "dataSources": { "p": { "type": "products" } }
        }))
        .unwrap();

        let lines = outline(&page);
        assert_eq!(lines[0], "   0  hero-1  hero");
        assert_eq!(lines[1], "        • list product-list → p");
        assert!(lines.iter().any(|l| l.contains("p products")));
    }

    #[tokio::test]
    async fn test_sections_opens_on_disk_workspace() {
        let (_dir, loaded) = fixtures::workspace();
        sections(SectionsArgs { json: true }, &loaded).await.unwrap();
        sections(SectionsArgs { json: false }, &loaded).await.unwrap();
    }
}
