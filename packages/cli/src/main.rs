mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    add_section, check, init, resolve, sections, set_text, AddSectionArgs, CheckArgs, InitArgs,
    ResolveArgs, SectionsArgs, SetTextArgs,
};
use config::ConfigArgs;
use tracing_subscriber::EnvFilter;

/// Pagewright CLI - edit storefront page templates and their strings
#[derive(Parser, Debug)]
#[command(name = "pagewright")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a pagewright.json in the current directory
    Init(InitArgs),

    /// Report dangling translation references and data-source bindings
    Check(CheckArgs),

    /// Print the string behind a translation path
    Resolve(ResolveArgs),

    /// Insert a library section and save the template
    AddSection(AddSectionArgs),

    /// Rewrite a translation string and save
    SetText(SetTextArgs),

    /// List the sections of the configured template
    Sections(SectionsArgs),
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Cannot get current directory")?;

    let load = || config::resolve(&cli.config, &cwd);

    match cli.command {
        Command::Init(args) => init(args, &cli.config, &cwd),
        Command::Check(args) => check(args, &load()?).await,
        Command::Resolve(args) => resolve(args, &load()?).await,
        Command::AddSection(args) => add_section(args, &load()?).await,
        Command::SetText(args) => set_text(args, &load()?).await,
        Command::Sections(args) => sections(args, &load()?).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
