//! Aether CLI - Command line tool for Aether projects.
//!
//! Commands:
//! - `aether render` - Render a URL offline and print the response
//! - `aether providers` - List the ESI providers of a URL
//! - `aether routes` - List rules or show which rule a URL matches
//! - `aether validate` - Validate the project configuration

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use aether_observability::{init_logging, LogFormat, LogLevel};
use commands::{ProvidersArgs, RenderArgs, RoutesArgs, ValidateArgs};

/// Aether CLI - Inspect and render Aether projects
#[derive(Parser)]
#[command(name = "aether")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a URL and print the response
    Render(RenderArgs),

    /// List the ESI providers of a URL
    Providers(ProvidersArgs),

    /// List rules, or show the rule a URL matches
    Routes(RoutesArgs),

    /// Validate the project configuration
    Validate(ValidateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Warn };
    let format = if cli.json { LogFormat::Json } else { LogFormat::Human };
    // Only fails when a subscriber is already installed.
    let _ = init_logging(format, level);

    let output = output::Output::new(cli.verbose, cli.json);
    let ctx = context::Context::load(cli.config.as_deref(), output)?;

    let result = match cli.command {
        Commands::Render(args) => commands::render::run(args, &ctx).await,
        Commands::Providers(args) => commands::providers::run(args, &ctx).await,
        Commands::Routes(args) => commands::routes::run(args, &ctx).await,
        Commands::Validate(args) => commands::validate::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
