//! Edge CLI - Command line tool for the edge incremental cache.
//!
//! Commands:
//! - `edge populate-cache` - Seed a bucket layout from the build output
//! - `edge compile-tags` - Compile build-time tag metadata into a tag manifest
//! - `edge tags` - Inspect tag associations in a populated bucket

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use edge_observability::{init_logging, LogFormat, LogLevel, LoggingConfig};

use commands::{CompileTagsArgs, PopulateCacheArgs, TagsArgs};

/// Edge CLI - Seed and inspect the edge incremental cache
#[derive(Parser)]
#[command(name = "edge")]
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
    /// Write prerendered cache assets into a local bucket layout
    PopulateCache(PopulateCacheArgs),

    /// Compile build-time tag metadata into a tag manifest
    CompileTags(CompileTagsArgs),

    /// Show tag associations stored in a bucket
    Tags(TagsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    init_logging(&logging_config(&ctx.config.logging, cli.verbose, cli.json))?;

    let result = match cli.command {
        Commands::PopulateCache(args) => commands::populate::run(args, &ctx).await,
        Commands::CompileTags(args) => commands::compile_tags::run(args, &ctx).await,
        Commands::Tags(args) => commands::tags::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Logging for an interactive run: human-readable unless `--json` is set.
fn logging_config(configured: &LoggingConfig, verbose: bool, json: bool) -> LoggingConfig {
    let level = if verbose {
        LogLevel::Debug
    } else {
        configured.level
    };
    let format = if json { LogFormat::Json } else { LogFormat::Human };
    LoggingConfig::new(level, format)
}
