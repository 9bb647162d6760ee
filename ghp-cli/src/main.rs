//! ghp CLI - Command line interface for ghp
//!
//! Publishes a directory of generated content to a dedicated git branch.

mod commands;

use clap::{Parser, Subcommand};
use ghp_core::{Config, PublishOverrides};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::PublishArgs;

/// ghp: publish a content directory to an orphan git branch
#[derive(Parser, Debug)]
#[command(name = "ghp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Publish a content directory to the configured branch
    #[command(visible_alias = "p")]
    Publish(PublishArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let overrides = match &cli.command {
        Some(Commands::Publish(args)) => args.overrides(),
        _ => PublishOverrides::default(),
    };

    // Load configuration with overrides
    let config = Config::load_with_overrides(overrides)?;

    if cli.verbose {
        tracing::info!(
            uri = ?config.publish.uri,
            branch = %config.publish.branch,
            working_dir = %config.publish.working_dir.display(),
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("ghp {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Publish(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Config) => {
            let publish = &config.publish;
            println!("ghp Configuration");
            println!("=================");
            println!();
            println!("Publish Settings:");
            println!("  uri: {}", publish.uri.as_deref().unwrap_or("(not set)"));
            println!("  branch: {}", publish.branch);
            println!("  content_dir: {}", publish.content_dir.display());
            println!("  working_dir: {}", publish.working_dir.display());
            println!("  content target: {}", publish.content_target().display());
            println!(
                "  commit_message: {}",
                publish.commit_message.as_deref().unwrap_or("(default)")
            );
            match publish.timeout {
                Some(timeout) => println!("  timeout: {:?}", timeout),
                None => println!("  timeout: (none)"),
            }
            println!();
            match Config::config_path() {
                Some(path) => println!("Config file: {}", path.display()),
                None => {
                    if let Some(path) = Config::default_config_path() {
                        println!("Config file: {}", path.display());
                        println!("  (not found - using defaults)");
                    }
                }
            }
        }
        None => {
            println!("ghp - publish a content directory to an orphan git branch");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
