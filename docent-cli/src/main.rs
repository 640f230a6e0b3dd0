//! Docent CLI - Command line interface for Docent
//!
//! Guided documentation generation for source trees.

mod commands;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use docent_core::{Backend, Config, ConfigOverrides};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{DetectArgs, GuidanceArgs, ScanArgs};

/// Docent: guided documentation generation for source trees
#[derive(Parser, Debug)]
#[command(name = "docent")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Generation backend: claude, cursor or dry-run (overrides config and env)
    #[arg(long, global = true)]
    backend: Option<Backend>,

    /// Path to claude executable (overrides config)
    #[arg(long, global = true, env = "DOCENT_CLAUDE_PATH")]
    claude_path: Option<String>,

    /// Path to cursor-agent executable (overrides config)
    #[arg(long, global = true, env = "DOCENT_CURSOR_PATH")]
    cursor_path: Option<String>,

    /// Model to use (overrides config)
    #[arg(long, global = true, env = "DOCENT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Collect guidance and generate documentation
    #[command(visible_alias = "s")]
    Scan(ScanArgs),

    /// Show the detected project layout
    Detect(DetectArgs),

    /// List collected guidance without generating anything
    #[command(visible_alias = "g")]
    Guidance(GuidanceArgs),

    /// Show current configuration
    Config {
        /// Project directory whose docent.toml is shown
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

impl Commands {
    /// Directory whose `docent.toml` applies to this command
    fn project_root(&self) -> Option<&Path> {
        match self {
            Commands::Scan(args) => Some(args.dir.as_path()),
            Commands::Detect(args) => Some(args.dir.as_path()),
            Commands::Guidance(args) => Some(args.dir.as_path()),
            Commands::Config { dir } => Some(dir.as_path()),
            Commands::Version => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG takes precedence over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if cli.verbose {
        tracing::debug!("Verbose mode enabled");
    }

    let mut overrides = match &cli.command {
        Some(Commands::Scan(args)) => args.overrides(),
        _ => ConfigOverrides::default(),
    };
    overrides.backend = overrides.backend.or(cli.backend);
    overrides.claude_path = cli.claude_path.clone();
    overrides.cursor_path = cli.cursor_path.clone();
    overrides.model = cli.model.clone();

    // Load configuration with overrides
    let project_root = cli.command.as_ref().and_then(|c| c.project_root());
    let config = Config::load_with_overrides(project_root, overrides)?;

    if cli.verbose {
        tracing::debug!(
            backend = %config.agent.backend,
            claude_path = %config.agent.claude_path,
            model = ?config.agent.model,
            order = %config.scan.order,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("docent {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Scan(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::Detect(args)) => {
            args.execute()?;
        }
        Some(Commands::Guidance(args)) => {
            args.execute(&config)?;
        }
        Some(Commands::Config { dir }) => {
            print_config(&config, &dir);
        }
        None => {
            println!("Docent - Guided documentation generation for source trees");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config, dir: &Path) {
    println!("Docent Configuration");
    println!("====================");
    println!();
    println!("Agent Settings:");
    println!("  backend: {}", config.agent.backend);
    println!("  claude_path: {}", config.agent.claude_path);
    println!("  cursor_path: {}", config.agent.cursor_path);
    println!("  model: {}", config.agent.model.as_deref().unwrap_or("(default)"));
    println!("  timeout: {}s", config.agent.timeout.as_secs());
    println!();
    println!("Scan Settings:");
    println!("  order: {}", config.scan.order);
    println!("  guidance_file: {}", config.scan.guidance_file);
    println!("  use_parent_guidance: {}", config.scan.use_parent_guidance);
    println!("  cross_module_inheritance: {}", config.scan.cross_module_inheritance);
    println!("  module_concurrency: {}", config.scan.module_concurrency);
    println!("  module_threads: {}", config.scan.module_threads);
    if config.scan.excludes.is_empty() {
        println!("  excludes: (none)");
    } else {
        println!("  excludes: {}", config.scan.excludes.join(", "));
    }
    println!();

    let project_file = dir.join(docent_core::config::PROJECT_CONFIG_FILE);
    if project_file.exists() {
        println!("Config file: {}", project_file.display());
        println!("  (project)");
    } else if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}
