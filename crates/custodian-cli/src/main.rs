use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use custodian_cli::{ModCommand, ModuleManager, Settings};

#[derive(Parser)]
#[command(name = "custodian")]
#[command(about = "Manage Jsonnet modules hosted in git repositories", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Directory holding fetched modules
    #[arg(long, env = "CUSTODIAN_MODULE_CACHE")]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Module management commands
    Mod {
        #[command(subcommand)]
        command: ModCommand,
    },

    /// Resolve one import against the project's dependency tree and print it
    Import {
        /// Path as written in the import statement
        path: String,

        /// Location tag of the importing file; empty means the project's main.jsonnet
        #[arg(long, default_value = "")]
        from: String,
    },

    /// Evaluate a Jsonnet file of the project and print the JSON result
    Jsonnet {
        /// File relative to the project root
        #[arg(default_value = "main.jsonnet")]
        file: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.debug {
        tracing::Level::TRACE
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(cli.debug)
        .with_writer(io::stderr)
        .init();

    let project_root = std::env::current_dir().context("Failed to read the current directory")?;
    let settings = Settings::from_env(cli.cache_dir)?;
    let manager = ModuleManager::new(project_root, &settings);

    match cli.command {
        Commands::Mod { command } => manager.execute(command),
        Commands::Import { path, from } => {
            let imported = manager.import(&from, &path)?;
            tracing::debug!("Imported {}", imported.found_at);
            let mut stdout = io::stdout().lock();
            stdout.write_all(&imported.contents)?;
            stdout.flush()?;
            Ok(())
        }
        Commands::Jsonnet { file } => {
            println!("{}", manager.evaluate(&file)?);
            Ok(())
        }
    }
}
