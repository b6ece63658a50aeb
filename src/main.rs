//! Mirror - load symbols from freshly compiled packages
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use mirror::cli::{Cli, Commands};
use mirror::config::{Config, ConfigManager};
use mirror::error::{MirrorError, MirrorResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> MirrorResult<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    if let Commands::Completions { shell } = cli.command {
        mirror::cli::commands::completions(shell);
        return Ok(());
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    let local_config_path = if cli.no_local || cli.config.is_some() {
        None
    } else {
        let cwd =
            std::env::current_dir().map_err(|e| MirrorError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_with_local(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, &config);
    if let Some(ref path) = local_config_path {
        debug!("Using local config: {}", path.display());
    }

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),
        Commands::Load(args) => mirror::cli::commands::load(args, &config).await,
        Commands::Watch(args) => mirror::cli::commands::watch(args, &config).await,
        Commands::Cache(args) => mirror::cli::commands::cache(args, &config).await,
        Commands::Config(args) => mirror::cli::commands::config(args, &config, &config_manager).await,
        Commands::Status => mirror::cli::commands::status(&config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `RUST_LOG` wins when set
fn init_logging(verbose: u8, config: &Config) {
    let default = match verbose {
        0 => "mirror=warn",
        1 => "mirror=info",
        _ => "mirror=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
