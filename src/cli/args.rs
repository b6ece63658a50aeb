//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Mirror - load symbols from freshly compiled packages
///
/// Copies a package into a private cache, compiles it as a dynamic library
/// and resolves the requested statics.
#[derive(Parser, Debug)]
#[command(name = "mirror")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(long, global = true, env = "MIRROR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .mirror.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a package once and list the resolved symbols
    Load(LoadArgs),

    /// Reload a package every time its directory changes
    Watch(LoadArgs),

    /// Inspect or clear the cache root
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Check the compiler toolchain
    Status,

    /// Print shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Arguments shared by `load` and `watch`
#[derive(Parser, Debug, Clone)]
pub struct LoadArgs {
    /// Package directory (defaults to the configured target)
    #[arg(short, long)]
    pub pkg: Option<PathBuf>,

    /// Symbols to load, or "all" (comma-separated)
    #[arg(short, long, value_delimiter = ',', env = "MIRROR_MODELS")]
    pub models: Vec<String>,

    /// Synthesize X<Type> symbols for the given type names
    #[arg(short = 'x', long)]
    pub generate_symbols: bool,

    /// Keep cache entries after each run
    #[arg(short = 'c', long)]
    pub preserve_cache: bool,

    /// Cache root directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,

        /// Write a project-local .mirror.toml in the current directory
        #[arg(long)]
        local: bool,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,

    /// Cache root directory (defaults to the configured one)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List preserved cache entries
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove every cache entry
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
