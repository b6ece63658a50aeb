//! Load command - compile once and print the resolved symbols

use crate::build::Rustc;
use crate::cli::args::{LoadArgs, OutputFormat};
use crate::config::Config;
use crate::error::{MirrorError, MirrorResult};
use crate::loader::{Loader, LoaderConfig};
use crate::symbols::{is_wildcard, Symbol};
use crate::ui::{TaskSpinner, UiContext};
use console::style;
use std::sync::Arc;
use std::time::Duration;

/// Execute the load command
pub async fn execute(args: LoadArgs, config: &Config) -> MirrorResult<()> {
    let (loader, models) = prepare(&args, config)?;
    let ctx = UiContext::detect();

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!(
        "Loading {} from {}",
        models.join(", "),
        loader.config().target.display()
    ));

    match loader.load(&models).await {
        Ok(symbols) => {
            spinner.stop(&format!("Loaded {} symbol(s)", symbols.len()));
            print_symbols(&symbols, args.format)
        }
        Err(e) => {
            spinner.stop_error("Load failed");
            Err(e)
        }
    }
}

/// Build a loader and the requested names from flags and config
pub(crate) fn prepare(args: &LoadArgs, config: &Config) -> MirrorResult<(Loader, Vec<String>)> {
    let models = if args.models.is_empty() {
        config.loader.models.clone()
    } else {
        args.models.clone()
    };
    let generate = args.generate_symbols || config.loader.generate_symbols;

    validate_models(&models, generate)?;

    let loader_config = LoaderConfig {
        target: args
            .pkg
            .clone()
            .unwrap_or_else(|| config.loader.target.clone()),
        preserve_cache: args.preserve_cache || config.loader.preserve_cache,
        generate_symbols: generate,
        cache_dir: Some(
            args.cache_dir
                .clone()
                .unwrap_or_else(|| config.loader.cache_dir.clone()),
        ),
    };

    let toolchain = Arc::new(Rustc::from_config(&config.toolchain));
    let loader = Loader::with_toolchain(loader_config, toolchain)
        .with_quiet_interval(Duration::from_millis(config.watch.debounce_ms));

    Ok((loader, models))
}

fn validate_models(models: &[String], generate: bool) -> MirrorResult<()> {
    if models.is_empty() {
        return Err(MirrorError::User(
            "no models given; pass --models or set loader.models".to_string(),
        ));
    }
    if generate && is_wildcard(models) {
        return Err(MirrorError::User(
            "--generate-symbols needs explicit type names, not \"all\"".to_string(),
        ));
    }
    Ok(())
}

/// Print symbols in the requested format
pub(crate) fn print_symbols(symbols: &[Symbol], format: OutputFormat) -> MirrorResult<()> {
    match format {
        OutputFormat::Table => print_symbol_table(symbols),
        OutputFormat::Json => print_symbol_json(symbols)?,
        OutputFormat::Plain => {
            for symbol in symbols {
                println!("{}", symbol.name());
            }
        }
    }
    Ok(())
}

fn print_symbol_table(symbols: &[Symbol]) {
    println!("{:<32} {:<18} {}", "SYMBOL", "ADDRESS", "ARTIFACT");
    println!("{}", "-".repeat(80));

    for symbol in symbols {
        let artifact = symbol
            .artifact()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "{:<32} {:<18} {}",
            style(symbol.name()).cyan(),
            format!("{:p}", symbol.address()),
            style(artifact).dim()
        );
    }

    println!();
    println!("Total: {} symbol(s)", symbols.len());
}

fn print_symbol_json(symbols: &[Symbol]) -> MirrorResult<()> {
    #[derive(serde::Serialize)]
    struct SymbolJson {
        name: String,
        address: String,
        artifact: String,
    }

    let json: Vec<SymbolJson> = symbols
        .iter()
        .map(|s| SymbolJson {
            name: s.name().to_string(),
            address: format!("{:p}", s.address()),
            artifact: s.artifact().display().to_string(),
        })
        .collect();

    println!("{}", serde_json::to_string(&json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(models: &[&str], generate: bool) -> LoadArgs {
        LoadArgs {
            pkg: Some(PathBuf::from("./models")),
            models: models.iter().map(|s| s.to_string()).collect(),
            generate_symbols: generate,
            preserve_cache: false,
            cache_dir: None,
            format: OutputFormat::Plain,
        }
    }

    #[test]
    fn generation_rejects_wildcard() {
        let err = prepare(&args(&["all"], true), &Config::default()).unwrap_err();
        assert!(matches!(err, MirrorError::User(_)));
    }

    #[test]
    fn missing_models_are_rejected() {
        let err = prepare(&args(&[], false), &Config::default()).unwrap_err();
        assert!(matches!(err, MirrorError::User(_)));
    }

    #[test]
    fn models_fall_back_to_config() {
        let mut config = Config::default();
        config.loader.models = vec!["XUser".to_string()];

        let (_, models) = prepare(&args(&[], false), &config).unwrap();
        assert_eq!(models, vec!["XUser"]);
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        config.loader.cache_dir = PathBuf::from("/tmp/from-config");

        let mut load_args = args(&["XUser"], false);
        load_args.cache_dir = Some(PathBuf::from("/tmp/from-flag"));
        load_args.preserve_cache = true;

        let (loader, _) = prepare(&load_args, &config).unwrap();
        assert_eq!(loader.config().target, PathBuf::from("./models"));
        assert!(loader.config().preserve_cache);
        assert_eq!(loader.config().cache_root(), PathBuf::from("/tmp/from-flag"));
    }
}
