//! Config command - show or initialize configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_FILE};
use crate::error::{MirrorError, MirrorResult};
use crate::ui::{self, UiContext};
use tokio::fs;

/// Template for project-local config
const LOCAL_TEMPLATE: &str = r#"# Mirror project configuration
# Settings here replace your user config (~/.config/mirror/config.toml)

[loader]
# target = "./models"
# models = ["XUser"]
# generate_symbols = false
# preserve_cache = false
# cache_dir = ".mirror"

# [toolchain]
# rustc = "rustc"
# edition = "2021"
# args = []

# [watch]
# debounce_ms = 300
"#;

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> MirrorResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force, local: false }) => init_config(manager, force).await?,
        Some(ConfigAction::Init { force, local: true }) => init_local(force).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> MirrorResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> MirrorResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok(&ctx, &format!("Configuration initialized at {}", path.display()));
    Ok(())
}

async fn init_local(force: bool) -> MirrorResult<()> {
    let ctx = UiContext::detect();
    let cwd =
        std::env::current_dir().map_err(|e| MirrorError::io("getting current directory", e))?;
    let path = cwd.join(LOCAL_CONFIG_FILE);

    if path.exists() && !force {
        return Err(MirrorError::User(format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        )));
    }

    fs::write(&path, LOCAL_TEMPLATE)
        .await
        .map_err(|e| MirrorError::io(format!("writing {}", path.display()), e))?;

    ui::step_ok(&ctx, &format!("Created {}", path.display()));
    Ok(())
}
