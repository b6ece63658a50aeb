//! Status command - check the compiler toolchain

use crate::build::{Rustc, MIN_RUSTC_VERSION};
use crate::config::Config;
use crate::error::{MirrorError, MirrorResult};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the status command
pub async fn execute(config: &Config) -> MirrorResult<()> {
    let ctx = UiContext::detect();
    println!("{}", style("Mirror Status").bold().cyan());

    ui::section(&ctx, "Toolchain:");
    ui::key_value(&ctx, "compiler", &config.toolchain.rustc.display().to_string());
    ui::key_value(&ctx, "edition", &config.toolchain.edition);

    let rustc = Rustc::from_config(&config.toolchain);
    let toolchain_ok = match rustc.ensure_supported().await {
        Ok(version) => {
            ui::key_value_status(&ctx, "version", &version.to_string(), true);
            true
        }
        Err(MirrorError::ToolchainUnsupported { found, required }) => {
            ui::key_value_status(&ctx, "version", &found, false);
            ui::step_warn_hint(
                &ctx,
                &format!("rustc {} or newer is required", required),
                "Run: rustup update stable",
            );
            false
        }
        Err(e) => {
            ui::step_error(&ctx, &e.to_string());
            false
        }
    };

    ui::section(&ctx, "Cache:");
    ui::key_value(&ctx, "root", &config.loader.cache_dir.display().to_string());

    println!();
    if toolchain_ok {
        println!("{}", style("All checks passed").green().bold());
    } else {
        println!(
            "{}",
            style(format!("Loading needs rustc {} or newer", MIN_RUSTC_VERSION))
                .yellow()
                .bold()
        );
    }

    Ok(())
}
