//! Cache command - inspect or clear the cache root

use crate::cache::{format_bytes, CacheEntryInfo, CacheManager};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::MirrorResult;
use crate::ui::{self, UiContext};
use console::style;
use std::io::{self, Write};

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> MirrorResult<()> {
    let root = args
        .cache_dir
        .unwrap_or_else(|| config.loader.cache_dir.clone());
    let manager = CacheManager::new(root);

    match args.action {
        CacheAction::List { format } => list_entries(&manager, format).await,
        CacheAction::Clear { yes } => clear_entries(&manager, yes).await,
    }
}

async fn list_entries(manager: &CacheManager, format: OutputFormat) -> MirrorResult<()> {
    let entries = manager.entries().await?;

    match format {
        OutputFormat::Table => print_entry_table(manager, &entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.path.display());
            }
        }
    }

    Ok(())
}

fn print_entry_table(manager: &CacheManager, entries: &[CacheEntryInfo]) {
    if entries.is_empty() {
        println!("No cache entries in {}.", manager.root().display());
        return;
    }

    println!("{:<38} {:<6} {:<10} {:<20}", "ENTRY", "FILES", "SIZE", "MODIFIED");
    println!("{}", "-".repeat(78));

    let mut total = 0u64;
    for entry in entries {
        total += entry.size_bytes;
        let modified = entry
            .modified_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<38} {:<6} {:<10} {:<20}",
            entry.id,
            entry.files,
            format_bytes(entry.size_bytes),
            modified
        );
    }

    println!();
    println!(
        "Total: {} entr{} ({})",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        format_bytes(total)
    );
}

async fn clear_entries(manager: &CacheManager, skip_confirm: bool) -> MirrorResult<()> {
    let ctx = UiContext::detect();
    let entries = manager.entries().await?;

    if entries.is_empty() {
        ui::step_info(&ctx, "Cache is already empty");
        return Ok(());
    }

    println!(
        "This will remove {} cache entr{} from {}:",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        manager.root().display()
    );
    for entry in &entries {
        println!("  {} {}", style("•").red(), entry.id);
    }
    println!();

    if !skip_confirm && !confirm("Are you sure? [y/N] ") {
        println!("Aborted.");
        return Ok(());
    }

    let removed = manager.clear().await?;
    ui::step_ok(
        &ctx,
        &format!("Removed {} cache entr{}", removed, if removed == 1 { "y" } else { "ies" }),
    );
    Ok(())
}

/// Ask on stdin; anything but `y` declines
fn confirm(prompt: &str) -> bool {
    print!("{}", prompt);
    let _ = io::stdout().flush();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    input.trim().eq_ignore_ascii_case("y")
}
