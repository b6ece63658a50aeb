//! Watch command - reload on every change until Ctrl-C

use crate::cli::args::LoadArgs;
use crate::cli::commands::load::{prepare, print_symbols};
use crate::config::Config;
use crate::error::MirrorResult;
use crate::ui::{self, UiContext};
use console::style;
use tokio::sync::oneshot;
use tracing::debug;

/// Execute the watch command
pub async fn execute(args: LoadArgs, config: &Config) -> MirrorResult<()> {
    let (loader, models) = prepare(&args, config)?;
    let ctx = UiContext::detect();

    ui::step_info(
        &ctx,
        &format!(
            "Watching {} for {} (Ctrl-C to stop)",
            loader.config().target.display(),
            models.join(", ")
        ),
    );

    let (cancel_tx, cancel_rx) = oneshot::channel();
    let mut session = loader.watch(models, cancel_rx);
    let mut cancel = Some(cancel_tx);
    let mut symbols_open = true;
    let mut errors_open = true;
    let mut reloads = 0usize;

    while symbols_open || errors_open {
        tokio::select! {
            received = session.symbols.recv(), if symbols_open => match received {
                Some(symbols) => {
                    reloads += 1;
                    ui::step_ok(&ctx, &format!("Reload #{}: {} symbol(s)", reloads, symbols.len()));
                    print_symbols(&symbols, args.format)?;
                }
                None => symbols_open = false,
            },
            received = session.errors.recv(), if errors_open => match received {
                Some(e) => {
                    ui::step_error(&ctx, &e.to_string());
                    if let Some(hint) = e.hint() {
                        eprintln!("  {} {}", style("Hint:").yellow(), hint);
                    }
                }
                None => errors_open = false,
            },
            _ = tokio::signal::ctrl_c(), if cancel.is_some() => {
                debug!("Ctrl-C received, stopping watch");
                if let Some(tx) = cancel.take() {
                    let _ = tx.send(());
                }
            }
        }
    }

    if let Err(e) = session.worker.await {
        debug!("Watch worker ended abnormally: {}", e);
    }

    ui::step_info(&ctx, &format!("Stopped after {} successful reload(s)", reloads));
    Ok(())
}
