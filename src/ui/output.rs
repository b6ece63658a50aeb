//! Line-oriented status output

use super::context::UiContext;
use console::{style, StyledObject};

/// Leading marker of a status line
#[derive(Debug, Clone, Copy)]
enum Mark {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Mark {
    fn render(self, ctx: &UiContext) -> StyledObject<&'static str> {
        let fancy = ctx.use_fancy_output();
        match self {
            Self::Ok => style(if fancy { "✓" } else { "[OK]" }).green(),
            Self::Warn => style(if fancy { "!" } else { "[WARN]" }).yellow(),
            Self::Fail => style(if fancy { "✗" } else { "[FAIL]" }).red(),
            Self::Info => style(if fancy { "•" } else { "[INFO]" }).cyan(),
        }
    }
}

fn line(ctx: &UiContext, mark: Mark, message: &str) {
    println!("  {} {}", mark.render(ctx), message);
}

/// Section header
pub fn section(_ctx: &UiContext, title: &str) {
    println!();
    println!("{}", style(title).bold());
}

/// Successful step
pub fn step_ok(ctx: &UiContext, message: &str) {
    line(ctx, Mark::Ok, message);
}

/// Step that needs attention, with a hint on how to fix it
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    line(ctx, Mark::Warn, &format!("{} - {}", message, style(hint).dim()));
}

/// Failed step
pub fn step_error(ctx: &UiContext, message: &str) {
    line(ctx, Mark::Fail, message);
}

/// Informational step
pub fn step_info(ctx: &UiContext, message: &str) {
    line(ctx, Mark::Info, message);
}

/// Key-value pair
pub fn key_value(_ctx: &UiContext, key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// Key-value pair marked by status
pub fn key_value_status(ctx: &UiContext, key: &str, value: &str, ok: bool) {
    let mark = if ok { Mark::Ok } else { Mark::Warn };
    line(ctx, mark, &format!("{}: {}", key, value));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_marks() {
        let ctx = UiContext::non_interactive();
        assert_eq!(Mark::Ok.render(&ctx).force_styling(false).to_string(), "[OK]");
        assert_eq!(Mark::Fail.render(&ctx).force_styling(false).to_string(), "[FAIL]");
    }

    #[test]
    fn plain_output_does_not_panic() {
        let ctx = UiContext::non_interactive();
        section(&ctx, "Toolchain");
        step_ok(&ctx, "rustc found");
        step_warn_hint(&ctx, "rustc too old", "rustup update");
        step_error(&ctx, "rustc missing");
        key_value_status(&ctx, "version", "1.80.0", true);
    }
}
