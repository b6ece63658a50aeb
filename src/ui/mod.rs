//! Terminal output for the `mirror` binary
//!
//! Spinners and colors in a terminal, plain `[OK]`/`[WARN]` lines when
//! piped or running under CI.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, key_value_status, section, step_error, step_info, step_ok, step_warn_hint};
pub use progress::TaskSpinner;
