//! Change watching for continuous reloads
//!
//! ```text
//! notify callback ──(unbounded)──▶ Debouncer task ──(bounded 1)──▶ loader worker
//! ```
//!
//! The debouncer is the only stage running beside the worker; the worker
//! pulls one trigger at a time and runs the whole pipeline before pulling
//! the next.

mod debounce;
mod watcher;

pub use debounce::{Debouncer, DEFAULT_QUIET_INTERVAL};
pub use watcher::{ChangeWatcher, Trigger};
