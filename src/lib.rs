//! Mirror - load symbols from freshly compiled packages
//!
//! Copies a package directory into an isolated cache entry, compiles it as
//! a dynamic library with `rustc`, and resolves named statics out of the
//! result. Watch mode repeats the pipeline on every change.

pub mod build;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod package;
pub mod symbols;
pub mod synth;
pub mod ui;
pub mod watch;

pub use error::{MirrorError, MirrorResult};
pub use loader::{Loader, LoaderConfig, Stage, WatchSession};
pub use symbols::Symbol;
