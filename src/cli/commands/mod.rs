//! CLI command implementations

pub mod cache;
pub mod completions;
pub mod config;
pub mod load;
pub mod status;
pub mod watch;

pub use cache::execute as cache;
pub use completions::execute as completions;
pub use config::execute as config;
pub use load::execute as load;
pub use status::execute as status;
pub use watch::execute as watch;
