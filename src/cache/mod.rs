//! Private build cache for package copies
//!
//! Every pipeline run copies the target package into a fresh, uniquely
//! named directory under the cache root and builds there, so the original
//! sources are never touched.
//!
//! # Entry Lifecycle
//!
//! | Step | Result |
//! |------|--------|
//! | Copy | `{root}/{uuid}` created exclusively, flat files copied |
//! | Build | Declarations rewritten and restored, artifact written inside |
//! | Cleanup | Artifact removed always, entry removed unless preserved |

pub mod entry;
pub mod manager;

pub use entry::{format_bytes, CacheEntry, CacheEntryInfo};
pub use manager::{CacheManager, DEFAULT_CACHE_DIR};
