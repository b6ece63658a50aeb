//! Loader facade
//!
//! Composes the pipeline stages and owns the cleanup policy:
//!
//! | Stage | Work |
//! |-------|------|
//! | Resolving | find the package and its files |
//! | Caching | copy into a fresh cache entry |
//! | Synthesizing | optional `X<Type>` statics |
//! | Building | rewrite, compile, restore |
//! | LoadingSymbols | open the artifact, look names up |
//! | Cleanup | artifact always removed, entry removed unless preserved |

use crate::build::{ModuleBuilder, Rustc, Toolchain};
use crate::cache::{CacheEntry, CacheManager, DEFAULT_CACHE_DIR};
use crate::config::Config;
use crate::error::{MirrorError, MirrorResult};
use crate::package::{resolve_package, Package, CRATE_ROOT};
use crate::symbols::{self, Symbol};
use crate::synth::synthesize;
use crate::watch::{ChangeWatcher, DEFAULT_QUIET_INTERVAL};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Immutable configuration of one loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Package directory to load
    pub target: PathBuf,

    /// Keep cache entries after each run
    pub preserve_cache: bool,

    /// Synthesize `X<Type>` statics for the requested names
    pub generate_symbols: bool,

    /// Cache root override; `.mirror` in the working directory otherwise
    pub cache_dir: Option<PathBuf>,
}

impl LoaderConfig {
    /// Configuration for a target with every option off
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            preserve_cache: false,
            generate_symbols: false,
            cache_dir: None,
        }
    }

    /// Build from the `[loader]` config section
    pub fn from_config(config: &Config) -> Self {
        Self {
            target: config.loader.target.clone(),
            preserve_cache: config.loader.preserve_cache,
            generate_symbols: config.loader.generate_symbols,
            cache_dir: Some(config.loader.cache_dir.clone()),
        }
    }

    /// Cache root in effect
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
    }
}

/// Pipeline stage of a single load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Resolving,
    Caching,
    Synthesizing,
    Building,
    LoadingSymbols,
    Cleanup,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Caching => "caching",
            Self::Synthesizing => "synthesizing",
            Self::Building => "building",
            Self::LoadingSymbols => "loading-symbols",
            Self::Cleanup => "cleanup",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Stage tracking for one load
struct Run {
    stage: Stage,
    failed_at: Option<Stage>,
    started: Instant,
}

impl Run {
    fn new() -> Self {
        Self {
            stage: Stage::Idle,
            failed_at: None,
            started: Instant::now(),
        }
    }

    fn enter(&mut self, stage: Stage) {
        if self.stage != stage {
            debug!("Stage {} -> {}", self.stage, stage);
            self.stage = stage;
        }
    }

    /// Stage the run failed in, cleanup aside
    fn failed_stage(&self) -> Stage {
        self.failed_at.unwrap_or(self.stage)
    }
}

/// Streams produced by a watch session
#[derive(Debug)]
pub struct WatchSession {
    /// Symbol sets, one per successful reload
    pub symbols: mpsc::UnboundedReceiver<Vec<Symbol>>,

    /// Errors, one per failed reload (and a final one if watching broke)
    pub errors: mpsc::UnboundedReceiver<MirrorError>,

    /// The background worker; finishes after cancellation
    pub worker: JoinHandle<()>,
}

/// Loads symbols from a target package
#[derive(Debug, Clone)]
pub struct Loader {
    config: LoaderConfig,
    cache: CacheManager,
    builder: ModuleBuilder,
    quiet_interval: Duration,
}

impl Loader {
    /// Create a loader compiling with the system `rustc`
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_toolchain(config, Arc::new(Rustc::new()))
    }

    /// Create a loader compiling with the given toolchain
    pub fn with_toolchain(config: LoaderConfig, toolchain: Arc<dyn Toolchain>) -> Self {
        Self {
            cache: CacheManager::new(config.cache_root()),
            builder: ModuleBuilder::new(toolchain),
            quiet_interval: DEFAULT_QUIET_INTERVAL,
            config,
        }
    }

    /// Override the watch debounce interval
    pub fn with_quiet_interval(mut self, quiet: Duration) -> Self {
        self.quiet_interval = quiet;
        self
    }

    /// The loader configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The cache this loader copies into
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Run the pipeline once and return the resolved symbols.
    ///
    /// `["all"]` resolves every exported static. Cleanup runs on every path.
    pub async fn load(&self, names: &[String]) -> MirrorResult<Vec<Symbol>> {
        let mut run = Run::new();
        let result = self.run_pipeline(&mut run, names).await;

        match &result {
            Ok(symbols) => {
                run.enter(Stage::Done);
                info!(
                    "Loaded {} symbols from {} in {:?}",
                    symbols.len(),
                    self.config.target.display(),
                    run.started.elapsed()
                );
            }
            Err(e) => {
                warn!("Load failed during {}: {}", run.failed_stage(), e);
                run.enter(Stage::Failed);
            }
        }

        result
    }

    async fn run_pipeline(&self, run: &mut Run, names: &[String]) -> MirrorResult<Vec<Symbol>> {
        run.enter(Stage::Resolving);
        let pkg = resolve_package(&self.config.target).await?;

        run.enter(Stage::Caching);
        let entry = self
            .cache
            .copy_to_cache(&pkg, self.config.preserve_cache)
            .await?;

        let result = self.build_and_resolve(run, &pkg, &entry, names).await;
        if result.is_err() {
            run.failed_at = Some(run.stage);
        }

        run.enter(Stage::Cleanup);
        entry.release().await;

        result
    }

    async fn build_and_resolve(
        &self,
        run: &mut Run,
        pkg: &Package,
        entry: &CacheEntry,
        names: &[String],
    ) -> MirrorResult<Vec<Symbol>> {
        let names = if self.config.generate_symbols {
            run.enter(Stage::Synthesizing);
            synthesize(names, &entry.dir, &entry.join(CRATE_ROOT)).await?
        } else {
            names.to_vec()
        };

        run.enter(Stage::Building);
        let artifact = self.builder.build(&entry.dir, &pkg.import_path).await?;

        run.enter(Stage::LoadingSymbols);
        let symbols = symbols::resolve(&artifact, &names);

        if let Err(e) = artifact.remove().await {
            warn!("{}", e);
        }

        symbols
    }

    /// Reload on every debounced change of the target directory.
    ///
    /// Spawns one worker on the current tokio runtime. Firing or dropping
    /// the `cancel` sender stops the session once any in-flight load has
    /// finished; both streams then close.
    pub fn watch(&self, names: Vec<String>, cancel: oneshot::Receiver<()>) -> WatchSession {
        let (symbols_tx, symbols_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let loader = self.clone();

        let worker = tokio::spawn(async move {
            let mut cancel = cancel;

            let mut watcher = match std::path::absolute(&loader.config.target)
                .map_err(|e| MirrorError::WatchFailed {
                    path: loader.config.target.clone(),
                    reason: e.to_string(),
                })
                .and_then(|path| {
                    ChangeWatcher::start(
                        &path,
                        loader.quiet_interval,
                        vec![loader.cache.root().to_path_buf()],
                    )
                }) {
                Ok(watcher) => watcher,
                Err(e) => {
                    let _ = errors_tx.send(e);
                    return;
                }
            };

            info!("Watching {} for changes", watcher.path().display());

            loop {
                let next = tokio::select! {
                    biased;
                    _ = &mut cancel => {
                        debug!("Watch cancelled");
                        break;
                    }
                    next = watcher.next() => next,
                };

                match next {
                    None => {
                        debug!("Change notifications closed");
                        break;
                    }
                    Some(Err(e)) => {
                        let _ = errors_tx.send(e);
                        break;
                    }
                    Some(Ok(trigger)) => {
                        debug!(
                            "Reloading after {} events on {} paths",
                            trigger.events,
                            trigger.paths.len()
                        );
                        // A closed stream only means the caller stopped listening to it
                        match loader.load(&names).await {
                            Ok(symbols) => {
                                let _ = symbols_tx.send(symbols);
                            }
                            Err(e) if e.is_pipeline_failure() => {
                                let _ = errors_tx.send(e);
                            }
                            Err(e) => {
                                warn!("Reload failed outside the pipeline, stopping: {}", e);
                                let _ = errors_tx.send(e);
                                break;
                            }
                        }
                    }
                }

                if symbols_tx.is_closed() && errors_tx.is_closed() {
                    debug!("Both watch streams dropped, stopping");
                    break;
                }
            }
        });

        WatchSession {
            symbols: symbols_rx,
            errors: errors_rx,
            worker,
        }
    }
}
