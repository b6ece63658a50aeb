//! Integration tests for Mirror
//!
//! The pipeline tests compile real fixture crates and need `rustc` on PATH.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Copy a fixture package into a fresh temp dir
fn fixture(name: &str) -> TempDir {
    let source = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let temp = TempDir::new().unwrap();
    for entry in std::fs::read_dir(&source).unwrap() {
        let entry = entry.unwrap();
        std::fs::copy(entry.path(), temp.path().join(entry.file_name())).unwrap();
    }
    temp
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Files left in a directory, sorted
fn listing(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(read) => read.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => vec![],
    };
    entries.sort();
    entries
}

mod load_tests {
    use super::*;
    use mirror::{Loader, LoaderConfig, MirrorError};
    use serial_test::serial;

    #[repr(C)]
    struct User {
        id: u32,
        age: u32,
    }

    fn loader(pkg: &TempDir, cache: &TempDir) -> Loader {
        Loader::new(LoaderConfig {
            cache_dir: Some(cache.path().to_path_buf()),
            ..LoaderConfig::new(pkg.path())
        })
    }

    #[tokio::test]
    async fn loads_declared_symbol() {
        let pkg = fixture("user");
        let cache = TempDir::new().unwrap();

        let symbols = loader(&pkg, &cache).load(&names(&["XUser"])).await.unwrap();

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name(), "XUser");
        let user = unsafe { symbols[0].get::<User>() };
        assert_eq!(user.id, 42);
        assert_eq!(user.age, 7);
    }

    #[tokio::test]
    async fn wildcard_loads_every_export() {
        let pkg = fixture("user");
        let cache = TempDir::new().unwrap();

        let symbols = loader(&pkg, &cache).load(&names(&["all"])).await.unwrap();

        let loaded: Vec<&str> = symbols.iter().map(|s| s.name()).collect();
        assert_eq!(loaded, vec!["XUser"]);
    }

    #[tokio::test]
    async fn artifact_and_entry_are_cleaned_up() {
        let pkg = fixture("user");
        let cache = TempDir::new().unwrap();

        let symbols = loader(&pkg, &cache).load(&names(&["XUser"])).await.unwrap();

        assert!(!symbols[0].artifact().exists());
        assert!(listing(cache.path()).is_empty());
    }

    #[tokio::test]
    async fn source_package_is_untouched() {
        let pkg = fixture("user");
        let cache = TempDir::new().unwrap();
        let before = std::fs::read_to_string(pkg.path().join("lib.rs")).unwrap();

        loader(&pkg, &cache).load(&names(&["XUser"])).await.unwrap();

        assert_eq!(std::fs::read_to_string(pkg.path().join("lib.rs")).unwrap(), before);
        assert_eq!(listing(pkg.path()).len(), 2);
    }

    #[tokio::test]
    async fn preserved_entry_keeps_original_declaration() {
        let pkg = fixture("user");
        let cache = TempDir::new().unwrap();
        let loader = Loader::new(LoaderConfig {
            preserve_cache: true,
            cache_dir: Some(cache.path().to_path_buf()),
            ..LoaderConfig::new(pkg.path())
        });

        loader.load(&names(&["XUser"])).await.unwrap();

        let entries = listing(cache.path());
        assert_eq!(entries.len(), 1);
        let files = listing(&entries[0]);
        assert_eq!(files.len(), 2, "artifact must be removed: {:?}", files);
        let root = std::fs::read_to_string(entries[0].join("lib.rs")).unwrap();
        assert!(root.starts_with("#![crate_type = \"lib\"]"));
    }

    #[tokio::test]
    async fn generates_symbols_for_types() {
        let pkg = fixture("usernosymbol");
        let cache = TempDir::new().unwrap();
        let loader = Loader::new(LoaderConfig {
            generate_symbols: true,
            cache_dir: Some(cache.path().to_path_buf()),
            ..LoaderConfig::new(pkg.path())
        });

        let symbols = loader.load(&names(&["User", "Order"])).await.unwrap();

        let loaded: Vec<&str> = symbols.iter().map(|s| s.name()).collect();
        assert_eq!(loaded, vec!["XUser", "XOrder"]);
        assert!(listing(cache.path()).is_empty());
    }

    #[tokio::test]
    async fn missing_symbol_fails_to_resolve() {
        let pkg = fixture("usernosymbol");
        let cache = TempDir::new().unwrap();

        let err = loader(&pkg, &cache)
            .load(&names(&["XUser"]))
            .await
            .unwrap_err();

        assert!(matches!(err, MirrorError::SymbolResolveFailed { ref name, .. } if name == "XUser"));
        assert!(listing(cache.path()).is_empty());
    }

    #[tokio::test]
    async fn compile_error_reports_diagnostics() {
        let pkg = fixture("broken");
        let cache = TempDir::new().unwrap();

        let err = loader(&pkg, &cache)
            .load(&names(&["XUser"]))
            .await
            .unwrap_err();

        match err {
            MirrorError::BuildFailed { diagnostics, .. } => {
                assert!(diagnostics.contains("mismatched types"), "{}", diagnostics)
            }
            other => panic!("expected BuildFailed, got {:?}", other),
        }
        assert!(listing(cache.path()).is_empty());
    }

    #[tokio::test]
    async fn nonexistent_package_fails() {
        let cache = TempDir::new().unwrap();
        let loader = Loader::new(LoaderConfig {
            cache_dir: Some(cache.path().to_path_buf()),
            ..LoaderConfig::new(cache.path().join("nonexisting"))
        });

        let err = loader.load(&names(&["XUser"])).await.unwrap_err();
        assert!(matches!(err, MirrorError::PackageNotFound { .. }));
    }

    #[tokio::test]
    async fn unwritable_cache_root_fails_cleanly() {
        let pkg = fixture("user");
        let blocker = TempDir::new().unwrap();
        let root = blocker.path().join("file");
        std::fs::write(&root, "not a directory").unwrap();

        let loader = Loader::new(LoaderConfig {
            cache_dir: Some(root.clone()),
            ..LoaderConfig::new(pkg.path())
        });

        let err = loader.load(&names(&["XUser"])).await.unwrap_err();
        assert!(matches!(err, MirrorError::CacheCopyFailed { .. }));
        assert!(root.is_file());
        assert_eq!(listing(pkg.path()).len(), 2);
    }

    #[tokio::test]
    async fn generates_symbols_for_types_in_private_modules() {
        let pkg = fixture("usermodule");
        let cache = TempDir::new().unwrap();
        let loader = Loader::new(LoaderConfig {
            generate_symbols: true,
            cache_dir: Some(cache.path().to_path_buf()),
            ..LoaderConfig::new(pkg.path())
        });

        let symbols = loader.load(&names(&["User"])).await.unwrap();

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name(), "XUser");
        assert!(listing(cache.path()).is_empty());
        assert_eq!(listing(pkg.path()).len(), 2);
    }

    #[tokio::test]
    async fn concurrent_loads_do_not_interfere() {
        let pkg = fixture("user");
        let cache = TempDir::new().unwrap();
        let loader = loader(&pkg, &cache);
        let requested = names(&["XUser"]);

        let (a, b) = tokio::join!(loader.load(&requested), loader.load(&requested));

        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap().len(), 1);
        assert!(listing(cache.path()).is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn default_cache_root_is_under_working_directory() {
        let pkg = fixture("user");
        let work = TempDir::new().unwrap();
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(work.path()).unwrap();

        let loader = Loader::new(LoaderConfig {
            preserve_cache: true,
            ..LoaderConfig::new(pkg.path())
        });
        let result = loader.load(&names(&["XUser"])).await;
        std::env::set_current_dir(previous).unwrap();

        result.unwrap();
        assert_eq!(listing(&work.path().join(".mirror")).len(), 1);
    }
}

mod watch_tests {
    use super::*;
    use mirror::{Loader, LoaderConfig};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    #[tokio::test]
    async fn reloads_after_change_until_cancelled() {
        let pkg = fixture("user");
        let cache = TempDir::new().unwrap();
        let loader = Loader::new(LoaderConfig {
            cache_dir: Some(cache.path().to_path_buf()),
            ..LoaderConfig::new(pkg.path())
        })
        .with_quiet_interval(Duration::from_millis(100));

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let mut session = loader.watch(names(&["XUser"]), cancel_rx);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let root = pkg.path().join("lib.rs");
        let mut source = std::fs::read_to_string(&root).unwrap();
        source.push_str("\n// touched\n");
        std::fs::write(&root, source).unwrap();

        let symbols = timeout(Duration::from_secs(120), session.symbols.recv())
            .await
            .expect("reload within timeout")
            .unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name(), "XUser");

        cancel_tx.send(()).unwrap();
        session.worker.await.unwrap();
        assert!(session.errors.try_recv().is_err());
        assert!(listing(cache.path()).is_empty());
    }

    #[tokio::test]
    async fn dropping_cancel_sender_stops_worker() {
        let pkg = fixture("user");
        let cache = TempDir::new().unwrap();
        let loader = Loader::new(LoaderConfig {
            cache_dir: Some(cache.path().to_path_buf()),
            ..LoaderConfig::new(pkg.path())
        });

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let session = loader.watch(names(&["XUser"]), cancel_rx);
        drop(cancel_tx);

        timeout(Duration::from_secs(10), session.worker)
            .await
            .expect("worker stops")
            .unwrap();
    }
}

mod cli_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn mirror() -> Command {
        let mut cmd = cargo_bin_cmd!("mirror");
        cmd.arg("--no-local").env_remove("MIRROR_MODELS").env_remove("MIRROR_CONFIG");
        cmd
    }

    #[test]
    fn help_displays() {
        mirror()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("load symbols from freshly compiled packages"));
    }

    #[test]
    fn version_displays() {
        mirror()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("mirror"));
    }

    #[test]
    fn config_show() {
        let home = TempDir::new().unwrap();
        mirror()
            .args(["--config"])
            .arg(home.path().join("config.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[loader]"));
    }

    #[test]
    fn load_without_models_fails() {
        let cache = TempDir::new().unwrap();
        mirror()
            .args(["load", "--cache-dir"])
            .arg(cache.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("no models given"));
    }

    #[test]
    fn generate_with_wildcard_is_rejected() {
        mirror()
            .args(["load", "-x", "-m", "all"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("explicit type names"));
    }

    #[test]
    fn load_missing_package_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        mirror()
            .args(["load", "-m", "XUser", "-p"])
            .arg(temp.path().join("nonexisting"))
            .arg("--cache-dir")
            .arg(temp.path().join("cache"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn load_prints_plain_symbols() {
        let pkg = fixture("user");
        let cache = TempDir::new().unwrap();
        mirror()
            .args(["load", "-m", "XUser", "--format", "plain", "-p"])
            .arg(pkg.path())
            .arg("--cache-dir")
            .arg(cache.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("XUser"));
    }

    #[test]
    fn cache_list_empty() {
        let cache = TempDir::new().unwrap();
        mirror()
            .args(["cache", "list", "--cache-dir"])
            .arg(cache.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries"));
    }

    #[test]
    fn cache_clear_keeps_foreign_directories() {
        let root = TempDir::new().unwrap();
        let entry = root.path().join(uuid::Uuid::new_v4().simple().to_string());
        std::fs::create_dir(&entry).unwrap();
        std::fs::create_dir(root.path().join("src")).unwrap();

        mirror()
            .args(["cache", "clear", "--yes", "--cache-dir"])
            .arg(root.path())
            .assert()
            .success();

        assert!(!entry.exists());
        assert!(root.path().join("src").exists());
    }

    #[test]
    fn cache_clear_declined_keeps_entries() {
        let root = TempDir::new().unwrap();
        let entry = root.path().join(uuid::Uuid::new_v4().simple().to_string());
        std::fs::create_dir(&entry).unwrap();

        mirror()
            .args(["cache", "clear", "--cache-dir"])
            .arg(root.path())
            .write_stdin("n\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("Aborted."));

        assert!(entry.exists());
    }

    #[test]
    fn completions_print() {
        mirror()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("mirror"));
    }
}
