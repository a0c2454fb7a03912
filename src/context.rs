//! Store directory resolution for the keylock CLI.
//!
//! Every command operates on one store directory, chosen in this order:
//! 1. `--store-dir <path>` on the command line
//! 2. the `KEYLOCK_DIR` environment variable
//! 3. `.keylock/` under the current working directory
//!
//! # Layout
//!
//! ```text
//! <store>/
//!   config.yaml
//!   locks/<encoded-key>.lock
//!   events/events.ndjson
//! ```

use crate::config::Config;
use crate::error::{LockError, Result};
use crate::store::FileStore;
use std::env;
use std::path::{Path, PathBuf};

/// Default store directory relative to the working directory.
pub const DEFAULT_STORE_DIR: &str = ".keylock";

/// Environment variable naming the store directory.
pub const STORE_DIR_ENV: &str = "KEYLOCK_DIR";

/// Resolved paths for one store directory.
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// Root of the store directory.
    pub root: PathBuf,

    /// Directory holding the lock files (`{root}/locks/`).
    pub locks_dir: PathBuf,
}

impl StoreContext {
    /// Resolve the store directory from an explicit path, the environment,
    /// or the current working directory, in that order.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(root) = explicit {
            return Ok(Self::at(root));
        }

        if let Some(root) = env::var_os(STORE_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(PathBuf::from(root)));
        }

        let cwd = env::current_dir().map_err(|e| {
            LockError::UserError(format!("failed to get current working directory: {}", e))
        })?;
        Ok(Self::at(cwd.join(DEFAULT_STORE_DIR)))
    }

    /// Context for a store rooted at `root`.
    pub fn at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let locks_dir = root.join("locks");
        Self { root, locks_dir }
    }

    /// Whether `keylock init` has been run for this store.
    pub fn is_initialized(&self) -> bool {
        self.root.is_dir() && self.locks_dir.is_dir()
    }

    /// Ensure the store is initialized, returning an error if not.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(LockError::UserError(format!(
                "keylock store not initialized.\n\
                 Expected locks directory at: {}\n\n\
                 Run `keylock init` (or pass --store-dir) to choose a store.",
                self.locks_dir.display()
            )));
        }
        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    /// Get the path to the events directory.
    pub fn events_dir(&self) -> PathBuf {
        self.root.join("events")
    }

    /// Get the path to the events log file.
    pub fn events_file(&self) -> PathBuf {
        self.events_dir().join("events.ndjson")
    }

    /// Load the store's config, falling back to defaults when there is none.
    pub fn load_config(&self) -> Result<Config> {
        let path = self.config_path();
        if path.exists() {
            Config::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Open the file store for this context.
    pub fn open_store(&self) -> Result<FileStore> {
        FileStore::open(&self.locks_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    /// Changes the working directory, restoring it on drop.
    struct CwdGuard {
        original: PathBuf,
    }

    impl CwdGuard {
        fn enter(dir: &Path) -> Self {
            let original = env::current_dir().unwrap();
            env::set_current_dir(dir).unwrap();
            Self { original }
        }
    }

    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = env::set_current_dir(&self.original);
        }
    }

    /// Restores an environment variable on drop.
    struct EnvGuard {
        previous: Option<std::ffi::OsString>,
    }

    impl EnvGuard {
        fn set(value: Option<&Path>) -> Self {
            let previous = env::var_os(STORE_DIR_ENV);
            // SAFETY: tests touching the environment are #[serial].
            unsafe {
                match value {
                    Some(v) => env::set_var(STORE_DIR_ENV, v),
                    None => env::remove_var(STORE_DIR_ENV),
                }
            }
            Self { previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            // SAFETY: see EnvGuard::set.
            unsafe {
                match &self.previous {
                    Some(v) => env::set_var(STORE_DIR_ENV, v),
                    None => env::remove_var(STORE_DIR_ENV),
                }
            }
        }
    }

    #[test]
    fn test_layout_paths() {
        let ctx = StoreContext::at("/var/lib/keylock");

        assert_eq!(ctx.locks_dir, PathBuf::from("/var/lib/keylock/locks"));
        assert_eq!(ctx.config_path(), PathBuf::from("/var/lib/keylock/config.yaml"));
        assert_eq!(
            ctx.events_file(),
            PathBuf::from("/var/lib/keylock/events/events.ndjson")
        );
    }

    #[test]
    #[serial]
    fn test_explicit_dir_wins_over_env() {
        let explicit = TempDir::new().unwrap();
        let from_env = TempDir::new().unwrap();
        let _env = EnvGuard::set(Some(from_env.path()));

        let ctx = StoreContext::resolve(Some(explicit.path())).unwrap();
        assert_eq!(ctx.root, explicit.path());
    }

    #[test]
    #[serial]
    fn test_env_dir_used_when_no_explicit_dir() {
        let from_env = TempDir::new().unwrap();
        let _env = EnvGuard::set(Some(from_env.path()));

        let ctx = StoreContext::resolve(None).unwrap();
        assert_eq!(ctx.root, from_env.path());
    }

    #[test]
    #[serial]
    fn test_defaults_to_cwd() {
        let temp_dir = TempDir::new().unwrap();
        let _env = EnvGuard::set(None);
        let _cwd = CwdGuard::enter(temp_dir.path());

        let ctx = StoreContext::resolve(None).unwrap();
        let expected = std::env::current_dir().unwrap().join(DEFAULT_STORE_DIR);
        assert_eq!(ctx.root, expected);
    }

    #[test]
    fn test_ensure_initialized() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StoreContext::at(temp_dir.path().join("store"));

        let err = ctx.ensure_initialized().unwrap_err();
        assert!(err.to_string().contains("keylock init"));

        ctx.open_store().unwrap();
        assert!(ctx.ensure_initialized().is_ok());
    }

    #[test]
    fn test_load_config_defaults_when_missing() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StoreContext::at(temp_dir.path());

        let config = ctx.load_config().unwrap();
        assert_eq!(config.default_timeout_secs, 3600);
    }

    #[test]
    fn test_load_config_surfaces_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StoreContext::at(temp_dir.path());
        std::fs::write(ctx.config_path(), "default_timeout_secs: 0\n").unwrap();

        assert!(ctx.load_config().is_err());
    }
}
