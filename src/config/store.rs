//! Current-configuration handle for explicit reloads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::loader::{ConfigError, ConfigLoader};
use crate::config::runtime::Config;

/// Holds the active configuration and swaps it atomically on reload.
///
/// Readers take a snapshot with [`ConfigStore::current`] and keep using it
/// for the lifetime of a connection. A superseded configuration, with its
/// TLS context and statsd socket, is dropped once the last snapshot goes.
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwap<Config>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    pub fn current(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// Install `config`, returning the one it replaced.
    pub fn replace(&self, config: Config) -> Arc<Config> {
        self.current.swap(Arc::new(config))
    }

    /// Reload from `path`. On failure the current configuration stays in place.
    pub fn reload(&self, loader: &ConfigLoader, path: &Path) -> Result<Arc<Config>, ConfigError> {
        match loader.load(path) {
            Ok(config) => {
                let previous = self.replace(config);
                tracing::info!(path = ?path, "Configuration reloaded");
                Ok(previous)
            }
            Err(e) => {
                tracing::warn!(
                    path = ?path,
                    error = %e,
                    "Failed to reload config. Keeping current configuration."
                );
                Err(e)
            }
        }
    }

    /// [`ConfigStore::reload`] on tokio's blocking pool.
    ///
    /// Loading reads files and resolves the statsd address, so it must not
    /// run on a runtime worker. A panic inside the load is resumed here.
    pub async fn reload_blocking(
        self: Arc<Self>,
        loader: ConfigLoader,
        path: PathBuf,
    ) -> Result<Arc<Config>, ConfigError> {
        let task_path = path.clone();
        let handle = tokio::task::spawn_blocking(move || self.reload(&loader, &task_path));

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(ConfigError::Io {
                path,
                source: std::io::Error::new(std::io::ErrorKind::Interrupted, e),
            }),
        }
    }
}
