//! Hot reload of the static policy tables.
//!
//! [`TablesWatcher`] watches the gateway configuration file and, once a burst
//! of changes has settled, re-parses it and swaps the `tables` section into
//! the shared [`TablesHandle`]. Requests already in flight keep the snapshot
//! they started with. Instance settings in the same file are not reloaded.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ihub_policy::TablesHandle;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, GatewayConfig};

/// Default debounce interval for filesystem change events.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches the configuration file and reloads the policy tables.
pub struct TablesWatcher {
    tables: Arc<TablesHandle>,
    config_path: PathBuf,
    debounce: Duration,
}

impl TablesWatcher {
    /// Create a watcher that reloads `tables` from the file at `config_path`.
    pub fn new(tables: Arc<TablesHandle>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            tables,
            config_path: config_path.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Override the default debounce duration.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Spawn the watcher as a background tokio task.
    ///
    /// The watcher runs until the handle is aborted or the process exits.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!(error = %e, "tables watcher exited with error");
            }
        })
    }

    async fn run(&self) -> Result<(), notify::Error> {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(16);

        // Editors often replace the file, so watch its directory.
        let watch_dir = self
            .config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let file_name = self
            .config_path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();

        let _watcher = {
            let mut watcher = RecommendedWatcher::new(
                move |res: Result<notify::Event, notify::Error>| match res {
                    Ok(event) => {
                        let ours = event
                            .paths
                            .iter()
                            .any(|p| p.file_name().is_some_and(|name| name == file_name.as_os_str()));
                        if is_relevant_event(event.kind) && ours {
                            // A full channel already has a reload queued.
                            let _ = tx.try_send(());
                        }
                    }
                    Err(e) => warn!(error = %e, "filesystem watcher error"),
                },
                notify::Config::default(),
            )?;
            watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
            info!(path = %self.config_path.display(), "tables watcher started");
            watcher
        };

        loop {
            if rx.recv().await.is_none() {
                debug!("tables watcher channel closed, shutting down");
                break;
            }

            tokio::time::sleep(self.debounce).await;
            while rx.try_recv().is_ok() {}

            if let Err(e) = self.reload() {
                error!(error = %e, "failed to reload tables, keeping previous snapshot");
            }
        }

        Ok(())
    }

    /// Re-read the configuration file and swap in its tables.
    ///
    /// # Errors
    ///
    /// Returns the load error; the current snapshot is left untouched.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let config = GatewayConfig::load(&self.config_path)?;
        let previous = self.tables.swap(config.tables);
        let current = self.tables.snapshot();
        info!(
            outer_services = current.outer_service_ports.len(),
            admin_modules = current.admin_endpoints.len(),
            group_modules = current.group_endpoints.len(),
            changed = *previous != *current,
            "policy tables reloaded"
        );
        Ok(())
    }
}

/// Returns `true` for filesystem events that might indicate config file changes.
fn is_relevant_event(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
