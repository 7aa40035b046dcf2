//! Configuration file watcher for hot reload.
//!
//! Only configs that load and validate are forwarded; the receiving server
//! rebuilds its version registry from each one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ServiceConfig;

/// Watches one config file and sends every valid revision of it.
pub struct ConfigWatcher {
    path: PathBuf,
    poll_interval: Duration,
    update_tx: mpsc::UnboundedSender<ServiceConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ServiceConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            poll_interval: Duration::from_secs(2),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Poll interval for backends without native change events.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Start watching in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(config) = revision_for_event(&event, &path) {
                        if tx.send(config).is_err() {
                            tracing::debug!(path = %path.display(), "Config receiver dropped");
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(
            path = %self.path.display(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Config watcher started"
        );
        Ok(watcher)
    }
}

/// Load the new revision of `path` if `event` changed it.
///
/// Returns `None` for unrelated events and for files that fail to load or
/// validate, so the version lifecycle currently served stays in place.
fn revision_for_event(event: &Event, path: &Path) -> Option<ServiceConfig> {
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return None;
    }

    match load_config(path) {
        Ok(config) => {
            tracing::info!(
                path = %path.display(),
                groups = config.groups.len(),
                versions = config.groups.iter().map(|g| g.versions.len()).sum::<usize>(),
                "Config change detected"
            );
            Some(config)
        }
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Ignoring invalid config revision. Version lifecycle unchanged."
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, EventKind, ModifyKind};
    use std::io::Write;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const GROUPS: &str = r#"
        [[groups]]
        name = "health"
        default_version = "1.0.0"

        [[groups.versions]]
        version = "1.0.0"
        sunset_at = "2030-01-01T00:00:00Z"

        [[groups.versions]]
        version = "2.0.0"
    "#;

    #[test]
    fn test_modify_event_loads_new_lifecycle() {
        let file = config_file(GROUPS);
        let event = Event::new(EventKind::Modify(ModifyKind::Any));

        let config = revision_for_event(&event, file.path()).unwrap();
        assert_eq!(config.groups[0].versions.len(), 2);
        assert!(config.groups[0].versions[0].sunset_at.is_some());

        let event = Event::new(EventKind::Create(CreateKind::File));
        assert!(revision_for_event(&event, file.path()).is_some());
    }

    #[test]
    fn test_access_event_is_ignored() {
        let file = config_file(GROUPS);
        let event = Event::new(EventKind::Access(AccessKind::Any));
        assert!(revision_for_event(&event, file.path()).is_none());
    }

    #[test]
    fn test_invalid_revision_is_dropped() {
        let file = config_file(
            r#"
            [[groups]]
            name = "health"
            default_version = "3.0.0"

            [[groups.versions]]
            version = "1.0.0"
            "#,
        );
        let event = Event::new(EventKind::Modify(ModifyKind::Any));
        assert!(revision_for_event(&event, file.path()).is_none());
    }

    #[test]
    fn test_run_watches_existing_file() {
        let file = config_file(GROUPS);
        let (watcher, _updates) = ConfigWatcher::new(file.path());
        let _handle = watcher
            .poll_interval(Duration::from_millis(100))
            .run()
            .unwrap();
    }
}
