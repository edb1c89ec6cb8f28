//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a temp file and renaming it over the original would
//! otherwise detach the watch after the first save.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// Watches one gateway configuration file and emits every new valid version.
pub struct ConfigWatcher {
    path: PathBuf,
    /// Last configuration handed to the server; starts as the one it booted with.
    current: GatewayConfig,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates. `current`
    /// is the configuration the server is already running.
    pub fn new(
        path: &Path,
        current: GatewayConfig,
    ) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                current,
                update_tx,
            },
            update_rx,
        )
    }

    /// Load the file and send it on when it differs from the running
    /// configuration. Returns whether an update was sent.
    pub fn reload(&mut self) -> bool {
        match load_config(&self.path) {
            Ok(config) if config == self.current => {
                tracing::debug!(path = ?self.path, "Config file touched, content unchanged");
                false
            }
            Ok(config) => {
                tracing::info!(path = ?self.path, "Config file changed, reloading");
                self.current = config.clone();
                self.update_tx.send(config).is_ok()
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to reload config, keeping current configuration"
                );
                false
            }
        }
    }

    /// Start watching. The returned watcher must be kept alive for as long as
    /// updates are wanted.
    pub fn run(mut self) -> Result<RecommendedWatcher, notify::Error> {
        let file_name = self.path.file_name().map(OsString::from);
        let dir = watch_dir(&self.path);
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches_config(&event, file_name.as_deref()) => {
                    self.reload();
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, dir = ?dir, "Config watcher started");
        Ok(watcher)
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether `event` writes or replaces the watched file.
fn touches_config(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    let Some(file_name) = file_name else {
        return false;
    };
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_only_config_file_writes_count() {
        let name = Some(std::ffi::OsStr::new("gateway.toml"));

        assert!(touches_config(
            &event(EventKind::Modify(ModifyKind::Any), "/etc/gym/gateway.toml"),
            name
        ));
        assert!(touches_config(
            &event(EventKind::Create(CreateKind::File), "/etc/gym/gateway.toml"),
            name
        ));
        assert!(!touches_config(
            &event(EventKind::Modify(ModifyKind::Any), "/etc/gym/other.toml"),
            name
        ));
        assert!(!touches_config(
            &event(EventKind::Remove(RemoveKind::File), "/etc/gym/gateway.toml"),
            name
        ));
    }

    #[test]
    fn test_reload_sends_only_real_changes() {
        let path = std::env::temp_dir().join(format!("gym-gateway-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "").unwrap();

        let (mut watcher, mut updates) = ConfigWatcher::new(&path, load_config(&path).unwrap());

        // Same content the server booted with.
        assert!(!watcher.reload());
        assert!(updates.try_recv().is_err());

        std::fs::write(&path, "[cors]\ninclude_on_failure = true\n").unwrap();
        assert!(watcher.reload());
        assert!(updates.try_recv().unwrap().cors.include_on_failure);

        assert!(!watcher.reload());
        assert!(updates.try_recv().is_err());

        std::fs::write(&path, "[cors\n").unwrap();
        assert!(!watcher.reload());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_watch_dir_of_bare_file_name() {
        assert_eq!(watch_dir(Path::new("gateway.toml")), PathBuf::from("."));
        assert_eq!(
            watch_dir(Path::new("/etc/gym/gateway.toml")),
            PathBuf::from("/etc/gym")
        );
    }
}
