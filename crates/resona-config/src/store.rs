//! Key-value metadata store port.
//!
//! The configuration language can reference external key-value metadata
//! (`RegistryValue("path", "name")`). The engine only needs three
//! operations: read, existence check, and change watching. Embedders supply
//! an implementation; two are provided here:
//!
//! - [`MemoryStore`] - in-memory map with a manual `touch()`, for tests and
//!   embedders that push values programmatically.
//! - [`TomlStore`] - a TOML file on disk, `path` segments addressing nested
//!   tables, watched with `notify`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, never, unbounded};
use notify::{RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// External key-value metadata the config language can reference.
///
/// `watch` returns a channel that fires (unit events, possibly coalesced)
/// whenever one of the given paths may have changed. The default
/// implementation never fires. Watches are re-established after every
/// compilation with the paths that compilation actually referenced.
pub trait MetadataStore: Send + Sync {
    /// Reads `name` under `path`, `None` when absent or unreadable.
    fn read(&self, path: &str, name: &str) -> Option<String>;

    /// Whether `name` exists under `path`.
    fn exists(&self, path: &str, name: &str) -> bool {
        self.read(path, name).is_some()
    }

    /// Subscribes to changes of the given paths.
    fn watch(&self, _paths: &[String]) -> Receiver<()> {
        never()
    }
}

/// A store with no entries. The engine default when the embedder supplies
/// nothing.
pub struct NullStore;

impl MetadataStore for NullStore {
    fn read(&self, _path: &str, _name: &str) -> Option<String> {
        None
    }
}

/// In-memory store for tests and programmatic embedders.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), String>>,
    subscribers: Mutex<Vec<Sender<()>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Inserts or replaces a value and notifies subscribers.
    pub fn set(&self, path: &str, name: &str, value: &str) {
        self.entries
            .lock()
            .insert((path.to_string(), name.to_string()), value.to_string());
        self.touch();
    }

    /// Removes a value and notifies subscribers.
    pub fn remove(&self, path: &str, name: &str) {
        self.entries
            .lock()
            .remove(&(path.to_string(), name.to_string()));
        self.touch();
    }

    /// Fires a change event to every live subscriber. A subscriber with an
    /// undrained event keeps its pending one; only disconnected receivers
    /// are forgotten.
    pub fn touch(&self) {
        self.subscribers
            .lock()
            .retain(|tx| !matches!(tx.try_send(()), Err(TrySendError::Disconnected(()))));
    }
}

impl MetadataStore for MemoryStore {
    fn read(&self, path: &str, name: &str) -> Option<String> {
        self.entries
            .lock()
            .get(&(path.to_string(), name.to_string()))
            .cloned()
    }

    fn watch(&self, _paths: &[String]) -> Receiver<()> {
        let (tx, rx) = bounded(1);
        self.subscribers.lock().push(tx);
        rx
    }
}

/// TOML-file-backed store. `path` addresses nested tables with `/`
/// separators; `name` is the final key. Watching is per-file: any change to
/// the backing file fires, regardless of which paths were requested.
pub struct TomlStore {
    file: PathBuf,
    /// Watchers stay alive as long as the store; replaced on re-subscription.
    watcher: Mutex<Option<notify::RecommendedWatcher>>,
}

impl TomlStore {
    pub fn new(file: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(TomlStore {
            file: file.into(),
            watcher: Mutex::new(None),
        })
    }

    fn lookup(&self, path: &str, name: &str) -> Option<toml::Value> {
        let text = std::fs::read_to_string(&self.file).ok()?;
        let root: toml::Value = match toml::from_str(&text) {
            Ok(value) => value,
            Err(error) => {
                warn!(file = %self.file.display(), %error, "metadata store file failed to parse");
                return None;
            }
        };

        let mut node = &root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.get(segment)?;
        }
        node.get(name).cloned()
    }
}

impl MetadataStore for TomlStore {
    fn read(&self, path: &str, name: &str) -> Option<String> {
        self.lookup(path, name).map(|value| match value {
            toml::Value::String(s) => s,
            other => other.to_string(),
        })
    }

    fn watch(&self, paths: &[String]) -> Receiver<()> {
        let (tx, rx) = unbounded();
        let mut watcher = match notify::recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
            if let Ok(event) = result {
                if matches!(
                    event.kind,
                    notify::EventKind::Modify(_)
                        | notify::EventKind::Create(_)
                        | notify::EventKind::Remove(_)
                ) {
                    let _ = tx.try_send(());
                }
            }
        }) {
            Ok(watcher) => watcher,
            Err(error) => {
                warn!(%error, "failed to create metadata store watcher");
                return rx;
            }
        };

        if let Err(error) = watcher.watch(Path::new(&self.file), RecursiveMode::NonRecursive) {
            // Watch the parent so file creation is still seen
            let parent = self.file.parent().unwrap_or(Path::new("."));
            debug!(%error, parent = %parent.display(), "watching parent directory instead");
            if let Err(error) = watcher.watch(parent, RecursiveMode::NonRecursive) {
                warn!(%error, "failed to watch metadata store file");
                return rx;
            }
        }

        debug!(file = %self.file.display(), watched_paths = paths.len(), "metadata store watch established");
        *self.watcher.lock() = Some(watcher);
        rx
    }
}
