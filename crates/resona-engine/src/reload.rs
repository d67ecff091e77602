//! The hot-reload worker.
//!
//! One background thread waits on three signals: shutdown, configuration
//! directory changes and metadata store changes. On a change it debounces
//! briefly, takes the reload permit (blocking while a previously published
//! graph is still unconsumed), compiles under the compile lock and
//! publishes the new graph to the audio thread. Retired graphs coming back
//! from the audio thread are dropped here, never on the audio thread.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, never, select, unbounded};
use notify::{RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use resona_config::{Compiler, DeviceInfo, MetadataStore, StagePhase, StreamFormat};

use crate::graph::FilterGraph;

/// Coalescing window after the first change event.
const DEBOUNCE: Duration = Duration::from_millis(10);

/// Channel endpoints the worker holds.
pub(crate) struct ReloadLinks {
    pub pending_tx: Sender<FilterGraph>,
    /// For returning the permit when a compile fails after taking it.
    pub permit_tx: Sender<()>,
    pub permit_rx: Receiver<()>,
    pub retire_rx: Receiver<FilterGraph>,
    pub shutdown_rx: Receiver<()>,
}

pub(crate) struct ReloadWorker {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
    pub store: Arc<dyn MetadataStore>,
    pub device: DeviceInfo,
    pub phase: StagePhase,
    pub format: StreamFormat,
    pub compile_lock: Arc<Mutex<()>>,
    pub watch_paths: Vec<String>,
    pub links: ReloadLinks,
}

enum Wake {
    Shutdown,
    Change,
    FsGone,
    StoreGone,
}

impl ReloadWorker {
    pub fn spawn(self) -> std::thread::JoinHandle<()> {
        std::thread::Builder::new()
            .name("resona-reload".to_string())
            .spawn(move || self.run())
            .unwrap_or_else(|error| {
                // no worker thread: hot reload is disabled but audio still runs
                warn!(%error, "failed to spawn reload worker");
                std::thread::spawn(|| {})
            })
    }

    fn run(mut self) {
        let (fs_tx, mut fs_rx) = unbounded();

        let _watcher = match notify::recommended_watcher(
            move |result: Result<notify::Event, notify::Error>| {
                if let Ok(event) = result {
                    if matches!(
                        event.kind,
                        notify::EventKind::Modify(_)
                            | notify::EventKind::Create(_)
                            | notify::EventKind::Remove(_)
                    ) {
                        let _ = fs_tx.send(());
                    }
                }
            },
        ) {
            Ok(mut watcher) => {
                match watcher.watch(&self.config_dir, RecursiveMode::Recursive) {
                    Ok(()) => {
                        debug!(dir = %self.config_dir.display(), "watching configuration directory");
                        Some(watcher)
                    }
                    Err(error) => {
                        warn!(%error, dir = %self.config_dir.display(), "cannot watch configuration directory");
                        fs_rx = never();
                        None
                    }
                }
            }
            Err(error) => {
                warn!(%error, "cannot create filesystem watcher");
                fs_rx = never();
                None
            }
        };

        let mut store_rx = self.store.watch(&self.watch_paths);

        loop {
            let wake = select! {
                recv(self.links.shutdown_rx) -> _ => Wake::Shutdown,
                recv(fs_rx) -> msg => if msg.is_ok() { Wake::Change } else { Wake::FsGone },
                recv(store_rx) -> msg => if msg.is_ok() { Wake::Change } else { Wake::StoreGone },
            };
            match wake {
                Wake::Shutdown => break,
                Wake::FsGone => {
                    fs_rx = never();
                    continue;
                }
                Wake::StoreGone => {
                    store_rx = never();
                    continue;
                }
                Wake::Change => {}
            }

            // wait briefly for a companion event, then drain the burst
            let _ = fs_rx.recv_timeout(DEBOUNCE);
            while fs_rx.try_recv().is_ok() {}
            while store_rx.try_recv().is_ok() {}

            // the permit bounds pending graphs to one; shutdown interrupts
            let acquired = select! {
                recv(self.links.shutdown_rx) -> _ => false,
                recv(self.links.permit_rx) -> msg => msg.is_ok(),
            };
            if !acquired {
                break;
            }

            let guard = self.compile_lock.lock();

            // retired graphs are freed here, off the audio thread
            let retired = self.links.retire_rx.try_iter().count();
            if retired > 0 {
                debug!(retired, "dropped retired graphs");
            }

            let compiler = Compiler::new(
                self.format,
                self.device.clone(),
                self.phase,
                self.store.as_ref(),
            );
            match compiler.compile_file(&self.config_path) {
                Ok(compiled) => {
                    self.watch_paths = compiled.watch_paths.clone();
                    store_rx = self.store.watch(&self.watch_paths);
                    let graph = FilterGraph::from_compiled(compiled, &self.format);
                    drop(guard);

                    info!("publishing recompiled graph");
                    if self.links.pending_tx.try_send(graph).is_err() {
                        // audio side gone
                        break;
                    }
                }
                Err(error) => {
                    drop(guard);
                    warn!(%error, "reload failed, keeping the active graph");
                    // return the permit so the next change can try again
                    let _ = self.links.permit_tx.try_send(());
                }
            }
        }

        // final drain so graph buffers never leak past shutdown
        let _ = self.links.retire_rx.try_iter().count();
        debug!("reload worker stopped");
    }
}
