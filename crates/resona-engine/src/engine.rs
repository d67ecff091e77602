//! The filter engine: real-time process loop, graph swaps, hot reload.
//!
//! Thread roles are strict. The host audio thread only ever calls
//! [`FilterEngine::process`] / [`FilterEngine::process_in_place`]: it takes
//! no locks, allocates nothing, and communicates with the reload worker
//! exclusively through bounded lock-free channels. The owner thread calls
//! `initialize` and drops the engine. The reload worker compiles in the
//! background and publishes graphs through a single-slot channel.
//!
//! Graph hand-off protocol:
//!
//! - `pending`: bounded(1), worker -> audio. A freshly compiled graph waits
//!   here until the audio thread adopts it as `next`.
//! - `permit`: bounded(1), audio -> worker. Holds one token when a reload
//!   may be published; the worker takes it before compiling, the audio
//!   thread returns it when it promotes `next` to `current`. This bounds
//!   pending graphs to one.
//! - `retire`: bounded(2), audio -> worker. Replaced graphs travel back so
//!   their buffers are freed off the audio thread.

use std::f32::consts::PI;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use resona_config::{
    Compiler, DeviceInfo, MetadataStore, NullStore, StagePhase, StreamFormat,
};

use crate::error::EngineError;
use crate::graph::FilterGraph;
use crate::reload::{ReloadLinks, ReloadWorker};

/// Where the engine finds its configuration and metadata.
pub struct EngineSettings {
    pub config_dir: PathBuf,
    pub config_file: String,
    pub store: Arc<dyn MetadataStore>,
}

impl EngineSettings {
    /// Settings with the conventional `config.txt` and no metadata store.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        EngineSettings {
            config_dir: config_dir.into(),
            config_file: "config.txt".to_string(),
            store: Arc::new(NullStore),
        }
    }

    pub fn with_config_file(mut self, name: impl Into<String>) -> Self {
        self.config_file = name.into();
        self
    }

    pub fn with_store(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.store = store;
        self
    }
}

/// Channel endpoints the audio side holds.
struct AudioLinks {
    pending_rx: Receiver<FilterGraph>,
    permit_tx: Sender<()>,
    retire_tx: Sender<FilterGraph>,
}

/// The engine. One instance per processed endpoint/stream.
pub struct FilterEngine {
    settings: EngineSettings,
    device: DeviceInfo,
    lfx: bool,

    format: Option<StreamFormat>,
    transition_length: usize,
    transition_counter: usize,
    last_input_silent: bool,
    last_frame_count: Option<usize>,

    current: FilterGraph,
    next: Option<FilterGraph>,
    previous: Option<FilterGraph>,

    links: Option<AudioLinks>,
    worker: Option<JoinHandle<()>>,
    shutdown_tx: Option<Sender<()>>,
    compile_lock: Arc<Mutex<()>>,
}

impl FilterEngine {
    pub fn new(settings: EngineSettings) -> Self {
        // placeholder until initialize supplies the real format
        let placeholder = StreamFormat {
            sample_rate: 48000.0,
            input_channels: 0,
            real_channels: 0,
            output_channels: 0,
            channel_mask: 0,
            max_frames: 0,
        };
        FilterEngine {
            settings,
            device: DeviceInfo::default(),
            lfx: false,
            format: None,
            transition_length: 0,
            transition_counter: 0,
            last_input_silent: false,
            last_frame_count: None,
            current: FilterGraph::empty(&placeholder),
            next: None,
            previous: None,
            links: None,
            worker: None,
            shutdown_tx: None,
            compile_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Supplies endpoint identity. Must precede `initialize`.
    pub fn set_device_info(
        &mut self,
        is_capture: bool,
        device_name: &str,
        connection_name: &str,
        device_guid: &str,
    ) {
        self.device = DeviceInfo {
            is_capture,
            device_name: device_name.to_string(),
            connection_name: connection_name.to_string(),
            device_guid: device_guid.to_string(),
        };
    }

    /// Selects the pre-mix stage (LFX) instead of post-mix. Must precede
    /// `initialize`.
    pub fn set_lfx(&mut self, lfx: bool) {
        self.lfx = lfx;
    }

    /// Compiles the initial graph and starts the reload worker. May be
    /// called again with a new format; the previous worker is stopped and
    /// all graphs are rebuilt.
    pub fn initialize(&mut self, format: StreamFormat) -> Result<(), EngineError> {
        validate_format(&format)?;

        self.stop_worker();

        let compile_lock = Arc::clone(&self.compile_lock);
        let guard = compile_lock.lock();

        self.format = Some(format);
        self.transition_length = format.transition_length();
        self.transition_counter = 0;
        self.last_input_silent = false;
        self.last_frame_count = None;
        self.next = None;
        self.previous = None;

        let phase = StagePhase::from_flags(self.device.is_capture, self.lfx);
        let config_path = self.settings.config_dir.join(&self.settings.config_file);

        let compiler = Compiler::new(
            format,
            self.device.clone(),
            phase,
            self.settings.store.as_ref(),
        );
        let watch_paths = match compiler.compile_file(&config_path) {
            Ok(compiled) => {
                let paths = compiled.watch_paths.clone();
                self.current = FilterGraph::from_compiled(compiled, &format);
                paths
            }
            Err(error) => {
                // missing config is not fatal: run as passthrough and let
                // the watcher pick the file up when it appears
                warn!(%error, "initial configuration load failed, starting empty");
                self.current = FilterGraph::empty(&format);
                Vec::new()
            }
        };
        drop(guard);

        let (pending_tx, pending_rx) = bounded(1);
        let (permit_tx, permit_rx) = bounded(1);
        let (retire_tx, retire_rx) = bounded(2);
        let (shutdown_tx, shutdown_rx) = bounded(1);

        // the initial permit: one reload may be published
        let _ = permit_tx.try_send(());

        let worker = ReloadWorker {
            config_dir: self.settings.config_dir.clone(),
            config_path,
            store: Arc::clone(&self.settings.store),
            device: self.device.clone(),
            phase,
            format,
            compile_lock: Arc::clone(&self.compile_lock),
            watch_paths,
            links: ReloadLinks {
                pending_tx,
                permit_tx: permit_tx.clone(),
                permit_rx,
                retire_rx,
                shutdown_rx,
            },
        };

        self.links = Some(AudioLinks {
            pending_rx,
            permit_tx,
            retire_tx,
        });
        self.shutdown_tx = Some(shutdown_tx);
        self.worker = Some(worker.spawn());

        info!(
            sample_rate = format.sample_rate,
            channels = format.real_channels,
            max_frames = format.max_frames,
            "engine initialized"
        );
        Ok(())
    }

    /// The real-time callback for distinct input/output buffers.
    ///
    /// Processes `min(input, output, max_frames)` frames. Wait-free and
    /// allocation-free.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let Some(format) = self.format else {
            // not initialized: pass through whatever fits
            let n = input.len().min(output.len());
            output[..n].copy_from_slice(&input[..n]);
            return;
        };

        let frames = (input.len() / format.input_channels)
            .min(output.len() / format.output_channels)
            .min(format.max_frames);
        self.note_frame_count(frames);

        if self.input_is_silent(input, frames, &format) {
            if self.last_input_silent {
                // second silent callback: skip the graphs entirely
                output[..frames * format.output_channels].fill(0.0);
                return;
            }
            self.last_input_silent = true;
        } else {
            self.last_input_silent = false;
        }

        self.adopt_pending();

        // memcpy shortcut only when the interleave layouts agree; spare
        // input lanes otherwise go through the graph's lane plumbing
        if self.current.is_empty()
            && self.next.is_none()
            && format.real_channels == format.output_channels
            && format.input_channels == format.output_channels
        {
            let n = frames * format.output_channels;
            output[..n].copy_from_slice(&input[..n]);
            return;
        }

        self.run_graphs(input, frames, &format);
        self.current.write(output, frames);
        self.promote_if_done();
    }

    /// The real-time callback for hosts whose input and output alias.
    /// Requires `input_channels == output_channels`.
    pub fn process_in_place(&mut self, io: &mut [f32]) {
        let Some(format) = self.format else { return };
        debug_assert_eq!(format.input_channels, format.output_channels);

        let frames = (io.len() / format.input_channels).min(format.max_frames);
        self.note_frame_count(frames);

        if self.input_is_silent(io, frames, &format) {
            if self.last_input_silent {
                // buffer already carries the silence
                return;
            }
            self.last_input_silent = true;
        } else {
            self.last_input_silent = false;
        }

        self.adopt_pending();

        if self.current.is_empty()
            && self.next.is_none()
            && format.real_channels == format.output_channels
        {
            return;
        }

        self.run_graphs(io, frames, &format);
        self.current.write(io, frames);
        self.promote_if_done();
    }

    /// Whether a compiled graph is waiting to be adopted or crossfaded.
    pub fn reload_in_flight(&self) -> bool {
        self.next.is_some()
            || self
                .links
                .as_ref()
                .is_some_and(|links| !links.pending_rx.is_empty())
    }

    // -- internals ----------------------------------------------------------

    fn note_frame_count(&mut self, frames: usize) {
        if self.last_frame_count != Some(frames) {
            if let Some(previous) = self.last_frame_count {
                debug!(previous, frames, "callback frame count changed");
            }
            self.last_frame_count = Some(frames);
        }
    }

    fn input_is_silent(&self, input: &[f32], frames: usize, format: &StreamFormat) -> bool {
        for f in 0..frames {
            let base = f * format.input_channels;
            for c in 0..format.real_channels {
                if input[base + c] != 0.0 {
                    return false;
                }
            }
        }
        true
    }

    fn adopt_pending(&mut self) {
        if self.next.is_some() {
            return;
        }
        if let Some(links) = &self.links {
            if let Ok(graph) = links.pending_rx.try_recv() {
                debug!("new graph adopted, crossfade starting");
                self.next = Some(graph);
                self.transition_counter = 0;
            }
        }
    }

    fn run_graphs(&mut self, input: &[f32], frames: usize, format: &StreamFormat) {
        self.current.process(input, frames);

        if let Some(next) = &mut self.next {
            next.process(input, frames);

            let length = self.transition_length.max(1);
            let current_out = self.current.output_pool_mut();
            let next_out = next.output_pool();

            for f in 0..frames {
                let weight = if self.transition_counter >= length {
                    1.0
                } else {
                    0.5 * (1.0 - (self.transition_counter as f32 * PI / length as f32).cos())
                };
                for c in 0..format.output_channels {
                    let dry = current_out[c][f];
                    current_out[c][f] = dry * (1.0 - weight) + next_out[c][f] * weight;
                }
                self.transition_counter += 1;
            }
        }
    }

    fn promote_if_done(&mut self) {
        if self.transition_counter < self.transition_length {
            return;
        }
        let Some(next) = self.next.take() else {
            return;
        };

        let old = std::mem::replace(&mut self.current, next);
        self.previous = Some(old);
        self.transition_counter = 0;

        if let Some(links) = &self.links {
            if let Some(graph) = self.previous.take() {
                match links.retire_tx.try_send(graph) {
                    Ok(()) => {}
                    Err(TrySendError::Full(graph)) | Err(TrySendError::Disconnected(graph)) => {
                        // keep it parked; replaced at the next promotion
                        self.previous = Some(graph);
                    }
                }
            }
            // hand the reload permit back: the worker may publish again
            let _ = links.permit_tx.try_send(());
        }
    }

    fn stop_worker(&mut self) {
        if let Some(shutdown) = self.shutdown_tx.take() {
            let _ = shutdown.try_send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("reload worker panicked during shutdown");
            }
        }
        if let Some(links) = self.links.take() {
            // drain anything published after the last promotion
            while links.pending_rx.try_recv().is_ok() {}
        }
        self.next = None;
        self.previous = None;
    }
}

impl Drop for FilterEngine {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn validate_format(format: &StreamFormat) -> Result<(), EngineError> {
    if format.sample_rate <= 0.0 {
        return Err(EngineError::InvalidFormat("sample rate must be positive"));
    }
    if format.real_channels == 0 || format.output_channels == 0 {
        return Err(EngineError::InvalidFormat("channel counts must be non-zero"));
    }
    if format.real_channels > format.input_channels {
        return Err(EngineError::InvalidFormat(
            "real channels cannot exceed input channels",
        ));
    }
    if format.max_frames == 0 {
        return Err(EngineError::InvalidFormat("max frame count must be non-zero"));
    }
    Ok(())
}
