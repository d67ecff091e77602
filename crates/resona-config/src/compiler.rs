//! The configuration compiler.
//!
//! Drives the directive factories over the tokenized config, resolves
//! includes, maintains the channel selection, and produces the ordered
//! [`FilterInfo`] list plus the lane-name table the graph is built from.
//!
//! Compilation is a pure function of the config text, the stream format,
//! the device info and the metadata store contents: identical inputs yield
//! identical filter/routing sequences.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use resona_filters::{Filter, FilterInfo};

use crate::channels::{default_channel_mask, lane_names};
use crate::device::{DeviceInfo, StagePhase};
use crate::error::ConfigError;
use crate::expr::{EvalHost, Evaluator, ExprError, Value};
use crate::factories::{FilterFactory, default_factories};
use crate::store::MetadataStore;

/// Includes deeper than this are dropped (cycle guard).
const MAX_INCLUDE_DEPTH: usize = 16;

/// Attempts for files that fail with a transient sharing error.
const READ_RETRIES: usize = 100;

/// Stream parameters fixed at engine initialization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFormat {
    pub sample_rate: f64,
    /// Interleaved lanes in the host input buffer.
    pub input_channels: usize,
    /// Input lanes that carry audio; the rest are spare lanes.
    pub real_channels: usize,
    /// Interleaved lanes in the host output buffer.
    pub output_channels: usize,
    /// Speaker-position bitmask; 0 lets the engine pick a default.
    pub channel_mask: u32,
    /// Upper bound for per-callback frame counts.
    pub max_frames: usize,
}

impl StreamFormat {
    /// The mask actually used for lane naming: an explicit mask, or the
    /// default derived from the device channel count.
    pub fn effective_mask(&self, is_capture: bool) -> u32 {
        if self.channel_mask != 0 {
            self.channel_mask
        } else {
            let device_channels = if is_capture {
                self.input_channels
            } else {
                self.output_channels
            };
            default_channel_mask(device_channels)
        }
    }

    /// Crossfade length in samples: 10 ms.
    pub fn transition_length(&self) -> usize {
        (self.sample_rate / 100.0) as usize
    }
}

/// The compiled artifact: filters with routing, the lane-name table (pool
/// size = `lane_names.len()`), and the metadata paths the compilation
/// referenced (for change watching).
pub struct CompiledConfig {
    pub filters: Vec<FilterInfo>,
    pub lane_names: Vec<String>,
    pub watch_paths: Vec<String>,
}

impl CompiledConfig {
    pub fn lane_count(&self) -> usize {
        self.lane_names.len()
    }
}

/// Mutable compiler state the factories operate on.
pub struct CompileContext<'a> {
    pub format: StreamFormat,
    pub device: DeviceInfo,
    pub phase: StagePhase,
    store: &'a dyn MetadataStore,
    evaluator: Evaluator,
    watch_paths: BTreeSet<String>,
    /// Every lane name in pool order; grows as filters introduce lanes.
    pub all_channel_names: Vec<String>,
    /// The current selection (`Channel:` directive).
    pub selection: Vec<String>,
    pending_include: Option<String>,
}

/// Adapter giving the evaluator store access while recording watch paths.
struct StoreHost<'a> {
    store: &'a dyn MetadataStore,
    watch_paths: &'a mut BTreeSet<String>,
}

impl EvalHost for StoreHost<'_> {
    fn store_read(&mut self, path: &str, name: &str) -> Option<String> {
        self.watch_paths.insert(path.to_string());
        self.store.read(path, name)
    }

    fn store_exists(&mut self, path: &str, name: &str) -> bool {
        self.watch_paths.insert(path.to_string());
        self.store.exists(path, name)
    }
}

impl CompileContext<'_> {
    /// Evaluates a single expression against the compilation's variables.
    pub fn eval(&mut self, input: &str) -> Result<Value, ExprError> {
        let mut host = StoreHost {
            store: self.store,
            watch_paths: &mut self.watch_paths,
        };
        self.evaluator.eval(input, &mut host)
    }

    /// Evaluates `;`-separated statements (`Eval:` directive).
    pub fn eval_statements(&mut self, input: &str) -> Result<(), ExprError> {
        let mut host = StoreHost {
            store: self.store,
            watch_paths: &mut self.watch_paths,
        };
        self.evaluator.eval_statements(input, &mut host)
    }

    /// Resets the selection to every lane.
    pub fn select_all(&mut self) {
        self.selection = self.all_channel_names.clone();
    }

    /// Queues an include to run after the current line's dispatch.
    pub fn request_include(&mut self, path: &str) {
        self.pending_include = Some(path.to_string());
    }
}

#[cfg(test)]
pub(crate) fn test_context(store: &dyn MetadataStore) -> CompileContext<'_> {
    let names = vec!["L".to_string(), "R".to_string()];
    CompileContext {
        format: StreamFormat {
            sample_rate: 48000.0,
            input_channels: 2,
            real_channels: 2,
            output_channels: 2,
            channel_mask: crate::channels::mask::STEREO,
            max_frames: 512,
        },
        device: DeviceInfo::default(),
        phase: StagePhase::PostMix,
        store,
        evaluator: Evaluator::new(),
        watch_paths: BTreeSet::new(),
        selection: names.clone(),
        all_channel_names: names,
        pending_include: None,
    }
}

#[cfg(test)]
impl CompileContext<'_> {
    pub(crate) fn take_pending_include(&mut self) -> Option<String> {
        self.pending_include.take()
    }
}

/// Compiles configuration files against a fixed format/device/store triple.
pub struct Compiler<'a> {
    format: StreamFormat,
    device: DeviceInfo,
    phase: StagePhase,
    store: &'a dyn MetadataStore,
}

impl<'a> Compiler<'a> {
    pub fn new(
        format: StreamFormat,
        device: DeviceInfo,
        phase: StagePhase,
        store: &'a dyn MetadataStore,
    ) -> Self {
        Compiler {
            format,
            device,
            phase,
            store,
        }
    }

    /// Compiles the root configuration file.
    ///
    /// # Errors
    ///
    /// Only an unreadable root file is an error; every nested problem
    /// (missing includes, bad directives) is logged and absorbed.
    pub fn compile_file(&self, path: &Path) -> Result<CompiledConfig, ConfigError> {
        let mut session = Session::new(self);
        session.start_of_configuration();

        let text = read_config_text(path)
            .map_err(|source| ConfigError::read_file(path, source))?;
        session.process_text(&text, path, 0);

        Ok(session.finish())
    }

    /// Compiles configuration text directly; includes resolve relative to
    /// `base_dir`.
    pub fn compile_str(&self, text: &str, base_dir: &Path) -> CompiledConfig {
        let mut session = Session::new(self);
        session.start_of_configuration();
        session.process_text(text, &base_dir.join("config.txt"), 0);
        session.finish()
    }
}

/// One compilation in flight: context, factories, routing state, output.
struct Session<'a> {
    ctx: CompileContext<'a>,
    factories: Vec<Box<dyn FilterFactory>>,
    filters: Vec<FilterInfo>,
    last_channel_names: Vec<String>,
    last_new_channel_names: Vec<String>,
    last_in_place: bool,
}

impl<'a> Session<'a> {
    fn new(compiler: &Compiler<'a>) -> Self {
        let mask = compiler.format.effective_mask(compiler.device.is_capture);
        let names = lane_names(
            mask,
            compiler.format.real_channels,
            compiler.format.output_channels,
        );
        debug!(?names, mask, "initial lane layout");

        Session {
            ctx: CompileContext {
                format: compiler.format,
                device: compiler.device.clone(),
                phase: compiler.phase,
                store: compiler.store,
                evaluator: Evaluator::new(),
                watch_paths: BTreeSet::new(),
                selection: names.clone(),
                all_channel_names: names,
                pending_include: None,
            },
            factories: default_factories(),
            filters: Vec::new(),
            last_channel_names: Vec::new(),
            last_new_channel_names: Vec::new(),
            last_in_place: false,
        }
    }

    fn start_of_configuration(&mut self) {
        let Session { factories, ctx, .. } = self;
        let emitted: Vec<_> = factories
            .iter_mut()
            .flat_map(|f| f.start_of_configuration(ctx))
            .collect();
        self.add_filters(emitted);
    }

    fn process_text(&mut self, text: &str, path: &Path, depth: usize) {
        info!(path = %path.display(), "loading configuration");

        let saved_selection = self.ctx.selection.clone();

        {
            let Session { factories, ctx, .. } = self;
            let emitted: Vec<_> = factories
                .iter_mut()
                .flat_map(|f| f.start_of_file(ctx, path))
                .collect();
            self.add_filters(emitted);
        }

        for raw_line in text.lines() {
            let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
            let Some((raw_key, raw_value)) = line.split_once(':') else {
                continue;
            };
            let key = raw_key.trim();
            if key.is_empty() {
                continue;
            }

            let value = if raw_value.contains('`') {
                match self.interpolate(raw_value) {
                    Ok(value) => value,
                    Err(error) => {
                        warn!(key, %error, "expression interpolation failed, line skipped");
                        continue;
                    }
                }
            } else {
                raw_value.to_string()
            };

            let claimed = {
                let Session { factories, ctx, .. } = self;
                factories.iter_mut().find_map(|f| f.create(ctx, key, &value))
            };
            match claimed {
                Some(emitted) => self.add_filters(emitted),
                None => debug!(key, "no factory claimed key, line ignored"),
            }

            if let Some(include) = self.ctx.pending_include.take() {
                self.process_include(&include, path, depth);
            }
        }

        {
            let Session { factories, ctx, .. } = self;
            let emitted: Vec<_> = factories
                .iter_mut()
                .flat_map(|f| f.end_of_file(ctx, path))
                .collect();
            self.add_filters(emitted);
        }

        // restore the selection of the including file
        self.ctx.selection = saved_selection;
    }

    fn process_include(&mut self, include: &str, including: &Path, depth: usize) {
        if depth >= MAX_INCLUDE_DEPTH {
            warn!(include, "include depth limit reached, file skipped");
            return;
        }

        let target = {
            let requested = Path::new(include);
            if requested.is_absolute() {
                requested.to_path_buf()
            } else {
                including
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(requested)
            }
        };

        match read_config_text(&target) {
            Ok(text) => self.process_text(&text, &target, depth + 1),
            Err(error) => {
                warn!(path = %target.display(), %error, "include could not be read, skipped");
            }
        }
    }

    /// Substitutes `` `expr` `` segments in a directive value.
    fn interpolate(&mut self, value: &str) -> Result<String, ExprError> {
        let parts: Vec<&str> = value.split('`').collect();
        if parts.len() % 2 == 0 {
            return Err(ExprError::UnterminatedInterpolation);
        }

        let mut result = String::with_capacity(value.len());
        for (i, part) in parts.iter().enumerate() {
            if i % 2 == 0 {
                result.push_str(part);
            } else {
                let evaluated = self.ctx.eval(part)?;
                result.push_str(&evaluated.to_string());
            }
        }
        Ok(result)
    }

    /// The channel-routing pass: computes each filter's pool bindings.
    ///
    /// `last_channel_names` is what the next filter may reuse as its input
    /// binding, `last_new_channel_names` what an in-place successor may
    /// reuse as its output binding; the two swap when a filter is not
    /// in-place, because then its outputs are what the follow-up filter
    /// consumes.
    fn add_filters(&mut self, new_filters: Vec<Box<dyn Filter>>) {
        for mut filter in new_filters {
            let in_place = filter.in_place();
            let saved_selection = self.ctx.selection.clone();

            if filter.all_channels() {
                self.ctx.selection = self.ctx.all_channel_names.clone();
            } else {
                let CompileContext {
                    selection,
                    all_channel_names,
                    ..
                } = &mut self.ctx;
                selection.retain(|name| all_channel_names.contains(name));
            }

            let in_channels = if self.last_channel_names == self.ctx.selection {
                Vec::new()
            } else {
                self.ctx
                    .selection
                    .iter()
                    .filter_map(|name| {
                        self.ctx.all_channel_names.iter().position(|n| n == name)
                    })
                    .collect()
            };

            self.last_channel_names = self.ctx.selection.clone();

            let new_names = filter.initialize(
                self.ctx.format.sample_rate,
                self.ctx.format.max_frames,
                &self.ctx.selection,
            );

            let out_channels = if in_place
                && self.last_in_place
                && self.last_new_channel_names == new_names
            {
                Vec::new()
            } else {
                new_names
                    .iter()
                    .map(|name| {
                        match self.ctx.all_channel_names.iter().position(|n| n == name) {
                            Some(index) => index,
                            None => {
                                self.ctx.all_channel_names.push(name.clone());
                                self.ctx.all_channel_names.len() - 1
                            }
                        }
                    })
                    .collect()
            };

            let select = filter.select_channels();
            self.last_new_channel_names = new_names.clone();
            self.last_in_place = in_place;
            if !in_place {
                std::mem::swap(&mut self.last_channel_names, &mut self.last_new_channel_names);
            }

            self.filters.push(FilterInfo {
                filter,
                in_place,
                in_channels,
                out_channels,
            });

            self.ctx.selection = if select { new_names } else { saved_selection };
        }
    }

    fn finish(mut self) -> CompiledConfig {
        {
            let Session { factories, ctx, .. } = &mut self;
            let emitted: Vec<_> = factories
                .iter_mut()
                .flat_map(|f| f.end_of_configuration(ctx))
                .collect();
            self.add_filters(emitted);
        }

        info!(
            filters = self.filters.len(),
            lanes = self.ctx.all_channel_names.len(),
            "configuration compiled"
        );

        CompiledConfig {
            filters: self.filters,
            lane_names: self.ctx.all_channel_names,
            watch_paths: self.ctx.watch_paths.into_iter().collect(),
        }
    }
}

/// Reads and decodes a config file. Transient sharing errors (a writer
/// still holds the file) are retried with a short sleep before giving up.
fn read_config_text(path: &Path) -> io::Result<String> {
    let mut attempts = 0;
    let bytes = loop {
        match std::fs::read(path) {
            Ok(bytes) => break bytes,
            Err(error)
                if attempts < READ_RETRIES
                    && matches!(
                        error.kind(),
                        io::ErrorKind::PermissionDenied | io::ErrorKind::WouldBlock
                    ) =>
            {
                attempts += 1;
                thread::sleep(Duration::from_millis(1));
            }
            Err(error) => return Err(error),
        }
    };
    Ok(decode_config_bytes(&bytes))
}

/// UTF-8 with a Latin-1 fallback when decoding produced replacement
/// codepoints. The fallback mirrors the historic system-code-page behavior
/// and can misread genuinely non-Latin legacy files; flagged as such.
fn decode_config_bytes(bytes: &[u8]) -> String {
    let lossy = String::from_utf8_lossy(bytes);
    if lossy.contains('\u{FFFD}') {
        bytes.iter().map(|&b| b as char).collect()
    } else {
        lossy.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NullStore;

    fn stereo_format() -> StreamFormat {
        StreamFormat {
            sample_rate: 48000.0,
            input_channels: 2,
            real_channels: 2,
            output_channels: 2,
            channel_mask: crate::channels::mask::STEREO,
            max_frames: 512,
        }
    }

    #[test]
    fn decode_prefers_utf8() {
        assert_eq!(decode_config_bytes("Préamp: -6 dB".as_bytes()), "Préamp: -6 dB");
    }

    #[test]
    fn decode_falls_back_to_latin1() {
        // 0xE9 is 'é' in Latin-1 but invalid as a standalone UTF-8 byte
        let bytes = b"Pr\xE9amp: -6 dB";
        assert_eq!(decode_config_bytes(bytes), "Préamp: -6 dB");
    }

    #[test]
    fn transition_length_is_ten_ms() {
        assert_eq!(stereo_format().transition_length(), 480);
    }

    #[test]
    fn effective_mask_defaults_by_channel_count() {
        let mut format = stereo_format();
        format.channel_mask = 0;
        assert_eq!(format.effective_mask(false), crate::channels::mask::STEREO);
        format.output_channels = 6;
        assert_eq!(format.effective_mask(false), crate::channels::mask::SURROUND_5_1);
        // capture devices key off the input count
        format.input_channels = 1;
        assert_eq!(format.effective_mask(true), crate::channels::mask::MONO);
    }

    #[test]
    fn empty_config_compiles_to_empty_graph() {
        let store = NullStore;
        let compiler = Compiler::new(
            stereo_format(),
            DeviceInfo::default(),
            StagePhase::PostMix,
            &store,
        );
        let compiled = compiler.compile_str("", Path::new("/tmp"));
        assert!(compiled.filters.is_empty());
        assert_eq!(compiled.lane_names, vec!["L", "R"]);
        assert!(compiled.watch_paths.is_empty());
    }
}
