//! Configuration compiler for the resona processing engine.
//!
//! Turns the line-oriented `key: value` chain description (with includes,
//! conditionals, expressions and per-device selection) into an ordered list
//! of filter instances with channel-routing tables - the input the engine's
//! graph builder consumes.
//!
//! The compiler is deterministic: identical config text, stream format,
//! device info and store contents produce identical routing sequences.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use resona_config::{Compiler, DeviceInfo, NullStore, StagePhase, StreamFormat};
//!
//! let format = StreamFormat {
//!     sample_rate: 48000.0,
//!     input_channels: 2,
//!     real_channels: 2,
//!     output_channels: 2,
//!     channel_mask: resona_config::channels::mask::STEREO,
//!     max_frames: 512,
//! };
//! let store = NullStore;
//! let compiler = Compiler::new(format, DeviceInfo::default(), StagePhase::PostMix, &store);
//! let compiled = compiler.compile_file(Path::new("config.txt")).unwrap();
//! println!("{} filters over {} lanes", compiled.filters.len(), compiled.lane_count());
//! ```

pub mod channels;
pub mod compiler;
pub mod device;
pub mod error;
pub mod expr;
pub mod factories;
pub mod store;

pub use compiler::{CompileContext, CompiledConfig, Compiler, StreamFormat};
pub use device::{DeviceInfo, StagePhase};
pub use error::ConfigError;
pub use expr::{EvalHost, Evaluator, ExprError, Value};
pub use store::{MemoryStore, MetadataStore, NullStore, TomlStore};
