//! Real-time audio post-processing engine.
//!
//! Sits in a host's audio pipeline and applies a user-authored chain of DSP
//! filters (parametric EQ, biquads, IIRs, delays, routing, preamp,
//! mixdown) to every frame flowing through an endpoint. A text
//! configuration describes the chain; the compiler in [`resona_config`]
//! turns it into an executable [`FilterGraph`]; [`FilterEngine`] runs the
//! graph per callback with hard real-time discipline and swaps in
//! recompiled graphs behind a 10 ms raised-cosine crossfade whenever the
//! configuration changes on disk.
//!
//! # Example
//!
//! ```rust,no_run
//! use resona_config::{StreamFormat, channels::mask};
//! use resona_engine::{EngineSettings, FilterEngine};
//!
//! let mut engine = FilterEngine::new(EngineSettings::new("/etc/resona"));
//! engine.set_device_info(false, "Speakers", "Built-in Audio", "{guid}");
//! engine.initialize(StreamFormat {
//!     sample_rate: 48000.0,
//!     input_channels: 2,
//!     real_channels: 2,
//!     output_channels: 2,
//!     channel_mask: mask::STEREO,
//!     max_frames: 512,
//! })?;
//!
//! // in the audio callback:
//! let input = vec![0.0f32; 2 * 512];
//! let mut output = vec![0.0f32; 2 * 512];
//! engine.process(&input, &mut output);
//! # Ok::<(), resona_engine::EngineError>(())
//! ```

pub mod engine;
pub mod error;
pub mod graph;
mod reload;

pub use engine::{EngineSettings, FilterEngine};
pub use error::EngineError;
pub use graph::FilterGraph;

// the pieces embedders need to configure the engine
pub use resona_config::{
    DeviceInfo, MemoryStore, MetadataStore, NullStore, StagePhase, StreamFormat, TomlStore,
};
