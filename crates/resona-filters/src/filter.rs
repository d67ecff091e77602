//! The uniform kernel contract.
//!
//! Every DSP kernel implements [`Filter`]. The lifecycle is two-phase:
//!
//! 1. `initialize` runs at compile time, receives the stream parameters and
//!    the kernel's input channel names, and returns its output channel names
//!    (which may introduce lanes that do not exist yet).
//! 2. `process` runs on the audio thread against the planar buffer pool. It
//!    must be wait-free, allocation-free and bounded, and must tolerate any
//!    `frames <= max_frames`.
//!
//! Kernels never see channel *names* at processing time; the compiler
//! resolves names to pool indices and hands them over as `inputs`/`outputs`
//! slices. For in-place kernels the runtime passes the same binding for both.

/// One planar lane of the working-buffer pool, sized `max_frames`.
pub type ChannelBuffer = Box<[f32]>;

/// Contract implemented by every DSP kernel.
pub trait Filter: Send {
    /// Compile-time setup. Receives the input channel names and returns the
    /// output channel names. Most kernels are in-place and return their
    /// input names unchanged; routing kernels may append new lane names.
    fn initialize(
        &mut self,
        sample_rate: f64,
        max_frames: usize,
        channels: &[String],
    ) -> Vec<String>;

    /// Whether this kernel writes into its input buffers.
    fn in_place(&self) -> bool {
        true
    }

    /// Whether this kernel operates on every lane of the pool instead of the
    /// compiler's current channel selection.
    fn all_channels(&self) -> bool {
        false
    }

    /// Whether this kernel's output channels become the compiler's selection
    /// for subsequent directives.
    fn select_channels(&self) -> bool {
        false
    }

    /// Processes `frames` samples. `inputs[i]`/`outputs[i]` are pool indices
    /// for the i-th channel name reported at `initialize`; for in-place
    /// kernels `outputs` aliases `inputs`.
    fn process(
        &mut self,
        pool: &mut [ChannelBuffer],
        inputs: &[usize],
        outputs: &[usize],
        frames: usize,
    );
}

/// One compiled filter: the kernel plus its routing relative to the pool.
///
/// Immutable once published to the audio thread. An empty `in_channels`
/// means "reuse the previous filter's output binding"; an empty
/// `out_channels` means "reuse the binding of the previous in-place run"
/// (both are produced by the compiler's routing pass and resolved when the
/// graph is built).
pub struct FilterInfo {
    /// The kernel instance with its coefficients.
    pub filter: Box<dyn Filter>,
    /// Cached `filter.in_place()`.
    pub in_place: bool,
    /// Pool indices supplying this filter's inputs; empty = reuse previous.
    pub in_channels: Vec<usize>,
    /// Pool indices receiving this filter's outputs; empty = reuse previous.
    pub out_channels: Vec<usize>,
}

impl core::fmt::Debug for FilterInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FilterInfo")
            .field("in_place", &self.in_place)
            .field("in_channels", &self.in_channels)
            .field("out_channels", &self.out_channels)
            .finish_non_exhaustive()
    }
}
