//! The compiled filter graph: kernels, resolved routing and the planar
//! buffer pool for one callback's worth of audio.
//!
//! A graph is immutable in structure once built (only kernel recurrence
//! state changes while processing) and owned by exactly one thread at a
//! time: the compile side builds it, the audio thread runs it, the reload
//! worker drops it after retirement. Nothing here allocates after
//! construction.

use resona_config::{CompiledConfig, StreamFormat};
use resona_filters::{ChannelBuffer, Filter};

/// Per-filter pool bindings with the compiler's reuse encoding resolved.
struct Route {
    inputs: Vec<usize>,
    outputs: Vec<usize>,
}

/// An executable graph over a planar buffer pool.
pub struct FilterGraph {
    kernels: Vec<Box<dyn Filter>>,
    routes: Vec<Route>,
    pool: Vec<ChannelBuffer>,
    /// Host input lanes deinterleaved into the pool.
    input_lanes: usize,
    /// Pool lanes interleaved back out to the host.
    output_lanes: usize,
    input_stride: usize,
}

impl FilterGraph {
    /// Builds a graph from a compiled configuration.
    ///
    /// The empty-`Vec` reuse encoding in [`resona_filters::FilterInfo`] is
    /// resolved here, once: an empty input binding reuses the previous
    /// filter's effective outputs, an empty output binding aliases the
    /// filter's own inputs (in-place reuse). The audio thread then indexes
    /// plain tables.
    pub fn from_compiled(compiled: CompiledConfig, format: &StreamFormat) -> Self {
        let lane_count = compiled
            .lane_count()
            .max(format.real_channels)
            .max(format.output_channels);

        let mut kernels = Vec::with_capacity(compiled.filters.len());
        let mut routes = Vec::with_capacity(compiled.filters.len());
        let mut current: Vec<usize> = Vec::new();

        for info in compiled.filters {
            let inputs = if info.in_channels.is_empty() {
                current.clone()
            } else {
                info.in_channels
            };
            let outputs = if info.out_channels.is_empty() {
                inputs.clone()
            } else {
                info.out_channels
            };
            current = outputs.clone();
            kernels.push(info.filter);
            routes.push(Route { inputs, outputs });
        }

        FilterGraph {
            kernels,
            routes,
            pool: (0..lane_count)
                .map(|_| vec![0.0f32; format.max_frames].into_boxed_slice())
                .collect(),
            input_lanes: lane_count.min(format.input_channels),
            output_lanes: format.output_channels,
            input_stride: format.input_channels,
        }
    }

    /// An identity graph: no filters, pool sized for passthrough.
    pub fn empty(format: &StreamFormat) -> Self {
        FilterGraph {
            kernels: Vec::new(),
            routes: Vec::new(),
            pool: (0..format.real_channels.max(format.output_channels))
                .map(|_| vec![0.0f32; format.max_frames].into_boxed_slice())
                .collect(),
            input_lanes: format
                .input_channels
                .min(format.real_channels.max(format.output_channels)),
            output_lanes: format.output_channels,
            input_stride: format.input_channels,
        }
    }

    /// Whether the graph holds no filters.
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Number of pool lanes.
    pub fn lane_count(&self) -> usize {
        self.pool.len()
    }

    /// Deinterleaves the host input and runs every filter in graph order.
    pub fn process(&mut self, input: &[f32], frames: usize) {
        for lane in 0..self.input_lanes {
            let buffer = &mut self.pool[lane];
            for f in 0..frames {
                buffer[f] = input[f * self.input_stride + lane];
            }
        }

        for (kernel, route) in self.kernels.iter_mut().zip(self.routes.iter()) {
            kernel.process(&mut self.pool, &route.inputs, &route.outputs, frames);
        }
    }

    /// Interleaves the output lanes into the host buffer.
    pub fn write(&self, output: &mut [f32], frames: usize) {
        for lane in 0..self.output_lanes {
            let buffer = &self.pool[lane];
            for f in 0..frames {
                output[f * self.output_lanes + lane] = buffer[f];
            }
        }
    }

    /// Planar access to the output lanes, for the crossfade mixer.
    pub(crate) fn output_pool(&self) -> &[ChannelBuffer] {
        &self.pool[..self.output_lanes]
    }

    /// Mutable planar access to the output lanes.
    pub(crate) fn output_pool_mut(&mut self) -> &mut [ChannelBuffer] {
        let lanes = self.output_lanes;
        &mut self.pool[..lanes]
    }
}
