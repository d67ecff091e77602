//! Biquad kernel: parametric EQ and raw second-order sections.
//!
//! One kernel instance serves every channel of the current selection, with
//! an independent recurrence state per channel. Coefficients are designed at
//! `initialize` time because they depend on the sample rate; the directive
//! parser only records the specification.

use resona_core::biquad::{DEFAULT_PASS_Q, DEFAULT_SHELF_Q};
use resona_core::{Biquad, BiquadCoeffs, FilterShape, bw_to_q};

use crate::filter::{ChannelBuffer, Filter};

/// What the directive asked for; resolved to coefficients at `initialize`.
#[derive(Debug, Clone, PartialEq)]
pub enum BiquadSpec {
    /// A parametric-EQ response (`Filter n: ON PK Fc 1000 Hz ...`).
    Parametric {
        shape: FilterShape,
        /// Center / corner frequency in Hz.
        freq: f64,
        /// Explicit Q; `None` selects the shape's default.
        q: Option<f64>,
        /// Bandwidth in octaves; takes precedence over `q` when set.
        bandwidth: Option<f64>,
        /// Gain in dB (peaking and shelving shapes only).
        gain_db: f64,
    },
    /// Raw normalized coefficients (`BiQuad: b0 b1 b2 a1 a2`).
    Raw(BiquadCoeffs),
}

impl BiquadSpec {
    fn resolve(&self, sample_rate: f64) -> BiquadCoeffs {
        match *self {
            BiquadSpec::Raw(coeffs) => coeffs,
            BiquadSpec::Parametric {
                shape,
                freq,
                q,
                bandwidth,
                gain_db,
            } => {
                let q = match (bandwidth, q) {
                    (Some(bw), _) => bw_to_q(bw),
                    (None, Some(q)) => q,
                    (None, None) => match shape {
                        FilterShape::LowShelf | FilterShape::HighShelf => DEFAULT_SHELF_Q,
                        FilterShape::Notch => 30.0,
                        FilterShape::Peaking | FilterShape::Allpass => 1.0,
                        _ => DEFAULT_PASS_Q,
                    },
                };
                // A non-positive Q would blow up alpha = sin/(2q)
                let q = if q > 0.0 { q } else { 1e-2 };
                BiquadCoeffs::design(shape, freq, q, gain_db, sample_rate)
            }
        }
    }
}

/// In-place biquad over the current channel selection.
pub struct BiquadFilter {
    spec: BiquadSpec,
    sections: Vec<Biquad>,
}

impl BiquadFilter {
    pub fn new(spec: BiquadSpec) -> Self {
        BiquadFilter {
            spec,
            sections: Vec::new(),
        }
    }

    /// The coefficients in effect after `initialize`.
    pub fn coeffs(&self) -> Option<&BiquadCoeffs> {
        self.sections.first().map(|s| s.coeffs())
    }
}

impl Filter for BiquadFilter {
    fn initialize(
        &mut self,
        sample_rate: f64,
        _max_frames: usize,
        channels: &[String],
    ) -> Vec<String> {
        let coeffs = self.spec.resolve(sample_rate);
        self.sections = channels.iter().map(|_| Biquad::new(coeffs)).collect();
        channels.to_vec()
    }

    fn process(
        &mut self,
        pool: &mut [ChannelBuffer],
        inputs: &[usize],
        _outputs: &[usize],
        frames: usize,
    ) {
        for (section, &lane) in self.sections.iter_mut().zip(inputs) {
            section.process_block(&mut pool[lane][..frames]);
        }
    }
}
