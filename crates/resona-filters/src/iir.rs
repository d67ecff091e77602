//! Arbitrary-order IIR kernel in direct form II transposed.
//!
//! The `IIR:` directive supplies raw numerator/denominator coefficients.
//! Coefficients are normalized by `a0` at construction; the per-channel
//! state vector is sized for the filter order at `initialize`.

use crate::filter::{ChannelBuffer, Filter};

/// In-place IIR of order `max(b.len(), a.len()) - 1`.
pub struct IirFilter {
    /// Numerator, zero-padded to order + 1.
    b: Vec<f64>,
    /// Denominator without the leading 1, zero-padded to order.
    a: Vec<f64>,
    /// Per-channel DF2T state, `order` entries each.
    state: Vec<Vec<f64>>,
}

impl IirFilter {
    /// Builds the kernel from raw coefficient lists. `a[0]` is divided out;
    /// it must be non-zero (the factory rejects zero before constructing).
    pub fn new(b: Vec<f64>, a: Vec<f64>) -> Self {
        let a0 = a.first().copied().unwrap_or(1.0);
        let order = b.len().max(a.len()).saturating_sub(1);

        let mut b_norm = vec![0.0; order + 1];
        for (slot, &value) in b_norm.iter_mut().zip(&b) {
            *slot = value / a0;
        }
        let mut a_norm = vec![0.0; order];
        for (slot, &value) in a_norm.iter_mut().zip(a.iter().skip(1)) {
            *slot = value / a0;
        }

        IirFilter {
            b: b_norm,
            a: a_norm,
            state: Vec::new(),
        }
    }

    /// Filter order (number of state variables per channel).
    pub fn order(&self) -> usize {
        self.a.len()
    }
}

impl Filter for IirFilter {
    fn initialize(
        &mut self,
        _sample_rate: f64,
        _max_frames: usize,
        channels: &[String],
    ) -> Vec<String> {
        self.state = channels.iter().map(|_| vec![0.0; self.order()]).collect();
        channels.to_vec()
    }

    fn process(
        &mut self,
        pool: &mut [ChannelBuffer],
        inputs: &[usize],
        _outputs: &[usize],
        frames: usize,
    ) {
        let order = self.a.len();
        for (state, &lane) in self.state.iter_mut().zip(inputs) {
            let buffer = &mut pool[lane][..frames];
            if order == 0 {
                for sample in buffer.iter_mut() {
                    *sample = (self.b[0] * *sample as f64) as f32;
                }
                continue;
            }
            for sample in buffer.iter_mut() {
                let x = *sample as f64;
                let y = self.b[0] * x + state[0];
                for i in 0..order - 1 {
                    state[i] = state[i + 1] + self.b[i + 1] * x - self.a[i] * y;
                }
                state[order - 1] = self.b[order] * x - self.a[order - 1] * y;
                *sample = y as f32;
            }
        }
    }
}
