//! Preamp kernel: constant gain over the current channel selection.

use resona_core::db_to_linear;

use crate::filter::{ChannelBuffer, Filter};

/// Pointwise multiply by a fixed gain factor.
pub struct PreampFilter {
    gain: f32,
}

impl PreampFilter {
    /// Gain from a decibel value.
    pub fn from_db(db: f64) -> Self {
        Self::from_linear(db_to_linear(db) as f32)
    }

    /// Gain from a linear factor.
    pub fn from_linear(gain: f32) -> Self {
        PreampFilter { gain }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl Filter for PreampFilter {
    fn initialize(
        &mut self,
        _sample_rate: f64,
        _max_frames: usize,
        channels: &[String],
    ) -> Vec<String> {
        channels.to_vec()
    }

    fn process(
        &mut self,
        pool: &mut [ChannelBuffer],
        inputs: &[usize],
        _outputs: &[usize],
        frames: usize,
    ) {
        for &lane in inputs {
            for sample in &mut pool[lane][..frames] {
                *sample *= self.gain;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_construction() {
        assert!((PreampFilter::from_db(-6.0).gain() - 0.501187).abs() < 1e-5);
        assert!((PreampFilter::from_db(0.0).gain() - 1.0).abs() < 1e-7);
    }

    #[test]
    fn scales_only_bound_lanes() {
        let mut filter = PreampFilter::from_linear(0.5);
        filter.initialize(48000.0, 4, &["L".to_string()]);

        let mut pool: Vec<ChannelBuffer> = vec![
            vec![1.0f32; 4].into_boxed_slice(),
            vec![1.0f32; 4].into_boxed_slice(),
        ];
        filter.process(&mut pool, &[0], &[0], 4);

        assert!(pool[0].iter().all(|&s| s == 0.5));
        assert!(pool[1].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn respects_frame_count() {
        let mut filter = PreampFilter::from_linear(2.0);
        filter.initialize(48000.0, 4, &["L".to_string()]);

        let mut pool: Vec<ChannelBuffer> = vec![vec![1.0f32; 4].into_boxed_slice()];
        filter.process(&mut pool, &[0], &[0], 2);
        assert_eq!(&*pool[0], &[2.0, 2.0, 1.0, 1.0]);
    }
}
