//! Delay kernel: per-channel ring buffers with a fixed whole-sample delay.

use resona_core::{DelayLine, ms_to_samples};

use crate::filter::{ChannelBuffer, Filter};

/// How the directive expressed the delay; resolved at `initialize` because
/// milliseconds depend on the sample rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DelaySpec {
    Samples(usize),
    Millis(f64),
}

impl DelaySpec {
    fn resolve(&self, sample_rate: f64) -> usize {
        match *self {
            DelaySpec::Samples(n) => n,
            DelaySpec::Millis(ms) => ms_to_samples(ms, sample_rate),
        }
    }
}

/// In-place delay over the current channel selection.
pub struct DelayFilter {
    spec: DelaySpec,
    lines: Vec<DelayLine>,
}

impl DelayFilter {
    pub fn new(spec: DelaySpec) -> Self {
        DelayFilter {
            spec,
            lines: Vec::new(),
        }
    }

    /// The delay in samples in effect after `initialize`.
    pub fn delay_samples(&self) -> Option<usize> {
        self.lines.first().map(|l| l.delay_samples())
    }
}

impl Filter for DelayFilter {
    fn initialize(
        &mut self,
        sample_rate: f64,
        _max_frames: usize,
        channels: &[String],
    ) -> Vec<String> {
        let samples = self.spec.resolve(sample_rate);
        self.lines = channels.iter().map(|_| DelayLine::new(samples)).collect();
        channels.to_vec()
    }

    fn process(
        &mut self,
        pool: &mut [ChannelBuffer],
        inputs: &[usize],
        _outputs: &[usize],
        frames: usize,
    ) {
        for (line, &lane) in self.lines.iter_mut().zip(inputs) {
            line.process_block(&mut pool[lane][..frames]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millisecond_spec_resolves_against_sample_rate() {
        let mut filter = DelayFilter::new(DelaySpec::Millis(10.0));
        filter.initialize(48000.0, 16, &["L".to_string()]);
        assert_eq!(filter.delay_samples(), Some(480));
    }

    #[test]
    fn delays_across_process_calls() {
        let mut filter = DelayFilter::new(DelaySpec::Samples(4));
        filter.initialize(48000.0, 4, &["L".to_string()]);

        let mut pool: Vec<ChannelBuffer> = vec![vec![0.0f32; 4].into_boxed_slice()];
        pool[0].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        filter.process(&mut pool, &[0], &[0], 4);
        assert_eq!(&*pool[0], &[0.0, 0.0, 0.0, 0.0]);

        pool[0].fill(0.0);
        filter.process(&mut pool, &[0], &[0], 4);
        assert_eq!(&*pool[0], &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn channels_delay_independently() {
        let mut filter = DelayFilter::new(DelaySpec::Samples(1));
        filter.initialize(48000.0, 2, &["L".to_string(), "R".to_string()]);

        let mut pool: Vec<ChannelBuffer> = vec![
            vec![1.0f32, 0.0].into_boxed_slice(),
            vec![0.0f32, 2.0].into_boxed_slice(),
        ];
        filter.process(&mut pool, &[0, 1], &[0, 1], 2);
        assert_eq!(&*pool[0], &[0.0, 1.0]);
        assert_eq!(&*pool[1], &[0.0, 0.0]);
    }
}
