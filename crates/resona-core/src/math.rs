//! Mathematical utility functions for DSP.
//!
//! Level and time conversions used throughout the engine. All functions are
//! allocation-free and suitable for `no_std`.

use libm::{exp, log};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use resona_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 1e-9);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 1e-3);
/// ```
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f64 = core::f64::consts::LN_10 / 20.0;
    exp(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// The input is floored at 1e-10 to keep the result finite for silence.
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    const FACTOR: f64 = 20.0 / core::f64::consts::LN_10;
    log(linear.max(1e-10)) * FACTOR
}

/// Convert a time in milliseconds to a whole number of samples, rounding to
/// the nearest sample.
#[inline]
pub fn ms_to_samples(ms: f64, sample_rate: f64) -> usize {
    let samples = ms * sample_rate / 1000.0;
    if samples <= 0.0 { 0 } else { (samples + 0.5) as usize }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_round_trip() {
        for db in [-24.0, -6.0, 0.0, 6.0, 12.0] {
            let linear = db_to_linear(db);
            assert!((linear_to_db(linear) - db).abs() < 1e-9);
        }
    }

    #[test]
    fn db_reference_points() {
        assert!((db_to_linear(-6.0) - 0.501187).abs() < 1e-6);
        assert!((db_to_linear(20.0) - 10.0).abs() < 1e-9);
        assert!((linear_to_db(2.0) - 6.0206).abs() < 1e-3);
    }

    #[test]
    fn linear_to_db_handles_silence() {
        assert!(linear_to_db(0.0).is_finite());
    }

    #[test]
    fn ms_conversion_rounds() {
        assert_eq!(ms_to_samples(10.0, 48000.0), 480);
        assert_eq!(ms_to_samples(0.0, 48000.0), 0);
        // 0.0104166… ms at 48 kHz is half a sample, rounds up
        assert_eq!(ms_to_samples(1000.0 / 96000.0, 48000.0), 1);
    }
}
