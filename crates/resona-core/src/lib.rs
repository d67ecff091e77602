//! Resona Core - DSP primitives for the resona processing engine
//!
//! This crate provides the foundational building blocks the filter kernels
//! are assembled from:
//!
//! - [`Biquad`] second-order IIR section (direct form II transposed)
//! - [`BiquadCoeffs`] RBJ Audio EQ Cookbook coefficient design
//! - [`DelayLine`] integer-sample circular delay buffer
//! - dB/linear conversions in [`math`]
//!
//! ## no_std Support
//!
//! This crate is `no_std` compatible. Use `default-features = false` in your
//! `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! resona-core = { version = "0.2", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod biquad;
pub mod delay;
pub mod math;

pub use biquad::{Biquad, BiquadCoeffs, FilterShape, bw_to_q, q_to_bw};
pub use delay::DelayLine;
pub use math::{db_to_linear, linear_to_db, ms_to_samples};
