//! Filter kernels for the resona processing engine.
//!
//! This crate defines the uniform contract every DSP kernel implements
//! ([`Filter`]) plus the kernels the configuration directives compile to:
//!
//! - [`BiquadFilter`] - parametric EQ and raw biquad sections
//! - [`IirFilter`] - arbitrary-order IIR in direct form II transposed
//! - [`PreampFilter`] - constant gain
//! - [`DelayFilter`] - integer-sample / millisecond delay
//! - [`CopyFilter`] - channel mixdown and routing
//!
//! Kernels are created by the configuration factories with their parsed
//! parameters and bound to the working-buffer pool through [`FilterInfo`]
//! by the compiler's routing pass.

pub mod biquad;
pub mod copy;
pub mod delay;
pub mod filter;
pub mod iir;
pub mod preamp;

pub use biquad::{BiquadFilter, BiquadSpec};
pub use copy::{Assignment, CopyFilter, Term};
pub use delay::{DelayFilter, DelaySpec};
pub use filter::{ChannelBuffer, Filter, FilterInfo};
pub use iir::IirFilter;
pub use preamp::PreampFilter;
