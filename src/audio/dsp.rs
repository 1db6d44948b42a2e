//! Low-level DSP helpers used by the effect nodes.

pub mod biquad;
pub mod delay;
