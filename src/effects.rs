//! The serial post-processing stage of a chain: filter, then delay, then reverb.

mod delay;
mod filter;
mod reverb;
mod stage;

pub use delay::{DelayControls, DelayNode};
pub use filter::{FilterControls, FilterNode};
pub use reverb::{ReverbControls, ReverbNode};
pub use stage::EffectsStage;

pub use crate::audio::dsp::biquad::BiquadFilterType as FilterType;
