//! Granular synthesis: the engine interface, a built-in engine, the grain voice pool and the
//! granular device which drives it.

mod device;
mod engine;
mod pool;
mod synth;

pub use device::GranularDevice;
pub use engine::{GrainEngine, GrainEnvelope, GrainParameters, VoiceId, VoiceOptions, VoiceUpdate};
pub use pool::GrainVoicePool;
pub use synth::GranularSynth;

#[cfg(test)]
pub(crate) use engine::tests::{EngineCall, RecordingEngine};
