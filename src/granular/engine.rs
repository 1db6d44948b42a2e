use std::fmt::Display;

use crate::{audio::SampleBuffer, Error};

// -------------------------------------------------------------------------------------------------

/// Opaque handle of a grain voice, issued by a [`GrainEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub(crate) usize);

impl VoiceId {
    pub const fn new(id: usize) -> Self {
        Self(id)
    }
}

impl Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -------------------------------------------------------------------------------------------------

/// Engine-wide grain parameters, shared by all voices of an engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainParameters {
    /// Grain trigger density. 0.0 spawns grains rarely, 2.0 spawns them as fast as possible.
    pub density: f32,
    /// Max random offset of a grain's start position around the voice position, in seconds.
    pub spread: f32,
    /// Playback speed of each grain. 1.0 is the original pitch.
    pub pitch: f32,
}

impl Default for GrainParameters {
    fn default() -> Self {
        Self {
            density: 0.9,
            spread: 0.1,
            pitch: 1.0,
        }
    }
}

/// Attack/decay envelope of a single grain, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainEnvelope {
    pub attack: f32,
    pub decay: f32,
}

impl Default for GrainEnvelope {
    fn default() -> Self {
        Self {
            attack: 0.0,
            decay: 0.5,
        }
    }
}

/// Initial settings of a new grain voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceOptions {
    /// Normalized read position in the engine's buffer (0.0..1.0).
    pub position: f32,
    /// Voice volume.
    pub gain: f32,
}

/// A partial update of a live grain voice. Unset fields stay unchanged.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct VoiceUpdate {
    pub position: Option<f32>,
    pub gain: Option<f32>,
}

impl VoiceUpdate {
    pub fn position(position: f32) -> Self {
        Self {
            position: Some(position),
            gain: None,
        }
    }

    pub fn gain(gain: f32) -> Self {
        Self {
            position: None,
            gain: Some(gain),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A grain synthesis engine which plays any number of grain voices from one sample buffer.
///
/// The engine is the authority on voice handle validity: updating or stopping a handle it did not
/// issue, or one that was already stopped, fails with [`Error::VoiceNotFound`].
pub trait GrainEngine {
    /// Set the buffer grains are read from.
    fn set_buffer(&mut self, buffer: &SampleBuffer);

    /// Start a new grain voice and return its handle.
    fn start_voice(&mut self, options: VoiceOptions) -> Result<VoiceId, Error>;

    /// Update a live voice.
    fn update_voice(&mut self, voice_id: VoiceId, update: VoiceUpdate) -> Result<(), Error>;

    /// Stop and release a live voice.
    fn stop_voice(&mut self, voice_id: VoiceId) -> Result<(), Error>;

    /// Apply new engine-wide parameters. Engines may clamp out of range values.
    fn set_parameters(&mut self, parameters: GrainParameters);

    /// Render the next block of mono output into `output`, overwriting it.
    /// Returns the number of frames which carry audio.
    fn write(&mut self, output: &mut [f32]) -> usize;
}

// -------------------------------------------------------------------------------------------------
