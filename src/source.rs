//! Sample sources of a chain: a [`Recorder`] capturing the input bus, or a [`Sampler`] playing
//! presets.

use crate::{
    audio::SampleBuffer,
    config::PerformanceContext,
    control::{Position, Surface},
    global::GlobalValues,
    state::DeviceState,
    Error,
};

// -------------------------------------------------------------------------------------------------

mod preset;
mod recorder;
mod sampler;

pub use preset::PresetLibrary;
pub use recorder::Recorder;
pub use sampler::Sampler;

// -------------------------------------------------------------------------------------------------

/// Kind of a chain's source device.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    strum::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum SourceKind {
    Recorder,
    Sampler,
}

/// Buffer notifications a source device hands to its chain.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A new take or preset copy is ready.
    NewSoundFile(SampleBuffer),
    /// The source dropped its buffer.
    Cleared,
}

// -------------------------------------------------------------------------------------------------

/// A chain's source device.
pub enum SourceDevice {
    Recorder(Recorder),
    Sampler(Sampler),
}

impl SourceDevice {
    pub fn new(kind: SourceKind, context: &PerformanceContext, chain_position: Position) -> Self {
        match kind {
            SourceKind::Recorder => Self::Recorder(Recorder::new(context, chain_position)),
            SourceKind::Sampler => Self::Sampler(Sampler::new(context, chain_position)),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Recorder(_) => SourceKind::Recorder,
            Self::Sampler(_) => SourceKind::Sampler,
        }
    }

    pub fn state(&self) -> DeviceState {
        match self {
            Self::Recorder(recorder) => recorder.state(),
            Self::Sampler(sampler) => sampler.state(),
        }
    }

    pub fn buffer(&self) -> Option<&SampleBuffer> {
        match self {
            Self::Recorder(recorder) => recorder.buffer(),
            Self::Sampler(sampler) => sampler.buffer(),
        }
    }

    pub fn level(&self) -> Option<f32> {
        match self {
            Self::Recorder(recorder) => recorder.level(),
            Self::Sampler(sampler) => sampler.level(),
        }
    }

    pub fn as_recorder_mut(&mut self) -> Option<&mut Recorder> {
        match self {
            Self::Recorder(recorder) => Some(recorder),
            Self::Sampler(_) => None,
        }
    }

    pub fn as_sampler_mut(&mut self) -> Option<&mut Sampler> {
        match self {
            Self::Recorder(_) => None,
            Self::Sampler(sampler) => Some(sampler),
        }
    }

    pub fn toggle_loop(&mut self) -> Result<(), Error> {
        match self {
            Self::Recorder(recorder) => recorder.toggle_loop(),
            Self::Sampler(sampler) => sampler.toggle_loop(),
        }
    }

    /// Pull the current input block into a running recording. No-op for samplers.
    pub fn capture(&mut self) {
        if let Self::Recorder(recorder) = self {
            recorder.capture();
        }
    }

    pub fn refresh_parameters(&mut self, globals: &GlobalValues) {
        match self {
            Self::Recorder(recorder) => recorder.refresh_parameters(globals),
            Self::Sampler(sampler) => sampler.refresh_parameters(globals),
        }
    }

    pub fn draw(&mut self, globals: &GlobalValues, surface: &mut dyn Surface) {
        match self {
            Self::Recorder(recorder) => recorder.draw(globals, surface),
            Self::Sampler(sampler) => sampler.draw(globals, surface),
        }
    }

    pub fn write(&mut self, output: &mut [f32]) -> usize {
        match self {
            Self::Recorder(recorder) => recorder.write(output),
            Self::Sampler(sampler) => sampler.write(output),
        }
    }

    pub fn update_pos(&mut self, chain_position: Position) {
        match self {
            Self::Recorder(recorder) => recorder.update_pos(chain_position),
            Self::Sampler(sampler) => sampler.update_pos(chain_position),
        }
    }

    pub fn remove(&mut self) {
        match self {
            Self::Recorder(recorder) => recorder.remove(),
            Self::Sampler(sampler) => sampler.remove(),
        }
    }
}
