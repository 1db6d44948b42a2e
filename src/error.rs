use std::{error, fmt, io};

use crate::{granular::VoiceId, state::DeviceState};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by grainloop.
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    BufferNotSet,
    EmptyBuffer,
    InvalidVoiceCount(usize),
    VoicesActive,
    VoiceNotFound(VoiceId),
    InvalidTransition {
        device: &'static str,
        state: DeviceState,
        action: &'static str,
    },
    ControlDisabled(&'static str),
    PresetNotFound(String),
    ChainNotFound(usize),
    ParameterError(String),
    WavError(hound::Error),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferNotSet => write!(f, "No sample buffer is set"),
            Self::EmptyBuffer => write!(f, "Sample buffer is empty"),
            Self::InvalidVoiceCount(count) => {
                write!(f, "Invalid voice count {count}: need at least one voice")
            }
            Self::VoicesActive => write!(f, "Grain voices are still active"),
            Self::VoiceNotFound(voice_id) => write!(f, "Grain voice with id {voice_id} not found"),
            Self::InvalidTransition {
                device,
                state,
                action,
            } => write!(f, "{device}: can't '{action}' while in state {state}"),
            Self::ControlDisabled(name) => write!(f, "Control '{name}' is disabled"),
            Self::PresetNotFound(name) => write!(f, "Preset '{name}' not found"),
            Self::ChainNotFound(index) => write!(f, "Chain at index {index} not found"),
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::WavError(err) => err.fmt(f),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<hound::Error> for Error {
    fn from(err: hound::Error) -> Error {
        match err {
            hound::Error::IoError(err) => Error::IoError(err),
            err => Error::WavError(err),
        }
    }
}
