#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod chain;
mod config;
mod error;
mod global;
mod performance;
mod scheduler;
mod state;

// public, flat re-exports
pub use error::Error;

pub use config::{GrainEngineFactory, PerformanceConfig, PerformanceContext};
pub use state::{DeviceState, State};

pub use scheduler::{IntervalId, Scheduler};

pub use global::{resolve, GlobalParameters, GlobalValues, ParameterSource};

pub use chain::{Chain, ChainKind};
pub use performance::{ChainRegistry, Performance};

// public mods
pub mod audio;
pub mod control;
pub mod effects;
pub mod granular;
pub mod source;
