//! Performance configuration and the shared context handed to chains and devices.

use std::{rc::Rc, time::Duration};

use crate::{
    audio::InputBus,
    control::Position,
    granular::{GrainEngine, GranularSynth},
    scheduler::Scheduler,
    source::PresetLibrary,
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Options for a [`Performance`](crate::Performance).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceConfig {
    /// By default 44100. Sample rate of all buffers and the rendered output.
    pub sample_rate: u32,
    /// By default 512. Max number of frames processed in one render cycle.
    pub block_size: usize,
    /// By default 1ms. Period of the grain read-cursor tick of each granular device.
    pub grain_tick_interval: Duration,
    /// By default 1000. Number of ticks it takes the read cursor to cross the whole buffer.
    pub cursor_steps: u32,
    /// By default 0.7. Smoothing factor of level meters in range `0.0..1.0`.
    pub level_smoothing: f32,
    /// By default true. When false, no level meters get created, saving some CPU.
    pub measure_amplitude: bool,
    /// By default (20, 100). Position of the first chain.
    pub chain_origin: Position,
    /// By default 150. Vertical distance of chain slots.
    pub chain_spacing: f32,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 512,
            grain_tick_interval: Duration::from_millis(1),
            cursor_steps: 1000,
            level_smoothing: 0.7,
            measure_amplitude: true,
            chain_origin: Position::new(20.0, 100.0),
            chain_spacing: 150.0,
        }
    }
}

impl PerformanceConfig {
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn grain_tick_interval(mut self, interval: Duration) -> Self {
        self.grain_tick_interval = interval;
        self
    }

    pub fn cursor_steps(mut self, steps: u32) -> Self {
        self.cursor_steps = steps;
        self
    }

    pub fn level_smoothing(mut self, smoothing: f32) -> Self {
        self.level_smoothing = smoothing;
        self
    }

    pub fn measure_amplitude(mut self, measure: bool) -> Self {
        self.measure_amplitude = measure;
        self
    }

    pub fn chain_layout(mut self, origin: Position, spacing: f32) -> Self {
        self.chain_origin = origin;
        self.chain_spacing = spacing;
        self
    }

    /// Position of the chain in the given slot.
    pub fn chain_position(&self, slot: usize) -> Position {
        Position::new(
            self.chain_origin.x,
            self.chain_origin.y + slot as f32 * self.chain_spacing,
        )
    }

    /// Validate all options. Returns Error::ParameterError on errors.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sample_rate == 0 {
            return Err(Error::ParameterError(
                "config 'sample_rate' must be > 0".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(Error::ParameterError(
                "config 'block_size' must be > 0".to_string(),
            ));
        }
        if self.grain_tick_interval.is_zero() {
            return Err(Error::ParameterError(
                "config 'grain_tick_interval' must be > 0".to_string(),
            ));
        }
        if self.cursor_steps == 0 {
            return Err(Error::ParameterError(
                "config 'cursor_steps' must be > 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.level_smoothing) {
            return Err(Error::ParameterError(format!(
                "config 'level_smoothing' value is '{}'",
                self.level_smoothing
            )));
        }
        Ok(())
    }
}

// -------------------------------------------------------------------------------------------------

/// Creates grain engines for new granular devices.
pub type GrainEngineFactory = Rc<dyn Fn(&PerformanceConfig) -> Box<dyn GrainEngine>>;

/// Shared resources and options injected into every chain and device at construction.
#[derive(Clone)]
pub struct PerformanceContext {
    pub config: PerformanceConfig,
    pub scheduler: Scheduler,
    pub input: InputBus,
    pub presets: Rc<PresetLibrary>,
    pub engine_factory: GrainEngineFactory,
}

impl PerformanceContext {
    /// Create a new context with a fresh scheduler and input bus, using [`GranularSynth`] engines.
    pub fn new(config: PerformanceConfig, presets: PresetLibrary) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            scheduler: Scheduler::new(),
            input: InputBus::new(config.block_size),
            presets: Rc::new(presets),
            engine_factory: Rc::new(|config: &PerformanceConfig| {
                Box::new(GranularSynth::new(config.sample_rate)) as Box<dyn GrainEngine>
            }),
        })
    }

    /// Replace the grain engine factory, e.g. to inject a custom synthesis engine.
    pub fn with_engine_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&PerformanceConfig) -> Box<dyn GrainEngine> + 'static,
    {
        self.engine_factory = Rc::new(factory);
        self
    }

    /// Create a new grain engine instance.
    pub fn new_engine(&self) -> Box<dyn GrainEngine> {
        (self.engine_factory)(&self.config)
    }
}

// -------------------------------------------------------------------------------------------------
