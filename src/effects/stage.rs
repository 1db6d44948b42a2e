use super::{DelayControls, DelayNode, FilterControls, FilterNode, ReverbControls, ReverbNode};
use crate::{
    audio::LevelMeter,
    config::PerformanceContext,
    control::{Position, Surface},
    global::GlobalValues,
    Error,
};

// -------------------------------------------------------------------------------------------------

/// A chain's effects: filter -> delay -> reverb, each with its own dry/wet mix.
pub struct EffectsStage {
    filter: FilterNode,
    delay: DelayNode,
    reverb: ReverbNode,
    filter_controls: FilterControls,
    delay_controls: DelayControls,
    reverb_controls: ReverbControls,
    meter: Option<LevelMeter>,
    removed: bool,
}

impl EffectsStage {
    pub fn new(context: &PerformanceContext, chain_position: Position) -> Result<Self, Error> {
        let sample_rate = context.config.sample_rate;
        let meter = context
            .config
            .measure_amplitude
            .then(|| LevelMeter::new(context.config.level_smoothing));
        let mut stage = Self {
            filter: FilterNode::new(sample_rate)?,
            delay: DelayNode::new(sample_rate),
            reverb: ReverbNode::new(sample_rate),
            filter_controls: FilterControls::new(),
            delay_controls: DelayControls::new(),
            reverb_controls: ReverbControls::new(),
            meter,
            removed: false,
        };
        stage.update_pos(chain_position);
        Ok(stage)
    }

    pub fn filter(&self) -> &FilterNode {
        &self.filter
    }

    pub fn delay(&self) -> &DelayNode {
        &self.delay
    }

    pub fn reverb(&self) -> &ReverbNode {
        &self.reverb
    }

    pub fn filter_controls_mut(&mut self) -> &mut FilterControls {
        &mut self.filter_controls
    }

    pub fn delay_controls_mut(&mut self) -> &mut DelayControls {
        &mut self.delay_controls
    }

    pub fn reverb_controls_mut(&mut self) -> &mut ReverbControls {
        &mut self.reverb_controls
    }

    /// Level of the stage output, when amplitude measuring is enabled.
    pub fn level(&self) -> Option<f32> {
        self.meter.as_ref().map(|m| m.level())
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Resolve all effect parameters from the controls and the global values.
    ///
    /// A failing filter update does not hold back the delay and reverb: all effects get
    /// refreshed and the filter's error is returned afterwards.
    pub fn refresh_parameters(&mut self, globals: &GlobalValues) -> Result<(), Error> {
        let result = self
            .filter_controls
            .apply(&mut self.filter, globals.density);
        self.delay_controls.apply(&mut self.delay, globals.density);
        self.reverb_controls.apply(&mut self.reverb);
        result
    }

    pub fn draw(&mut self, globals: &GlobalValues, surface: &mut dyn Surface) -> Result<(), Error> {
        if self.removed {
            return Ok(());
        }
        self.refresh_parameters(globals)?;
        self.filter_controls.draw(surface);
        self.delay_controls.draw(surface);
        self.reverb_controls.draw(surface);
        Ok(())
    }

    /// Run the chain bus through all effects in place.
    pub fn process(&mut self, bus: &mut [f32]) {
        if self.removed {
            bus.fill(0.0);
            return;
        }
        self.filter.process(bus);
        self.delay.process(bus);
        self.reverb.process(bus);
        if let Some(meter) = self.meter.as_mut() {
            meter.process(bus);
        }
    }

    pub fn update_pos(&mut self, chain_position: Position) {
        self.filter_controls.update_pos(chain_position);
        self.delay_controls.update_pos(chain_position);
        self.reverb_controls.update_pos(chain_position);
    }

    /// Silence all effect tails and release the controls.
    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.filter.reset();
        self.delay.reset();
        self.reverb.reset();
        self.filter_controls.remove();
        self.delay_controls.remove();
        self.reverb_controls.remove();
        self.removed = true;
    }
}

// -------------------------------------------------------------------------------------------------
