//! A chain of devices: one source, an optional granular device and an effects stage, all sharing
//! one mono bus.

use crate::{
    audio::{add_buffers, SampleBuffer},
    config::PerformanceContext,
    control::{Position, Surface},
    effects::EffectsStage,
    global::GlobalValues,
    granular::GranularDevice,
    source::{SourceDevice, SourceEvent, SourceKind},
    state::DeviceState,
    Error,
};

// -------------------------------------------------------------------------------------------------

/// The device combinations a chain can be created with.
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
#[strum(serialize_all = "kebab-case")]
pub enum ChainKind {
    Recorder,
    Sampler,
    GranularRecorder,
    GranularSampler,
}

impl ChainKind {
    pub fn new(source: SourceKind, with_granular: bool) -> Self {
        match (source, with_granular) {
            (SourceKind::Recorder, false) => Self::Recorder,
            (SourceKind::Sampler, false) => Self::Sampler,
            (SourceKind::Recorder, true) => Self::GranularRecorder,
            (SourceKind::Sampler, true) => Self::GranularSampler,
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        match self {
            Self::Recorder | Self::GranularRecorder => SourceKind::Recorder,
            Self::Sampler | Self::GranularSampler => SourceKind::Sampler,
        }
    }

    pub fn has_granular(&self) -> bool {
        matches!(self, Self::GranularRecorder | Self::GranularSampler)
    }
}

// -------------------------------------------------------------------------------------------------

/// One row of devices in a performance.
///
/// Source playback and the grain engine output are mixed additively into the chain's bus, which
/// then runs through the effects stage.
pub struct Chain {
    kind: ChainKind,
    slot: usize,
    position: Position,
    context: PerformanceContext,
    source: SourceDevice,
    granular: Option<GranularDevice>,
    effects: EffectsStage,
    bus: Vec<f32>,
    scratch: Vec<f32>,
    removed: bool,
}

impl Chain {
    const NAME: &'static str = "chain";

    /// Create a new chain in the given layout slot.
    pub fn new(kind: ChainKind, context: &PerformanceContext, slot: usize) -> Result<Self, Error> {
        let position = context.config.chain_position(slot);
        let source = SourceDevice::new(kind.source_kind(), context, position);
        let granular = kind
            .has_granular()
            .then(|| GranularDevice::new(context, position));
        let effects = EffectsStage::new(context, position)?;
        let block_size = context.config.block_size;
        log::debug!("Created {kind} chain in slot {slot}");
        Ok(Self {
            kind,
            slot,
            position,
            context: context.clone(),
            source,
            granular,
            effects,
            bus: vec![0.0; block_size],
            scratch: vec![0.0; block_size],
            removed: false,
        })
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn source(&self) -> &SourceDevice {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut SourceDevice {
        &mut self.source
    }

    pub fn granular(&self) -> Option<&GranularDevice> {
        self.granular.as_ref()
    }

    pub fn granular_mut(&mut self) -> Option<&mut GranularDevice> {
        self.granular.as_mut()
    }

    pub fn effects(&self) -> &EffectsStage {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectsStage {
        &mut self.effects
    }

    /// Output level of the chain, when amplitude measuring is enabled.
    pub fn level(&self) -> Option<f32> {
        self.effects.level()
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            device: Self::NAME,
            state: self.source.state(),
            action,
        }
    }

    /// Record button of a recorder chain.
    pub fn toggle_record(&mut self) -> Result<(), Error> {
        let Some(recorder) = self.source.as_recorder_mut() else {
            return Err(self.invalid("record"));
        };
        if let Some(event) = recorder.toggle_record()? {
            self.handle_source_event(event)?;
        }
        Ok(())
    }

    /// Preset chooser of a sampler chain.
    pub fn select_preset(&mut self, name: &str) -> Result<(), Error> {
        let Some(sampler) = self.source.as_sampler_mut() else {
            return Err(self.invalid("select"));
        };
        let event = sampler.select_preset(name)?;
        self.handle_source_event(event)
    }

    /// Loop button of the source device.
    pub fn toggle_loop(&mut self) -> Result<(), Error> {
        self.source.toggle_loop()
    }

    /// Granulate button of the granular device.
    pub fn toggle_granulate(&mut self) -> Result<(), Error> {
        match self.granular.as_mut() {
            Some(granular) => granular.toggle(),
            None => Err(self.invalid("granulate")),
        }
    }

    /// Hand a new buffer of the source to the granular device, if any.
    pub fn new_sound_file(&mut self, buffer: &SampleBuffer) -> Result<(), Error> {
        match self.granular.as_mut() {
            Some(granular) => granular.set_sound_file(buffer),
            None => Ok(()),
        }
    }

    fn handle_source_event(&mut self, event: SourceEvent) -> Result<(), Error> {
        match event {
            SourceEvent::NewSoundFile(buffer) => self.new_sound_file(&buffer),
            SourceEvent::Cleared => match self.granular.as_mut() {
                Some(granular) if granular.state() != DeviceState::Empty => granular.clear(),
                _ => Ok(()),
            },
        }
    }

    /// Resolve all device parameters without drawing anything.
    pub fn refresh_parameters(&mut self, globals: &GlobalValues) -> Result<(), Error> {
        if self.removed {
            return Ok(());
        }
        self.source.refresh_parameters(globals);
        if let Some(granular) = self.granular.as_mut() {
            granular.refresh_parameters(globals)?;
        }
        self.effects.refresh_parameters(globals)
    }

    /// Refresh all device parameters and draw their panels.
    pub fn draw(&mut self, globals: &GlobalValues, surface: &mut dyn Surface) -> Result<(), Error> {
        if self.removed {
            return Ok(());
        }
        self.source.draw(globals, surface);
        if let Some(granular) = self.granular.as_mut() {
            granular.draw(globals, surface)?;
        }
        self.effects.draw(globals, surface)
    }

    /// Render one block of the chain and add it to `output`.
    pub fn process(&mut self, output: &mut [f32]) {
        if self.removed {
            return;
        }
        let frames = output.len();
        self.bus.resize(frames, 0.0);
        self.scratch.resize(frames, 0.0);

        self.source.capture();
        self.source.write(&mut self.bus);
        if let Some(granular) = self.granular.as_mut() {
            granular.write(&mut self.scratch);
            add_buffers(&mut self.bus, &self.scratch);
            granular.measure(&self.bus);
        }
        self.effects.process(&mut self.bus);
        add_buffers(output, &self.bus);
    }

    /// Move the chain and all its devices to a new layout slot.
    pub fn update_pos(&mut self, slot: usize) {
        self.slot = slot;
        self.position = self.context.config.chain_position(slot);
        let position = self.position;
        self.source.update_pos(position);
        if let Some(granular) = self.granular.as_mut() {
            granular.update_pos(position);
        }
        self.effects.update_pos(position);
    }

    /// Remove all devices: stops playback, capture and grain voices before releasing controls.
    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.source.remove();
        if let Some(granular) = self.granular.as_mut() {
            granular.remove();
        }
        self.effects.remove();
        self.removed = true;
        log::debug!("Removed {} chain from slot {}", self.kind, self.slot);
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        config::PerformanceConfig,
        control::RecordingSurface,
        granular::{EngineCall, GrainEngine, RecordingEngine},
        source::PresetLibrary,
    };

    fn context() -> (PerformanceContext, Rc<RefCell<Vec<EngineCall>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let presets = PresetLibrary::new()
            .with("piano", SampleBuffer::new(vec![0.25; 256], 44100).unwrap());
        let context = PerformanceContext::new(PerformanceConfig::default(), presets)
            .unwrap()
            .with_engine_factory({
                let calls = Rc::clone(&calls);
                move |_| Box::new(RecordingEngine::with_log(Rc::clone(&calls))) as Box<dyn GrainEngine>
            });
        (context, calls)
    }

    #[test]
    fn kinds() {
        assert_eq!(
            ChainKind::new(SourceKind::Sampler, true),
            ChainKind::GranularSampler
        );
        assert_eq!(ChainKind::GranularRecorder.source_kind(), SourceKind::Recorder);
        assert!(!ChainKind::Sampler.has_granular());
        assert_eq!(ChainKind::GranularSampler.to_string(), "granular-sampler");
    }

    #[test]
    fn preset_reaches_granular_device() {
        let (context, calls) = context();
        let mut chain = Chain::new(ChainKind::GranularSampler, &context, 0).unwrap();
        chain.select_preset("piano").unwrap();
        let granular = chain.granular().unwrap();
        assert_eq!(granular.state(), DeviceState::Loaded);
        let pool_buffer = granular.pool().buffer().unwrap().clone();
        assert!(!pool_buffer.ptr_eq(chain.source().buffer().unwrap()));

        chain.toggle_granulate().unwrap();
        assert_eq!(chain.granular().unwrap().state(), DeviceState::Granulating);

        // the blank sentinel stops the voices and forces the granular device to EMPTY
        chain.select_preset(" ").unwrap();
        assert_eq!(chain.source().state(), DeviceState::Empty);
        assert_eq!(chain.granular().unwrap().state(), DeviceState::Empty);
        let calls = calls.borrow();
        let started = calls
            .iter()
            .filter(|c| matches!(c, EngineCall::StartVoice(..)))
            .count();
        let stopped = calls
            .iter()
            .filter(|c| matches!(c, EngineCall::StopVoice(..)))
            .count();
        assert_eq!((started, stopped), (5, 5));
    }

    #[test]
    fn wrong_source_actions_are_rejected() {
        let (context, _) = context();
        let mut chain = Chain::new(ChainKind::Sampler, &context, 0).unwrap();
        assert!(chain.toggle_record().is_err());
        assert!(chain.toggle_granulate().is_err());
        assert!(chain.new_sound_file(&SampleBuffer::new(vec![0.1], 44100).unwrap()).is_ok());
    }

    #[test]
    fn looping_sampler_reaches_output() {
        let (context, _) = context();
        let mut chain = Chain::new(ChainKind::Sampler, &context, 0).unwrap();
        chain.select_preset("piano").unwrap();
        chain.toggle_loop().unwrap();
        let mut surface = RecordingSurface::new();
        chain.draw(&GlobalValues::default(), &mut surface).unwrap();
        let mut output = vec![0.0; 64];
        chain.process(&mut output);
        assert!(output.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn moves_and_removes_devices() {
        let (context, _) = context();
        let mut chain = Chain::new(ChainKind::GranularRecorder, &context, 2).unwrap();
        assert_eq!(chain.position(), Position::new(20.0, 400.0));
        chain.update_pos(1);
        assert_eq!(chain.slot(), 1);
        assert_eq!(
            chain.granular().unwrap().position(),
            Position::new(220.0, 250.0)
        );

        let intervals = context.scheduler.interval_count();
        chain.remove();
        chain.remove();
        assert!(chain.is_removed());
        assert!(chain.granular().unwrap().is_removed());
        assert!(chain.effects().is_removed());
        assert_eq!(context.scheduler.interval_count(), intervals - 1);

        let mut surface = RecordingSurface::new();
        chain.draw(&GlobalValues::default(), &mut surface).unwrap();
        assert!(surface.panels().is_empty());
    }
}
