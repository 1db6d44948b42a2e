//! The top level of a performance: global parameters, the chain registry and the render cycle.

use std::time::Duration;

use crate::{
    chain::{Chain, ChainKind},
    audio::LevelMeter,
    config::{PerformanceConfig, PerformanceContext},
    control::Surface,
    global::GlobalParameters,
    source::{PresetLibrary, SourceKind},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Ordered list of chains, laid out in a gap-free vertical stack.
#[derive(Default)]
pub struct ChainRegistry {
    chains: Vec<Chain>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Chain> {
        self.chains.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Chain> {
        self.chains.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chain> {
        self.chains.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chain> {
        self.chains.iter_mut()
    }

    /// Append a new chain in the next free slot. Returns the chain's index.
    pub fn add(&mut self, kind: ChainKind, context: &PerformanceContext) -> Result<usize, Error> {
        let slot = self.chains.len();
        self.chains.push(Chain::new(kind, context, slot)?);
        Ok(slot)
    }

    /// Remove the chain at `index`, cascading the removal to its devices, then move all
    /// following chains up so the slots stay contiguous.
    pub fn remove(&mut self, index: usize) -> Result<(), Error> {
        if index >= self.chains.len() {
            return Err(Error::ChainNotFound(index));
        }
        let mut chain = self.chains.remove(index);
        chain.remove();
        self.renumber();
        Ok(())
    }

    /// Remove all chains.
    pub fn clear(&mut self) {
        for chain in &mut self.chains {
            chain.remove();
        }
        self.chains.clear();
    }

    fn renumber(&mut self) {
        for (slot, chain) in self.chains.iter_mut().enumerate() {
            if chain.slot() != slot {
                chain.update_pos(slot);
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A live performance: a set of chains sharing one input bus, one scheduler and one set of
/// global parameters.
///
/// The host drives it by calling [`process`](Self::process) with blocks of input and output
/// samples, and [`draw`](Self::draw) whenever it wants to display the devices.
///
/// Failures inside a single chain during the render cycle get logged and never affect sibling
/// chains.
pub struct Performance {
    context: PerformanceContext,
    globals: GlobalParameters,
    chains: ChainRegistry,
    input_meter: Option<LevelMeter>,
}

impl Performance {
    /// Create a new, empty performance with the given config and presets.
    pub fn new(config: PerformanceConfig, presets: PresetLibrary) -> Result<Self, Error> {
        Self::with_context(PerformanceContext::new(config, presets)?)
    }

    /// Create a new, empty performance from a prepared context, e.g. with a custom grain engine.
    pub fn with_context(context: PerformanceContext) -> Result<Self, Error> {
        context.config.validate()?;
        log::debug!(
            "Created performance with sample rate {} and block size {}",
            context.config.sample_rate,
            context.config.block_size
        );
        let input_meter = context
            .config
            .measure_amplitude
            .then(|| LevelMeter::new(context.config.level_smoothing));
        Ok(Self {
            context,
            globals: GlobalParameters::new(),
            chains: ChainRegistry::new(),
            input_meter,
        })
    }

    pub fn config(&self) -> &PerformanceConfig {
        &self.context.config
    }

    pub fn context(&self) -> &PerformanceContext {
        &self.context
    }

    pub fn global_parameters(&self) -> &GlobalParameters {
        &self.globals
    }

    pub fn global_parameters_mut(&mut self) -> &mut GlobalParameters {
        &mut self.globals
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn chain(&self, index: usize) -> Option<&Chain> {
        self.chains.get(index)
    }

    pub fn chain_mut(&mut self, index: usize) -> Result<&mut Chain, Error> {
        self.chains
            .get_mut(index)
            .ok_or(Error::ChainNotFound(index))
    }

    /// Level of the input (microphone) bus, when amplitude measuring is enabled.
    pub fn input_level(&self) -> Option<f32> {
        self.input_meter.as_ref().map(|m| m.level())
    }

    /// Current time of the performance's scheduler.
    pub fn now(&self) -> Duration {
        self.context.scheduler.now()
    }

    /// Add a chain with the given source and an optional granular device.
    /// Returns the new chain's index.
    pub fn add_chain(&mut self, source: SourceKind, with_granular: bool) -> Result<usize, Error> {
        self.chains
            .add(ChainKind::new(source, with_granular), &self.context)
    }

    /// Delete the chain at `index`. Remaining chains move up.
    pub fn delete_chain(&mut self, index: usize) -> Result<(), Error> {
        self.chains.remove(index)
    }

    /// Draw the global parameters and all chains.
    pub fn draw(&mut self, surface: &mut dyn Surface) {
        self.globals.draw(surface);
        let globals = self.globals.values();
        for chain in self.chains.iter_mut() {
            if let Err(err) = chain.draw(&globals, surface) {
                log::error!("Failed to draw chain {}: {err}", chain.slot());
            }
        }
    }

    /// Move the scheduler forward without rendering audio.
    pub fn advance(&mut self, delta: Duration) {
        self.context.scheduler.advance(delta);
    }

    /// Run the render cycle for one buffer of mono input and output samples.
    ///
    /// The output gets split into blocks of at most `block_size` frames. For each block the
    /// input bus is fed and measured, scheduled ticks run, all parameters are refreshed and then
    /// every chain is mixed into the output. Missing input frames are treated as silence.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        output.fill(0.0);
        let block_size = self.context.config.block_size;
        let sample_rate = self.context.config.sample_rate as f64;
        let mut offset = 0;
        for block in output.chunks_mut(block_size) {
            let frames = block.len();
            let block_input = input.get(offset..).unwrap_or(&[]);
            self.context.input.write_padded(block_input, frames);
            if let Some(meter) = self.input_meter.as_mut() {
                self.context.input.read(|samples| meter.process(samples));
            }
            self.context
                .scheduler
                .advance(Duration::from_secs_f64(frames as f64 / sample_rate));

            let globals = self.globals.values();
            for chain in self.chains.iter_mut() {
                if let Err(err) = chain.refresh_parameters(&globals) {
                    log::error!(
                        "Failed to refresh parameters of chain {}: {err}",
                        chain.slot()
                    );
                }
                chain.process(block);
            }
            offset += frames;
        }
    }
}

impl Drop for Performance {
    fn drop(&mut self) {
        self.chains.clear();
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::SampleBuffer, control::Position, control::RecordingSurface, state::DeviceState,
    };

    fn presets() -> PresetLibrary {
        let samples = (0..4410)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 44100.0).sin() * 0.5)
            .collect();
        PresetLibrary::new().with("piano", SampleBuffer::new(samples, 44100).unwrap())
    }

    fn performance() -> Performance {
        Performance::new(PerformanceConfig::default(), presets()).unwrap()
    }

    #[test]
    fn removal_renumbers_slots() {
        let mut performance = performance();
        performance.add_chain(SourceKind::Recorder, false).unwrap();
        performance.add_chain(SourceKind::Sampler, true).unwrap();
        performance.add_chain(SourceKind::Sampler, false).unwrap();
        assert_eq!(performance.chains().len(), 3);

        performance.delete_chain(1).unwrap();
        let chains = performance.chains();
        assert_eq!(chains.len(), 2);
        let first = chains.get(0).unwrap();
        let second = chains.get(1).unwrap();
        assert_eq!(first.kind(), ChainKind::Recorder);
        assert_eq!(second.kind(), ChainKind::Sampler);
        assert_eq!((first.slot(), second.slot()), (0, 1));
        assert_eq!(first.position(), Position::new(20.0, 100.0));
        assert_eq!(second.position(), Position::new(20.0, 250.0));

        assert!(matches!(
            performance.delete_chain(2),
            Err(Error::ChainNotFound(2))
        ));
    }

    #[test]
    fn removed_chain_cancels_its_tick() {
        let mut performance = performance();
        performance.add_chain(SourceKind::Sampler, true).unwrap();
        performance.add_chain(SourceKind::Recorder, true).unwrap();
        assert_eq!(performance.context().scheduler.interval_count(), 2);
        performance.delete_chain(0).unwrap();
        assert_eq!(performance.context().scheduler.interval_count(), 1);
        assert_eq!(
            performance.chain(0).unwrap().granular().unwrap().position(),
            Position::new(220.0, 100.0)
        );
    }

    #[test]
    fn sampler_to_granular_flow() {
        let mut performance = performance();
        let index = performance.add_chain(SourceKind::Sampler, true).unwrap();
        let chain = performance.chain_mut(index).unwrap();
        chain.select_preset("piano").unwrap();
        chain.toggle_granulate().unwrap();
        assert_eq!(chain.granular().unwrap().state(), DeviceState::Granulating);

        let mut output = vec![0.0; 4096];
        performance.process(&[], &mut output);
        assert!(output.iter().any(|s| *s != 0.0));
        let granular = performance.chain(index).unwrap().granular().unwrap();
        assert!(granular.pool().position() > 0.0);
        assert!(granular.level().unwrap() > 0.0);

        // blank sentinel forces the granular device back to EMPTY
        let chain = performance.chain_mut(index).unwrap();
        chain.select_preset(" ").unwrap();
        assert_eq!(chain.granular().unwrap().state(), DeviceState::Empty);
        assert!(chain.granular().unwrap().pool().voices().is_empty());
    }

    #[test]
    fn recorder_captures_input() {
        let mut performance = performance();
        let index = performance.add_chain(SourceKind::Recorder, true).unwrap();
        performance.chain_mut(index).unwrap().toggle_record().unwrap();
        let input = vec![0.3; 1024];
        let mut output = vec![0.0; 1024];
        performance.process(&input, &mut output);
        let chain = performance.chain_mut(index).unwrap();
        chain.toggle_record().unwrap();
        assert_eq!(chain.source().state(), DeviceState::Full);
        assert_eq!(chain.source().buffer().unwrap().len(), 1024);
        assert_eq!(chain.granular().unwrap().state(), DeviceState::Loaded);
    }

    #[test]
    fn short_input_records_silence() {
        let mut performance = performance();
        let index = performance.add_chain(SourceKind::Recorder, false).unwrap();
        performance.chain_mut(index).unwrap().toggle_record().unwrap();
        let input = vec![0.3; 100];
        let mut output = vec![0.0; 1024];
        performance.process(&input, &mut output);
        let chain = performance.chain_mut(index).unwrap();
        chain.toggle_record().unwrap();
        let take = chain.source().buffer().unwrap();
        assert_eq!(take.len(), 1024);
        assert!(take.samples()[..100].iter().all(|s| *s == 0.3));
        assert!(take.samples()[100..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn measures_input_level() {
        let mut performance = performance();
        assert_eq!(performance.input_level(), Some(0.0));
        let input = vec![0.5; 2048];
        let mut output = vec![0.0; 2048];
        performance.process(&input, &mut output);
        assert!(performance.input_level().unwrap() > 0.3);
        for _ in 0..50 {
            performance.process(&[], &mut output);
        }
        assert!(performance.input_level().unwrap() < 1e-3);

        let mut performance = Performance::new(
            PerformanceConfig::default().measure_amplitude(false),
            presets(),
        )
        .unwrap();
        performance.process(&input, &mut output);
        assert_eq!(performance.input_level(), None);
    }

    #[test]
    fn low_sample_rates_create_chains() {
        let mut performance = Performance::new(
            PerformanceConfig::default().sample_rate(16000),
            PresetLibrary::new(),
        )
        .unwrap();
        let index = performance.add_chain(SourceKind::Sampler, true).unwrap();
        performance
            .chain_mut(index)
            .unwrap()
            .effects_mut()
            .filter_controls_mut()
            .follow_global
            .set_checked(true);
        performance.global_parameters_mut().density_mut().set_value(1.0);
        let mut output = vec![0.0; 512];
        performance.process(&[], &mut output);
        let filter = performance.chain(index).unwrap().effects().filter();
        assert!(filter.cutoff() < 8000.0);
    }

    #[test]
    fn draws_globals_and_chains() {
        let mut performance = performance();
        performance.add_chain(SourceKind::Sampler, true).unwrap();
        let mut surface = RecordingSurface::new();
        performance.draw(&mut surface);
        // globals, sampler, granular, filter, delay, reverb
        assert_eq!(surface.panels().len(), 6);
    }
}
