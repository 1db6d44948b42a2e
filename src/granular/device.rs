use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use four_cc::FourCC;

use super::{engine::GrainParameters, pool::GrainVoicePool};
use crate::{
    audio::{LevelMeter, SampleBuffer},
    config::PerformanceContext,
    control::{panel_view, Button, Checkbox, Control, Position, Slider, SliderParameter, Surface},
    global::{resolve, GlobalValues, ParameterSource},
    scheduler::{IntervalId, Scheduler},
    state::{DeviceState, State},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Granulates the chain's current sample buffer with a [`GrainVoicePool`].
///
/// States: `EMPTY -> LOADED -> GRANULATING -> LOADED -> ...`. While granulating, a scheduled
/// interval moves the pool's read cursor forward. The interval is registered once at
/// construction, is inert in all other states, and gets cancelled on [`remove`](Self::remove).
pub struct GranularDevice {
    state: State<DeviceState>,
    pool: Rc<RefCell<GrainVoicePool>>,
    scheduler: Scheduler,
    tick_interval: Option<IntervalId>,
    granulate: Button,
    voice_count: Slider,
    density: Slider,
    pitch: Slider,
    gain: Slider,
    follow_global: Checkbox,
    meter: Option<LevelMeter>,
    position: Position,
    removed: bool,
}

impl GranularDevice {
    pub const NAME: &'static str = "granular";
    pub const TITLE: &'static str = "Granular";

    pub const VOICE_COUNT: SliderParameter =
        SliderParameter::new(FourCC(*b"nvoc"), "NUM GRAINS", 1.0..=15.0, 5.0).with_step(1.0);
    pub const DENSITY: SliderParameter =
        SliderParameter::new(FourCC(*b"dens"), "DENSITY", 0.001..=1.0, 0.9);
    pub const PITCH: SliderParameter =
        SliderParameter::new(FourCC(*b"ptch"), "PITCH", 0.0..=2.5, 1.0);
    pub const GAIN: SliderParameter =
        SliderParameter::new(FourCC(*b"gain"), "GAIN", 0.0..=1.0, 0.5);

    /// Offset of the device panel within its chain row.
    pub const OFFSET: f32 = 200.0;

    const PANEL_SIZE: (f32, f32) = (250.0, 140.0);

    pub fn new(context: &PerformanceContext, chain_position: Position) -> Self {
        let state = State::new(DeviceState::Empty);
        let pool = Rc::new(RefCell::new(GrainVoicePool::new(
            context.new_engine(),
            context.config.cursor_steps,
        )));

        let granulate = Button::new(FourCC(*b"gran"), "granulate", "GRAN", Position::new(5.0, 5.0));
        let follow_global =
            Checkbox::new(FourCC(*b"fglb"), "FOLLOW GLOBAL", Position::new(130.0, 5.0));
        let voice_count = Slider::new(Self::VOICE_COUNT, Position::new(5.0, 35.0));
        let density = Slider::new(Self::DENSITY, Position::new(5.0, 60.0));
        let pitch = Slider::new(Self::PITCH, Position::new(5.0, 85.0));
        let gain = Slider::new(Self::GAIN, Position::new(5.0, 110.0));

        {
            let granulate = granulate.enablement();
            let voice_count = voice_count.enablement();
            state.on_change(move |state| {
                granulate.set(state != DeviceState::Empty);
                voice_count.set(state != DeviceState::Granulating);
            });
        }

        let scheduler = context.scheduler.clone();
        let tick_interval = {
            let pool = Rc::downgrade(&pool);
            let state = state.clone();
            scheduler.set_interval(context.config.grain_tick_interval, move || {
                if state.get() != DeviceState::Granulating {
                    return;
                }
                let Some(pool) = pool.upgrade() else {
                    return;
                };
                let Ok(mut pool) = pool.try_borrow_mut() else {
                    log::warn!("Grain voice pool is busy, skipping cursor tick");
                    return;
                };
                if let Err(err) = pool.tick() {
                    log::error!("Failed to move grain voices: {err}");
                }
            })
        };

        let meter = context
            .config
            .measure_amplitude
            .then(|| LevelMeter::new(context.config.level_smoothing));

        let mut device = Self {
            state,
            pool,
            scheduler,
            tick_interval: Some(tick_interval),
            granulate,
            voice_count,
            density,
            pitch,
            gain,
            follow_global,
            meter,
            position: Position::ZERO,
            removed: false,
        };
        device.state.change(DeviceState::Empty);
        device.update_pos(chain_position);
        device
    }

    /// Map the user facing density and pitch to engine parameters: density is forwarded doubled
    /// and spread is `density / (density / 6)`, which is 6 for any density. A zero density also
    /// maps to a spread of 6.
    pub fn engine_parameters(density: f32, pitch: f32) -> GrainParameters {
        let spread = if density == 0.0 {
            6.0
        } else {
            density / (density / 6.0)
        };
        GrainParameters {
            density: density * 2.0,
            spread,
            pitch,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state.get()
    }

    /// Subscribe to state changes.
    pub fn on_state_change<F: Fn(DeviceState) + 'static>(&self, listener: F) {
        self.state.on_change(listener);
    }

    pub fn pool(&self) -> Ref<'_, GrainVoicePool> {
        self.pool.borrow()
    }

    /// Absolute position of the device panel.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Level of the chain bus, when amplitude measuring is enabled.
    pub fn level(&self) -> Option<f32> {
        self.meter.as_ref().map(|m| m.level())
    }

    pub fn granulate_button(&self) -> &Button {
        &self.granulate
    }

    pub fn voice_count(&self) -> &Slider {
        &self.voice_count
    }

    pub fn voice_count_mut(&mut self) -> &mut Slider {
        &mut self.voice_count
    }

    pub fn density_mut(&mut self) -> &mut Slider {
        &mut self.density
    }

    pub fn pitch_mut(&mut self) -> &mut Slider {
        &mut self.pitch
    }

    pub fn gain_mut(&mut self) -> &mut Slider {
        &mut self.gain
    }

    pub fn follow_global_mut(&mut self) -> &mut Checkbox {
        &mut self.follow_global
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            device: Self::NAME,
            state: self.state.get(),
            action,
        }
    }

    /// Load a new buffer from the chain's source. Live voices get stopped first.
    pub fn set_sound_file(&mut self, buffer: &SampleBuffer) -> Result<(), Error> {
        if self.removed {
            return Err(self.invalid("load"));
        }
        let mut pool = self.pool.borrow_mut();
        if pool.is_active() {
            log::debug!("New sound file while granulating: stopping grain voices");
            pool.stop()?;
            self.granulate.change_text("GRAN");
        }
        pool.set_buffer(buffer)?;
        pool.connect();
        drop(pool);
        self.state.change(DeviceState::Loaded);
        Ok(())
    }

    /// Start granulating with the configured number of voices.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.removed || self.state.get() != DeviceState::Loaded {
            return Err(self.invalid("start"));
        }
        self.granulate.press()?;
        let voice_count = self.voice_count.value() as usize;
        self.pool.borrow_mut().start(voice_count)?;
        self.granulate.change_text("STOP");
        self.state.change(DeviceState::Granulating);
        log::debug!("Granulating with {voice_count} voices");
        Ok(())
    }

    /// Stop granulating. The device returns to LOADED even when the engine rejected some voice
    /// handles, so the user can start again.
    pub fn stop(&mut self) -> Result<(), Error> {
        if self.removed || self.state.get() != DeviceState::Granulating {
            return Err(self.invalid("stop"));
        }
        let result = self.pool.borrow_mut().stop();
        self.granulate.change_text("GRAN");
        self.state.change(DeviceState::Loaded);
        result
    }

    /// The granulate button action: start when loaded, stop when granulating.
    pub fn toggle(&mut self) -> Result<(), Error> {
        if self.state.get() == DeviceState::Granulating {
            self.stop()
        } else {
            self.start()
        }
    }

    /// Force the device back to EMPTY, stopping live voices first.
    pub fn clear(&mut self) -> Result<(), Error> {
        if self.removed {
            return Err(self.invalid("clear"));
        }
        let mut pool = self.pool.borrow_mut();
        let result = pool.stop();
        pool.disconnect();
        // voices are gone even when stopping some of them failed
        pool.clear_buffer()?;
        drop(pool);
        self.granulate.change_text("GRAN");
        self.state.change(DeviceState::Empty);
        result
    }

    /// Push the current density, spread, pitch and gain to the pool. Runs in every state, so
    /// the engine is up to date as soon as granulation starts.
    pub fn refresh_parameters(&mut self, globals: &GlobalValues) -> Result<(), Error> {
        let source = ParameterSource::from_follow(self.follow_global.checked());
        let density = resolve(source, self.density.value(), globals.density);
        let gain = resolve(source, self.gain.value(), globals.gain);
        let mut pool = self.pool.borrow_mut();
        pool.set_parameters(Self::engine_parameters(density, self.pitch.value()));
        pool.set_gain(gain)
    }

    /// Refresh parameters and draw the device panel.
    pub fn draw(&mut self, globals: &GlobalValues, surface: &mut dyn Surface) -> Result<(), Error> {
        if self.removed {
            return Ok(());
        }
        self.refresh_parameters(globals)?;
        surface.draw_panel(&panel_view(
            Self::TITLE,
            self.position,
            Self::PANEL_SIZE,
            &[
                &self.granulate,
                &self.follow_global,
                &self.voice_count,
                &self.density,
                &self.pitch,
                &self.gain,
            ],
        ));
        Ok(())
    }

    /// Render the grain engine output into `output`, overwriting it.
    pub fn write(&mut self, output: &mut [f32]) -> usize {
        if self.removed {
            output.fill(0.0);
            return 0;
        }
        self.pool.borrow_mut().write(output)
    }

    /// Feed the chain bus into the level meter.
    pub fn measure(&mut self, bus: &[f32]) {
        if let Some(meter) = self.meter.as_mut() {
            meter.process(bus);
        }
    }

    /// Move the device along with its chain.
    pub fn update_pos(&mut self, chain_position: Position) {
        self.position = chain_position.offset_x(Self::OFFSET);
        let position = self.position;
        self.granulate.update_parent(position);
        self.follow_global.update_parent(position);
        self.voice_count.update_parent(position);
        self.density.update_parent(position);
        self.pitch.update_parent(position);
        self.gain.update_parent(position);
    }

    /// Stop all voices, cancel the cursor tick and release the controls. Removing twice is a
    /// no-op.
    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        if let Some(interval) = self.tick_interval.take() {
            self.scheduler.clear_interval(interval);
        }
        {
            let mut pool = self.pool.borrow_mut();
            if let Err(err) = pool.stop() {
                log::warn!("Failed to stop grain voices of removed device: {err}");
            }
            pool.disconnect();
        }
        self.state.clear_listeners();
        self.granulate.remove();
        self.follow_global.remove();
        self.voice_count.remove();
        self.density.remove();
        self.pitch.remove();
        self.gain.remove();
        self.removed = true;
        log::debug!("Removed granular device");
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::PerformanceConfig,
        control::RecordingSurface,
        granular::{EngineCall, GrainEngine, RecordingEngine},
        source::PresetLibrary,
    };
    use std::time::Duration;

    type CallLog = Rc<RefCell<Vec<EngineCall>>>;

    fn context() -> (PerformanceContext, CallLog) {
        let calls: CallLog = Rc::new(RefCell::new(Vec::new()));
        let context = PerformanceContext::new(PerformanceConfig::default(), PresetLibrary::new())
            .unwrap()
            .with_engine_factory({
                let calls = Rc::clone(&calls);
                move |_| Box::new(RecordingEngine::with_log(Rc::clone(&calls))) as Box<dyn GrainEngine>
            });
        (context, calls)
    }

    fn buffer() -> SampleBuffer {
        SampleBuffer::new(vec![0.5; 64], 44100).unwrap()
    }

    fn count_calls(calls: &CallLog, filter: impl Fn(&EngineCall) -> bool) -> usize {
        calls.borrow().iter().filter(|c| filter(c)).count()
    }

    #[test]
    fn state_transitions() {
        let (context, calls) = context();
        let mut device = GranularDevice::new(&context, Position::new(20.0, 100.0));
        assert_eq!(device.state(), DeviceState::Empty);
        assert!(!device.granulate_button().is_enabled());
        assert!(matches!(
            device.start(),
            Err(Error::InvalidTransition {
                state: DeviceState::Empty,
                ..
            })
        ));

        device.set_sound_file(&buffer()).unwrap();
        assert_eq!(device.state(), DeviceState::Loaded);
        assert!(device.pool().is_connected());
        assert!(device.granulate_button().is_enabled());

        device.start().unwrap();
        assert_eq!(device.state(), DeviceState::Granulating);
        assert_eq!(device.granulate_button().label(), "STOP");
        assert!(!device.voice_count().is_enabled());
        let started = |c: &EngineCall| matches!(c, EngineCall::StartVoice(..));
        assert_eq!(count_calls(&calls, started), 5);

        // no duplicate voices
        assert!(device.start().is_err());
        assert_eq!(count_calls(&calls, started), 5);
        assert_eq!(device.pool().voices().len(), 5);

        device.stop().unwrap();
        assert_eq!(device.state(), DeviceState::Loaded);
        assert!(device.voice_count().is_enabled());
        assert!(device.pool().voices().is_empty());
        assert!(device.stop().is_err());

        device.toggle().unwrap();
        assert_eq!(device.state(), DeviceState::Granulating);
        device.toggle().unwrap();
        assert_eq!(device.state(), DeviceState::Loaded);
    }

    #[test]
    fn voice_count_is_frozen_while_granulating() {
        let (context, calls) = context();
        let mut device = GranularDevice::new(&context, Position::ZERO);
        device.set_sound_file(&buffer()).unwrap();
        device.voice_count_mut().set_value(3.0);
        device.start().unwrap();
        device.voice_count_mut().set_value(12.0);
        assert_eq!(device.voice_count().value(), 3.0);
        assert_eq!(
            count_calls(&calls, |c| matches!(c, EngineCall::StartVoice(..))),
            3
        );
    }

    #[test]
    fn tick_is_inert_unless_granulating() {
        let (context, calls) = context();
        let mut device = GranularDevice::new(&context, Position::ZERO);
        device.set_sound_file(&buffer()).unwrap();
        context.scheduler.advance(Duration::from_millis(5));
        assert_eq!(device.pool().position(), 0.0);

        device.start().unwrap();
        context.scheduler.advance(Duration::from_millis(3));
        assert!((device.pool().position() - 0.003).abs() < 1e-9);
        assert_eq!(
            count_calls(
                &calls,
                |c| matches!(c, EngineCall::UpdateVoice(_, u) if u.position.is_some())
            ),
            15
        );

        device.stop().unwrap();
        context.scheduler.advance(Duration::from_millis(3));
        assert!((device.pool().position() - 0.003).abs() < 1e-9);
    }

    #[test]
    fn remove_cancels_tick_once() {
        let (context, _) = context();
        let mut device = GranularDevice::new(&context, Position::ZERO);
        assert_eq!(context.scheduler.interval_count(), 1);
        device.set_sound_file(&buffer()).unwrap();
        device.start().unwrap();

        device.remove();
        assert!(device.is_removed());
        assert_eq!(context.scheduler.interval_count(), 0);
        assert!(device.pool().voices().is_empty());
        assert!(!device.granulate_button().is_enabled());
        device.remove();
        assert_eq!(context.scheduler.advance(Duration::from_millis(2)), 0);
        assert!(device.start().is_err());
    }

    #[test]
    fn clear_stops_voices() {
        let (context, calls) = context();
        let mut device = GranularDevice::new(&context, Position::ZERO);
        device.set_sound_file(&buffer()).unwrap();
        device.start().unwrap();
        device.clear().unwrap();
        assert_eq!(device.state(), DeviceState::Empty);
        assert!(device.pool().buffer().is_none());
        assert!(!device.pool().is_connected());
        assert_eq!(
            count_calls(&calls, |c| matches!(c, EngineCall::StopVoice(_))),
            5
        );
    }

    #[test]
    fn new_sound_file_while_granulating_reloads() {
        let (context, _) = context();
        let mut device = GranularDevice::new(&context, Position::ZERO);
        device.set_sound_file(&buffer()).unwrap();
        device.start().unwrap();
        device.set_sound_file(&buffer()).unwrap();
        assert_eq!(device.state(), DeviceState::Loaded);
        assert!(device.pool().voices().is_empty());
        assert_eq!(device.granulate_button().label(), "GRAN");
    }

    #[test]
    fn parameter_refresh_follows_global() {
        let (context, calls) = context();
        let mut device = GranularDevice::new(&context, Position::ZERO);
        let globals = GlobalValues {
            density: 0.25,
            gain: 1.0,
        };
        device.density_mut().set_value(0.5);
        device.refresh_parameters(&globals).unwrap();
        assert_eq!(
            calls.borrow().last(),
            Some(&EngineCall::SetParameters(GrainParameters {
                density: 1.0,
                spread: 6.0,
                pitch: 1.0
            }))
        );
        assert_eq!(device.pool().gain(), 0.5);

        device.follow_global_mut().set_checked(true);
        device.refresh_parameters(&globals).unwrap();
        assert_eq!(
            calls.borrow().last(),
            Some(&EngineCall::SetParameters(GrainParameters {
                density: 0.5,
                spread: 6.0,
                pitch: 1.0
            }))
        );
        assert_eq!(device.pool().gain(), 1.0);
    }

    #[test]
    fn spread_mapping() {
        for density in [0.0, 0.001, 0.3, 1.0] {
            let parameters = GranularDevice::engine_parameters(density, 1.0);
            assert!((parameters.spread - 6.0).abs() < 1e-5);
            assert_eq!(parameters.density, density * 2.0);
        }
    }

    #[test]
    fn panel_moves_with_chain() {
        let (context, _) = context();
        let mut device = GranularDevice::new(&context, Position::new(20.0, 100.0));
        assert_eq!(device.position(), Position::new(220.0, 100.0));
        device.update_pos(Position::new(20.0, 250.0));
        let mut surface = RecordingSurface::new();
        device.draw(&GlobalValues::default(), &mut surface).unwrap();
        let panel = surface
            .panel_at(GranularDevice::TITLE, Position::new(220.0, 250.0))
            .unwrap();
        assert_eq!(panel.controls.len(), 6);
        assert_eq!(panel.controls[0].position, Position::new(225.0, 255.0));
    }
}
