use std::rc::Rc;

use four_cc::FourCC;

use super::{PresetLibrary, SourceEvent};
use crate::{
    audio::{LevelMeter, SampleBuffer, SamplePlayer},
    config::PerformanceContext,
    control::{
        panel_view, Button, Checkbox, Control, Position, Selector, Slider, SliderParameter,
        Surface,
    },
    global::{resolve, GlobalValues, ParameterSource},
    state::{DeviceState, State},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Plays a private copy of a preset from the [`PresetLibrary`], once or looped.
///
/// States: `EMPTY -> FULL <-> LOOPING`. Selecting the blank [`NONE`](Self::NONE) entry returns
/// to EMPTY.
pub struct Sampler {
    state: State<DeviceState>,
    presets: Rc<PresetLibrary>,
    player: SamplePlayer,
    buffer: Option<SampleBuffer>,
    preset: Selector,
    looping: Button,
    gain: Slider,
    follow_global: Checkbox,
    meter: Option<LevelMeter>,
    position: Position,
    removed: bool,
}

impl Sampler {
    pub const NAME: &'static str = "sampler";
    pub const TITLE: &'static str = "Sampler";

    /// The "no preset selected" entry of the preset chooser.
    pub const NONE: &'static str = " ";

    pub const GAIN: SliderParameter =
        SliderParameter::new(FourCC(*b"sgai"), "GAIN", 0.0..=1.0, 0.8);

    const PANEL_SIZE: (f32, f32) = (170.0, 90.0);

    pub fn new(context: &PerformanceContext, chain_position: Position) -> Self {
        let state = State::new(DeviceState::Empty);
        let presets = Rc::clone(&context.presets);
        let preset = Selector::new(
            FourCC(*b"prst"),
            "preset",
            std::iter::once(Self::NONE).chain(presets.names()),
            Position::new(5.0, 5.0),
        );
        let looping = Button::new(FourCC(*b"loop"), "loop", "LOOP", Position::new(100.0, 5.0));
        let gain = Slider::new(Self::GAIN, Position::new(5.0, 35.0));
        let follow_global =
            Checkbox::new(FourCC(*b"fgai"), "FOLLOW GLOBAL", Position::new(5.0, 60.0));

        {
            let preset = preset.enablement();
            let looping = looping.enablement();
            state.on_change(move |state| {
                preset.set(state != DeviceState::Looping);
                looping.set(matches!(state, DeviceState::Full | DeviceState::Looping));
            });
        }

        let meter = context
            .config
            .measure_amplitude
            .then(|| LevelMeter::new(context.config.level_smoothing));

        let mut sampler = Self {
            state,
            presets,
            player: SamplePlayer::new(),
            buffer: None,
            preset,
            looping,
            gain,
            follow_global,
            meter,
            position: Position::ZERO,
            removed: false,
        };
        sampler.state.change(DeviceState::Empty);
        sampler.update_pos(chain_position);
        sampler
    }

    pub fn state(&self) -> DeviceState {
        self.state.get()
    }

    pub fn on_state_change<F: Fn(DeviceState) + 'static>(&self, listener: F) {
        self.state.on_change(listener);
    }

    /// The private copy of the selected preset.
    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_ref()
    }

    /// Name of the selected preset, `NONE` when nothing is selected.
    pub fn selected_preset(&self) -> &str {
        self.preset.value()
    }

    pub fn player(&self) -> &SamplePlayer {
        &self.player
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn level(&self) -> Option<f32> {
        self.meter.as_ref().map(|m| m.level())
    }

    pub fn preset_selector(&self) -> &Selector {
        &self.preset
    }

    pub fn loop_button(&self) -> &Button {
        &self.looping
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

    /// The preset chooser action.
    ///
    /// Selecting a preset copies its samples into a private buffer and returns it as
    /// [`SourceEvent::NewSoundFile`]. Selecting [`NONE`](Self::NONE) drops the buffer and returns
    /// [`SourceEvent::Cleared`]. The chooser is disabled while looping.
    pub fn select_preset(&mut self, name: &str) -> Result<SourceEvent, Error> {
        if self.removed {
            return Err(self.invalid("select"));
        }
        if !self.preset.is_enabled() {
            log::warn!("Preset chooser is disabled");
            return Err(Error::ControlDisabled("preset"));
        }
        if name == Self::NONE {
            self.preset.select(Self::NONE);
            self.buffer = None;
            self.player.clear_buffer();
            self.player.disconnect();
            self.state.change(DeviceState::Empty);
            log::debug!("Cleared sampler preset");
            return Ok(SourceEvent::Cleared);
        }
        let Some(preset) = self.presets.get(name) else {
            log::warn!("Unknown preset '{name}'");
            return Err(Error::PresetNotFound(name.to_string()));
        };
        let buffer = preset.copy();
        self.preset.select(name);
        self.buffer = Some(buffer.clone());
        self.player.set_buffer(buffer.clone());
        self.player.connect();
        self.state.change(DeviceState::Full);
        log::debug!("Selected sampler preset '{name}'");
        Ok(SourceEvent::NewSoundFile(buffer))
    }

    /// The loop button action: start or stop looping the selected preset.
    pub fn toggle_loop(&mut self) -> Result<(), Error> {
        if self.removed {
            return Err(self.invalid("loop"));
        }
        match self.state.get() {
            DeviceState::Full => {
                self.looping.press()?;
                self.player.loop_playback();
                self.looping.change_text("STOP");
                self.state.change(DeviceState::Looping);
                Ok(())
            }
            DeviceState::Looping => {
                self.player.stop();
                self.looping.change_text("LOOP");
                self.state.change(DeviceState::Full);
                Ok(())
            }
            _ => Err(self.invalid("loop")),
        }
    }

    /// Apply the current gain to playback.
    pub fn refresh_parameters(&mut self, globals: &GlobalValues) {
        let source = ParameterSource::from_follow(self.follow_global.checked());
        self.player
            .set_volume(resolve(source, self.gain.value(), globals.gain));
    }

    pub fn draw(&mut self, globals: &GlobalValues, surface: &mut dyn Surface) {
        if self.removed {
            return;
        }
        self.refresh_parameters(globals);
        surface.draw_panel(&panel_view(
            Self::TITLE,
            self.position,
            Self::PANEL_SIZE,
            &[&self.preset, &self.looping, &self.gain, &self.follow_global],
        ));
    }

    /// Render playback into `output`, overwriting it.
    pub fn write(&mut self, output: &mut [f32]) -> usize {
        let written = self.player.write(output);
        if let Some(meter) = self.meter.as_mut() {
            meter.process(output);
        }
        written
    }

    pub fn update_pos(&mut self, chain_position: Position) {
        self.position = chain_position;
        self.preset.update_parent(chain_position);
        self.looping.update_parent(chain_position);
        self.gain.update_parent(chain_position);
        self.follow_global.update_parent(chain_position);
    }

    /// Stop playback, then release the controls.
    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.player.stop();
        self.player.disconnect();
        self.state.clear_listeners();
        self.preset.remove();
        self.looping.remove();
        self.gain.remove();
        self.follow_global.remove();
        self.removed = true;
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerformanceConfig;

    fn context() -> PerformanceContext {
        let presets = PresetLibrary::new()
            .with("piano", SampleBuffer::new(vec![0.1, 0.2, 0.3], 44100).unwrap())
            .with("drums", SampleBuffer::new(vec![0.9; 8], 44100).unwrap());
        PerformanceContext::new(PerformanceConfig::default(), presets).unwrap()
    }

    #[test]
    fn preset_is_copied() {
        let context = context();
        let mut sampler = Sampler::new(&context, Position::ZERO);
        assert_eq!(sampler.state(), DeviceState::Empty);
        assert_eq!(sampler.selected_preset(), Sampler::NONE);
        assert_eq!(
            sampler.preset_selector().options(),
            &[" ".to_string(), "piano".to_string(), "drums".to_string()]
        );

        let buffer = match sampler.select_preset("piano").unwrap() {
            SourceEvent::NewSoundFile(buffer) => buffer,
            other => panic!("unexpected event {other:?}"),
        };
        let preset = context.presets.get("piano").unwrap();
        assert_eq!(buffer.samples(), preset.samples());
        assert!(!buffer.ptr_eq(preset));
        assert!(!sampler.buffer().unwrap().ptr_eq(preset));
        assert_eq!(sampler.state(), DeviceState::Full);
        assert!(sampler.player().is_connected());
    }

    #[test]
    fn blank_selection_empties() {
        let context = context();
        let mut sampler = Sampler::new(&context, Position::ZERO);
        sampler.select_preset("drums").unwrap();
        assert!(matches!(
            sampler.select_preset(Sampler::NONE).unwrap(),
            SourceEvent::Cleared
        ));
        assert_eq!(sampler.state(), DeviceState::Empty);
        assert!(sampler.buffer().is_none());
        assert!(!sampler.loop_button().is_enabled());
    }

    #[test]
    fn unknown_preset_keeps_state() {
        let context = context();
        let mut sampler = Sampler::new(&context, Position::ZERO);
        sampler.select_preset("piano").unwrap();
        assert!(matches!(
            sampler.select_preset("violin"),
            Err(Error::PresetNotFound(_))
        ));
        assert_eq!(sampler.state(), DeviceState::Full);
        assert_eq!(sampler.selected_preset(), "piano");
    }

    #[test]
    fn chooser_is_locked_while_looping() {
        let context = context();
        let mut sampler = Sampler::new(&context, Position::ZERO);
        sampler.select_preset("piano").unwrap();
        sampler.toggle_loop().unwrap();
        assert_eq!(sampler.state(), DeviceState::Looping);
        assert!(!sampler.preset_selector().is_enabled());
        assert!(matches!(
            sampler.select_preset("drums"),
            Err(Error::ControlDisabled("preset"))
        ));

        sampler.toggle_loop().unwrap();
        assert!(sampler.preset_selector().is_enabled());
        assert!(sampler.select_preset("drums").is_ok());
    }
}
