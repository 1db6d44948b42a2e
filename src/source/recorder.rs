use four_cc::FourCC;

use super::SourceEvent;
use crate::{
    audio::{LevelMeter, SampleBuffer, SamplePlayer, SoundRecorder},
    config::PerformanceContext,
    control::{panel_view, Button, Checkbox, Control, Position, Slider, SliderParameter, Surface},
    global::{resolve, GlobalValues, ParameterSource},
    state::{DeviceState, State},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Records takes from the shared input bus and plays them back looped.
///
/// States: `EMPTY -> RECORDING -> FULL <-> LOOPING`. Recording again from FULL replaces the take.
pub struct Recorder {
    state: State<DeviceState>,
    recorder: SoundRecorder,
    player: SamplePlayer,
    buffer: Option<SampleBuffer>,
    record: Button,
    looping: Button,
    gain: Slider,
    follow_global: Checkbox,
    meter: Option<LevelMeter>,
    position: Position,
    removed: bool,
}

impl Recorder {
    pub const NAME: &'static str = "recorder";
    pub const TITLE: &'static str = "Recorder";

    pub const GAIN: SliderParameter =
        SliderParameter::new(FourCC(*b"rgai"), "GAIN", 0.0..=1.0, 0.8);

    const PANEL_SIZE: (f32, f32) = (170.0, 90.0);

    pub fn new(context: &PerformanceContext, chain_position: Position) -> Self {
        let state = State::new(DeviceState::Empty);
        let record = Button::new(FourCC(*b"rec "), "record", "REC", Position::new(5.0, 5.0));
        let looping = Button::new(FourCC(*b"loop"), "loop", "LOOP", Position::new(60.0, 5.0));
        let gain = Slider::new(Self::GAIN, Position::new(5.0, 35.0));
        let follow_global =
            Checkbox::new(FourCC(*b"fgai"), "FOLLOW GLOBAL", Position::new(5.0, 60.0));

        {
            let record = record.enablement();
            let looping = looping.enablement();
            state.on_change(move |state| {
                record.set(state != DeviceState::Looping);
                looping.set(matches!(state, DeviceState::Full | DeviceState::Looping));
            });
        }

        let meter = context
            .config
            .measure_amplitude
            .then(|| LevelMeter::new(context.config.level_smoothing));

        let mut recorder = Self {
            state,
            recorder: SoundRecorder::new(context.input.clone(), context.config.sample_rate),
            player: SamplePlayer::new(),
            buffer: None,
            record,
            looping,
            gain,
            follow_global,
            meter,
            position: Position::ZERO,
            removed: false,
        };
        recorder.state.change(DeviceState::Empty);
        recorder.update_pos(chain_position);
        recorder
    }

    pub fn state(&self) -> DeviceState {
        self.state.get()
    }

    pub fn on_state_change<F: Fn(DeviceState) + 'static>(&self, listener: F) {
        self.state.on_change(listener);
    }

    /// The last finished take.
    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_ref()
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

    pub fn record_button(&self) -> &Button {
        &self.record
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

    /// The record button action: start recording, or finish the running take.
    ///
    /// Finishing a take returns it as [`SourceEvent::NewSoundFile`]. When nothing was captured,
    /// the recorder falls back to its previous take (or EMPTY) and reports `EmptyBuffer`.
    pub fn toggle_record(&mut self) -> Result<Option<SourceEvent>, Error> {
        if self.removed {
            return Err(self.invalid("record"));
        }
        match self.state.get() {
            DeviceState::Recording => {
                self.record.change_text("REC");
                let buffer = match self.recorder.stop() {
                    Ok(buffer) => buffer,
                    Err(err) => {
                        let fallback = if self.buffer.is_some() {
                            DeviceState::Full
                        } else {
                            DeviceState::Empty
                        };
                        self.state.change(fallback);
                        return Err(err);
                    }
                };
                log::debug!(
                    "Recorded a take of {:.2} seconds",
                    buffer.duration_secs()
                );
                self.buffer = Some(buffer.clone());
                self.player.set_buffer(buffer.clone());
                self.player.connect();
                self.state.change(DeviceState::Full);
                Ok(Some(SourceEvent::NewSoundFile(buffer)))
            }
            DeviceState::Empty | DeviceState::Full => {
                self.record.press()?;
                self.player.stop();
                self.recorder.record();
                self.record.change_text("STOP");
                self.state.change(DeviceState::Recording);
                log::debug!("Recording...");
                Ok(None)
            }
            _ => Err(self.invalid("record")),
        }
    }

    /// The loop button action: start or stop looping the current take.
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

    /// Append the input bus's current block to a running take.
    pub fn capture(&mut self) {
        self.recorder.capture();
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
            &[&self.record, &self.looping, &self.gain, &self.follow_global],
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
        self.record.update_parent(chain_position);
        self.looping.update_parent(chain_position);
        self.gain.update_parent(chain_position);
        self.follow_global.update_parent(chain_position);
    }

    /// Stop capture and playback, then release the controls.
    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        if self.recorder.is_recording() {
            log::debug!("Recorder removed while recording: dropping the take");
        }
        self.recorder.cancel();
        self.player.stop();
        self.player.disconnect();
        self.state.clear_listeners();
        self.record.remove();
        self.looping.remove();
        self.gain.remove();
        self.follow_global.remove();
        self.removed = true;
    }
}

// -------------------------------------------------------------------------------------------------
