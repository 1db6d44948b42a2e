use four_cc::FourCC;

use crate::{
    audio::apply_dry_wet,
    control::{panel_view, Control, Position, Slider, SliderParameter, Surface},
};

// -------------------------------------------------------------------------------------------------

/// Damped feedback comb filter.
#[derive(Debug, Clone)]
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    damping: f32,
    filter_store: f32,
}

impl Comb {
    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            index: 0,
            feedback: 0.0,
            damping: 0.0,
            filter_store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filter_store = output * (1.0 - self.damping) + self.filter_store * self.damping;
        self.buffer[self.index] = input + self.filter_store * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }

    fn flush(&mut self) {
        self.buffer.fill(0.0);
        self.filter_store = 0.0;
        self.index = 0;
    }
}

/// Schroeder allpass diffuser.
#[derive(Debug, Clone)]
struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    const FEEDBACK: f32 = 0.5;

    fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        self.buffer[self.index] = input + delayed * Self::FEEDBACK;
        self.index = (self.index + 1) % self.buffer.len();
        delayed - input
    }

    fn flush(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }
}

// -------------------------------------------------------------------------------------------------

/// Mono Schroeder reverb: four parallel damped combs into two serial allpasses.
///
/// `time` is the decay time in seconds to -60 dB. `decay` damps the tail's high frequencies,
/// from 0 (bright) to 99 (dark). Changing either rebuilds the reverb and cuts its current tail.
#[derive(Debug, Clone)]
pub struct ReverbNode {
    sample_rate: u32,
    time: f32,
    decay: f32,
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
    wet: f32,
    dry: Vec<f32>,
}

impl ReverbNode {
    pub const MAX_TIME: f32 = 10.0;
    pub const MAX_DECAY: f32 = 99.0;

    // Freeverb tunings at 44.1 kHz
    const COMB_TUNINGS: [usize; 4] = [1116, 1188, 1277, 1356];
    const ALLPASS_TUNINGS: [usize; 2] = [556, 441];

    const INPUT_GAIN: f32 = 0.25;

    pub fn new(sample_rate: u32) -> Self {
        let scale = sample_rate as f32 / 44100.0;
        let combs = Self::COMB_TUNINGS
            .iter()
            .map(|length| Comb::new((*length as f32 * scale) as usize))
            .collect();
        let allpasses = Self::ALLPASS_TUNINGS
            .iter()
            .map(|length| Allpass::new((*length as f32 * scale) as usize))
            .collect();
        let mut reverb = Self {
            sample_rate,
            time: 0.0,
            decay: 0.0,
            combs,
            allpasses,
            wet: ReverbControls::WET.default_value(),
            dry: Vec::new(),
        };
        reverb.set(
            ReverbControls::TIME.default_value(),
            ReverbControls::DECAY.default_value(),
        );
        reverb
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }

    pub fn wet(&self) -> f32 {
        self.wet
    }

    /// Rebuild the reverb for a new decay time and damping.
    pub fn set(&mut self, time: f32, decay: f32) {
        self.time = time.clamp(0.0, Self::MAX_TIME);
        self.decay = decay.clamp(0.0, Self::MAX_DECAY);
        let damping = self.decay / (Self::MAX_DECAY + 1.0);
        for comb in &mut self.combs {
            let delay_secs = comb.buffer.len() as f32 / self.sample_rate as f32;
            comb.feedback = if self.time > 0.0 {
                10.0_f32.powf(-3.0 * delay_secs / self.time)
            } else {
                0.0
            };
            comb.damping = damping;
            comb.flush();
        }
        for allpass in &mut self.allpasses {
            allpass.flush();
        }
        log::debug!(
            "Rebuilt reverb: time {:.2}s, decay {:.1}",
            self.time,
            self.decay
        );
    }

    pub fn set_wet(&mut self, wet: f32) {
        self.wet = wet.clamp(0.0, 1.0);
    }

    pub fn reset(&mut self) {
        self.combs.iter_mut().for_each(Comb::flush);
        self.allpasses.iter_mut().for_each(Allpass::flush);
    }

    pub fn process(&mut self, buffer: &mut [f32]) {
        self.dry.clear();
        self.dry.extend_from_slice(buffer);
        for sample in buffer.iter_mut() {
            let input = *sample * Self::INPUT_GAIN;
            let mut output = self
                .combs
                .iter_mut()
                .map(|comb| comb.process(input))
                .sum::<f32>();
            for allpass in &mut self.allpasses {
                output = allpass.process(output);
            }
            *sample = output;
        }
        apply_dry_wet(buffer, &self.dry, self.wet);
    }
}

// -------------------------------------------------------------------------------------------------

/// The reverb box of an effects stage.
///
/// Wet is applied continuously. Time and decay are only applied when the user lets go of their
/// sliders, since every change rebuilds the reverb.
#[derive(Debug, Clone)]
pub struct ReverbControls {
    pub wet: Slider,
    pub time: Slider,
    pub decay: Slider,
    position: Position,
}

impl ReverbControls {
    pub const TITLE: &'static str = "Reverb";

    pub const WET: SliderParameter =
        SliderParameter::new(FourCC(*b"rwet"), "WET", 0.0..=1.0, 0.0);
    pub const TIME: SliderParameter =
        SliderParameter::new(FourCC(*b"rtim"), "TIME", 0.0..=10.0, 3.0).with_unit("s");
    pub const DECAY: SliderParameter =
        SliderParameter::new(FourCC(*b"rdec"), "DECAY", 0.0..=99.0, 2.0);

    pub const OFFSET: f32 = 870.0;

    pub fn new() -> Self {
        Self {
            wet: Slider::new(Self::WET, Position::new(5.0, 5.0)),
            time: Slider::new(Self::TIME, Position::new(5.0, 30.0)),
            decay: Slider::new(Self::DECAY, Position::new(5.0, 55.0)),
            position: Position::ZERO,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Apply wet, and time and decay when one of them got committed since the last call.
    pub fn apply(&mut self, node: &mut ReverbNode) {
        node.set_wet(self.wet.value());
        let time_changed = self.time.take_changed();
        let decay_changed = self.decay.take_changed();
        if time_changed || decay_changed {
            node.set(self.time.value(), self.decay.value());
        }
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        surface.draw_panel(&panel_view(
            Self::TITLE,
            self.position,
            (190.0, 80.0),
            &[&self.wet, &self.time, &self.decay],
        ));
    }

    pub fn update_pos(&mut self, chain_position: Position) {
        self.position = chain_position.offset_x(Self::OFFSET);
        let position = self.position;
        self.wet.update_parent(position);
        self.time.update_parent(position);
        self.decay.update_parent(position);
    }

    pub fn remove(&mut self) {
        self.wet.remove();
        self.time.remove();
        self.decay.remove();
    }
}

impl Default for ReverbControls {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------
