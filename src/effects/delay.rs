use four_cc::FourCC;

use crate::{
    audio::{apply_dry_wet, dsp::delay::DelayLine},
    control::{panel_view, Checkbox, Control, Position, Slider, SliderParameter, Surface},
    global::{resolve, ParameterSource},
};

// -------------------------------------------------------------------------------------------------

/// Feedback delay with an optional ping-pong topology and dry/wet mix.
///
/// The ping-pong line runs on two internal channels which feed each other. Both get summed back
/// into the mono bus.
#[derive(Debug, Clone)]
pub struct DelayNode {
    sample_rate: u32,
    line: DelayLine<2>,
    time: f32,
    feedback: f32,
    pingpong: bool,
    wet: f32,
    dry: Vec<f32>,
}

impl DelayNode {
    /// Longest delay time in seconds.
    pub const MAX_TIME: f32 = 1.0;
    pub const MAX_FEEDBACK: f32 = 0.99;

    pub fn new(sample_rate: u32) -> Self {
        let max_frames = (Self::MAX_TIME * sample_rate as f32).ceil() as usize;
        Self {
            sample_rate,
            line: DelayLine::new(max_frames),
            time: DelayControls::TIME.default_value(),
            feedback: DelayControls::FEEDBACK.default_value(),
            pingpong: false,
            wet: DelayControls::WET.default_value(),
            dry: Vec::new(),
        }
    }

    /// Delay time and feedback for a global density: `(1 - density, density)`.
    pub fn density_to_delay(density: f32) -> (f32, f32) {
        let density = density.clamp(0.0, 1.0);
        (1.0 - density, density.min(Self::MAX_FEEDBACK))
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn is_pingpong(&self) -> bool {
        self.pingpong
    }

    pub fn wet(&self) -> f32 {
        self.wet
    }

    /// Set delay time in seconds and feedback amount.
    pub fn set(&mut self, time: f32, feedback: f32) {
        self.time = time.clamp(0.0, Self::MAX_TIME);
        self.feedback = feedback.clamp(0.0, Self::MAX_FEEDBACK);
    }

    /// Switch between the plain and the ping-pong delay line. Switching flushes the line.
    pub fn set_pingpong(&mut self, pingpong: bool) {
        if self.pingpong != pingpong {
            self.pingpong = pingpong;
            self.line.flush();
        }
    }

    pub fn set_wet(&mut self, wet: f32) {
        self.wet = wet.clamp(0.0, 1.0);
    }

    pub fn reset(&mut self) {
        self.line.flush();
    }

    pub fn process(&mut self, buffer: &mut [f32]) {
        self.dry.clear();
        self.dry.extend_from_slice(buffer);
        let delay_frames = self.time * self.sample_rate as f32;
        for sample in buffer.iter_mut() {
            let input = [*sample, 0.0];
            let output = if self.pingpong {
                self.line
                    .process_sample_crossed(input, self.feedback, delay_frames)
            } else {
                self.line.process_sample(input, self.feedback, delay_frames)
            };
            *sample = output[0] + output[1];
        }
        apply_dry_wet(buffer, &self.dry, self.wet);
    }
}

// -------------------------------------------------------------------------------------------------

/// The delay box of an effects stage.
#[derive(Debug, Clone)]
pub struct DelayControls {
    pub wet: Slider,
    pub time: Slider,
    pub feedback: Slider,
    pub pingpong: Checkbox,
    pub follow_global: Checkbox,
    position: Position,
}

impl DelayControls {
    pub const TITLE: &'static str = "Delay";

    pub const WET: SliderParameter =
        SliderParameter::new(FourCC(*b"dwet"), "WET", 0.0..=1.0, 0.0);
    pub const TIME: SliderParameter =
        SliderParameter::new(FourCC(*b"dtim"), "TIME", 0.0..=1.0, 0.5).with_unit("s");
    pub const FEEDBACK: SliderParameter =
        SliderParameter::new(FourCC(*b"dfbk"), "FEEDBACK", 0.0..=0.99, 0.5);

    pub const OFFSET: f32 = 670.0;

    pub fn new() -> Self {
        Self {
            wet: Slider::new(Self::WET, Position::new(5.0, 5.0)),
            time: Slider::new(Self::TIME, Position::new(5.0, 30.0)),
            feedback: Slider::new(Self::FEEDBACK, Position::new(5.0, 55.0)),
            pingpong: Checkbox::new(FourCC(*b"ping"), "PINGPONG", Position::new(5.0, 80.0)),
            follow_global: Checkbox::new(
                FourCC(*b"dglb"),
                "FOLLOW GLOBAL",
                Position::new(5.0, 105.0),
            ),
            position: Position::ZERO,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Resolve and apply the delay settings.
    pub fn apply(&self, node: &mut DelayNode, global_density: f32) {
        let source = ParameterSource::from_follow(self.follow_global.checked());
        let (time, feedback) = resolve(
            source,
            (self.time.value(), self.feedback.value()),
            DelayNode::density_to_delay(global_density),
        );
        node.set(time, feedback);
        node.set_pingpong(self.pingpong.checked());
        node.set_wet(self.wet.value());
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        surface.draw_panel(&panel_view(
            Self::TITLE,
            self.position,
            (190.0, 130.0),
            &[
                &self.wet,
                &self.time,
                &self.feedback,
                &self.pingpong,
                &self.follow_global,
            ],
        ));
    }

    pub fn update_pos(&mut self, chain_position: Position) {
        self.position = chain_position.offset_x(Self::OFFSET);
        let position = self.position;
        self.wet.update_parent(position);
        self.time.update_parent(position);
        self.feedback.update_parent(position);
        self.pingpong.update_parent(position);
        self.follow_global.update_parent(position);
    }

    pub fn remove(&mut self) {
        self.wet.remove();
        self.time.remove();
        self.feedback.remove();
        self.pingpong.remove();
        self.follow_global.remove();
    }
}

impl Default for DelayControls {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_mapping() {
        assert_eq!(DelayNode::density_to_delay(0.25), (0.75, 0.25));
        assert_eq!(DelayNode::density_to_delay(1.0), (0.0, 0.99));
    }

    #[test]
    fn follows_global_density() {
        let mut node = DelayNode::new(44100);
        let mut controls = DelayControls::new();
        controls.apply(&mut node, 0.25);
        assert_eq!((node.time(), node.feedback()), (0.5, 0.5));

        controls.follow_global.set_checked(true);
        controls.pingpong.set_checked(true);
        controls.apply(&mut node, 0.25);
        assert_eq!((node.time(), node.feedback()), (0.75, 0.25));
        assert!(node.is_pingpong());
    }

    #[test]
    fn echoes_impulse() {
        let mut node = DelayNode::new(100);
        node.set(0.5, 0.5);
        node.set_wet(1.0);
        let mut buffer = [0.0; 110];
        buffer[0] = 1.0;
        node.process(&mut buffer);
        assert_eq!(buffer[50], 1.0);
        assert_eq!(buffer[100], 0.5);

        node.reset();
        node.set_pingpong(true);
        let mut buffer = [0.0; 110];
        buffer[0] = 1.0;
        node.process(&mut buffer);
        assert_eq!(buffer[50], 1.0);
        assert_eq!(buffer[100], 0.5);
    }
}
