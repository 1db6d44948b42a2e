use four_cc::FourCC;

use crate::{
    audio::{
        apply_dry_wet,
        dsp::biquad::{BiquadFilter, BiquadFilterCoefficients, BiquadFilterType},
    },
    control::{panel_view, Checkbox, Control, Position, Selector, Slider, SliderParameter, Surface},
    global::{resolve, ParameterSource},
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Mono lowpass or highpass filter with dry/wet mix.
#[derive(Debug, Clone)]
pub struct FilterNode {
    sample_rate: u32,
    filter: BiquadFilter,
    coefficients: BiquadFilterCoefficients,
    wet: f32,
    dry: Vec<f32>,
}

impl FilterNode {
    pub const MIN_CUTOFF: f32 = 40.0;
    pub const MAX_CUTOFF: f32 = 10000.0;

    /// Smallest Q the filter runs with. A resonance of 0 maps to this.
    const MIN_Q: f32 = 0.001;

    pub fn new(sample_rate: u32) -> Result<Self, Error> {
        let coefficients = BiquadFilterCoefficients::new(
            BiquadFilterType::Lowpass,
            sample_rate,
            Self::max_cutoff(sample_rate),
            FilterControls::RESONANCE.default_value(),
        )?;
        Ok(Self {
            sample_rate,
            filter: BiquadFilter::new(),
            coefficients,
            wet: FilterControls::WET.default_value(),
            dry: Vec::new(),
        })
    }

    /// Highest cutoff the filter runs with at the given sample rate: [`MAX_CUTOFF`](Self::MAX_CUTOFF)
    /// or just below nyquist, whichever is lower.
    pub fn max_cutoff(sample_rate: u32) -> f32 {
        Self::MAX_CUTOFF.min(0.49 * sample_rate as f32)
    }

    /// Cutoff frequency for a global density: lowpass opens from 40 Hz at density 0 to 10 kHz
    /// at density 1, highpass runs the same range inverted.
    pub fn density_to_cutoff(filter_type: BiquadFilterType, density: f32) -> f32 {
        let density = density.clamp(0.0, 1.0);
        let amount = match filter_type {
            BiquadFilterType::Lowpass => density,
            BiquadFilterType::Highpass => 1.0 - density,
        };
        (Self::MAX_CUTOFF - Self::MIN_CUTOFF) * amount + Self::MIN_CUTOFF
    }

    pub fn filter_type(&self) -> BiquadFilterType {
        self.coefficients.filter_type()
    }

    pub fn cutoff(&self) -> f32 {
        self.coefficients.cutoff()
    }

    pub fn q(&self) -> f32 {
        self.coefficients.q()
    }

    pub fn wet(&self) -> f32 {
        self.wet
    }

    /// Apply new filter settings. The resonance is used as the filter's Q.
    pub fn set(
        &mut self,
        filter_type: BiquadFilterType,
        cutoff: f32,
        resonance: f32,
    ) -> Result<(), Error> {
        let max_cutoff = Self::max_cutoff(self.sample_rate);
        let cutoff = cutoff.clamp(Self::MIN_CUTOFF.min(max_cutoff), max_cutoff);
        self.coefficients.set(
            filter_type,
            self.sample_rate,
            cutoff,
            resonance.max(Self::MIN_Q),
        )
    }

    pub fn set_wet(&mut self, wet: f32) {
        self.wet = wet.clamp(0.0, 1.0);
    }

    pub fn reset(&mut self) {
        self.filter.reset();
    }

    /// Filter the given buffer in place.
    pub fn process(&mut self, buffer: &mut [f32]) {
        self.dry.clear();
        self.dry.extend_from_slice(buffer);
        self.filter.process(&self.coefficients, buffer);
        apply_dry_wet(buffer, &self.dry, self.wet);
    }
}

// -------------------------------------------------------------------------------------------------

/// The filter box of an effects stage.
#[derive(Debug, Clone)]
pub struct FilterControls {
    pub wet: Slider,
    pub filter_type: Selector,
    pub frequency: Slider,
    pub resonance: Slider,
    pub follow_global: Checkbox,
    position: Position,
}

impl FilterControls {
    pub const TITLE: &'static str = "Filter";

    pub const WET: SliderParameter =
        SliderParameter::new(FourCC(*b"fwet"), "WET", 0.0..=1.0, 1.0);
    pub const FREQUENCY: SliderParameter =
        SliderParameter::new(FourCC(*b"freq"), "FREQ", 40.0..=10000.0, 10000.0).with_unit("Hz");
    pub const RESONANCE: SliderParameter =
        SliderParameter::new(FourCC(*b"fres"), "RES", 0.0..=5.0, 0.2);

    /// Offset of the box within its chain row.
    pub const OFFSET: f32 = 470.0;

    pub fn new() -> Self {
        Self {
            wet: Slider::new(Self::WET, Position::new(5.0, 5.0)),
            filter_type: Selector::from_enum(
                FourCC(*b"ftyp"),
                "TYPE",
                BiquadFilterType::Lowpass,
                Position::new(5.0, 30.0),
            ),
            frequency: Slider::new(Self::FREQUENCY, Position::new(5.0, 55.0)),
            resonance: Slider::new(Self::RESONANCE, Position::new(5.0, 80.0)),
            follow_global: Checkbox::new(
                FourCC(*b"fglb"),
                "FOLLOW GLOBAL",
                Position::new(5.0, 105.0),
            ),
            position: Position::ZERO,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn selected_type(&self) -> BiquadFilterType {
        self.filter_type.value_as().unwrap_or_default()
    }

    /// Resolve and apply the filter settings.
    pub fn apply(&self, node: &mut FilterNode, global_density: f32) -> Result<(), Error> {
        let filter_type = self.selected_type();
        let source = ParameterSource::from_follow(self.follow_global.checked());
        let cutoff = resolve(
            source,
            self.frequency.value(),
            FilterNode::density_to_cutoff(filter_type, global_density),
        );
        node.set(filter_type, cutoff, self.resonance.value())?;
        node.set_wet(self.wet.value());
        Ok(())
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        surface.draw_panel(&panel_view(
            Self::TITLE,
            self.position,
            (190.0, 130.0),
            &[
                &self.wet,
                &self.filter_type,
                &self.frequency,
                &self.resonance,
                &self.follow_global,
            ],
        ));
    }

    pub fn update_pos(&mut self, chain_position: Position) {
        self.position = chain_position.offset_x(Self::OFFSET);
        let position = self.position;
        self.wet.update_parent(position);
        self.filter_type.update_parent(position);
        self.frequency.update_parent(position);
        self.resonance.update_parent(position);
        self.follow_global.update_parent(position);
    }

    pub fn remove(&mut self) {
        self.wet.remove();
        self.filter_type.remove();
        self.frequency.remove();
        self.resonance.remove();
        self.follow_global.remove();
    }
}

impl Default for FilterControls {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------
