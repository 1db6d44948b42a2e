use std::{
    fmt::{Debug, Display},
    ops::RangeInclusive,
};

use four_cc::FourCC;

use super::{Control, ControlView, Enablement, Placement, Position};

// -------------------------------------------------------------------------------------------------

/// A continuous (float) slider descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderParameter {
    id: FourCC,
    name: &'static str,
    range: RangeInclusive<f32>,
    default: f32,
    step: f32,
    unit: &'static str,
}

impl SliderParameter {
    /// Create a new slider descriptor.
    pub const fn new(
        id: FourCC,
        name: &'static str,
        range: RangeInclusive<f32>,
        default: f32,
    ) -> Self {
        assert!(
            default >= *range.start() && default <= *range.end(),
            "Invalid slider default value"
        );
        Self {
            id,
            name,
            range,
            default,
            step: 0.0,
            unit: "",
        }
    }

    /// Optional quantization step. `0.0` means continuous.
    pub const fn with_step(mut self, step: f32) -> Self {
        assert!(step >= 0.0, "Invalid slider step");
        self.step = step;
        self
    }

    /// Optional unit for string displays.
    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    pub const fn id(&self) -> FourCC {
        self.id
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub fn range(&self) -> &RangeInclusive<f32> {
        &self.range
    }

    pub const fn default_value(&self) -> f32 {
        self.default
    }

    pub const fn step(&self) -> f32 {
        self.step
    }

    /// Clamp the given plain value to the slider's range and quantize it to its step size.
    pub fn clamp_value(&self, value: f32) -> f32 {
        let start = *self.range.start();
        let end = *self.range.end();
        let value = value.clamp(start, end);
        if self.step > 0.0 {
            (start + ((value - start) / self.step).round() * self.step).clamp(start, end)
        } else {
            value
        }
    }

    /// Normalize the given plain value to a 0.0-1.0 range.
    pub fn normalize_value(&self, value: f32) -> f32 {
        (value - *self.range.start()) / (*self.range.end() - *self.range.start())
    }

    /// Denormalize a 0.0-1.0 ranged value to the corresponding plain value.
    pub fn denormalize_value(&self, normalized: f32) -> f32 {
        *self.range.start() + normalized.clamp(0.0, 1.0) * (*self.range.end() - *self.range.start())
    }

    /// Convert the given plain value to a string.
    pub fn value_to_string(&self, value: f32, include_unit: bool) -> String {
        if include_unit && !self.unit.is_empty() {
            format!("{:.2} {}", value, self.unit)
        } else {
            format!("{:.2}", value)
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Slider control state: a float value within its descriptor's range.
///
/// Besides the continuous value, a slider reports a "changed" edge when the user lets go of it
/// (see [`release`](Self::release)). Consumers that must not follow every drag step poll the
/// edge with [`take_changed`](Self::take_changed).
#[derive(Debug, Clone)]
pub struct Slider {
    description: SliderParameter,
    value: f32,
    changed: bool,
    enablement: Enablement,
    placement: Placement,
    removed: bool,
}

impl Slider {
    /// Create a new slider at the given offset, initialized to the descriptor's default value.
    pub fn new(description: SliderParameter, offset: Position) -> Self {
        let value = description.default_value();
        Self {
            description,
            value,
            changed: false,
            enablement: Enablement::default(),
            placement: Placement::new(offset),
            removed: false,
        }
    }

    pub fn description(&self) -> &SliderParameter {
        &self.description
    }

    /// Current plain value.
    #[inline(always)]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Set a new value (e.g. while dragging), clamped and quantized into the slider's range.
    /// Disabled sliders ignore value changes.
    pub fn set_value(&mut self, value: f32) {
        if !self.enablement.is_enabled() {
            log::warn!(
                "Ignoring value change of disabled slider '{}'",
                self.description.name()
            );
            return;
        }
        self.value = self.description.clamp_value(value);
    }

    /// Set a value and immediately commit it, as if the user dragged and released the slider.
    pub fn set_value_committed(&mut self, value: f32) {
        self.set_value(value);
        self.release();
    }

    /// Signal that the user let go of the slider: raises the changed edge.
    pub fn release(&mut self) {
        if self.enablement.is_enabled() {
            self.changed = true;
        }
    }

    /// Consume the changed edge. Returns true once per [`release`](Self::release).
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn enablement(&self) -> Enablement {
        self.enablement.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enablement.is_enabled()
    }

    pub fn enable(&self) {
        self.enablement.enable();
    }

    pub fn disable(&self) {
        self.enablement.disable();
    }
}

impl Control for Slider {
    fn id(&self) -> FourCC {
        self.description.id()
    }

    fn view(&self) -> ControlView {
        ControlView {
            id: self.description.id(),
            label: self.description.name().to_string(),
            position: self.placement.position(),
            enabled: self.is_enabled(),
            value: self.to_string(),
        }
    }

    fn update_parent(&mut self, parent: Position) {
        self.placement.update_parent(parent);
    }

    fn remove(&mut self) {
        self.removed = true;
        self.enablement.disable();
    }

    fn is_removed(&self) -> bool {
        self.removed
    }
}

impl Display for Slider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let include_unit = true;
        f.write_str(&self.description.value_to_string(self.value, include_unit))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const GAIN: SliderParameter = SliderParameter::new(FourCC(*b"gain"), "GAIN", 0.0..=1.0, 0.8);

    #[test]
    fn clamps_and_quantizes() {
        let mut slider = Slider::new(GAIN, Position::ZERO);
        assert_eq!(slider.value(), 0.8);
        slider.set_value(2.0);
        assert_eq!(slider.value(), 1.0);
        slider.set_value(-1.0);
        assert_eq!(slider.value(), 0.0);

        let voices = SliderParameter::new(FourCC(*b"nvoc"), "NUM GRAINS", 1.0..=15.0, 5.0)
            .with_step(1.0);
        let mut slider = Slider::new(voices, Position::ZERO);
        slider.set_value(7.4);
        assert_eq!(slider.value(), 7.0);
        slider.set_value(7.6);
        assert_eq!(slider.value(), 8.0);
    }

    #[test]
    fn disabled_slider_ignores_changes() {
        let mut slider = Slider::new(GAIN, Position::ZERO);
        slider.disable();
        slider.set_value_committed(0.1);
        assert_eq!(slider.value(), 0.8);
        assert!(!slider.take_changed());
        slider.enable();
        slider.set_value(0.1);
        assert_eq!(slider.value(), 0.1);
    }

    #[test]
    fn changed_edge_fires_once_per_release() {
        let mut slider = Slider::new(GAIN, Position::ZERO);
        slider.set_value(0.3);
        slider.set_value(0.4);
        assert!(!slider.take_changed());
        slider.release();
        assert!(slider.take_changed());
        assert!(!slider.take_changed());
    }

    #[test]
    fn normalization() {
        let freq = SliderParameter::new(FourCC(*b"freq"), "F", 40.0..=10000.0, 10000.0);
        assert_eq!(freq.normalize_value(40.0), 0.0);
        assert_eq!(freq.normalize_value(10000.0), 1.0);
        assert_eq!(freq.denormalize_value(0.5), 5020.0);
    }
}
