//! Performance-wide parameters, which devices may follow instead of their local controls.

use four_cc::FourCC;

use crate::control::{
    panel_view, Control, Position, Slider, SliderParameter, Surface,
};

// -------------------------------------------------------------------------------------------------

/// Where a device takes a parameter value from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSource {
    /// The device's own control.
    #[default]
    Local,
    /// The shared [`GlobalParameters`].
    Global,
}

impl ParameterSource {
    /// Map a "follow global" checkbox state to a parameter source.
    pub const fn from_follow(follow_global: bool) -> Self {
        if follow_global {
            Self::Global
        } else {
            Self::Local
        }
    }
}

/// Pick exactly one of the local or global value, never a blend of both.
#[inline]
pub fn resolve<T>(source: ParameterSource, local: T, global: T) -> T {
    match source {
        ParameterSource::Local => local,
        ParameterSource::Global => global,
    }
}

// -------------------------------------------------------------------------------------------------

/// Read-only snapshot of the global parameters, handed to devices in each draw cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalValues {
    /// Global density in range `0.0..=1.0`.
    pub density: f32,
    /// Global gain in range `0.0..=1.0`.
    pub gain: f32,
}

impl Default for GlobalValues {
    fn default() -> Self {
        Self {
            density: GlobalParameters::DENSITY.default_value(),
            gain: GlobalParameters::GAIN.default_value(),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// The global density and gain controls.
#[derive(Debug, Clone)]
pub struct GlobalParameters {
    density: Slider,
    gain: Slider,
}

impl GlobalParameters {
    pub const DENSITY: SliderParameter =
        SliderParameter::new(FourCC(*b"gden"), "DENSITY", 0.0..=1.0, 0.9);
    pub const GAIN: SliderParameter =
        SliderParameter::new(FourCC(*b"ggai"), "GAIN", 0.0..=1.0, 0.5);

    const POSITION: Position = Position::new(320.0, 20.0);

    pub fn new() -> Self {
        Self {
            density: Slider::new(Self::DENSITY, Position::new(100.0, 2.5)),
            gain: Slider::new(Self::GAIN, Position::new(275.0, 2.5)),
        }
        .placed()
    }

    fn placed(mut self) -> Self {
        self.density.update_parent(Self::POSITION);
        self.gain.update_parent(Self::POSITION);
        self
    }

    pub fn density(&self) -> &Slider {
        &self.density
    }

    pub fn density_mut(&mut self) -> &mut Slider {
        &mut self.density
    }

    pub fn gain(&self) -> &Slider {
        &self.gain
    }

    pub fn gain_mut(&mut self) -> &mut Slider {
        &mut self.gain
    }

    /// Snapshot of the current values.
    pub fn values(&self) -> GlobalValues {
        GlobalValues {
            density: self.density.value(),
            gain: self.gain.value(),
        }
    }

    pub fn draw(&self, surface: &mut dyn Surface) {
        surface.draw_panel(&panel_view(
            "Global parameters",
            Self::POSITION,
            (385.0, 25.0),
            &[&self.density, &self.gain],
        ));
    }
}

impl Default for GlobalParameters {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_picks_one_side() {
        assert_eq!(resolve(ParameterSource::Local, 0.2, 0.7), 0.2);
        assert_eq!(resolve(ParameterSource::Global, 0.2, 0.7), 0.7);
        assert_eq!(ParameterSource::from_follow(true), ParameterSource::Global);
        assert_eq!(ParameterSource::from_follow(false), ParameterSource::Local);
    }

    #[test]
    fn values_snapshot() {
        let mut globals = GlobalParameters::new();
        assert_eq!(globals.values(), GlobalValues::default());
        globals.density_mut().set_value(0.25);
        globals.gain_mut().set_value(1.0);
        assert_eq!(
            globals.values(),
            GlobalValues {
                density: 0.25,
                gain: 1.0
            }
        );
    }
}
