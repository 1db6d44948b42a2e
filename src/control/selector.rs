use std::{fmt::Debug, str::FromStr};

use four_cc::FourCC;
use strum::IntoEnumIterator;

use super::{Control, ControlView, Enablement, Placement, Position};

// -------------------------------------------------------------------------------------------------

/// Selector (drop-down) control state: a choice from a list of string options.
#[derive(Debug, Clone)]
pub struct Selector {
    id: FourCC,
    name: &'static str,
    options: Vec<String>,
    selected: usize,
    enablement: Enablement,
    placement: Placement,
    removed: bool,
}

impl Selector {
    /// Create a new selector with the given options. The first option is selected.
    pub fn new<S: Into<String>>(
        id: FourCC,
        name: &'static str,
        options: impl IntoIterator<Item = S>,
        offset: Position,
    ) -> Self {
        let options = options.into_iter().map(Into::into).collect::<Vec<_>>();
        assert!(!options.is_empty(), "Selector needs at least one option");
        Self {
            id,
            name,
            options,
            selected: 0,
            enablement: Enablement::default(),
            placement: Placement::new(offset),
            removed: false,
        }
    }

    /// Create a new selector with all variants of an enum as options, selecting `default`.
    pub fn from_enum<E: IntoEnumIterator + ToString + PartialEq>(
        id: FourCC,
        name: &'static str,
        default: E,
        offset: Position,
    ) -> Self {
        let mut selector = Self::new(id, name, E::iter().map(|v| v.to_string()), offset);
        selector.selected = E::iter().position(|v| v == default).unwrap_or(0);
        selector
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// The selected option.
    pub fn value(&self) -> &str {
        &self.options[self.selected]
    }

    /// The selected option, parsed into `T`.
    pub fn value_as<T: FromStr>(&self) -> Option<T> {
        T::from_str(self.value()).ok()
    }

    /// Select an option by its string value. Returns false when the option does not exist or
    /// the selector is disabled.
    pub fn select(&mut self, value: &str) -> bool {
        if !self.enablement.is_enabled() {
            log::warn!("Ignoring selection in disabled selector '{}'", self.name);
            return false;
        }
        match self.options.iter().position(|o| o == value) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => {
                log::warn!("Selector '{}' has no option '{}'", self.name, value);
                false
            }
        }
    }

    pub fn enablement(&self) -> Enablement {
        self.enablement.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enablement.is_enabled()
    }
}

impl Control for Selector {
    fn id(&self) -> FourCC {
        self.id
    }

    fn view(&self) -> ControlView {
        ControlView {
            id: self.id,
            label: self.name.to_string(),
            position: self.placement.position(),
            enabled: self.is_enabled(),
            value: self.value().to_string(),
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

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, strum::Display, strum::EnumIter, strum::EnumString)]
    #[strum(serialize_all = "lowercase")]
    enum Shape {
        Round,
        Square,
    }

    #[test]
    fn enum_options() {
        let mut selector =
            Selector::from_enum(FourCC(*b"shap"), "Shape", Shape::Square, Position::ZERO);
        assert_eq!(selector.options(), ["round", "square"]);
        assert_eq!(selector.value_as::<Shape>(), Some(Shape::Square));
        assert!(selector.select("round"));
        assert_eq!(selector.value_as::<Shape>(), Some(Shape::Round));
        assert!(!selector.select("triangle"));
        assert_eq!(selector.value(), "round");
    }

    #[test]
    fn disabled_selector_keeps_value() {
        let mut selector = Selector::new(FourCC(*b"smpl"), "Sample", [" ", "piano"], Position::ZERO);
        selector.enablement().disable();
        assert!(!selector.select("piano"));
        assert_eq!(selector.value(), " ");
    }
}
