use std::fmt::Display;

use four_cc::FourCC;

use super::{Control, ControlView, Enablement, Placement, Position};

// -------------------------------------------------------------------------------------------------

/// Checkbox control state: a labeled boolean toggle.
#[derive(Debug, Clone)]
pub struct Checkbox {
    id: FourCC,
    label: &'static str,
    checked: bool,
    enablement: Enablement,
    placement: Placement,
    removed: bool,
}

impl Checkbox {
    /// Create a new, unchecked checkbox at the given offset.
    pub fn new(id: FourCC, label: &'static str, offset: Position) -> Self {
        Self {
            id,
            label,
            checked: false,
            enablement: Enablement::default(),
            placement: Placement::new(offset),
            removed: false,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    #[inline(always)]
    pub fn checked(&self) -> bool {
        self.checked
    }

    /// Set the checked state. Disabled checkboxes ignore changes.
    pub fn set_checked(&mut self, checked: bool) {
        if !self.enablement.is_enabled() {
            log::warn!("Ignoring change of disabled checkbox '{}'", self.label);
            return;
        }
        self.checked = checked;
    }

    /// Flip the checked state.
    pub fn toggle(&mut self) {
        self.set_checked(!self.checked);
    }

    pub fn enablement(&self) -> Enablement {
        self.enablement.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enablement.is_enabled()
    }
}

impl Control for Checkbox {
    fn id(&self) -> FourCC {
        self.id
    }

    fn view(&self) -> ControlView {
        ControlView {
            id: self.id,
            label: self.label.to_string(),
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

impl Display for Checkbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.checked { "ON" } else { "OFF" })
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles() {
        let mut checkbox = Checkbox::new(FourCC(*b"flow"), "Use global parameters", Position::ZERO);
        assert!(!checkbox.checked());
        checkbox.toggle();
        assert!(checkbox.checked());
        assert_eq!(checkbox.view().value, "ON");
        checkbox.remove();
        checkbox.toggle();
        assert!(checkbox.checked());
        assert!(checkbox.is_removed());
    }
}
