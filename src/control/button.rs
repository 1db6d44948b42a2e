use four_cc::FourCC;

use super::{Control, ControlView, Enablement, Placement, Position};
use crate::Error;

// -------------------------------------------------------------------------------------------------

/// Button control state: a label and an enabled flag.
///
/// Buttons carry no callback. The owning device exposes the action as a method and checks
/// [`press`](Self::press) before running it.
#[derive(Debug, Clone)]
pub struct Button {
    id: FourCC,
    name: &'static str,
    label: &'static str,
    enablement: Enablement,
    placement: Placement,
    removed: bool,
}

impl Button {
    /// Create a new, enabled button. `name` identifies the action in logs and errors,
    /// `label` is the displayed text.
    pub fn new(id: FourCC, name: &'static str, label: &'static str, offset: Position) -> Self {
        Self {
            id,
            name,
            label,
            enablement: Enablement::default(),
            placement: Placement::new(offset),
            removed: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn change_text(&mut self, label: &'static str) {
        self.label = label;
    }

    /// Validate a press: fails when the button is disabled.
    pub fn press(&self) -> Result<(), Error> {
        if self.enablement.is_enabled() {
            Ok(())
        } else {
            log::warn!("Button '{}' is disabled", self.name);
            Err(Error::ControlDisabled(self.name))
        }
    }

    pub fn enablement(&self) -> Enablement {
        self.enablement.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enablement.is_enabled()
    }
}

impl Control for Button {
    fn id(&self) -> FourCC {
        self.id
    }

    fn view(&self) -> ControlView {
        ControlView {
            id: self.id,
            label: self.label.to_string(),
            position: self.placement.position(),
            enabled: self.is_enabled(),
            value: String::new(),
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

    #[test]
    fn press_requires_enabled() {
        let mut button = Button::new(FourCC(*b"loop"), "loop", "LOOP", Position::ZERO);
        assert!(button.press().is_ok());
        button.enablement().disable();
        assert!(matches!(button.press(), Err(Error::ControlDisabled("loop"))));
        button.change_text("STOP");
        assert_eq!(button.view().label, "STOP");
    }
}
