//! Pure control-state models for device UIs and the rendering adapter that displays them.
//!
//! Controls only hold values and enablement. How they are drawn is up to a [`Surface`]
//! implementation, so device logic never depends on a concrete widget toolkit.

use std::{
    cell::Cell,
    fmt::Display,
    ops::{Add, Sub},
    rc::Rc,
};

use four_cc::FourCC;

// -------------------------------------------------------------------------------------------------

mod button;
pub use button::Button;

mod checkbox;
pub use checkbox::Checkbox;

mod selector;
pub use selector::Selector;

mod slider;
pub use slider::{Slider, SliderParameter};

// -------------------------------------------------------------------------------------------------

/// A 2D position in surface units.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ZERO: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// This position moved right by the given amount.
    pub const fn offset_x(self, dx: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y,
        }
    }
}

impl Add for Position {
    type Output = Position;
    fn add(self, rhs: Self) -> Self::Output {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;
    fn sub(self, rhs: Self) -> Self::Output {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

// -------------------------------------------------------------------------------------------------

/// Shared enable/disable flag of a control.
///
/// Clones refer to the same flag, so state listeners can capture a control's enablement and
/// toggle it without holding a reference to the control itself.
#[derive(Debug, Clone)]
pub struct Enablement(Rc<Cell<bool>>);

impl Enablement {
    pub fn new(enabled: bool) -> Self {
        Self(Rc::new(Cell::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.get()
    }

    pub fn enable(&self) {
        self.0.set(true);
    }

    pub fn disable(&self) {
        self.0.set(false);
    }

    pub fn set(&self, enabled: bool) {
        self.0.set(enabled);
    }
}

impl Default for Enablement {
    fn default() -> Self {
        Self::new(true)
    }
}

// -------------------------------------------------------------------------------------------------

/// Placement of a control: a fixed offset relative to a movable parent anchor.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Placement {
    offset: Position,
    parent: Position,
}

impl Placement {
    pub const fn new(offset: Position) -> Self {
        Self {
            offset,
            parent: Position::ZERO,
        }
    }

    /// Absolute position on the surface.
    pub fn position(&self) -> Position {
        self.parent + self.offset
    }

    pub fn offset(&self) -> Position {
        self.offset
    }

    pub fn parent(&self) -> Position {
        self.parent
    }

    pub fn update_parent(&mut self, parent: Position) {
        self.parent = parent;
    }
}

// -------------------------------------------------------------------------------------------------

/// Read-only snapshot of a control, handed to a [`Surface`] for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlView {
    pub id: FourCC,
    pub label: String,
    pub position: Position,
    pub enabled: bool,
    pub value: String,
}

/// Read-only snapshot of a device panel (a titled box with controls).
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub title: &'static str,
    pub position: Position,
    pub width: f32,
    pub height: f32,
    pub controls: Vec<ControlView>,
}

/// Common interface of all control models.
pub trait Control {
    /// The control's unique id within its device.
    fn id(&self) -> FourCC;

    /// Snapshot of the control for rendering.
    fn view(&self) -> ControlView;

    /// Move the control along with its parent anchor.
    fn update_parent(&mut self, parent: Position);

    /// Dispose the control. Removed controls stay disabled.
    fn remove(&mut self);

    /// True when the control got removed.
    fn is_removed(&self) -> bool;
}

// -------------------------------------------------------------------------------------------------

/// Rendering adapter: draws panel snapshots produced by devices.
pub trait Surface {
    fn draw_panel(&mut self, panel: &PanelView);
}

/// A surface which draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn draw_panel(&mut self, _panel: &PanelView) {}
}

/// A surface which remembers the last drawn frame of panels. Useful for headless hosts and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingSurface {
    panels: Vec<PanelView>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panels drawn since the last call to `clear`.
    pub fn panels(&self) -> &[PanelView] {
        &self.panels
    }

    /// Find a drawn panel by title and position.
    pub fn panel_at(&self, title: &str, position: Position) -> Option<&PanelView> {
        self.panels
            .iter()
            .find(|p| p.title == title && p.position == position)
    }

    pub fn clear(&mut self) {
        self.panels.clear();
    }
}

impl Surface for RecordingSurface {
    fn draw_panel(&mut self, panel: &PanelView) {
        self.panels.push(panel.clone());
    }
}

// -------------------------------------------------------------------------------------------------

/// Build a panel view from a set of controls.
pub(crate) fn panel_view(
    title: &'static str,
    position: Position,
    size: (f32, f32),
    controls: &[&dyn Control],
) -> PanelView {
    PanelView {
        title,
        position,
        width: size.0,
        height: size.1,
        controls: controls
            .iter()
            .filter(|c| !c.is_removed())
            .map(|c| c.view())
            .collect(),
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_follows_parent() {
        let mut placement = Placement::new(Position::new(5.0, 35.0));
        assert_eq!(placement.position(), Position::new(5.0, 35.0));
        placement.update_parent(Position::new(20.0, 250.0));
        assert_eq!(placement.position(), Position::new(25.0, 285.0));
        assert_eq!(placement.offset(), Position::new(5.0, 35.0));
    }

    #[test]
    fn enablement_is_shared() {
        let enablement = Enablement::new(false);
        let captured = enablement.clone();
        captured.enable();
        assert!(enablement.is_enabled());
        enablement.disable();
        assert!(!captured.is_enabled());
    }
}
