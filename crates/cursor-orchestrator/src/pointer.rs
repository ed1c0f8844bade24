use pagepilot_core_types::Point;
use serde::Serialize;

/// Off-screen rest position used whenever there is nothing to aim at.
pub const PARK: Point = Point { x: -100.0, y: -100.0 };

/// Observable state of the cursor overlay.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PointerState {
    pub position: Point,
    pub visible: bool,
    pub pressed: bool,
}

impl PointerState {
    pub fn parked() -> Self {
        Self {
            position: PARK,
            visible: false,
            pressed: false,
        }
    }

    pub fn aimed(position: Point) -> Self {
        Self {
            position,
            visible: true,
            pressed: false,
        }
    }
}

impl Default for PointerState {
    fn default() -> Self {
        Self::parked()
    }
}
