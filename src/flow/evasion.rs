//! Quadrant-based evasion for the decline control.
//!
//! The container is split at its midlines and the control jumps to the corner
//! diagonally opposite the pointer. The result depends only on which quadrant
//! the pointer is in, so repeated moves inside one quadrant are stable.

use serde::{Deserialize, Serialize};

/// Horizontal displacement magnitude.
pub const HORIZONTAL_JUMP: f64 = 100.0;
/// Vertical displacement magnitude.
pub const VERTICAL_JUMP: f64 = 50.0;

/// A pointer position relative to the container's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size of the region the pointer moves in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }
}

/// Displacement applied to the decline control's resting position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Offset {
    pub const ZERO: Offset = Offset { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

/// Compute where the decline control should jump for the given pointer.
///
/// A pointer left of the vertical midline pushes the control right, otherwise
/// left; above the horizontal midline pushes it down, otherwise up. The
/// comparisons are strict, so a pointer exactly on a midline pushes left/up.
/// Zero-sized or non-finite bounds produce [`Offset::ZERO`].
///
/// Callers animate towards the returned offset; this function keeps no state.
pub fn compute_offset(pointer: Point, container: Bounds) -> Offset {
    if container.is_degenerate() {
        return Offset::ZERO;
    }

    let dx = if pointer.x < container.width / 2.0 {
        HORIZONTAL_JUMP
    } else {
        -HORIZONTAL_JUMP
    };
    let dy = if pointer.y < container.height / 2.0 {
        VERTICAL_JUMP
    } else {
        -VERTICAL_JUMP
    };

    Offset::new(dx, dy)
}
