//! Keyboard placement relative to the focused input

use std::fmt;
use std::sync::Arc;

/// Screen point (pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Width/height pair (pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// Bounding box of an element (pixels, viewport coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width * 0.5
    }
}

/// Caller placement: (input bounds, keyboard size, viewport size) -> top-left
pub type PositionFn = Arc<dyn Fn(Rect, Size, Size) -> Point + Send + Sync>;

/// How the keyboard is placed when it is shown
#[derive(Clone, Default)]
pub enum AutoPosition {
    /// Leave placement to the surface
    Disabled,
    /// Centered below the input, clamped to the viewport
    #[default]
    Centered,
    Custom(PositionFn),
}

impl AutoPosition {
    pub fn compute(&self, target: Rect, keyboard: Size, viewport: Size) -> Option<Point> {
        match self {
            AutoPosition::Disabled => None,
            AutoPosition::Centered => Some(centered_below(target, keyboard, viewport)),
            AutoPosition::Custom(place) => Some(place(target, keyboard, viewport)),
        }
    }
}

impl From<bool> for AutoPosition {
    fn from(enabled: bool) -> Self {
        if enabled {
            AutoPosition::Centered
        } else {
            AutoPosition::Disabled
        }
    }
}

impl fmt::Debug for AutoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoPosition::Disabled => f.write_str("Disabled"),
            AutoPosition::Centered => f.write_str("Centered"),
            AutoPosition::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Center the keyboard horizontally under `target`.
///
/// The right-edge clamp is applied first, then the left-edge clamp, so a
/// keyboard wider than the viewport lands at x = 0.
pub fn centered_below(target: Rect, keyboard: Size, viewport: Size) -> Point {
    let mut x = target.center_x() - keyboard.width * 0.5;
    if x + keyboard.width > viewport.width {
        x = viewport.width - keyboard.width;
    }
    if x < 0.0 {
        x = 0.0;
    }
    Point {
        x,
        y: target.bottom(),
    }
}
