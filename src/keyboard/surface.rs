//! Rendering-surface collaborators
//!
//! The keyboard never touches a real UI toolkit. Inputs are identified by
//! [`TargetId`], and everything visual goes through the [`Surface`] trait.

use std::fmt;

use super::position::{Point, Size};

/// Opaque handle of an input element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of element a keyboard is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// Single-line text field
    Text,
    Password,
    /// Multi-line text field
    TextArea,
    /// Anything else (checkbox, button, ...)
    Other(String),
}

impl ElementKind {
    pub fn accepts_text(&self) -> bool {
        matches!(self, ElementKind::Text | ElementKind::Password | ElementKind::TextArea)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Text => f.write_str("text"),
            ElementKind::Password => f.write_str("password"),
            ElementKind::TextArea => f.write_str("textarea"),
            ElementKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// An element offered for attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElement {
    pub id: TargetId,
    pub name: String,
    pub kind: ElementKind,
}

impl InputElement {
    pub fn new(id: u64, name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: TargetId(id),
            name: name.into(),
            kind,
        }
    }
}

/// Whatever draws the keyboard and owns input focus
pub trait Surface {
    /// Show the keyboard, at `position` when one was computed
    fn show(&mut self, position: Option<Point>);

    fn hide(&mut self);

    /// Give keyboard focus back to an input
    fn focus(&mut self, target: TargetId);

    /// Flip visibility to the named sub-layout
    fn show_sub_layout(&mut self, name: &str);

    fn viewport(&self) -> Size;

    /// Rendered size of the keyboard container
    fn keyboard_size(&self) -> Size;

    /// The host finished injecting every queued character
    fn buffer_empty(&mut self) {}
}
