//! Keyboard layouts
//!
//! Layout strings flow through three stages:
//! - `token`: one whitespace-delimited unit -> `KeyToken` (name + sizing modifier)
//! - `custom`: `KeyToken` -> matched custom key (display transform + press behaviour)
//! - `render`: sub-layout rows -> column/row render tree of key descriptors
//!
//! `registry` holds the layout sets those stages read from.

pub mod custom;
pub mod registry;
pub mod render;
pub mod token;

pub use custom::{
    CustomKeyDefinition, CustomKeyRegistry, DisplayPatch, HandlerFn, KeyAction, KeyRender,
    RenderFn,
};
pub use registry::{LayoutRegistry, LayoutSet, LayoutSource, RowSpec, SubLayout};
pub use render::{
    Column, KeyDescriptor, KeyRef, KeyWidth, LayoutRenderer, RenderTree, RenderedLayout,
    RenderedRow,
};
pub use token::{KeyToken, Modifier, ModifierKind, ModifierRule, TokenParser};
