//! vkeyboard - on-screen virtual keyboard core
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────── surface side ─────────────────────┐
//! │  layout rows ─▶ TokenParser ─▶ CustomKeyRegistry       │
//! │                       ↓                                │
//! │                LayoutRenderer ─▶ RenderTree            │
//! │                       ↓                                │
//! │  pointer / focus ─▶ VirtualKeyboard (timers, state)    │
//! └───────────────────────┬────────────────────────────────┘
//!            KeyPress / ConfigSet  │  ▲ BufferEmpty
//! ┌───────────────────────▼────────┴───────────────────────┐
//! │  host side: KeyboardHost ─▶ DispatchQueue (paced)      │
//! │                       ↓                                │
//! │              InjectionTarget (down / char / up)        │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything on the surface side is sans-IO and driven by a millisecond
//! clock the caller supplies. [`host::HostHandle`] runs the host side on its
//! own thread.

pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod keyboard;
pub mod layout;
pub mod timer;
pub mod transport;

pub use error::{Error, Result};
