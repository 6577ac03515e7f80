//! Error type shared by the library

use thiserror::Error;

/// Errors surfaced by vkeyboard
///
/// Layout authoring mistakes (unknown modifier units, patterns that match
/// nothing, unknown config keys) are deliberately *not* errors; they are
/// logged and ignored where they occur.
#[derive(Debug, Error)]
pub enum Error {
    /// Attachment was attempted on an element that does not accept text
    #[error("virtual keyboard does not support element of type: {kind} ({name})")]
    UnsupportedElement { name: String, kind: String },

    /// A custom-key or modifier pattern failed to compile
    #[error("invalid key pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A named layout is in neither the built-in nor the caller table
    #[error("unknown layout: {0}")]
    UnknownLayout(String),

    /// The injection target disappeared while the queue was draining
    #[error("injection target is gone")]
    TargetGone,

    /// The host side of the transport hung up
    #[error("keyboard transport closed")]
    TransportClosed,

    /// Host thread or runtime could not be started
    #[error("host I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, Error>;
