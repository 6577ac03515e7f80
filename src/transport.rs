//! Host <-> surface messages
//!
//! The transport itself is external; it only has to be ordered, reliable
//! and asynchronous. These are the only messages that cross it:
//!
//! | Direction      | Message        | Effect on the receiver          |
//! |----------------|----------------|---------------------------------|
//! | surface → host | `KeyPress`     | enqueue into the dispatch queue |
//! | surface → host | `ConfigSet`    | adjust a host setting           |
//! | host → surface | `BufferEmpty`  | queue fully drained             |

use tokio::sync::mpsc::UnboundedSender;

use crate::constants::KEY_PRESS_WAIT_CONFIG_KEY;
use crate::error::{Error, Result};

/// Messages from the rendering surface to the privileged host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceMessage {
    /// Character or control string to inject
    KeyPress(String),
    /// Host setting change; unknown keys are ignored by the host
    ConfigSet { key: String, value: i64 },
}

impl SurfaceMessage {
    pub fn key_press(text: impl Into<String>) -> Self {
        SurfaceMessage::KeyPress(text.into())
    }

    /// Pacing delay change (`keyPressWait`)
    pub fn key_press_wait(ms: i64) -> Self {
        SurfaceMessage::ConfigSet {
            key: KEY_PRESS_WAIT_CONFIG_KEY.to_string(),
            value: ms,
        }
    }
}

/// Messages from the host back to the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMessage {
    /// The dispatch queue drained completely
    BufferEmpty,
}

/// Outgoing half of the transport, as seen by the surface
pub trait KeySink {
    fn send(&mut self, message: SurfaceMessage) -> Result<()>;
}

impl KeySink for UnboundedSender<SurfaceMessage> {
    fn send(&mut self, message: SurfaceMessage) -> Result<()> {
        UnboundedSender::send(self, message).map_err(|_| Error::TransportClosed)
    }
}

impl<K: KeySink + ?Sized> KeySink for Box<K> {
    fn send(&mut self, message: SurfaceMessage) -> Result<()> {
        (**self).send(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_sender_sink() {
        let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        KeySink::send(&mut tx, SurfaceMessage::key_press("a")).expect("send");
        assert_eq!(rx.try_recv().ok(), Some(SurfaceMessage::KeyPress("a".into())));
        drop(rx);
        let err = KeySink::send(&mut tx, SurfaceMessage::key_press_wait(10)).unwrap_err();
        assert!(matches!(err, Error::TransportClosed));
    }
}
