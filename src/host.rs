//! Privileged host side
//!
//! [`KeyboardHost`] turns surface messages into dispatch-queue operations.
//! [`HostHandle`] runs it on a dedicated thread with a current-thread
//! tokio runtime: surface messages arrive on a tokio channel, the pacing
//! timer is a `sleep_until`, and host messages go back over a std channel
//! the surface side polls.

use std::sync::mpsc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use crate::constants::KEY_PRESS_WAIT_CONFIG_KEY;
use crate::dispatch::{DispatchQueue, InjectionTarget};
use crate::error::{Error, Result};
use crate::transport::{HostMessage, SurfaceMessage};

/// Message handling around a dispatch queue
pub struct KeyboardHost<T> {
    queue: DispatchQueue<T>,
}

impl<T: InjectionTarget> KeyboardHost<T> {
    pub fn new(target: T, key_press_wait: u64) -> Self {
        Self {
            queue: DispatchQueue::with_key_press_wait(target, key_press_wait),
        }
    }

    pub fn queue(&self) -> &DispatchQueue<T> {
        &self.queue
    }

    /// Apply one surface message at `now`
    pub fn handle(&mut self, message: SurfaceMessage, now: u64) -> Result<Option<HostMessage>> {
        match message {
            SurfaceMessage::KeyPress(text) => {
                let drained = self.queue.enqueue(&text, now)?;
                Ok(drained.then_some(HostMessage::BufferEmpty))
            }
            SurfaceMessage::ConfigSet { key, value } => {
                self.config(&key, value);
                Ok(None)
            }
        }
    }

    fn config(&mut self, key: &str, value: i64) {
        if key == KEY_PRESS_WAIT_CONFIG_KEY {
            let ms = value.max(0) as u64;
            info!("Key press wait set to {}ms", ms);
            self.queue.set_key_press_wait(ms);
        } else {
            debug!("Unknown host config key {:?} ignored", key);
        }
    }

    /// Run pacing steps due at `now`
    pub fn poll(&mut self, now: u64) -> Result<Option<HostMessage>> {
        let drained = self.queue.poll(now)?;
        Ok(drained.then_some(HostMessage::BufferEmpty))
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.next_deadline()
    }
}

/// Drive a host until the surface side hangs up.
///
/// `emit` receives every host message. Injection-target errors end the
/// loop and are returned to the caller.
pub async fn run<T, F>(
    mut host: KeyboardHost<T>,
    mut messages: UnboundedReceiver<SurfaceMessage>,
    mut emit: F,
) -> Result<()>
where
    T: InjectionTarget,
    F: FnMut(HostMessage),
{
    let origin = Instant::now();
    let now = || origin.elapsed().as_millis() as u64;

    loop {
        let deadline = host.next_deadline();
        let wake = origin + Duration::from_millis(deadline.unwrap_or(0));

        tokio::select! {
            message = messages.recv() => match message {
                Some(message) => {
                    if let Some(out) = host.handle(message, now())? {
                        emit(out);
                    }
                }
                None => break,
            },
            _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                if let Some(out) = host.poll(now())? {
                    emit(out);
                }
            }
        }
    }

    debug!("Surface hung up, host loop finished");
    Ok(())
}

/// Host running on its own thread
///
/// Dropping the handle closes the surface channel, which ends the thread.
pub struct HostHandle {
    /// Surface -> host
    tx: UnboundedSender<SurfaceMessage>,
    /// Host -> surface
    event_rx: mpsc::Receiver<HostMessage>,
    thread: std::thread::JoinHandle<Result<()>>,
}

impl HostHandle {
    /// Start the host thread injecting into `target`
    pub fn spawn<T>(target: T, key_press_wait: u64) -> Result<Self>
    where
        T: InjectionTarget + Send + 'static,
    {
        let (tx, rx) = unbounded_channel::<SurfaceMessage>();
        let (event_tx, event_rx) = mpsc::channel::<HostMessage>();

        let thread = std::thread::Builder::new()
            .name("vkeyboard-host".into())
            .spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()?;
                let host = KeyboardHost::new(target, key_press_wait);
                let result = rt.block_on(run(host, rx, move |message| {
                    // Surface gone: nothing left to notify
                    let _ = event_tx.send(message);
                }));
                match &result {
                    Ok(()) => info!("Host thread terminated normally"),
                    Err(e) => warn!("Host thread error: {}", e),
                }
                result
            })?;

        Ok(Self {
            tx,
            event_rx,
            thread,
        })
    }

    /// Sender for the surface side; clone it per keyboard
    pub fn sender(&self) -> UnboundedSender<SurfaceMessage> {
        self.tx.clone()
    }

    /// All host messages received so far (non-blocking)
    pub fn poll_events(&self) -> Vec<HostMessage> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait up to `timeout` for the next host message
    pub fn recv_timeout(&self, timeout: Duration) -> Option<HostMessage> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Close the channel and wait for the thread.
    ///
    /// Every surface-side sender clone must be dropped first, or this
    /// blocks until they are.
    pub fn shutdown(self) -> Result<()> {
        drop(self.tx);
        self.thread
            .join()
            .map_err(|_| Error::TransportClosed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{InputEvent, InputEventKind};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedTarget(Arc<Mutex<Vec<InputEvent>>>);

    impl InjectionTarget for SharedTarget {
        fn send_input_event(&mut self, event: InputEvent) -> Result<()> {
            self.0.lock().map_err(|_| Error::TargetGone)?.push(event);
            Ok(())
        }
    }

    impl SharedTarget {
        fn chars(&self) -> String {
            self.0
                .lock()
                .map(|events| {
                    events
                        .iter()
                        .filter(|e| e.kind == InputEventKind::Char)
                        .map(|e| e.key)
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    #[test]
    fn test_handle_key_press_and_config() {
        let target = SharedTarget::default();
        let mut host = KeyboardHost::new(target.clone(), 30);
        assert_eq!(host.handle(SurfaceMessage::key_press("hi"), 0).expect("handle"), None);
        assert_eq!(target.chars(), "h");

        host.handle(SurfaceMessage::key_press_wait(5), 0).expect("config");
        assert_eq!(host.queue().key_press_wait(), 5);
        host.handle(
            SurfaceMessage::ConfigSet {
                key: "frameRate".into(),
                value: 60,
            },
            0,
        )
        .expect("unknown key");
        assert_eq!(host.queue().key_press_wait(), 5);

        assert_eq!(host.poll(30).expect("poll"), None);
        assert_eq!(target.chars(), "hi");
        assert_eq!(host.poll(35).expect("poll"), Some(HostMessage::BufferEmpty));
    }

    #[test]
    fn test_negative_wait_clamps_to_zero() {
        let mut host = KeyboardHost::new(SharedTarget::default(), 30);
        host.handle(SurfaceMessage::key_press_wait(-10), 0).expect("config");
        assert_eq!(host.queue().key_press_wait(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_paces_and_signals() {
        let target = SharedTarget::default();
        let (tx, rx) = unbounded_channel();
        let (event_tx, mut event_rx) = unbounded_channel();
        let task = tokio::spawn(run(KeyboardHost::new(target.clone(), 30), rx, move |m| {
            let _ = event_tx.send(m);
        }));

        tx.send(SurfaceMessage::key_press("ab")).expect("send");
        tx.send(SurfaceMessage::key_press("c")).expect("send");
        assert_eq!(event_rx.recv().await, Some(HostMessage::BufferEmpty));
        assert_eq!(target.chars(), "abc");

        drop(tx);
        task.await.expect("join").expect("host loop");
        assert_eq!(event_rx.recv().await, None);
    }

    #[test]
    fn test_host_handle_round_trip() {
        let target = SharedTarget::default();
        let host = HostHandle::spawn(target.clone(), 0).expect("spawn");
        let tx = host.sender();
        tx.send(SurfaceMessage::key_press("ok")).expect("send");
        assert_eq!(
            host.recv_timeout(Duration::from_secs(5)),
            Some(HostMessage::BufferEmpty)
        );
        assert_eq!(target.chars(), "ok");
        drop(tx);
        host.shutdown().expect("shutdown");
    }
}
