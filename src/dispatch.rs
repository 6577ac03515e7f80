//! Keystroke dispatch queue
//!
//! Serializes bursts of characters into paced key-down / char / key-up
//! triples for the injection target:
//!
//! ```text
//!            enqueue (while Idle)
//!   Idle ───────────────────────────▶ Draining ──┐ step: pop head, emit
//!    ▲                                   │  ▲    │ down/char/up, wait
//!    │  step finds the buffer empty      │  └────┘ key_press_wait ms
//!    └───────────── (buffer-empty) ◀─────┘
//! ```
//!
//! Enqueueing while draining only grows the buffer; there is never more
//! than one drain loop. The queue is sans-IO: the owner feeds it a
//! millisecond clock through [`DispatchQueue::enqueue`] and
//! [`DispatchQueue::poll`] and sleeps until [`DispatchQueue::next_deadline`].

use std::collections::VecDeque;

use log::{debug, trace};

use crate::constants::DEFAULT_KEY_PRESS_WAIT_MS;
use crate::error::Result;
use crate::timer::Timer;

/// Low-level event kind, issued in this order for every character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventKind {
    KeyDown,
    Char,
    KeyUp,
}

/// One event for the injection target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: InputEventKind,
    /// Character or control code, forwarded unmodified
    pub key: char,
}

/// Receiver of injected input
///
/// Returning [`crate::Error::TargetGone`] is fatal for the queue owner;
/// the queue neither retries nor keeps the undelivered character.
pub trait InjectionTarget {
    fn send_input_event(&mut self, event: InputEvent) -> Result<()>;
}

impl<T: InjectionTarget + ?Sized> InjectionTarget for Box<T> {
    fn send_input_event(&mut self, event: InputEvent) -> Result<()> {
        (**self).send_input_event(event)
    }
}

/// Queue phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Buffer empty, nothing scheduled
    Idle,
    /// A drain cycle is running; exactly one step is scheduled
    Draining,
}

/// FIFO of characters awaiting injection
pub struct DispatchQueue<T> {
    target: T,
    buffer: VecDeque<char>,
    state: DispatchState,
    pacing: Timer,
    key_press_wait: u64,
}

impl<T: InjectionTarget> DispatchQueue<T> {
    pub fn new(target: T) -> Self {
        Self::with_key_press_wait(target, DEFAULT_KEY_PRESS_WAIT_MS)
    }

    pub fn with_key_press_wait(target: T, key_press_wait: u64) -> Self {
        Self {
            target,
            buffer: VecDeque::new(),
            state: DispatchState::Idle,
            pacing: Timer::once(key_press_wait),
            key_press_wait,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Characters still waiting
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn key_press_wait(&self) -> u64 {
        self.key_press_wait
    }

    /// Change the pacing delay. The step already scheduled keeps its
    /// deadline; the new delay applies from the next one.
    pub fn set_key_press_wait(&mut self, ms: u64) {
        self.key_press_wait = ms;
        self.pacing.set_delay(ms);
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    /// When the next drain step is due
    pub fn next_deadline(&self) -> Option<u64> {
        match self.state {
            DispatchState::Draining => self.pacing.next_deadline(),
            DispatchState::Idle => None,
        }
    }

    /// Append every character of `text`, starting a drain cycle if idle.
    ///
    /// The first character is injected immediately when a cycle starts.
    /// Returns `true` when this call completed a drain cycle (only possible
    /// for an empty `text` on an idle queue).
    pub fn enqueue(&mut self, text: &str, now: u64) -> Result<bool> {
        self.buffer.extend(text.chars());
        if self.state == DispatchState::Draining {
            trace!("Queue busy, {} characters pending", self.buffer.len());
            return Ok(false);
        }
        debug!("Drain cycle started ({} characters)", self.buffer.len());
        self.state = DispatchState::Draining;
        self.step(now)
    }

    /// Run every step due at `now`. Returns `true` when a drain cycle
    /// finished, i.e. the buffer-empty signal must be emitted.
    pub fn poll(&mut self, now: u64) -> Result<bool> {
        let mut drained = false;
        while self.state == DispatchState::Draining && self.pacing.poll(now) > 0 {
            drained |= self.step(now)?;
        }
        Ok(drained)
    }

    fn step(&mut self, now: u64) -> Result<bool> {
        let Some(key) = self.buffer.pop_front() else {
            self.state = DispatchState::Idle;
            debug!("Drain cycle finished");
            return Ok(true);
        };

        trace!("Injecting {:?}", key);
        for kind in [
            InputEventKind::KeyDown,
            InputEventKind::Char,
            InputEventKind::KeyUp,
        ] {
            self.target.send_input_event(InputEvent { kind, key })?;
        }
        self.pacing.start(now);
        Ok(false)
    }
}
