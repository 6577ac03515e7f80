//! Deferred and repeating timers
//!
//! Timers here never own a clock or a callback. The owner drives them
//! with a monotonic millisecond counter and acts on the number of fires
//! `poll` reports, which keeps every timer a plain state machine:
//!
//! ```text
//!          start                poll (delay elapsed)
//!   Idle ─────────▶ Pending ─────────────────────────▶ Idle        (one-shot)
//!    ▲                 │  └──────────────────────────▶ Repeating   (with interval)
//!    │   trigger_now   │ cancel                           │
//!    └─────────────────┴──────────▶ Cancelled ◀───────────┘ cancel
//! ```
//!
//! `cancel` and `trigger_now` are idempotent: a second call observes an
//! inactive timer and does nothing.

/// Current phase of a [`Timer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Never started, or ran to completion
    Idle,
    /// Waiting for the initial delay to elapse
    Pending { deadline: u64 },
    /// Past the initial delay, firing every interval
    Repeating { next: u64 },
    /// Stopped before completing
    Cancelled,
}

/// A restartable timer: optional immediate fire, a delay, then either
/// one fire or an endless repeat at a fixed interval.
#[derive(Debug, Clone)]
pub struct Timer {
    delay: u64,
    interval: Option<u64>,
    fire_on_start: bool,
    state: TimerState,
    /// Whether the current run has fired at least once
    fired: bool,
}

impl Timer {
    /// Fires once, `delay` ms after start
    pub fn once(delay: u64) -> Self {
        Self {
            delay,
            interval: None,
            fire_on_start: false,
            state: TimerState::Idle,
            fired: false,
        }
    }

    /// Fires immediately on start, again after `delay`, then every `interval`
    /// until stopped. Models a held-down key.
    pub fn hold(delay: u64, interval: u64) -> Self {
        Self {
            delay,
            // A zero interval would repeat on every poll
            interval: Some(interval.max(1)),
            fire_on_start: true,
            state: TimerState::Idle,
            fired: false,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            TimerState::Pending { .. } | TimerState::Repeating { .. }
        )
    }

    /// Change the delay used by the next `start`. A running timer keeps its
    /// current deadline.
    pub fn set_delay(&mut self, delay: u64) {
        self.delay = delay;
    }

    /// Start (or restart) the timer at `now`.
    ///
    /// A running timer is replaced, never stacked. Returns the number of
    /// fires due immediately (1 for hold timers, 0 otherwise).
    pub fn start(&mut self, now: u64) -> u32 {
        self.state = TimerState::Pending {
            deadline: now.saturating_add(self.delay),
        };
        self.fired = self.fire_on_start;
        u32::from(self.fire_on_start)
    }

    /// Advance to `now`, returning how many times the timer fired.
    ///
    /// Reports at most one fire per call. A late poll does not replay the
    /// repeats it missed; the next repeat is scheduled one interval after `now`.
    pub fn poll(&mut self, now: u64) -> u32 {
        match self.state {
            TimerState::Pending { deadline } if now >= deadline => {
                self.fired = true;
                self.state = match self.interval {
                    Some(interval) => TimerState::Repeating {
                        next: now.saturating_add(interval),
                    },
                    None => TimerState::Idle,
                };
                1
            }
            TimerState::Repeating { next } if now >= next => {
                let interval = self.interval.unwrap_or(1);
                self.state = TimerState::Repeating {
                    next: now.saturating_add(interval),
                };
                1
            }
            _ => 0,
        }
    }

    /// Stop without firing
    pub fn cancel(&mut self) {
        if self.is_active() {
            self.state = TimerState::Cancelled;
        }
    }

    /// Stop now, firing once if the current run has not fired yet.
    ///
    /// Returns `true` when the caller should run the action.
    pub fn trigger_now(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        let fire = !self.fired;
        self.fired = true;
        self.state = TimerState::Idle;
        fire
    }

    /// Deadline of the next fire, if any
    pub fn next_deadline(&self) -> Option<u64> {
        match self.state {
            TimerState::Pending { deadline } => Some(deadline),
            TimerState::Repeating { next } => Some(next),
            _ => None,
        }
    }
}
