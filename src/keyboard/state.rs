//! Per-keyboard mutable state

use log::debug;

use super::surface::TargetId;
use crate::constants::{INITIAL_SUB_LAYOUT, UNFOCUS_DELAY_MS};
use crate::timer::Timer;

/// State owned by exactly one keyboard instance
///
/// Press handlers receive it mutably, which is how layout-switch keys
/// change the visible sub-layout.
#[derive(Debug, Clone)]
pub struct KeyboardState {
    active: String,
    sub_layouts: Vec<String>,
    focused: Option<TargetId>,
    unfocus: Timer,
}

impl KeyboardState {
    /// State over the given sub-layout names; "normal" starts active when
    /// present, else the first name.
    pub fn new<I, S>(sub_layouts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sub_layouts: Vec<String> = sub_layouts.into_iter().map(Into::into).collect();
        let active = if sub_layouts.iter().any(|s| s == INITIAL_SUB_LAYOUT) {
            INITIAL_SUB_LAYOUT.to_string()
        } else {
            sub_layouts.first().cloned().unwrap_or_default()
        };
        Self {
            active,
            sub_layouts,
            focused: None,
            unfocus: Timer::once(UNFOCUS_DELAY_MS),
        }
    }

    pub(crate) fn with_unfocus_delay(mut self, delay: u64) -> Self {
        self.unfocus = Timer::once(delay);
        self
    }

    /// Name of the active sub-layout
    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn has_sub_layout(&self, name: &str) -> bool {
        self.sub_layouts.iter().any(|s| s == name)
    }

    /// Activate `name`. Unknown names are ignored.
    pub fn switch_to(&mut self, name: &str) -> bool {
        if !self.has_sub_layout(name) {
            debug!("Layout switch to unknown sub-layout {:?} ignored", name);
            return false;
        }
        self.active = name.to_string();
        true
    }

    /// Activate `alternate`, or `primary` if `alternate` is already active
    pub fn toggle(&mut self, primary: &str, alternate: &str) -> bool {
        if self.active == alternate {
            self.switch_to(primary)
        } else {
            self.switch_to(alternate)
        }
    }

    /// Input the keyboard types into
    pub fn focused(&self) -> Option<TargetId> {
        self.focused
    }

    pub(crate) fn set_focused(&mut self, target: TargetId) {
        self.focused = Some(target);
    }

    pub fn unfocus_pending(&self) -> bool {
        self.unfocus.is_active()
    }

    pub fn unfocus_deadline(&self) -> Option<u64> {
        self.unfocus.next_deadline()
    }

    pub(crate) fn unfocus_timer(&mut self) -> &mut Timer {
        &mut self.unfocus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_prefers_normal() {
        assert_eq!(KeyboardState::new(["shift", "normal"]).active(), "normal");
        assert_eq!(KeyboardState::new(["digits"]).active(), "digits");
        assert_eq!(KeyboardState::new(Vec::<String>::new()).active(), "");
    }

    #[test]
    fn test_toggle_flips_once_per_call() {
        let mut state = KeyboardState::new(["normal", "shift"]);
        assert!(state.toggle("normal", "shift"));
        assert_eq!(state.active(), "shift");
        assert!(state.toggle("normal", "shift"));
        assert_eq!(state.active(), "normal");
    }

    #[test]
    fn test_switch_to_unknown_is_ignored() {
        let mut state = KeyboardState::new(["normal"]);
        assert!(!state.switch_to("symbols"));
        assert!(!state.toggle("normal", "shift"));
        assert_eq!(state.active(), "normal");
    }
}
