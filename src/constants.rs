//! Global constants for vkeyboard
//!
//! Consolidates timing defaults, control code points and layout
//! defaults to eliminate magic numbers throughout the codebase.

// ============================================================================
// Timing Constants (milliseconds)
// ============================================================================

/// Pacing delay between two injected characters
pub const DEFAULT_KEY_PRESS_WAIT_MS: u64 = 30;

/// Delay between an input losing focus and the keyboard hiding.
/// A click on the keyboard blurs the input; this window lets it cancel the hide.
pub const UNFOCUS_DELAY_MS: u64 = 500;

/// Delay before a held key starts repeating
pub const HOLD_DELAY_MS: u64 = 500;

/// Interval between repeats of a held key
pub const HOLD_REPEAT_MS: u64 = 100;

/// Delay before focus is handed back to the input after a key press
/// (one scheduling tick)
pub const REFOCUS_DELAY_MS: u64 = 1;

// ============================================================================
// Control Characters
// ============================================================================

/// Carriage return, emitted by `enter`
pub const CARRIAGE_RETURN: char = '\r';

/// Horizontal tab, emitted by `tab`
pub const TAB: char = '\t';

/// Backspace (BS), emitted by `backspace`
pub const BACKSPACE: char = '\u{8}';

/// Delete (DEL, code point 127), emitted by `delete`/`del`
pub const DELETE: char = '\u{7f}';

// ============================================================================
// Layout Defaults
// ============================================================================

/// Sub-layout shown when a keyboard is built
pub const INITIAL_SUB_LAYOUT: &str = "normal";

/// Sub-layout `shift` toggles to
pub const SHIFT_SUB_LAYOUT: &str = "shift";

/// Name of the built-in layout set
pub const DEFAULT_LAYOUT: &str = "default";

/// Unit applied to a bare numeric size modifier (`{space:10}` -> `10em`)
pub const DEFAULT_SIZE_UNIT: &str = "em";

/// Visual shell used for a single key
pub const DEFAULT_KEY_TEMPLATE: &str = "<span class=\"key\"></span>";

/// Config key accepted by the host to change the pacing delay
pub const KEY_PRESS_WAIT_CONFIG_KEY: &str = "keyPressWait";
