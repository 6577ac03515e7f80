//! Custom key resolution
//!
//! Custom keys attach a display transform and a press behaviour to any
//! token whose name matches a pattern. The table is an ordered list
//! scanned linearly: the first registered pattern that matches wins, even
//! when a later one is more specific. Matching is a case-insensitive,
//! unanchored search; the built-in patterns anchor themselves so that
//! `backspace` is never mistaken for `space`.

use std::fmt;
use std::sync::Arc;

use log::debug;
use regex::Regex;
use smol_str::SmolStr;

use super::token::{compile_pattern, KeyToken};
use crate::constants::{
    BACKSPACE, CARRIAGE_RETURN, DELETE, INITIAL_SUB_LAYOUT, SHIFT_SUB_LAYOUT, TAB,
};
use crate::error::Result;
use crate::keyboard::KeyboardState;

/// Closure form of a render step
pub type RenderFn = Arc<dyn Fn(&KeyToken) -> Option<DisplayPatch> + Send + Sync>;

/// Closure form of a press handler; `None` means "no character output"
pub type HandlerFn = Arc<dyn Fn(&mut KeyboardState, &KeyToken) -> Option<String> + Send + Sync>;

/// Visual annotation produced by a render step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayPatch {
    /// Replacement label
    pub label: Option<String>,
    /// Extra style classes
    pub classes: Vec<String>,
}

/// Render step of a custom key
#[derive(Clone)]
pub enum KeyRender {
    /// Default styling only
    Plain,
    /// Upper-cased label with the `action` class
    Action,
    /// A single cosmetic class, no behavioural effect
    Class(SmolStr),
    /// Fixed label and classes
    Patch(DisplayPatch),
    Custom(RenderFn),
}

impl KeyRender {
    pub fn apply(&self, token: &KeyToken) -> Option<DisplayPatch> {
        match self {
            KeyRender::Plain => None,
            KeyRender::Action => Some(DisplayPatch {
                label: Some(token.display.to_uppercase()),
                classes: vec!["action".to_string()],
            }),
            KeyRender::Class(class) => Some(DisplayPatch {
                label: None,
                classes: vec![class.to_string()],
            }),
            KeyRender::Patch(patch) => Some(patch.clone()),
            KeyRender::Custom(render) => render(token),
        }
    }
}

impl fmt::Debug for KeyRender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRender::Plain => f.write_str("Plain"),
            KeyRender::Action => f.write_str("Action"),
            KeyRender::Class(class) => f.debug_tuple("Class").field(class).finish(),
            KeyRender::Patch(patch) => f.debug_tuple("Patch").field(patch).finish(),
            KeyRender::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Press behaviour of a custom key
#[derive(Clone)]
pub enum KeyAction {
    /// Emit the key's own display text
    Literal,
    /// Emit fixed text
    Emit(String),
    /// Flip between two sub-layouts, no character
    Toggle { primary: String, alternate: String },
    /// Switch to a sub-layout, no character
    SwitchTo(String),
    /// Non-interactive: never invoked, never emits
    Spacer,
    Custom(HandlerFn),
}

impl KeyAction {
    pub fn is_interactive(&self) -> bool {
        !matches!(self, KeyAction::Spacer)
    }

    /// Run the behaviour, returning the text to dispatch
    pub fn invoke(&self, state: &mut KeyboardState, token: &KeyToken) -> Option<String> {
        match self {
            KeyAction::Literal => Some(token.display.to_string()),
            KeyAction::Emit(text) => Some(text.clone()),
            KeyAction::Toggle { primary, alternate } => {
                state.toggle(primary, alternate);
                None
            }
            KeyAction::SwitchTo(name) => {
                state.switch_to(name);
                None
            }
            KeyAction::Spacer => None,
            KeyAction::Custom(handler) => handler(state, token),
        }
    }
}

impl fmt::Debug for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAction::Literal => f.write_str("Literal"),
            KeyAction::Emit(text) => f.debug_tuple("Emit").field(text).finish(),
            KeyAction::Toggle { primary, alternate } => f
                .debug_struct("Toggle")
                .field("primary", primary)
                .field("alternate", alternate)
                .finish(),
            KeyAction::SwitchTo(name) => f.debug_tuple("SwitchTo").field(name).finish(),
            KeyAction::Spacer => f.write_str("Spacer"),
            KeyAction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A pattern-matched key override
#[derive(Debug, Clone)]
pub struct CustomKeyDefinition {
    name: SmolStr,
    pattern: Regex,
    render: KeyRender,
    action: KeyAction,
}

impl CustomKeyDefinition {
    /// Definition named after its pattern text
    pub fn new(pattern: &str, render: KeyRender, action: KeyAction) -> Result<Self> {
        Ok(Self {
            name: SmolStr::new(pattern),
            pattern: compile_pattern(pattern)?,
            render,
            action,
        })
    }

    /// Rename the definition (the name is recorded on matched tokens)
    pub fn named(mut self, name: &str) -> Self {
        self.name = SmolStr::new(name);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn render(&self) -> &KeyRender {
        &self.render
    }

    pub fn action(&self) -> &KeyAction {
        &self.action
    }

    pub fn matches(&self, key_name: &str) -> bool {
        self.pattern.is_match(key_name)
    }
}

/// Ordered first-match table of custom keys
#[derive(Debug, Clone)]
pub struct CustomKeyRegistry {
    definitions: Vec<CustomKeyDefinition>,
}

impl Default for CustomKeyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CustomKeyRegistry {
    /// Built-in keys only
    pub fn builtin() -> Self {
        Self {
            definitions: builtin_definitions(),
        }
    }

    /// Built-in keys merged with caller overrides.
    ///
    /// An override whose pattern text equals a built-in's replaces it in
    /// place; every other override is placed ahead of the built-ins, in the
    /// order given, so it takes precedence.
    pub fn with_overrides(overrides: impl IntoIterator<Item = CustomKeyDefinition>) -> Self {
        let mut definitions = builtin_definitions();
        let mut front = Vec::new();
        for def in overrides {
            match definitions.iter_mut().find(|d| d.pattern() == def.pattern()) {
                Some(existing) => {
                    debug!("Custom key {:?} replaces built-in {}", def.pattern(), existing.name);
                    *existing = def;
                }
                None => front.push(def),
            }
        }
        front.extend(definitions);
        Self { definitions: front }
    }

    pub fn get(&self, index: usize) -> Option<&CustomKeyDefinition> {
        self.definitions.get(index)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Index of the first definition matching the token's name
    pub fn resolve(&self, token: &KeyToken) -> Option<usize> {
        self.definitions
            .iter()
            .position(|def| def.matches(&token.display))
    }
}

/// The built-in table. Order is significant.
fn builtin_definitions() -> Vec<CustomKeyDefinition> {
    let emit = |c: char| KeyAction::Emit(c.to_string());
    let switch = |name: &str| KeyAction::SwitchTo(name.to_string());
    let table = vec![
        ("enter", r"^enter$", KeyRender::Action, emit(CARRIAGE_RETURN)),
        (
            "shift",
            r"^shift$",
            KeyRender::Action,
            KeyAction::Toggle {
                primary: INITIAL_SUB_LAYOUT.to_string(),
                alternate: SHIFT_SUB_LAYOUT.to_string(),
            },
        ),
        ("tab", r"^tab$", KeyRender::Action, emit(TAB)),
        ("backspace", r"^backspace$", KeyRender::Action, emit(BACKSPACE)),
        ("delete", r"^(?:delete|del)$", KeyRender::Action, emit(DELETE)),
        ("space", r"^space$", KeyRender::Action, emit(' ')),
        ("caps", r"^caps$", KeyRender::Action, switch(SHIFT_SUB_LAYOUT)),
        ("lower", r"^lower$", KeyRender::Action, switch(INITIAL_SUB_LAYOUT)),
        ("numeric", r"^numeric$", KeyRender::Action, switch("numeric")),
        ("symbols", r"^symbols$", KeyRender::Action, switch("symbols")),
        ("abc", r"^abc$", KeyRender::Action, switch(INITIAL_SUB_LAYOUT)),
        (
            "sp",
            r"^(?:sp)?$",
            KeyRender::Patch(DisplayPatch {
                label: Some(String::new()),
                classes: vec!["spacer".to_string()],
            }),
            KeyAction::Spacer,
        ),
        ("digit", r"^\d$", KeyRender::Class(SmolStr::new_inline("digit")), KeyAction::Literal),
        (
            "punctuation",
            r"^[[:punct:]]$",
            KeyRender::Class(SmolStr::new_inline("punctuation")),
            KeyAction::Literal,
        ),
    ];

    table
        .into_iter()
        .map(|(name, pattern, render, action)| {
            CustomKeyDefinition::new(pattern, render, action)
                .expect("built-in custom key pattern")
                .named(name)
        })
        .collect()
}
