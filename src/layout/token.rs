//! Key token parser
//!
//! Turns one whitespace-delimited unit of a row string into a [`KeyToken`]:
//!
//! ```text
//!   a            literal key "a"
//!   :            literal key ":" (never split)
//!   {enter}      special key "enter"
//!   {shift:*}    special key "shift", fills remaining row space
//!   {space:10}   special key "space", 10em wide
//!   sp:2         unbraced tokens split on ':' the same way
//! ```
//!
//! The modifier half is classified by its own ordered rule table, which
//! is independent of the custom-key table consulted later by the resolver.

use regex::{Regex, RegexBuilder};
use smol_str::SmolStr;

use crate::constants::DEFAULT_SIZE_UNIT;
use crate::error::{Error, Result};

/// How a modifier affects key sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind {
    None,
    /// Explicit width
    Size,
    /// Share the remaining row space with every other fill key
    Fill,
    /// Syntax no rule recognised; carried along and ignored by the renderer
    Unrecognized,
}

/// Sizing annotation taken from the `:`-suffix of a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub kind: ModifierKind,
    pub value: Option<SmolStr>,
}

impl Modifier {
    pub fn none() -> Self {
        Self {
            kind: ModifierKind::None,
            value: None,
        }
    }

    /// CSS-style width for size modifiers; a bare number gets the default unit
    pub fn width(&self) -> Option<String> {
        if self.kind != ModifierKind::Size {
            return None;
        }
        let value = self.value.as_deref()?;
        if value.chars().all(|c| c.is_ascii_digit() || c == '.') {
            Some(format!("{}{}", value, DEFAULT_SIZE_UNIT))
        } else {
            Some(value.to_string())
        }
    }
}

/// One parsed key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyToken {
    /// Token text exactly as written in the row
    pub raw: SmolStr,
    /// Written as `{...}`
    pub braced: bool,
    /// Key name, shown unless a custom key's render step overrides it
    pub display: SmolStr,
    pub modifier: Modifier,
    /// Name of the custom key definition attached by the resolver
    pub custom_key: Option<SmolStr>,
}

/// A pattern in the modifier table
#[derive(Debug, Clone)]
pub struct ModifierRule {
    pattern: Regex,
    kind: ModifierKind,
}

impl ModifierRule {
    pub fn new(pattern: &str, kind: ModifierKind) -> Result<Self> {
        Ok(Self {
            pattern: compile_pattern(pattern)?,
            kind,
        })
    }
}

/// Compile a case-insensitive search pattern
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Splits row strings into tokens and classifies their modifiers
#[derive(Debug, Clone)]
pub struct TokenParser {
    rules: Vec<ModifierRule>,
}

impl Default for TokenParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenParser {
    /// Parser with the built-in modifier rules: `*`/`fill` and sizes
    pub fn new() -> Self {
        let builtin = [
            (r"^(?:\*|fill)$", ModifierKind::Fill),
            (
                r"^\d+(?:\.\d+)?(?:px|em|rem|ex|ch|vw|vh|vmin|vmax|pt|pc|cm|mm|in|%)?$",
                ModifierKind::Size,
            ),
        ];
        let rules = builtin
            .iter()
            .map(|(pattern, kind)| {
                ModifierRule::new(pattern, *kind).expect("built-in modifier pattern")
            })
            .collect();
        Self { rules }
    }

    /// Parser with a caller-supplied rule table, scanned in order
    pub fn with_rules(rules: Vec<ModifierRule>) -> Self {
        Self { rules }
    }

    /// Tokens of one row segment; runs of whitespace never yield empty keys
    pub fn tokenize<'a>(&'a self, row: &'a str) -> impl Iterator<Item = KeyToken> + 'a {
        row.split_whitespace().filter_map(move |raw| self.parse(raw))
    }

    /// Parse a single token. Returns `None` for an empty token.
    pub fn parse(&self, raw: &str) -> Option<KeyToken> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let inner = raw
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'));
        let (braced, body) = match inner {
            Some(inner) => (true, inner),
            None => (false, raw),
        };

        let (name, modifier) = if braced || (raw != ":" && raw.chars().count() > 1) {
            match body.split_once(':') {
                // Only a braced token may have an empty name (`{:fill}`)
                Some(("", _)) if !braced => (body, Modifier::none()),
                Some((name, modifier)) => (name, self.classify(modifier)),
                None => (body, Modifier::none()),
            }
        } else {
            (body, Modifier::none())
        };

        Some(KeyToken {
            raw: SmolStr::new(raw),
            braced,
            display: SmolStr::new(name),
            modifier,
            custom_key: None,
        })
    }

    /// First matching rule wins; no match is carried as unrecognised
    fn classify(&self, modifier: &str) -> Modifier {
        if modifier.is_empty() {
            return Modifier::none();
        }
        let kind = self
            .rules
            .iter()
            .find(|rule| rule.pattern.is_match(modifier))
            .map(|rule| rule.kind)
            .unwrap_or(ModifierKind::Unrecognized);
        Modifier {
            kind,
            value: Some(SmolStr::new(modifier)),
        }
    }
}
