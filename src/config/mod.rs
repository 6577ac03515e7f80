//! Configuration file management
//!
//! Loads TOML configuration files and turns them into keyboard options.
//! Default config path: ~/.config/vkeyboard/config.toml

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_KEY_PRESS_WAIT_MS, DEFAULT_KEY_TEMPLATE, DEFAULT_LAYOUT, HOLD_DELAY_MS,
    HOLD_REPEAT_MS, REFOCUS_DELAY_MS, UNFOCUS_DELAY_MS,
};
use crate::keyboard::{AutoPosition, KeyboardOptions, Timing};
use crate::layout::{
    CustomKeyDefinition, DisplayPatch, KeyAction, KeyRender, LayoutRegistry, LayoutSet,
    LayoutSource,
};

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Keyboard settings
    pub keyboard: KeyboardConfig,
    /// Timer settings
    pub timing: TimingConfig,
    /// Extra layout sets (a set named like a built-in replaces it)
    pub layouts: Vec<LayoutSet>,
    /// Custom keys, checked before the built-in ones
    pub custom_keys: Vec<CustomKeyConfig>,
}

/// Keyboard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// One keyboard per input instead of one shared keyboard
    pub individual: bool,
    /// Theme class for the keyboard container (empty = none)
    pub theme: String,
    /// Show the keyboard before any input is focused
    pub show: bool,
    /// Show the keyboard when an attached input gains focus
    pub display_on_focus: bool,
    /// Caller-managed container (empty = floating keyboard)
    /// When set, auto_position is ignored
    pub container: String,
    /// Center the keyboard below the focused input
    pub auto_position: bool,
    /// Layout set name
    pub layout: String,
    /// Markup of a single key
    pub key_template: String,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            individual: false,
            theme: String::new(),
            show: false,
            display_on_focus: true,
            container: String::new(),
            auto_position: true,
            layout: DEFAULT_LAYOUT.to_string(),
            key_template: DEFAULT_KEY_TEMPLATE.to_string(),
        }
    }
}

/// Timer settings (milliseconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay between injected characters (default: 30)
    pub key_press_wait: u64,
    /// Delay between input blur and keyboard hide (default: 500)
    pub unfocus_delay: u64,
    /// Delay before a held key repeats (default: 500)
    pub hold_delay: u64,
    /// Interval between repeats (default: 100)
    pub hold_repeat: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            key_press_wait: DEFAULT_KEY_PRESS_WAIT_MS,
            unfocus_delay: UNFOCUS_DELAY_MS,
            hold_delay: HOLD_DELAY_MS,
            hold_repeat: HOLD_REPEAT_MS,
        }
    }
}

/// Declarative custom key
///
/// At most one of `output`, `switch_to`, `toggle` and `spacer` should be
/// set; without any the key types its own name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomKeyConfig {
    /// Case-insensitive regex matched against the key name
    pub pattern: String,
    /// Replacement label
    pub label: Option<String>,
    /// Extra style classes
    pub classes: Vec<String>,
    /// Text sent when pressed
    pub output: Option<String>,
    /// Sub-layout activated when pressed
    pub switch_to: Option<String>,
    /// [primary, alternate] sub-layouts flipped when pressed
    pub toggle: Option<[String; 2]>,
    /// Inert spacer
    pub spacer: bool,
}

impl CustomKeyConfig {
    /// Compile into a definition
    pub fn to_definition(&self) -> crate::Result<CustomKeyDefinition> {
        let render = if self.label.is_some() || !self.classes.is_empty() {
            KeyRender::Patch(DisplayPatch {
                label: self.label.clone(),
                classes: self.classes.clone(),
            })
        } else {
            KeyRender::Plain
        };

        let behaviours = usize::from(self.output.is_some())
            + usize::from(self.switch_to.is_some())
            + usize::from(self.toggle.is_some())
            + usize::from(self.spacer);
        if behaviours > 1 {
            warn!(
                "Custom key {:?}: several behaviours set, using the first of output/switch_to/toggle/spacer",
                self.pattern
            );
        }

        let action = if let Some(text) = &self.output {
            KeyAction::Emit(text.clone())
        } else if let Some(name) = &self.switch_to {
            KeyAction::SwitchTo(name.clone())
        } else if let Some([primary, alternate]) = &self.toggle {
            KeyAction::Toggle {
                primary: primary.clone(),
                alternate: alternate.clone(),
            }
        } else if self.spacer {
            KeyAction::Spacer
        } else {
            KeyAction::Literal
        };

        CustomKeyDefinition::new(&self.pattern, render, action)
    }
}

impl Config {
    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. VKEYBOARD_CONFIG environment variable
        if let Ok(path) = std::env::var("VKEYBOARD_CONFIG") {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/vkeyboard/config.toml
        let user_config = default_config_path()?;
        user_config.exists().then_some(user_config)
    }

    /// Load configuration with priority:
    /// 1. VKEYBOARD_CONFIG environment variable
    /// 2. ~/.config/vkeyboard/config.toml (user config)
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::default()
    }

    /// Load settings from specified path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Layout registry with the configured sets merged in
    pub fn layout_registry(&self) -> LayoutRegistry {
        LayoutRegistry::with_layouts(self.layouts.iter().cloned())
    }

    /// Keyboard options described by this config.
    ///
    /// Custom keys whose pattern does not compile are skipped with a warning.
    pub fn keyboard_options(&self) -> KeyboardOptions {
        let kb = &self.keyboard;
        let custom_keys = self
            .custom_keys
            .iter()
            .filter_map(|key| match key.to_definition() {
                Ok(def) => Some(def),
                Err(e) => {
                    warn!("Custom key skipped: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();
        debug!("{} custom keys from config", custom_keys.len());

        KeyboardOptions {
            individual: kb.individual,
            theme: non_empty(&kb.theme),
            show: kb.show,
            display_on_focus: kb.display_on_focus,
            container: non_empty(&kb.container),
            auto_position: AutoPosition::from(kb.auto_position),
            layout: LayoutSource::Named(kb.layout.clone()),
            key_template: kb.key_template.clone(),
            custom_keys,
            timing: Timing {
                key_press_wait: self.timing.key_press_wait,
                unfocus_delay: self.timing.unfocus_delay,
                hold_delay: self.timing.hold_delay,
                hold_repeat: self.timing.hold_repeat,
                refocus_delay: REFOCUS_DELAY_MS,
            },
        }
    }

    /// Commented config file holding the defaults
    pub fn template() -> String {
        format!(
            r#"# vkeyboard configuration
#
# Every section is optional; missing keys keep their defaults.

[keyboard]
# One keyboard per input instead of one shared keyboard
individual = false
# Theme class added to the keyboard container ("" = none)
theme = ""
# Show the keyboard before any input is focused
show = false
# Show the keyboard when an attached input gains focus
display_on_focus = true
# Caller-managed container ("" = floating keyboard)
# When set, auto_position is ignored
container = ""
# Center the keyboard below the focused input, clamped to the screen
auto_position = true
# Layout set: "{layout}" or the name of a [[layouts]] entry
layout = "{layout}"
# Markup of a single key
key_template = '{key_template}'

[timing]
# Delay between injected characters (ms)
key_press_wait = {key_press_wait}
# Delay between input blur and keyboard hide (ms)
unfocus_delay = {unfocus_delay}
# Delay before a held key starts repeating (ms)
hold_delay = {hold_delay}
# Interval between repeats of a held key (ms)
hold_repeat = {hold_repeat}

# =============================================================================
# Layouts
# =============================================================================
# A row is a string of whitespace-separated keys, or an array of strings
# rendered as parallel columns. Keys in braces are named keys; an optional
# modifier after ':' sets the width ({{space:10}} = 10em, {{shift:*}} = fill).
#
# [[layouts]]
# name = "pin"
#
# [[layouts.sub]]
# name = "normal"
# rows = [
#     ["1 2 3", "{{backspace}}"],
#     ["4 5 6", "{{enter}}"],
#     ["7 8 9"],
#     "{{sp}} 0 {{sp}}",
# ]

# =============================================================================
# Custom keys
# =============================================================================
# Matched against key names (case-insensitive regex), before the built-in
# keys. Pick one behaviour: output, switch_to, toggle or spacer.
#
# [[custom_keys]]
# pattern = "^smile$"
# label = ":)"
# output = ":-)"
#
# [[custom_keys]]
# pattern = "^pin$"
# classes = ["action"]
# switch_to = "numeric"
"#,
            layout = DEFAULT_LAYOUT,
            key_template = DEFAULT_KEY_TEMPLATE,
            key_press_wait = DEFAULT_KEY_PRESS_WAIT_MS,
            unfocus_delay = UNFOCUS_DELAY_MS,
            hold_delay = HOLD_DELAY_MS,
            hold_repeat = HOLD_REPEAT_MS,
        )
    }

    /// Write the template to the config path.
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub fn write_template(force: bool) -> Result<PathBuf> {
        let config_path = match std::env::var("VKEYBOARD_CONFIG") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_config_path()
                .ok_or_else(|| anyhow::anyhow!("Config directory not found"))?,
        };
        Self::write_template_to(&config_path, force)?;
        Ok(config_path)
    }

    /// Write the template to `path`
    pub fn write_template_to(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, Self::template())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// User config path, whether or not it exists
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vkeyboard").join("config.toml"))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
