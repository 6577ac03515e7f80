//! Layout registry
//!
//! A layout set is a named group of sub-layouts ("normal", "shift", ...),
//! each an ordered list of rows. Built-in sets are immutable; caller sets
//! are merged in once when the registry is built and never mutated after.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LAYOUT, INITIAL_SUB_LAYOUT};
use crate::error::{Error, Result};

/// One row of a sub-layout
///
/// Deserializes from either a string or an array of strings, so a TOML
/// file can write `rows = ["q w e", ["7 8 9", "{backspace}"]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowSpec {
    /// A single row string
    Single(String),
    /// Parallel column segments rendered side by side
    Columns(Vec<String>),
}

impl RowSpec {
    /// Row segments, one per column slot, lowest index first
    pub fn segments(&self) -> &[String] {
        match self {
            RowSpec::Single(row) => std::slice::from_ref(row),
            RowSpec::Columns(columns) => columns,
        }
    }

    /// Number of column slots this row occupies
    pub fn column_count(&self) -> usize {
        self.segments().len()
    }
}

impl From<&str> for RowSpec {
    fn from(row: &str) -> Self {
        RowSpec::Single(row.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for RowSpec {
    fn from(columns: [&str; N]) -> Self {
        RowSpec::Columns(columns.iter().map(|c| c.to_string()).collect())
    }
}

/// One selectable key arrangement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubLayout {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<RowSpec>,
}

impl SubLayout {
    pub fn new(name: impl Into<String>, rows: Vec<RowSpec>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// A named set of sub-layouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSet {
    pub name: String,
    #[serde(default, rename = "sub")]
    pub sub_layouts: Vec<SubLayout>,
}

impl LayoutSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sub_layouts: Vec::new(),
        }
    }

    /// Add a sub-layout, replacing one of the same name in place
    pub fn with_sub_layout(mut self, sub: SubLayout) -> Self {
        match self.sub_layouts.iter_mut().find(|s| s.name == sub.name) {
            Some(existing) => *existing = sub,
            None => self.sub_layouts.push(sub),
        }
        self
    }

    pub fn sub_layout(&self, name: &str) -> Option<&SubLayout> {
        self.sub_layouts.iter().find(|s| s.name == name)
    }

    /// Sub-layout shown first: "normal" when present, else the first one
    pub fn initial_sub_layout(&self) -> Option<&SubLayout> {
        self.sub_layout(INITIAL_SUB_LAYOUT)
            .or_else(|| self.sub_layouts.first())
    }

    /// Drop repeated sub-layout names, keeping the first occurrence
    fn dedup_sub_layouts(mut self) -> Self {
        let mut seen: Vec<String> = Vec::with_capacity(self.sub_layouts.len());
        let layout = self.name.clone();
        self.sub_layouts.retain(|sub| {
            if seen.contains(&sub.name) {
                warn!("Layout {}: duplicate sub-layout {:?} ignored", layout, sub.name);
                false
            } else {
                seen.push(sub.name.clone());
                true
            }
        });
        self
    }
}

/// Where a keyboard takes its layout set from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutSource {
    /// Look the set up by name in the registry
    Named(String),
    /// Use this set directly
    Inline(LayoutSet),
}

impl Default for LayoutSource {
    fn default() -> Self {
        LayoutSource::Named(DEFAULT_LAYOUT.to_string())
    }
}

/// Read-only table of layout sets
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    layouts: Vec<LayoutSet>,
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LayoutRegistry {
    /// Registry holding only the built-in sets
    pub fn builtin() -> Self {
        Self {
            layouts: vec![default_layout()],
        }
    }

    /// Built-in sets merged with caller sets; a caller set replaces a
    /// built-in of the same name.
    pub fn with_layouts(layouts: impl IntoIterator<Item = LayoutSet>) -> Self {
        let mut registry = Self::builtin();
        for layout in layouts {
            let layout = layout.dedup_sub_layouts();
            match registry.layouts.iter_mut().find(|l| l.name == layout.name) {
                Some(existing) => {
                    debug!("Layout {} overrides built-in", layout.name);
                    *existing = layout;
                }
                None => registry.layouts.push(layout),
            }
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<&LayoutSet> {
        self.layouts.iter().find(|l| l.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layouts.iter().map(|l| l.name.as_str())
    }

    /// Resolve a layout source to a concrete set
    pub fn resolve(&self, source: &LayoutSource) -> Result<LayoutSet> {
        match source {
            LayoutSource::Named(name) => self
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnknownLayout(name.clone())),
            LayoutSource::Inline(set) => Ok(set.clone().dedup_sub_layouts()),
        }
    }
}

/// Built-in US layout
fn default_layout() -> LayoutSet {
    LayoutSet::new(DEFAULT_LAYOUT)
        .with_sub_layout(SubLayout::new(
            "normal",
            vec![
                "` 1 2 3 4 5 6 7 8 9 0 - = {backspace}".into(),
                "{tab} q w e r t y u i o p [ ] \\".into(),
                "a s d f g h j k l ; ' {enter}".into(),
                "{shift} z x c v b n m , . / {shift}".into(),
                "{numeric} {space:*} {symbols}".into(),
            ],
        ))
        .with_sub_layout(SubLayout::new(
            "shift",
            vec![
                "{:fill} ~ ! @ # $ % ^ & * ( ) _ + {backspace} {:fill}".into(),
                "{:fill} {tab} Q W E R T Y U I O P { } | {:fill}".into(),
                "{:fill} A S D F G H J K L : \" {enter} {:fill}".into(),
                "{:fill} {shift} Z X C V B N M < > ? {shift} {:fill}".into(),
                "{:fill} {space:10} {:fill}".into(),
            ],
        ))
        .with_sub_layout(SubLayout::new(
            "numeric",
            vec![
                ["1 2 3", "{backspace}"].into(),
                ["4 5 6", "{del}"].into(),
                ["7 8 9", "{tab}"].into(),
                ["{abc} 0 .", "{enter}"].into(),
            ],
        ))
        .with_sub_layout(SubLayout::new(
            "symbols",
            vec![
                "! @ # $ % ^ & * ( ) {backspace}".into(),
                "{tab} - _ = + [ ] { } | \\".into(),
                "~ ` : ; \" ' < > ? / {enter}".into(),
                "{abc} {numeric} {sp:2} , . {space:*}".into(),
            ],
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_default_layout() {
        let registry = LayoutRegistry::builtin();
        let layout = registry.get("default").expect("default layout");
        let names: Vec<&str> = layout.sub_layouts.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["normal", "shift", "numeric", "symbols"]);
        assert_eq!(layout.initial_sub_layout().map(|s| s.name.as_str()), Some("normal"));
    }

    #[test]
    fn test_row_spec_segments() {
        let single: RowSpec = "a b c".into();
        assert_eq!(single.column_count(), 1);
        let columns: RowSpec = ["1 2 3", "{backspace}"].into();
        assert_eq!(columns.segments(), ["1 2 3", "{backspace}"]);
    }

    #[test]
    fn test_caller_layout_overrides_builtin() {
        let custom = LayoutSet::new("default")
            .with_sub_layout(SubLayout::new("normal", vec!["x y z".into()]));
        let registry = LayoutRegistry::with_layouts(vec![custom.clone(), LayoutSet::new("empty")]);
        assert_eq!(registry.get("default"), Some(&custom));
        assert_eq!(registry.names().collect::<Vec<_>>(), ["default", "empty"]);
    }

    #[test]
    fn test_initial_sub_layout_falls_back_to_first() {
        let layout = LayoutSet::new("pad").with_sub_layout(SubLayout::new("digits", vec![]));
        assert_eq!(layout.initial_sub_layout().map(|s| s.name.as_str()), Some("digits"));
    }

    #[test]
    fn test_duplicate_sub_layouts_keep_first() {
        let mut set = LayoutSet::new("dup");
        set.sub_layouts.push(SubLayout::new("normal", vec!["a".into()]));
        set.sub_layouts.push(SubLayout::new("normal", vec!["b".into()]));
        let resolved = LayoutRegistry::builtin()
            .resolve(&LayoutSource::Inline(set))
            .expect("inline layout");
        assert_eq!(resolved.sub_layouts.len(), 1);
        assert_eq!(resolved.sub_layouts[0].rows, vec![RowSpec::from("a")]);
    }

    #[test]
    fn test_unknown_layout() {
        let err = LayoutRegistry::builtin()
            .resolve(&LayoutSource::Named("dvorak".into()))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownLayout(name) if name == "dvorak"));
    }

    #[test]
    fn test_rows_deserialize_from_toml() {
        let toml_src = r#"
            name = "pad"
            [[sub]]
            name = "normal"
            rows = ["a b", ["1 2", "{enter}"]]
        "#;
        let set: LayoutSet = toml::from_str(toml_src).expect("parse layout");
        let normal = set.sub_layout("normal").expect("normal");
        assert_eq!(normal.rows[0], RowSpec::Single("a b".into()));
        assert_eq!(normal.rows[1].column_count(), 2);
    }
}
