//! Layout renderer
//!
//! Builds the render tree for a layout set once, at construction. Each
//! sub-layout is split into N parallel columns, N being the widest row
//! (in column segments) of that sub-layout:
//!
//! ```text
//!   rows: ["1 2 3", "{backspace}"]      column 0    column 1
//!         ["4 5 6", "{enter}"]    ──▶   1 2 3       BACKSPACE
//!         "0 ."                         4 5 6       ENTER
//!                                       0 .
//! ```
//!
//! A row with fewer segments fills only its own (lowest) column slots.
//! Switching sub-layouts later is a visibility flip, never a re-parse.

use log::trace;
use smol_str::SmolStr;

use super::custom::CustomKeyRegistry;
use super::registry::{LayoutSet, SubLayout};
use super::token::{KeyToken, ModifierKind, TokenParser};

/// Resolved width of one key
#[derive(Debug, Clone, PartialEq)]
pub enum KeyWidth {
    /// Natural width
    Auto,
    /// Explicit CSS-style length, e.g. `2em`
    Fixed(String),
    /// Fraction of the row space left over after the other keys
    Fill { share: f32 },
}

/// Everything needed to draw and activate one key
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDescriptor {
    pub token: KeyToken,
    pub label: String,
    pub classes: Vec<String>,
    pub width: KeyWidth,
    /// Index of the matched custom key definition
    pub custom: Option<usize>,
    pub interactive: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedRow {
    pub keys: Vec<KeyDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Column {
    pub rows: Vec<RenderedRow>,
}

/// One sub-layout container
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLayout {
    pub name: String,
    pub columns: Vec<Column>,
    pub visible: bool,
}

impl RenderedLayout {
    pub fn keys(&self) -> impl Iterator<Item = &KeyDescriptor> {
        self.columns
            .iter()
            .flat_map(|c| c.rows.iter())
            .flat_map(|r| r.keys.iter())
    }
}

/// Address of a key inside a [`RenderTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyRef {
    pub sub_layout: usize,
    pub column: usize,
    pub row: usize,
    pub key: usize,
}

/// Rendered form of a whole layout set
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    pub layout: String,
    pub theme: Option<String>,
    pub key_template: String,
    pub sub_layouts: Vec<RenderedLayout>,
}

impl RenderTree {
    pub fn sub_layout(&self, name: &str) -> Option<&RenderedLayout> {
        self.sub_layouts.iter().find(|s| s.name == name)
    }

    /// The visible sub-layout
    pub fn active(&self) -> Option<&RenderedLayout> {
        self.sub_layouts.iter().find(|s| s.visible)
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active().map(|s| s.name.as_str())
    }

    /// Make `name` the only visible sub-layout. Unknown names change nothing.
    pub fn show(&mut self, name: &str) -> bool {
        if self.sub_layout(name).is_none() {
            return false;
        }
        for sub in &mut self.sub_layouts {
            sub.visible = sub.name == name;
        }
        true
    }

    pub fn key(&self, at: KeyRef) -> Option<&KeyDescriptor> {
        self.sub_layouts
            .get(at.sub_layout)?
            .columns
            .get(at.column)?
            .rows
            .get(at.row)?
            .keys
            .get(at.key)
    }

    /// First key of the visible sub-layout written as `raw` (e.g. `{enter}`)
    /// or named `raw` (e.g. `enter`)
    pub fn find_in_active(&self, raw: &str) -> Option<KeyRef> {
        let sub_layout = self.sub_layouts.iter().position(|s| s.visible)?;
        let layout = &self.sub_layouts[sub_layout];
        for (column, col) in layout.columns.iter().enumerate() {
            for (row, r) in col.rows.iter().enumerate() {
                if let Some(key) = r
                    .keys
                    .iter()
                    .position(|k| k.token.raw == raw || k.token.display == raw)
                {
                    return Some(KeyRef {
                        sub_layout,
                        column,
                        row,
                        key,
                    });
                }
            }
        }
        None
    }
}

/// Builds render trees from layout sets
pub struct LayoutRenderer<'a> {
    parser: &'a TokenParser,
    registry: &'a CustomKeyRegistry,
}

impl<'a> LayoutRenderer<'a> {
    pub fn new(parser: &'a TokenParser, registry: &'a CustomKeyRegistry) -> Self {
        Self { parser, registry }
    }

    /// Render every sub-layout; the initial one is visible
    pub fn render(&self, set: &LayoutSet) -> RenderTree {
        let initial = set.initial_sub_layout().map(|s| s.name.clone());
        let sub_layouts = set
            .sub_layouts
            .iter()
            .map(|sub| {
                let mut rendered = self.render_sub_layout(sub);
                rendered.visible = initial.as_deref() == Some(sub.name.as_str());
                rendered
            })
            .collect();
        RenderTree {
            layout: set.name.clone(),
            theme: None,
            key_template: String::new(),
            sub_layouts,
        }
    }

    /// Column/row layout of one sub-layout (hidden)
    pub fn render_sub_layout(&self, sub: &SubLayout) -> RenderedLayout {
        let column_count = sub.rows.iter().map(|r| r.column_count()).max().unwrap_or(0);
        let mut columns = vec![Column::default(); column_count];
        for row in &sub.rows {
            for (slot, segment) in row.segments().iter().enumerate() {
                columns[slot].rows.push(self.render_row(segment));
            }
        }
        trace!(
            "Rendered sub-layout {} ({} rows, {} columns)",
            sub.name,
            sub.rows.len(),
            column_count
        );
        RenderedLayout {
            name: sub.name.clone(),
            columns,
            visible: false,
        }
    }

    fn render_row(&self, segment: &str) -> RenderedRow {
        let mut keys: Vec<KeyDescriptor> = self
            .parser
            .tokenize(segment)
            .map(|token| self.describe(token))
            .collect();

        let fills = keys
            .iter()
            .filter(|k| matches!(k.width, KeyWidth::Fill { .. }))
            .count();
        if fills > 0 {
            let share = 1.0 / fills as f32;
            for key in &mut keys {
                if let KeyWidth::Fill { share: s } = &mut key.width {
                    *s = share;
                }
            }
        }
        RenderedRow { keys }
    }

    fn describe(&self, mut token: KeyToken) -> KeyDescriptor {
        let mut classes = vec!["key".to_string()];
        let width = match token.modifier.kind {
            ModifierKind::Fill => {
                classes.push("fill".to_string());
                KeyWidth::Fill { share: 1.0 }
            }
            ModifierKind::Size => token
                .modifier
                .width()
                .map(KeyWidth::Fixed)
                .unwrap_or(KeyWidth::Auto),
            ModifierKind::None | ModifierKind::Unrecognized => KeyWidth::Auto,
        };

        let mut label = token.display.to_string();
        let mut interactive = true;
        let custom = self.registry.resolve(&token);
        if let Some(def) = custom.and_then(|i| self.registry.get(i)) {
            token.custom_key = Some(SmolStr::new(def.name()));
            interactive = def.action().is_interactive();
            if let Some(patch) = def.render().apply(&token) {
                if let Some(l) = patch.label {
                    label = l;
                }
                classes.extend(patch.classes);
            }
        }

        KeyDescriptor {
            token,
            label,
            classes,
            width,
            custom,
            interactive,
        }
    }
}
