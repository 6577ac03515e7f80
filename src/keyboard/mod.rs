//! Rendering-side keyboard widget
//!
//! A [`VirtualKeyboard`] serves one or more input elements. It owns the
//! render tree (built once), the [`KeyboardState`] and three timers:
//!
//! - unfocus: input blurred -> hide after a short delay, unless a key
//!   press or a refocus cancels it first
//! - refocus: key pressed -> hand focus back to the input on the next tick
//! - hold: key held -> press now, again after a delay, then repeatedly
//!
//! Time is a caller-supplied millisecond counter; call [`VirtualKeyboard::tick`]
//! whenever [`VirtualKeyboard::next_deadline`] passes.

mod position;
mod state;
mod surface;

pub use position::{centered_below, AutoPosition, Point, PositionFn, Rect, Size};
pub use state::KeyboardState;
pub use surface::{ElementKind, InputElement, Surface, TargetId};

use std::sync::Arc;

use log::{debug, info, trace};

use crate::constants::{
    DEFAULT_KEY_PRESS_WAIT_MS, DEFAULT_KEY_TEMPLATE, HOLD_DELAY_MS, HOLD_REPEAT_MS,
    REFOCUS_DELAY_MS, UNFOCUS_DELAY_MS,
};
use crate::error::{Error, Result};
use crate::layout::{
    CustomKeyDefinition, CustomKeyRegistry, KeyRef, LayoutRegistry, LayoutRenderer, LayoutSource,
    RenderTree, TokenParser,
};
use crate::timer::Timer;
use crate::transport::{KeySink, SurfaceMessage};

/// Timer settings (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Host pacing between injected characters
    pub key_press_wait: u64,
    pub unfocus_delay: u64,
    pub hold_delay: u64,
    pub hold_repeat: u64,
    pub refocus_delay: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            key_press_wait: DEFAULT_KEY_PRESS_WAIT_MS,
            unfocus_delay: UNFOCUS_DELAY_MS,
            hold_delay: HOLD_DELAY_MS,
            hold_repeat: HOLD_REPEAT_MS,
            refocus_delay: REFOCUS_DELAY_MS,
        }
    }
}

/// Attachment options
#[derive(Debug, Clone)]
pub struct KeyboardOptions {
    /// One keyboard per element instead of one shared keyboard
    pub individual: bool,
    /// Theme class for the keyboard container
    pub theme: Option<String>,
    /// Initially visible
    pub show: bool,
    /// Show when an attached input gains focus
    pub display_on_focus: bool,
    /// Host container supplied by the caller; when set, placement is left
    /// to the caller and auto-positioning is skipped
    pub container: Option<String>,
    pub auto_position: AutoPosition,
    pub layout: LayoutSource,
    /// Visual shell of one key
    pub key_template: String,
    /// Overrides merged ahead of the built-in custom keys
    pub custom_keys: Vec<CustomKeyDefinition>,
    pub timing: Timing,
}

impl Default for KeyboardOptions {
    fn default() -> Self {
        Self {
            individual: false,
            theme: None,
            show: false,
            display_on_focus: true,
            container: None,
            auto_position: AutoPosition::Centered,
            layout: LayoutSource::default(),
            key_template: DEFAULT_KEY_TEMPLATE.to_string(),
            custom_keys: Vec::new(),
            timing: Timing::default(),
        }
    }
}

/// Key being held down
#[derive(Debug, Clone)]
struct HeldKey {
    key: KeyRef,
    timer: Timer,
}

/// On-screen keyboard for one or more inputs
pub struct VirtualKeyboard<S, K> {
    targets: Vec<TargetId>,
    tree: RenderTree,
    registry: Arc<CustomKeyRegistry>,
    state: KeyboardState,
    refocus: Timer,
    hold: Option<HeldKey>,
    timing: Timing,
    display_on_focus: bool,
    floating: bool,
    auto_position: AutoPosition,
    visible: bool,
    awaiting_drain: bool,
    surface: S,
    sink: K,
}

impl<S: Surface, K: KeySink> VirtualKeyboard<S, K> {
    /// Build a keyboard; the layout is parsed and rendered here, once.
    pub fn new(
        targets: Vec<TargetId>,
        options: &KeyboardOptions,
        layouts: &LayoutRegistry,
        surface: S,
        sink: K,
    ) -> Result<Self> {
        let registry = Arc::new(CustomKeyRegistry::with_overrides(
            options.custom_keys.iter().cloned(),
        ));
        Self::with_registry(targets, options, layouts, registry, surface, sink)
    }

    /// Build a keyboard sharing an already merged custom-key table
    pub fn with_registry(
        targets: Vec<TargetId>,
        options: &KeyboardOptions,
        layouts: &LayoutRegistry,
        registry: Arc<CustomKeyRegistry>,
        surface: S,
        sink: K,
    ) -> Result<Self> {
        let set = layouts.resolve(&options.layout)?;
        let parser = TokenParser::new();
        let mut tree = LayoutRenderer::new(&parser, &registry).render(&set);
        tree.theme = options.theme.clone();
        tree.key_template = options.key_template.clone();

        let state = KeyboardState::new(set.sub_layouts.iter().map(|s| s.name.clone()))
            .with_unfocus_delay(options.timing.unfocus_delay);

        info!(
            "Keyboard for {} input(s) built from layout {} ({} sub-layouts)",
            targets.len(),
            set.name,
            tree.sub_layouts.len()
        );

        let mut keyboard = Self {
            targets,
            tree,
            registry,
            state,
            refocus: Timer::once(options.timing.refocus_delay),
            hold: None,
            timing: options.timing,
            display_on_focus: options.display_on_focus,
            floating: options.container.is_none(),
            auto_position: options.auto_position.clone(),
            visible: false,
            awaiting_drain: false,
            surface,
            sink,
        };
        if options.timing.key_press_wait != DEFAULT_KEY_PRESS_WAIT_MS {
            keyboard.set_key_press_wait(options.timing.key_press_wait)?;
        }
        if options.show {
            keyboard.show(None);
        }
        Ok(keyboard)
    }

    pub fn targets(&self) -> &[TargetId] {
        &self.targets
    }

    pub fn serves(&self, target: TargetId) -> bool {
        self.targets.contains(&target)
    }

    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }

    pub fn state(&self) -> &KeyboardState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Characters were sent and the host has not reported buffer-empty yet
    pub fn awaiting_drain(&self) -> bool {
        self.awaiting_drain
    }

    pub fn is_holding(&self) -> bool {
        self.hold.as_ref().is_some_and(|h| h.timer.is_active())
    }

    /// Show the keyboard, placed under `near` when auto-positioning applies
    pub fn show(&mut self, near: Option<Rect>) {
        let position = match near {
            Some(bounds) if self.floating => self.auto_position.compute(
                bounds,
                self.surface.keyboard_size(),
                self.surface.viewport(),
            ),
            _ => None,
        };
        trace!("Show keyboard at {:?}", position);
        self.visible = true;
        self.surface.show(position);
    }

    pub fn hide(&mut self) {
        trace!("Hide keyboard");
        self.visible = false;
        self.surface.hide();
    }

    /// Drop a pending unfocus-hide. No-op when none is scheduled.
    pub fn cancel_unfocus(&mut self) {
        self.state.unfocus_timer().cancel();
    }

    /// Run a pending unfocus-hide right away. Hides at most once per blur.
    pub fn hide_now(&mut self) {
        if self.state.unfocus_timer().trigger_now() {
            self.hide();
        }
    }

    /// An attached input gained focus
    pub fn input_focus(&mut self, target: TargetId, bounds: Rect, _now: u64) {
        self.state.set_focused(target);
        self.cancel_unfocus();
        if self.display_on_focus {
            self.show(Some(bounds));
        }
    }

    /// An attached input lost focus: hide after the unfocus delay
    pub fn input_blur(&mut self, target: TargetId, now: u64) {
        trace!("Input {} blurred", target);
        self.state.unfocus_timer().start(now);
    }

    /// Pointer pressed on a key
    pub fn key_down(&mut self, key: KeyRef, now: u64) -> Result<()> {
        self.cancel_unfocus();
        self.refocus.start(now);

        // Releasing a previous hold that never saw its key-up
        if let Some(mut held) = self.hold.take() {
            held.timer.cancel();
        }

        let interactive = self.tree.key(key).is_some_and(|k| k.interactive);
        if !interactive {
            return Ok(());
        }

        let mut timer = Timer::hold(self.timing.hold_delay, self.timing.hold_repeat);
        let fires = timer.start(now);
        self.hold = Some(HeldKey { key, timer });
        self.fire(key, fires)
    }

    /// Pointer released: stop repeating, making sure the key fired once
    pub fn key_up(&mut self, _now: u64) -> Result<()> {
        let Some(mut held) = self.hold.take() else {
            return Ok(());
        };
        if held.timer.trigger_now() {
            self.fire(held.key, 1)?;
        }
        Ok(())
    }

    /// Run every timer due at `now`
    pub fn tick(&mut self, now: u64) -> Result<()> {
        if self.state.unfocus_timer().poll(now) > 0 {
            self.hide();
        }

        if self.refocus.poll(now) > 0 {
            self.refocus_input();
        }

        let due = match self.hold.as_mut() {
            Some(held) => (held.key, held.timer.poll(now)),
            None => return Ok(()),
        };
        self.fire(due.0, due.1)
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<u64> {
        [
            self.state.unfocus_deadline(),
            self.refocus.next_deadline(),
            self.hold.as_ref().and_then(|h| h.timer.next_deadline()),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Activate a key once, without hold behaviour
    pub fn press(&mut self, key: KeyRef) -> Result<()> {
        let output = {
            let Some(desc) = self.tree.key(key) else {
                debug!("Press on missing key {:?} ignored", key);
                return Ok(());
            };
            if !desc.interactive {
                return Ok(());
            }
            match desc.custom.and_then(|i| self.registry.get(i)) {
                Some(def) => def.action().invoke(&mut self.state, &desc.token),
                None => Some(desc.token.display.to_string()),
            }
        };

        self.sync_sub_layout();

        if let Some(text) = output {
            trace!("Key press {:?}", text);
            self.sink.send(SurfaceMessage::KeyPress(text))?;
            self.awaiting_drain = true;
        }
        Ok(())
    }

    /// Ask the host to change its pacing delay
    pub fn set_key_press_wait(&mut self, ms: u64) -> Result<()> {
        self.timing.key_press_wait = ms;
        let ms = i64::try_from(ms).unwrap_or(i64::MAX);
        self.sink.send(SurfaceMessage::key_press_wait(ms))
    }

    /// The host reported its queue drained
    pub fn buffer_empty(&mut self) {
        self.awaiting_drain = false;
        self.surface.buffer_empty();
    }

    fn fire(&mut self, key: KeyRef, times: u32) -> Result<()> {
        for _ in 0..times {
            self.refocus_input();
            self.press(key)?;
        }
        Ok(())
    }

    fn refocus_input(&mut self) {
        if let Some(target) = self.state.focused() {
            self.surface.focus(target);
        }
    }

    /// Flip the render tree to whatever a handler made active
    fn sync_sub_layout(&mut self) {
        let active = self.state.active();
        if self.tree.active_name() == Some(active) {
            return;
        }
        if self.tree.show(active) {
            debug!("Sub-layout switched to {}", active);
            self.surface.show_sub_layout(active);
        }
    }
}

/// Create keyboards for `elements`.
///
/// Fails without creating anything if any element does not accept text.
/// `make` supplies the surface and sink of each keyboard.
pub fn attach<S, K, F>(
    elements: &[InputElement],
    options: &KeyboardOptions,
    layouts: &LayoutRegistry,
    mut make: F,
) -> Result<Vec<VirtualKeyboard<S, K>>>
where
    S: Surface,
    K: KeySink,
    F: FnMut() -> (S, K),
{
    if let Some(bad) = elements.iter().find(|e| !e.kind.accepts_text()) {
        return Err(Error::UnsupportedElement {
            name: bad.name.clone(),
            kind: bad.kind.to_string(),
        });
    }
    if elements.is_empty() {
        return Ok(Vec::new());
    }

    let registry = Arc::new(CustomKeyRegistry::with_overrides(
        options.custom_keys.iter().cloned(),
    ));
    let groups: Vec<Vec<TargetId>> = if options.individual {
        elements.iter().map(|e| vec![e.id]).collect()
    } else {
        vec![elements.iter().map(|e| e.id).collect()]
    };

    groups
        .into_iter()
        .map(|targets| {
            let (surface, sink) = make();
            VirtualKeyboard::with_registry(targets, options, layouts, registry.clone(), surface, sink)
        })
        .collect()
}

/// Every keyboard attached so far, addressed by input
pub struct Attachments<S, K> {
    keyboards: Vec<VirtualKeyboard<S, K>>,
}

impl<S, K> Default for Attachments<S, K> {
    fn default() -> Self {
        Self {
            keyboards: Vec::new(),
        }
    }
}

impl<S: Surface, K: KeySink> Attachments<S, K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach keyboards to `elements`.
    ///
    /// Without `options`, elements that already have keyboards get those
    /// back unchanged. With `options`, fresh keyboards replace any existing
    /// ones for these elements. Returns the index of each element's keyboard.
    pub fn attach<F>(
        &mut self,
        elements: &[InputElement],
        options: Option<&KeyboardOptions>,
        layouts: &LayoutRegistry,
        make: F,
    ) -> Result<Vec<usize>>
    where
        F: FnMut() -> (S, K),
    {
        if options.is_none() {
            let existing: Option<Vec<usize>> =
                elements.iter().map(|e| self.index_of(e.id)).collect();
            if let Some(existing) = existing {
                return Ok(existing);
            }
        }

        let defaults = KeyboardOptions::default();
        let options = options.unwrap_or(&defaults);
        let created = attach(elements, options, layouts, make)?;

        for element in elements {
            for keyboard in &mut self.keyboards {
                keyboard.targets.retain(|t| *t != element.id);
            }
        }
        self.keyboards.retain(|k| !k.targets.is_empty());
        self.keyboards.extend(created);

        Ok(elements
            .iter()
            .filter_map(|e| self.index_of(e.id))
            .collect())
    }

    fn index_of(&self, target: TargetId) -> Option<usize> {
        self.keyboards.iter().position(|k| k.serves(target))
    }

    pub fn get(&self, target: TargetId) -> Option<&VirtualKeyboard<S, K>> {
        self.keyboards.iter().find(|k| k.serves(target))
    }

    pub fn get_mut(&mut self, target: TargetId) -> Option<&mut VirtualKeyboard<S, K>> {
        self.keyboards.iter_mut().find(|k| k.serves(target))
    }

    pub fn keyboards(&self) -> &[VirtualKeyboard<S, K>] {
        &self.keyboards
    }

    pub fn keyboards_mut(&mut self) -> &mut [VirtualKeyboard<S, K>] {
        &mut self.keyboards
    }

    /// Tick every keyboard
    pub fn tick(&mut self, now: u64) -> Result<()> {
        for keyboard in &mut self.keyboards {
            keyboard.tick(now)?;
        }
        Ok(())
    }

    /// Forward buffer-empty to every keyboard still waiting on the host
    pub fn buffer_empty(&mut self) {
        for keyboard in self.keyboards.iter_mut().filter(|k| k.awaiting_drain()) {
            keyboard.buffer_empty();
        }
    }
}

#[cfg(test)]
mod tests;
