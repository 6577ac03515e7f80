use super::*;
use crate::layout::{KeyAction, KeyRender, LayoutSet, SubLayout};

#[derive(Default)]
struct RecordingSurface {
    calls: Vec<String>,
}

impl Surface for RecordingSurface {
    fn show(&mut self, position: Option<Point>) {
        match position {
            Some(p) => self.calls.push(format!("show {},{}", p.x, p.y)),
            None => self.calls.push("show".to_string()),
        }
    }

    fn hide(&mut self) {
        self.calls.push("hide".to_string());
    }

    fn focus(&mut self, target: TargetId) {
        self.calls.push(format!("focus {}", target));
    }

    fn show_sub_layout(&mut self, name: &str) {
        self.calls.push(format!("sub {}", name));
    }

    fn viewport(&self) -> Size {
        Size {
            width: 1000.0,
            height: 800.0,
        }
    }

    fn keyboard_size(&self) -> Size {
        Size {
            width: 600.0,
            height: 250.0,
        }
    }

    fn buffer_empty(&mut self) {
        self.calls.push("buffer-empty".to_string());
    }
}

impl RecordingSurface {
    fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

#[derive(Default)]
struct Sent(Vec<SurfaceMessage>);

impl KeySink for Sent {
    fn send(&mut self, message: SurfaceMessage) -> Result<()> {
        self.0.push(message);
        Ok(())
    }
}

impl Sent {
    fn presses(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|m| match m {
                SurfaceMessage::KeyPress(text) => Some(text.as_str()),
                SurfaceMessage::ConfigSet { .. } => None,
            })
            .collect()
    }
}

type TestKeyboard = VirtualKeyboard<RecordingSurface, Sent>;

fn keyboard(options: &KeyboardOptions) -> TestKeyboard {
    VirtualKeyboard::new(
        vec![TargetId(1)],
        options,
        &LayoutRegistry::builtin(),
        RecordingSurface::default(),
        Sent::default(),
    )
    .expect("keyboard")
}

fn key(kb: &TestKeyboard, raw: &str) -> KeyRef {
    kb.tree().find_in_active(raw).expect("key in active sub-layout")
}

fn click(kb: &mut TestKeyboard, raw: &str, now: u64) {
    let at = key(kb, raw);
    kb.key_down(at, now).expect("key down");
    kb.key_up(now).expect("key up");
}

#[test]
fn test_click_sends_once_and_refocuses() {
    let mut kb = keyboard(&KeyboardOptions::default());
    kb.input_focus(TargetId(1), Rect::new(100.0, 50.0, 200.0, 30.0), 0);
    click(&mut kb, "q", 10);
    assert_eq!(kb.sink.presses(), ["q"]);
    assert!(kb.awaiting_drain());
    assert_eq!(kb.surface().count("focus #1"), 1);

    kb.tick(11).expect("tick");
    assert_eq!(kb.surface().count("focus #1"), 2);
    assert_eq!(kb.next_deadline(), None);
}

#[test]
fn test_shift_flips_once_without_output() {
    let mut kb = keyboard(&KeyboardOptions::default());
    click(&mut kb, "{shift}", 0);
    assert!(kb.sink.presses().is_empty());
    assert_eq!(kb.state().active(), "shift");
    assert_eq!(kb.tree().active_name(), Some("shift"));
    assert_eq!(kb.surface().count("sub shift"), 1);

    click(&mut kb, "Q", 5);
    click(&mut kb, "{shift}", 10);
    assert_eq!(kb.sink.presses(), ["Q"]);
    assert_eq!(kb.state().active(), "normal");
}

#[test]
fn test_action_keys_emit_control_codes() {
    let mut kb = keyboard(&KeyboardOptions::default());
    for raw in ["{enter}", "{tab}", "{backspace}", "{space:*}"] {
        click(&mut kb, raw, 0);
    }
    assert_eq!(kb.sink.presses(), ["\r", "\t", "\u{8}", " "]);
}

#[test]
fn test_layout_switch_keys() {
    let mut kb = keyboard(&KeyboardOptions::default());
    click(&mut kb, "{numeric}", 0);
    assert_eq!(kb.tree().active_name(), Some("numeric"));
    click(&mut kb, "7", 1);
    click(&mut kb, "{del}", 2);
    click(&mut kb, "{abc}", 3);
    assert_eq!(kb.tree().active_name(), Some("normal"));
    assert_eq!(kb.sink.presses(), ["7", "\u{7f}"]);
}

#[test]
fn test_spacer_is_inert() {
    let mut kb = keyboard(&KeyboardOptions::default());
    click(&mut kb, "{symbols}", 0);
    let spacer = key(&kb, "{sp:2}");
    kb.key_down(spacer, 1).expect("key down");
    assert!(!kb.is_holding());
    kb.key_up(2).expect("key up");
    assert!(kb.sink.presses().is_empty());
}

#[test]
fn test_hold_repeats_until_release() {
    let mut kb = keyboard(&KeyboardOptions::default());
    kb.input_focus(TargetId(1), Rect::default(), 0);
    let at = key(&kb, "{backspace}");
    kb.key_down(at, 0).expect("key down");
    assert_eq!(kb.sink.presses().len(), 1);

    kb.tick(499).expect("tick");
    assert_eq!(kb.sink.presses().len(), 1);
    kb.tick(500).expect("tick");
    assert_eq!(kb.sink.presses().len(), 2);
    kb.tick(700).expect("tick");
    assert_eq!(kb.sink.presses().len(), 3);

    kb.key_up(750).expect("key up");
    kb.tick(2000).expect("tick");
    assert_eq!(kb.sink.presses().len(), 3);
    assert!(!kb.is_holding());
    // Every repeat hands focus back
    assert!(kb.surface().count("focus #1") >= 4);
}

#[test]
fn test_late_tick_repeats_held_key_once() {
    let mut kb = keyboard(&KeyboardOptions::default());
    kb.input_focus(TargetId(1), Rect::default(), 0);
    let at = key(&kb, "{backspace}");
    kb.key_down(at, 0).expect("key down");

    // Event loop stalled for a minute with the key still down
    kb.tick(60_000).expect("tick");
    assert_eq!(kb.sink.presses().len(), 2);
    assert_eq!(kb.next_deadline(), Some(60_100));

    kb.key_up(60_050).expect("key up");
    kb.tick(61_000).expect("tick");
    assert_eq!(kb.sink.presses().len(), 2);
}

#[test]
fn test_hide_now_and_cancel_unfocus_are_idempotent() {
    let mut kb = keyboard(&KeyboardOptions::default());
    kb.input_focus(TargetId(1), Rect::default(), 0);
    kb.input_blur(TargetId(1), 100);
    kb.hide_now();
    kb.hide_now();
    assert_eq!(kb.surface().count("hide"), 1);
    assert!(!kb.is_visible());
    kb.tick(1000).expect("tick");
    assert_eq!(kb.surface().count("hide"), 1);

    kb.input_focus(TargetId(1), Rect::default(), 1000);
    kb.input_blur(TargetId(1), 1100);
    kb.cancel_unfocus();
    kb.cancel_unfocus();
    assert!(!kb.state().unfocus_pending());
    kb.tick(5000).expect("tick");
    kb.hide_now();
    assert_eq!(kb.surface().count("hide"), 1);
}

#[test]
fn test_blur_hides_after_delay() {
    let mut kb = keyboard(&KeyboardOptions::default());
    kb.input_focus(TargetId(1), Rect::default(), 0);
    kb.input_blur(TargetId(1), 100);
    assert!(kb.state().unfocus_pending());
    assert_eq!(kb.next_deadline(), Some(600));
    kb.tick(599).expect("tick");
    assert!(kb.is_visible());
    kb.tick(600).expect("tick");
    assert!(!kb.is_visible());
    assert_eq!(kb.surface().calls.last().map(String::as_str), Some("hide"));
}

#[test]
fn test_key_down_cancels_pending_hide() {
    let mut kb = keyboard(&KeyboardOptions::default());
    kb.input_focus(TargetId(1), Rect::default(), 0);
    kb.input_blur(TargetId(1), 100);
    click(&mut kb, "a", 200);
    kb.tick(1000).expect("tick");
    assert!(kb.is_visible());
    assert_eq!(kb.surface().count("hide"), 0);
}

#[test]
fn test_refocus_cancels_pending_hide() {
    let mut kb = keyboard(&KeyboardOptions::default());
    kb.input_focus(TargetId(1), Rect::default(), 0);
    kb.input_blur(TargetId(1), 100);
    kb.input_focus(TargetId(1), Rect::default(), 200);
    kb.tick(1000).expect("tick");
    assert!(kb.is_visible());
}

#[test]
fn test_auto_position_below_input() {
    let mut kb = keyboard(&KeyboardOptions::default());
    kb.input_focus(TargetId(1), Rect::new(400.0, 100.0, 200.0, 30.0), 0);
    assert_eq!(kb.surface().calls, ["show 200,130"]);
}

#[test]
fn test_container_disables_auto_position() {
    let options = KeyboardOptions {
        container: Some("#keyboard".to_string()),
        ..KeyboardOptions::default()
    };
    let mut kb = keyboard(&options);
    kb.input_focus(TargetId(1), Rect::new(400.0, 100.0, 200.0, 30.0), 0);
    assert_eq!(kb.surface().calls, ["show"]);
}

#[test]
fn test_display_on_focus_disabled() {
    let options = KeyboardOptions {
        display_on_focus: false,
        ..KeyboardOptions::default()
    };
    let mut kb = keyboard(&options);
    kb.input_focus(TargetId(1), Rect::default(), 0);
    assert!(!kb.is_visible());
    assert_eq!(kb.state().focused(), Some(TargetId(1)));
}

#[test]
fn test_show_option_and_pacing_message() {
    let options = KeyboardOptions {
        show: true,
        timing: Timing {
            key_press_wait: 5,
            ..Timing::default()
        },
        ..KeyboardOptions::default()
    };
    let kb = keyboard(&options);
    assert!(kb.is_visible());
    assert_eq!(kb.sink.0, [SurfaceMessage::key_press_wait(5)]);
}

#[test]
fn test_custom_key_override() {
    let smiley = CustomKeyDefinition::new(
        "^smile$",
        KeyRender::Patch(crate::layout::DisplayPatch {
            label: Some(":)".to_string()),
            classes: vec![],
        }),
        KeyAction::Emit(":-)".to_string()),
    )
    .expect("pattern");
    let layout = LayoutSet::new("faces").with_sub_layout(SubLayout::new(
        "normal",
        vec!["{smile} {enter}".into()],
    ));
    let options = KeyboardOptions {
        layout: LayoutSource::Inline(layout),
        custom_keys: vec![smiley],
        ..KeyboardOptions::default()
    };
    let mut kb = keyboard(&options);
    let at = key(&kb, "{smile}");
    assert_eq!(kb.tree().key(at).map(|k| k.label.as_str()), Some(":)"));
    click(&mut kb, "{smile}", 0);
    click(&mut kb, "{enter}", 1);
    assert_eq!(kb.sink.presses(), [":-)", "\r"]);
}

#[test]
fn test_unknown_layout_is_an_error() {
    let options = KeyboardOptions {
        layout: LayoutSource::Named("dvorak".to_string()),
        ..KeyboardOptions::default()
    };
    let result = VirtualKeyboard::new(
        vec![TargetId(1)],
        &options,
        &LayoutRegistry::builtin(),
        RecordingSurface::default(),
        Sent::default(),
    );
    assert!(matches!(result, Err(Error::UnknownLayout(name)) if name == "dvorak"));
}

#[test]
fn test_buffer_empty_clears_drain_flag() {
    let mut kb = keyboard(&KeyboardOptions::default());
    click(&mut kb, "a", 0);
    assert!(kb.awaiting_drain());
    kb.buffer_empty();
    assert!(!kb.awaiting_drain());
    assert_eq!(kb.surface().count("buffer-empty"), 1);
}

fn elements() -> Vec<InputElement> {
    vec![
        InputElement::new(1, "user", ElementKind::Text),
        InputElement::new(2, "pass", ElementKind::Password),
        InputElement::new(3, "notes", ElementKind::TextArea),
    ]
}

fn make() -> (RecordingSurface, Sent) {
    (RecordingSurface::default(), Sent::default())
}

#[test]
fn test_attach_shared_and_individual() {
    let layouts = LayoutRegistry::builtin();
    let shared = attach(&elements(), &KeyboardOptions::default(), &layouts, make).expect("attach");
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].targets(), [TargetId(1), TargetId(2), TargetId(3)]);

    let options = KeyboardOptions {
        individual: true,
        ..KeyboardOptions::default()
    };
    let individual = attach(&elements(), &options, &layouts, make).expect("attach");
    assert_eq!(individual.len(), 3);
    assert!(individual[2].serves(TargetId(3)));
}

#[test]
fn test_attach_rejects_non_text_elements() {
    let mut elements = elements();
    elements.push(InputElement::new(4, "agree", ElementKind::Other("checkbox".into())));
    let mut made = 0;
    let result = attach(
        &elements,
        &KeyboardOptions::default(),
        &LayoutRegistry::builtin(),
        || {
            made += 1;
            make()
        },
    );
    let err = result.err().expect("unsupported element");
    assert!(matches!(err, Error::UnsupportedElement { ref kind, .. } if kind == "checkbox"));
    assert_eq!(made, 0);
}

#[test]
fn test_attachments_reuse_and_replace() {
    let layouts = LayoutRegistry::builtin();
    let mut attachments = Attachments::new();
    let first = attachments
        .attach(&elements(), None, &layouts, make)
        .expect("attach");
    assert_eq!(first, [0, 0, 0]);

    // Already attached and no options: the existing keyboard comes back
    let again = attachments
        .attach(&elements()[..1], None, &layouts, make)
        .expect("attach");
    assert_eq!(again, [0]);
    assert_eq!(attachments.keyboards().len(), 1);

    let options = KeyboardOptions {
        individual: true,
        ..KeyboardOptions::default()
    };
    let replaced = attachments
        .attach(&elements()[..1], Some(&options), &layouts, make)
        .expect("attach");
    assert_eq!(attachments.keyboards().len(), 2);
    assert_eq!(attachments.get(TargetId(1)).map(|k| k.targets().len()), Some(1));
    assert_eq!(attachments.get(TargetId(2)).map(|k| k.targets().len()), Some(2));
    assert_eq!(replaced, [1]);
}

#[test]
fn test_attachments_route_ticks() {
    let layouts = LayoutRegistry::builtin();
    let mut attachments = Attachments::new();
    attachments
        .attach(&elements(), None, &layouts, make)
        .expect("attach");
    let kb = attachments.get_mut(TargetId(2)).expect("keyboard");
    kb.input_focus(TargetId(2), Rect::default(), 0);
    kb.input_blur(TargetId(2), 0);
    let at = kb.tree().find_in_active("a").expect("a");
    kb.press(at).expect("press");

    attachments.tick(UNFOCUS_DELAY_MS).expect("tick");
    attachments.buffer_empty();
    let kb = attachments.get(TargetId(2)).expect("keyboard");
    assert!(!kb.is_visible());
    assert!(!kb.awaiting_drain());
}
