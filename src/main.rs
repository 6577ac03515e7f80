//! vkeyboard - headless driver for the virtual keyboard
//!
//! Types layout keys into stdout through the full surface -> host path,
//! prints rendered layouts and generates the config file.

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use std::io::Write;
use std::time::{Duration, Instant};

use vkeyboard::config::Config;
use vkeyboard::dispatch::{InjectionTarget, InputEvent, InputEventKind};
use vkeyboard::host::HostHandle;
use vkeyboard::keyboard::{self, ElementKind, InputElement, Point, Rect, Size, Surface, TargetId};
use vkeyboard::layout::{
    CustomKeyRegistry, KeyWidth, LayoutRenderer, LayoutSource, RenderTree, TokenParser,
};
use vkeyboard::transport::HostMessage;

/// How long to wait for the host to report a drained queue
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra wait after a drain, in case a later cycle is still running
const SETTLE_TIMEOUT: Duration = Duration::from_millis(100);

/// Fake screen used for auto-positioning
const VIEWPORT: Size = Size {
    width: 1920.0,
    height: 1080.0,
};

const KEYBOARD_SIZE: Size = Size {
    width: 800.0,
    height: 300.0,
};

/// Injection target writing typed characters to stdout
struct StdoutTarget;

impl InjectionTarget for StdoutTarget {
    fn send_input_event(&mut self, event: InputEvent) -> vkeyboard::Result<()> {
        if event.kind != InputEventKind::Char {
            return Ok(());
        }
        let mut out = std::io::stdout().lock();
        write!(out, "{}", event.key.escape_debug())
            .and_then(|()| out.flush())
            .map_err(|_| vkeyboard::Error::TargetGone)
    }
}

/// Surface with nothing to draw: logs what a real one would do
struct HeadlessSurface;

impl Surface for HeadlessSurface {
    fn show(&mut self, position: Option<Point>) {
        match position {
            Some(p) => info!("Keyboard shown at ({}, {})", p.x, p.y),
            None => info!("Keyboard shown"),
        }
    }

    fn hide(&mut self) {
        info!("Keyboard hidden");
    }

    fn focus(&mut self, target: TargetId) {
        info!("Focus returned to input {}", target);
    }

    fn show_sub_layout(&mut self, name: &str) {
        info!("Sub-layout: {}", name);
    }

    fn viewport(&self) -> Size {
        VIEWPORT
    }

    fn keyboard_size(&self) -> Size {
        KEYBOARD_SIZE
    }

    fn buffer_empty(&mut self) {
        info!("Host buffer empty");
    }
}

/// Print help message
fn print_help() {
    println!(
        r#"vkeyboard {} - on-screen virtual keyboard core

USAGE:
    vkeyboard [OPTIONS]

OPTIONS:
    -h, --help                Print this help message
    -V, --version             Print version information
    -p, --press KEYS          Click the given layout keys and type the result to stdout
    --print-layout[=NAME]     Print the rendered layout (default: configured layout)
    --init-config             Generate config file
    -f, --force               Overwrite an existing config file

KEYS:
    Keys as written in the layout, separated by spaces. Clicks follow the
    visible sub-layout, so shift and layout switches apply to later keys.

EXAMPLES:
    vkeyboard --press "h e l l o {{space:*}} {{shift}} W {{shift}} o r l d {{enter}}"
    vkeyboard --print-layout
    vkeyboard --init-config --force

CONFIG FILE:
    ~/.config/vkeyboard/config.toml (override with VKEYBOARD_CONFIG)
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Value of `--flag=VALUE` or `--flag VALUE`
fn arg_value<'a>(args: &'a [String], long: &str, short: &str) -> Option<&'a str> {
    let prefix = format!("{}=", long);
    for (i, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value);
        }
        if arg == long || arg == short {
            return args.get(i + 1).map(String::as_str);
        }
    }
    None
}

fn print_layout(tree: &RenderTree) {
    println!("layout {}", tree.layout);
    for sub in &tree.sub_layouts {
        let marker = if sub.visible { " (visible)" } else { "" };
        println!("\n[{}]{}", sub.name, marker);
        for (i, column) in sub.columns.iter().enumerate() {
            if sub.columns.len() > 1 {
                println!("  column {}", i);
            }
            for row in &column.rows {
                let keys: Vec<String> = row
                    .keys
                    .iter()
                    .map(|k| match &k.width {
                        KeyWidth::Auto => k.label.clone(),
                        KeyWidth::Fixed(w) => format!("{}<{}>", k.label, w),
                        KeyWidth::Fill { share } => format!("{}<{:.0}%>", k.label, share * 100.0),
                    })
                    .collect();
                println!("    {}", keys.join(" "));
            }
        }
    }
}

fn press_keys(cfg: &Config, keys: &str) -> Result<()> {
    let options = cfg.keyboard_options();
    let layouts = cfg.layout_registry();

    let host = HostHandle::spawn(StdoutTarget, options.timing.key_press_wait)
        .context("Failed to start keyboard host")?;

    let element = InputElement::new(1, "stdout", ElementKind::Text);
    let mut keyboards = keyboard::attach(&[element], &options, &layouts, || {
        (HeadlessSurface, host.sender())
    })?;
    let kb = keyboards
        .first_mut()
        .ok_or_else(|| anyhow!("No keyboard attached"))?;

    let origin = Instant::now();
    let now = || origin.elapsed().as_millis() as u64;

    kb.input_focus(TargetId(1), Rect::new(560.0, 200.0, 800.0, 30.0), now());
    for raw in keys.split_whitespace() {
        let Some(at) = kb.tree().find_in_active(raw) else {
            warn!(
                "Key {:?} not in sub-layout {}, skipped",
                raw,
                kb.state().active()
            );
            continue;
        };
        kb.key_down(at, now())?;
        kb.key_up(now())?;
        kb.tick(now())?;
    }

    loop {
        let timeout = if kb.awaiting_drain() {
            DRAIN_TIMEOUT
        } else {
            SETTLE_TIMEOUT
        };
        match host.recv_timeout(timeout) {
            Some(HostMessage::BufferEmpty) => kb.buffer_empty(),
            None => {
                if kb.awaiting_drain() {
                    warn!("Host did not drain within {:?}", DRAIN_TIMEOUT);
                }
                break;
            }
        }
    }
    println!();

    // Surface-side senders must go before the host can stop
    drop(keyboards);
    host.shutdown().context("Keyboard host failed")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Check command line arguments
    let args: Vec<String> = std::env::args().collect();

    // --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // --version
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("vkeyboard {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Config file generation mode
    if args.iter().any(|a| a == "--init-config") {
        let force = args.iter().any(|a| a == "--force" || a == "-f");
        match Config::write_template(force) {
            Ok(path) => {
                println!("Config file generated:");
                println!("  Path: {}", path.display());
                return Ok(());
            }
            Err(e) => {
                eprintln!("Failed to generate config: {:#}", e);
                return Err(e);
            }
        }
    }

    // Load config file
    let cfg = Config::load();

    if let Some(arg) = args.iter().find(|a| a.starts_with("--print-layout")) {
        let name = arg
            .strip_prefix("--print-layout=")
            .unwrap_or(cfg.keyboard.layout.as_str());
        let set = cfg
            .layout_registry()
            .resolve(&LayoutSource::Named(name.to_string()))?;
        let options = cfg.keyboard_options();
        let registry = CustomKeyRegistry::with_overrides(options.custom_keys);
        let tree = LayoutRenderer::new(&TokenParser::new(), &registry).render(&set);
        print_layout(&tree);
        return Ok(());
    }

    if let Some(keys) = arg_value(&args, "--press", "-p") {
        info!("vkeyboard starting...");
        return press_keys(&cfg, keys);
    }

    print_help();
    Ok(())
}
