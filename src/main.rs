//! hotkeys-playground: drive the hotkeys engine from a terminal
//!
//! Registers a small set of demo bindings, then reads keystrokes from stdin,
//! one burst per line:
//! - `control.k` presses a single chord on the document
//! - `g g` presses two keys in quick succession
//! - `@2 d d` presses keys on target 2
//! - `focus INPUT` / `blur` changes the focused element
//!
//! Every dispatch is written to stdout as one JSON line. Logs go to stderr.

mod events;
mod lifecycle;

use std::rc::Rc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use hotkeys_engine::{
    Config, FocusTracker, FocusedElement, Hotkey, Hotkeys, KeyEvent, LocalEventSource, Platform,
    Target, Trigger,
};

use crate::events::Notice;
use crate::lifecycle::ShutdownSignal;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "hotkeys-playground starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(?config, "configuration loaded");

    let shutdown = ShutdownSignal::new().context("failed to register signal handlers")?;

    run(config, shutdown).await
}

async fn run(config: Config, mut shutdown: ShutdownSignal) -> Result<()> {
    let source = Rc::new(LocalEventSource::new());
    let focus = FocusTracker::new();
    let engine = Rc::new(Hotkeys::from_config(
        source.clone(),
        Rc::new(focus.clone()),
        &config,
    ));

    // Engine callbacks -> stdout writer
    let (notice_tx, notice_rx) = mpsc::unbounded_channel::<Notice>();
    register_demo_bindings(&engine, &config, notice_tx);

    info!(
        bindings = engine.hotkeys().len() + engine.sequence_hotkeys().len(),
        "playground ready, reading keystrokes from stdin"
    );

    // Sequence timers only run while the engine's task set is driven
    let timers = engine.timers().clone();
    timers
        .run_until(drive(&engine, &source, &focus, &config, &mut shutdown, notice_rx))
        .await?;

    engine.shutdown();
    info!("hotkeys-playground stopped");

    Ok(())
}

async fn drive(
    engine: &Hotkeys,
    source: &LocalEventSource,
    focus: &FocusTracker,
    config: &Config,
    shutdown: &mut ShutdownSignal,
    mut notice_rx: mpsc::UnboundedReceiver<Notice>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    Some(line) => feed(source, focus, engine.platform(), &line),
                    None => {
                        info!("stdin closed");
                        break;
                    }
                }
            }

            Some(notice) = notice_rx.recv() => {
                write_notice(&mut stdout, &notice).await?;
            }

            signal = shutdown.wait() => {
                info!(?signal, "shutdown signal received");
                break;
            }
        }
    }

    // Let pending sequence buffers finish before tearing down
    tokio::time::sleep(config.sequence_debounce).await;
    while let Ok(notice) = notice_rx.try_recv() {
        write_notice(&mut stdout, &notice).await?;
    }

    Ok(())
}

fn register_demo_bindings(
    engine: &Rc<Hotkeys>,
    config: &Config,
    notice_tx: mpsc::UnboundedSender<Notice>,
) {
    let panel = Target::new(2);

    let tx = notice_tx.clone();
    // Global observer; lives as long as the engine
    let _ = engine.on_dispatch(move |event, keys, target| {
        let _ = tx.send(Notice::ChordDispatched {
            keys: keys.to_string(),
            target,
            default_prevented: event.is_default_prevented(),
        });
    });

    engine.register_chord(Hotkey::new("control.k").group("Navigation").description("Open search"));
    engine.register_chord(Hotkey::new("command.s").group("File").description("Save"));
    engine.register_chord(
        Hotkey::new("escape")
            .description("Close panel")
            .target(panel)
            .prevent_default(false),
    );

    let sequences = [
        Hotkey::new("g>g").group("Navigation").description("Go to top"),
        Hotkey::new("g>i").group("Navigation").description("Go to inbox"),
        Hotkey::new("d>d").group("Editing").description("Delete line").target(panel),
    ];
    for hotkey in sequences {
        let tx = notice_tx.clone();
        engine.register_sequence(hotkey).subscribe(move |hotkey| {
            let _ = tx.send(Notice::SequenceMatched {
                keys: hotkey.keys.clone(),
                target: hotkey.target,
                description: hotkey.description.clone(),
            });
        });
    }

    let weak = Rc::downgrade(engine);
    engine.register_help_trigger(
        move || {
            if let Some(engine) = weak.upgrade() {
                let _ = notice_tx.send(Notice::HelpRequested {
                    groups: engine.summary_groups(),
                });
            }
        },
        Some(&config.help_keys),
    );
}

/// Turn one input line into focus changes or key events
fn feed(source: &LocalEventSource, focus: &FocusTracker, platform: Platform, line: &str) {
    let mut tokens = line.split_whitespace().peekable();

    match tokens.peek().copied() {
        None => return,
        Some("focus") => {
            tokens.next();
            match tokens.next() {
                Some(tag) => {
                    focus.focus(FocusedElement::new(tag.to_ascii_uppercase()));
                    debug!(%tag, "focus changed");
                }
                None => warn!("usage: focus <TAG>"),
            }
            return;
        }
        Some("blur") => {
            focus.blur();
            debug!("focus cleared");
            return;
        }
        _ => {}
    }

    let mut target = Target::DOCUMENT;
    let first = tokens.peek().copied();
    if let Some(id) = first.and_then(|t| t.strip_prefix('@')) {
        match id.parse::<u32>() {
            Ok(id) => target = Target::new(id),
            Err(_) => {
                warn!(%id, "invalid target, expected @<number>");
                return;
            }
        }
        tokens.next();
    }

    for descriptor in tokens {
        let event = KeyEvent::parse(descriptor, platform);
        source.emit(target, Trigger::KeyDown, &event);
        source.emit(target, Trigger::KeyUp, &event);
    }
}

/// Write a JSON line to stdout
async fn write_notice(stdout: &mut tokio::io::Stdout, notice: &Notice) -> Result<()> {
    debug!(%notice, "notice");
    let mut line = serde_json::to_vec(notice)?;
    line.push(b'\n');
    stdout.write_all(&line).await?;
    stdout.flush().await?;
    Ok(())
}
