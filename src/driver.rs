//! Startup wiring and the event loop: config specs become panes, filtered
//! panes get a tail process, then every event is applied to the screen until
//! a quit key arrives.

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info, warn};
use std::{
    io::{self, Write},
    thread,
};
use tokio::sync::mpsc;

use crate::{
    config::PaneSpec,
    layout::{slot_at, LayoutError},
    pane::{Pane, PaneId, DEFAULT_SCROLLBACK},
    process::{self, ProcessHandle, SpawnError, TailCommand, DEFAULT_TAIL_BINARY},
    screen::{AppEvent, Flow, Screen},
};

pub const NO_FILTER_MESSAGE: &str = "No filter specified.";

#[derive(Debug, Clone)]
pub struct Options {
    pub binary: String,
    pub scrollback: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            binary: DEFAULT_TAIL_BINARY.to_string(),
            scrollback: DEFAULT_SCROLLBACK,
        }
    }
}

/// Starts the process behind a filtered pane.
pub trait Launcher {
    type Handle;

    fn launch(&mut self, pane: PaneId, command: &TailCommand) -> Result<Self::Handle, SpawnError>;
}

/// Spawns under a pty and forwards output to the screen's event channel.
pub struct PtyLauncher {
    events: mpsc::UnboundedSender<AppEvent>,
}

impl PtyLauncher {
    pub fn new(events: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { events }
    }
}

impl Launcher for PtyLauncher {
    type Handle = ProcessHandle;

    fn launch(&mut self, pane: PaneId, command: &TailCommand) -> Result<ProcessHandle, SpawnError> {
        process::attach(pane, command, self.events.clone())
    }
}

/// Creates one pane per spec at its grid slot. A spawn failure stays inside
/// its pane as an error line; running out of slots aborts.
pub fn populate<W: Write, L: Launcher>(
    screen: &mut Screen<W>,
    specs: &[PaneSpec],
    options: &Options,
    launcher: &mut L,
) -> Result<Vec<L::Handle>, LayoutError> {
    let mut handles = Vec::new();
    for (index, spec) in specs.iter().enumerate() {
        let id = PaneId(index);
        let mut pane = Pane::new(id, spec.title.as_str(), slot_at(index)?, options.scrollback);
        info!("pane {index}: {:?} filter={:?}", spec.title, spec.filter);

        match spec.active_filter() {
            Some(filter) => {
                let command = TailCommand::for_filter(options.binary.as_str(), filter);
                match launcher.launch(id, &command) {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        error!("pane {index}: {err}");
                        pane.append_static(&format!("Error: {err}"));
                    }
                }
            }
            None => pane.append_static(NO_FILTER_MESSAGE),
        }
        screen.add_pane(pane);
    }
    Ok(handles)
}

/// Draws the initial frame, then applies events until a quit key or until
/// every sender is gone.
pub async fn run<W: Write>(
    screen: &mut Screen<W>,
    events: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    screen.render()?;
    while let Some(event) = events.recv().await {
        if screen.handle(event)? == Flow::Quit {
            info!("quit requested");
            break;
        }
    }
    Ok(())
}

/// Raw mode, alternate screen and mouse capture for as long as it lives.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        let guard = TerminalGuard;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture, Hide)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, DisableMouseCapture, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

fn spawn_input_reader(events: mpsc::UnboundedSender<AppEvent>) -> Result<()> {
    thread::Builder::new()
        .name("terminal-input".to_string())
        .spawn(move || loop {
            let event = match event::read() {
                Ok(Event::Key(key)) => AppEvent::Key(key),
                Ok(Event::Mouse(mouse)) => AppEvent::Mouse(mouse),
                Ok(Event::Resize(columns, rows)) => AppEvent::Resize(columns, rows),
                Ok(_) => continue,
                Err(err) => {
                    warn!("terminal input closed: {err}");
                    return;
                }
            };
            if events.send(event).is_err() {
                return;
            }
        })
        .context("failed to start terminal input thread")?;
    Ok(())
}

/// Takes over the terminal and runs until the user quits. Child processes are
/// killed on the way out.
pub async fn start(specs: &[PaneSpec], options: &Options) -> Result<()> {
    let (columns, rows) = terminal::size().context("failed to read terminal size")?;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _guard = TerminalGuard::enter()?;
    let mut screen = Screen::new(io::stdout(), columns, rows);
    let mut handles = populate(&mut screen, specs, options, &mut PtyLauncher::new(tx.clone()))?;
    spawn_input_reader(tx)?;

    let result = run(&mut screen, &mut rx).await;
    for handle in &mut handles {
        info!("pane {}: stopping tail process", handle.pane().0);
        handle.kill();
    }
    result
}
