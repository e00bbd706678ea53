//! Spawns the tail binary for a pane inside a pseudo-terminal and forwards its
//! output to the screen's event channel.
//!
//! Each subprocess gets its own channel: a blocking reader thread owns the pty
//! master's read side and is the only producer, a small tokio task drains it
//! and tags chunks with the pane they belong to.

use log::{debug, info, warn};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::{io::Read, thread};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{pane::PaneId, screen::AppEvent};

pub const DEFAULT_TAIL_BINARY: &str = "../target/release/gtail";
pub const TERM_NAME: &str = "xterm-color";
pub const PTY_COLUMNS: u16 = 80;
pub const PTY_ROWS: u16 = 24;
const READ_CHUNK: usize = 8192;

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to open pty: {0}")]
    OpenPty(String),
    #[error("failed to start {program}: {reason}")]
    Start { program: String, reason: String },
    #[error("failed to read from pty: {0}")]
    Reader(String),
}

/// The program and arguments run for one pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailCommand {
    program: String,
    args: Vec<String>,
}

impl TailCommand {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `<binary> --filter <filter>`
    pub fn for_filter(binary: impl Into<String>, filter: &str) -> Self {
        Self::new(binary, ["--filter", filter])
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Inherits the parent's environment and working directory; only `TERM`
    /// is overridden.
    fn builder(&self) -> CommandBuilder {
        let mut cmd = CommandBuilder::new(&self.program);
        cmd.args(&self.args);
        cmd.env("TERM", TERM_NAME);
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }
        cmd
    }
}

/// A subprocess bound to one pane. Nothing supervises it; it runs until it
/// exits on its own or [ProcessHandle::kill] is called.
pub struct ProcessHandle {
    pane: PaneId,
    child: Box<dyn Child + Send + Sync>,
    _master: Box<dyn MasterPty + Send>,
}

impl ProcessHandle {
    pub fn pane(&self) -> PaneId {
        self.pane
    }

    pub fn kill(&mut self) {
        if let Err(err) = self.child.kill() {
            debug!("pane {}: kill failed (already exited?): {err}", self.pane.0);
        }
    }
}

/// Starts `command` for `pane` and returns its handle together with the
/// receiving end of its output channel.
pub fn spawn(
    pane: PaneId,
    command: &TailCommand,
) -> Result<(ProcessHandle, mpsc::UnboundedReceiver<Vec<u8>>), SpawnError> {
    let pair = native_pty_system()
        .openpty(PtySize {
            rows: PTY_ROWS,
            cols: PTY_COLUMNS,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| SpawnError::OpenPty(format!("{e:#}")))?;

    let child = pair
        .slave
        .spawn_command(command.builder())
        .map_err(|e| SpawnError::Start {
            program: command.program.clone(),
            reason: format!("{e:#}"),
        })?;
    // The reader only sees EOF once every slave handle is closed.
    drop(pair.slave);

    let mut reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| SpawnError::Reader(format!("{e:#}")))?;

    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name(format!("pty-reader-{}", pane.0))
        .spawn(move || {
            let mut buf = [0u8; READ_CHUNK];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    // EIO once the child is gone on Linux
                    Err(err) => {
                        debug!("pane {}: pty read ended: {err}", pane.0);
                        break;
                    }
                }
            }
        })
        .map_err(|e| SpawnError::Reader(e.to_string()))?;

    Ok((
        ProcessHandle {
            pane,
            child,
            _master: pair.master,
        },
        rx,
    ))
}

/// Spawns `command` for `pane` and forwards every output chunk to `events`.
/// Must be called from within a tokio runtime.
pub fn attach(
    pane: PaneId,
    command: &TailCommand,
    events: mpsc::UnboundedSender<AppEvent>,
) -> Result<ProcessHandle, SpawnError> {
    let (handle, output) = spawn(pane, command)?;
    info!(
        "pane {}: started {} {}",
        pane.0,
        command.program,
        command.args.join(" ")
    );
    tokio::spawn(forward(pane, output, events));
    Ok(handle)
}

async fn forward(
    pane: PaneId,
    mut output: mpsc::UnboundedReceiver<Vec<u8>>,
    events: mpsc::UnboundedSender<AppEvent>,
) {
    while let Some(chunk) = output.recv().await {
        if events.send(AppEvent::Output { pane, chunk }).is_err() {
            warn!("pane {}: screen gone, dropping output", pane.0);
            return;
        }
    }
    info!("pane {}: output closed", pane.0);
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{
        ffi::{OsStr, OsString},
        time::Duration,
    };

    /// Collects output from `events` until `needle` shows up, the channel
    /// closes, or five seconds pass.
    async fn output_until(
        events: &mut mpsc::UnboundedReceiver<AppEvent>,
        expected_pane: PaneId,
        needle: &str,
    ) -> String {
        let mut output = Vec::new();
        let deadline = tokio::time::sleep(Duration::from_secs(5));
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(AppEvent::Output { pane, chunk }) => {
                        assert_eq!(pane, expected_pane);
                        output.extend(chunk);
                        if String::from_utf8_lossy(&output).contains(needle) {
                            break;
                        }
                    }
                    Some(other) => panic!("unexpected event {other:?}"),
                    None => break,
                },
                _ = &mut deadline => break,
            }
        }
        String::from_utf8_lossy(&output).into_owned()
    }

    #[test]
    fn filter_becomes_flag_arguments() {
        let command = TailCommand::for_filter("/opt/gtail", "ERROR");
        assert_eq!(command.program(), "/opt/gtail");
        assert_eq!(command.args(), ["--filter", "ERROR"]);
    }

    #[test]
    fn builder_passes_program_then_args() {
        let builder = TailCommand::for_filter("gtail", "WARN").builder();
        let argv: Vec<OsString> = ["gtail", "--filter", "WARN"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(builder.get_argv(), &argv);
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let command = TailCommand::for_filter("/definitely/not/a/binary", "ERROR");
        let err = attach(PaneId(0), &command, tx).err().unwrap();
        assert!(matches!(err, SpawnError::Start { .. }), "{err:?}");
    }

    #[test]
    fn builder_sets_terminal_type() {
        let builder = TailCommand::for_filter("gtail", "WARN").builder();
        assert_eq!(builder.get_env("TERM"), Some(OsStr::new(TERM_NAME)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn forwards_output_tagged_with_pane() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let command = TailCommand::new("/bin/echo", ["hello"]);
        let _handle = attach(PaneId(2), &command, tx).unwrap();

        let output = output_until(&mut rx, PaneId(2), "hello").await;
        assert!(output.contains("hello"), "got {output:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn child_sees_pty_size_term_and_parent_env() {
        std::env::set_var("MULTI_PANE_TAIL_PARENT_VAR", "inherited");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let command = TailCommand::new(
            "/bin/sh",
            [
                "-c",
                "stty size; echo \"$TERM $MULTI_PANE_TAIL_PARENT_VAR done\"",
            ],
        );
        let _handle = attach(PaneId(1), &command, tx).unwrap();

        let output = output_until(&mut rx, PaneId(1), "done").await;
        assert!(output.contains("24 80"), "got {output:?}");
        assert!(
            output.contains("xterm-color inherited done"),
            "got {output:?}"
        );
    }
}
