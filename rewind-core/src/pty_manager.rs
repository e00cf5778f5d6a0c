//! PTY ownership.
//!
//! One `PtyManager` owns one child shell. Output is pumped by a dedicated
//! OS thread into a bounded tokio channel, so callers can bound every read
//! with `tokio::time::timeout` instead of blocking on the PTY.

use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use portable_pty::{Child, CommandBuilder, MasterPty, NativePtySystem, PtySize, PtySystem};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Chunks buffered between the reader thread and the async side.
const OUTPUT_CHANNEL: usize = 256;
const READ_CHUNK: usize = 4096;

/// What to spawn inside the PTY.
#[derive(Debug, Clone)]
pub struct SpawnSpec<'a> {
    pub program: &'a str,
    pub args: &'a [String],
    pub cwd: Option<&'a Path>,
    pub env: &'a [(&'a str, &'a str)],
    pub cols: u16,
    pub rows: u16,
}

pub struct PtyManager {
    program: String,
    master: Box<dyn MasterPty + Send>,
    input: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
}

impl std::fmt::Debug for PtyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyManager")
            .field("program", &self.program)
            .field("pid", &self.child.process_id())
            .finish_non_exhaustive()
    }
}

impl PtyManager {
    pub fn spawn(spec: &SpawnSpec<'_>) -> Result<Self> {
        let pair = NativePtySystem::default()
            .openpty(PtySize {
                rows: spec.rows,
                cols: spec.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("cannot open a pseudo-terminal")?;

        let mut cmd = CommandBuilder::new(spec.program);
        cmd.args(spec.args);
        if let Some(cwd) = spec.cwd {
            cmd.cwd(cwd);
        }
        for (key, value) in spec.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("cannot start `{}`", spec.program))?;
        // Keeping the slave open would hide EOF from the reader when the child exits.
        drop(pair.slave);

        let input = pair
            .master
            .take_writer()
            .context("pseudo-terminal has no input side")?;

        debug!(program = spec.program, args = ?spec.args, pid = ?child.process_id(), "spawned PTY child");

        Ok(Self {
            program: spec.program.to_string(),
            master: pair.master,
            input,
            child,
        })
    }

    /// Send bytes as if typed; no newline is added.
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.input
            .write_all(data)
            .and_then(|()| self.input.flush())
            .with_context(|| format!("cannot write to `{}`", self.program))
    }

    /// Type `line` and press Enter (CR, as a real keyboard would).
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let mut bytes = line.trim_end_matches(['\r', '\n']).as_bytes().to_vec();
        bytes.push(b'\r');
        self.write_raw(&bytes)
    }

    /// Kill the child unless it already exited.
    pub fn kill(&mut self) -> Result<()> {
        if let Ok(Some(status)) = self.child.try_wait() {
            debug!(program = %self.program, code = status.exit_code(), "child already exited");
            return Ok(());
        }
        self.child
            .kill()
            .with_context(|| format!("cannot stop `{}`", self.program))
    }

    /// Start pumping output. The channel closes on EOF or a read error.
    pub fn start_reader(&mut self) -> Result<mpsc::Receiver<Vec<u8>>> {
        let reader = self
            .master
            .try_clone_reader()
            .context("cannot read from the pseudo-terminal")?;
        let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL);
        std::thread::Builder::new()
            .name("rewind-pty-reader".into())
            .spawn(move || pump(reader, tx))
            .context("cannot start the PTY reader thread")?;
        Ok(rx)
    }
}

impl Drop for PtyManager {
    fn drop(&mut self) {
        let _ = self.kill();
    }
}

fn pump(mut reader: Box<dyn Read + Send>, tx: mpsc::Sender<Vec<u8>>) {
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            // EIO is how Linux reports a hung-up PTY.
            Err(e) => {
                trace!(error = %e, "PTY reader stopped");
                break;
            }
        };
        if tx.blocking_send(chunk[..n].to_vec()).is_err() {
            break;
        }
    }
}
