//! Shared subprocess execution for the external pipeline and renderers.
//!
//! [`run_command`] spawns a prepared [`tokio::process::Command`], optionally
//! feeds it a stdin payload, captures stdout/stderr and enforces a timeout.
//! On timeout the child is killed.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Number of trailing stderr bytes kept for error reports.
const STDERR_TAIL_BYTES: usize = 4096;

/// Maximum stdout or stderr captured per stream (10 MiB). The rest is
/// read and discarded.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// A program plus its leading arguments, parsed from a config string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a whitespace-separated command string. Returns `None` if blank.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// A fresh [`Command`] with the program and leading arguments applied.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code (`-1` if killed by a signal).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last non-blank stdout line, trimmed.
    pub fn last_line(&self) -> Option<&str> {
        self.stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
    }

    /// The end of stderr, bounded so it can be logged or embedded in errors.
    pub fn stderr_tail(&self) -> &str {
        let len = self.stderr.len();
        if len <= STDERR_TAIL_BYTES {
            return self.stderr.trim();
        }
        let mut start = len - STDERR_TAIL_BYTES;
        while !self.stderr.is_char_boundary(start) {
            start += 1;
        }
        self.stderr[start..].trim()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("I/O error while waiting for process: {0}")]
    Io(#[from] std::io::Error),
}

/// Spawn `cmd`, write `stdin` (if any) and wait for it to exit within
/// `timeout`.
pub async fn run_command(
    cmd: &mut Command,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<CommandOutput, ProcessError> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let start = Instant::now();

    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;

    if let (Some(payload), Some(mut pipe)) = (stdin, child.stdin.take()) {
        // Written from a separate task so a child that fills stdout before
        // draining stdin cannot deadlock us. A child that exits without
        // reading stdin produces a broken pipe, which is not our failure.
        tokio::spawn(async move {
            let _ = pipe.write_all(&payload).await;
            let _ = pipe.shutdown().await;
        });
    }

    let stdout_task = tokio::spawn(read_capped(child.stdout.take(), MAX_OUTPUT_BYTES));
    let stderr_task = tokio::spawn(read_capped(child.stderr.take(), MAX_OUTPUT_BYTES));

    // On timeout `child` is dropped on return, and `kill_on_drop(true)`
    // kills it.
    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(result) => result?,
        Err(_) => {
            stdout_task.abort();
            stderr_task.abort();
            let elapsed_ms = start.elapsed().as_millis() as u64;
            tracing::warn!(program = %program, elapsed_ms, "Process timed out, killed");
            return Err(ProcessError::Timeout { elapsed_ms });
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    let duration_ms = start.elapsed().as_millis() as u64;
    let exit_code = status.code().unwrap_or(-1);
    tracing::debug!(program = %program, exit_code, duration_ms, "Process finished");

    Ok(CommandOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        duration_ms,
    })
}

/// Read up to `cap` bytes of `handle`, then drain the rest so the child never
/// blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(handle: Option<R>, cap: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h).take(cap as u64).read_to_end(&mut buf).await;
        let _ = tokio::io::copy(&mut h, &mut tokio::io::sink()).await;
    }
    buf
}
