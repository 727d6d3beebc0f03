//! External process runner
//!
//! Launches a command-line tool, waits for it to exit and captures stdout
//! and stderr separately. Stdin is null. A child whose invocation is dropped
//! (timeout, cancelled request) is killed, so no tool outlives its request.

use async_trait::async_trait;
use std::ffi::OsString;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

/// Longest stderr excerpt carried in error messages
pub const STDERR_EXCERPT_BYTES: usize = 1024;

/// One tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable name (resolved via PATH) or path
    pub program: String,
    pub args: Vec<OsString>,
    /// Kill the child if it runs longer than this
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Argument following `flag`, if present
    pub fn flag_value(&self, flag: &str) -> Option<&OsString> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
    }
}

/// Captured output of a successful (exit code 0) run
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Process runner errors
#[derive(Debug, Error)]
pub enum ProcessFailure {
    /// Binary missing, permission denied, ...
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit or killed by a signal
    #[error("`{program}` exited with {status}: {}", stderr_excerpt(.stderr))]
    Exit {
        program: String,
        status: String,
        /// Full captured stderr
        stderr: String,
    },

    /// Deadline elapsed; the child was killed
    #[error("`{program}` did not finish within {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
}

impl ProcessFailure {
    /// Full captured stderr, when the tool got far enough to produce one
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ProcessFailure::Exit { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Trailing part of a tool's stderr, bounded to `STDERR_EXCERPT_BYTES`
///
/// Tools print their actual error last, after banners and progress output.
pub fn stderr_excerpt(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    if trimmed.len() <= STDERR_EXCERPT_BYTES {
        return trimmed;
    }
    let mut start = trimmed.len() - STDERR_EXCERPT_BYTES;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    &trimmed[start..]
}

/// Runs external tools on behalf of pipeline stages
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion; non-zero exit is a `ProcessFailure`
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessFailure>;
}

/// Runner backed by real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessFailure> {
        let program = invocation.program.clone();
        let started = Instant::now();

        tracing::debug!(
            program = %program,
            args = ?invocation.args,
            "Launching external tool"
        );

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match invocation.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, command.output()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(program = %program, ?timeout, "External tool timed out");
                    return Err(ProcessFailure::TimedOut { program, timeout });
                }
            },
            None => command.output().await,
        }
        .map_err(|source| ProcessFailure::Launch {
            program: program.clone(),
            source,
        })?;

        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let status = match output.status.code() {
                Some(code) => format!("exit code {}", code),
                None => "no exit code (terminated by signal)".to_string(),
            };
            tracing::error!(
                program = %program,
                status = %status,
                elapsed_ms,
                stderr = %stderr,
                "External tool failed"
            );
            return Err(ProcessFailure::Exit {
                program,
                status,
                stderr,
            });
        }

        tracing::debug!(
            program = %program,
            elapsed_ms,
            stdout_bytes = output.stdout.len(),
            "External tool finished"
        );

        Ok(ProcessOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
