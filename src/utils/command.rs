//! Command execution primitives with consistent error handling.

use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a timed command finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedOutcome {
    /// `None` when the process was killed (timeout or signal).
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration: Duration,
}

impl TimedOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Run a command, killing it once `timeout` elapses.
///
/// The child's stdout and stderr go to our stderr so stdout stays reserved
/// for the JSON response. Output is never captured or parsed.
pub fn run_with_timeout(
    program: &str,
    args: &[String],
    dir: Option<&Path>,
    timeout: Duration,
    context: &str,
) -> Result<TimedOutcome> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(std::io::stderr()))
        .stderr(Stdio::from(std::io::stderr()));
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    let started = Instant::now();
    let mut child = command.spawn().map_err(|e| {
        Error::internal_io(
            format!("Failed to run {}: {}", context, e),
            Some(context.to_string()),
        )
    })?;

    loop {
        let status = child.try_wait().map_err(|e| {
            Error::internal_io(
                format!("Failed to wait for {}: {}", context, e),
                Some(context.to_string()),
            )
        })?;

        if let Some(status) = status {
            return Ok(TimedOutcome {
                exit_code: status.code(),
                timed_out: false,
                duration: started.elapsed(),
            });
        }

        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(TimedOutcome {
                exit_code: None,
                timed_out: true,
                duration: started.elapsed(),
            });
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Split a command line on whitespace, honouring simple single/double quotes.
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut has_token = false;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                has_token = true;
            }
            None if c.is_whitespace() => {
                if has_token {
                    parts.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            None => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        parts.push(current);
    }
    parts
}
