//! Post-run verification: run the project's compiler or build as a black box.
//!
//! Only the exit status is recorded. Compiler output is streamed to stderr for
//! the developer and never parsed.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::defaults::DEFAULT_VERIFY_TIMEOUT_SECS;
use crate::error::{Error, Result};
use crate::utils::command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyConfig {
    /// Program followed by its arguments, e.g. `["npx", "tsc", "--noEmit"]`.
    pub command: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

impl VerifyConfig {
    /// Build from a command line such as `"npx tsc --noEmit"`.
    pub fn from_command_line(line: &str, cwd: Option<PathBuf>, timeout_secs: Option<u64>) -> Result<Self> {
        let command = command::split_command_line(line);
        if command.is_empty() {
            return Err(Error::validation_invalid_argument(
                "verify",
                "verification command is empty",
            ));
        }
        let secs = timeout_secs.unwrap_or(DEFAULT_VERIFY_TIMEOUT_SECS);
        if secs == 0 {
            return Err(Error::validation_invalid_argument(
                "verify_timeout",
                "timeout must be at least one second",
            ));
        }
        Ok(VerifyConfig {
            command,
            cwd,
            timeout: Duration::from_secs(secs),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub command: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl Verification {
    pub fn passed(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Run the verification command. Spawn failures are returned as errors so
/// the caller can record them alongside the run's other recovered errors.
pub fn run_verification(config: &VerifyConfig) -> Result<Verification> {
    let (program, args) = config.command.split_first().ok_or_else(|| {
        Error::validation_invalid_argument("verify", "verification command is empty")
    })?;
    let shown = config.command.join(" ");

    log_status!("verify", "Running `{}` (timeout {}s)", shown, config.timeout.as_secs());

    let outcome = command::run_with_timeout(
        program,
        args,
        config.cwd.as_deref(),
        config.timeout,
        &shown,
    )?;

    if outcome.timed_out {
        log_status!("verify", "`{}` timed out", shown);
    } else if !outcome.success() {
        log_status!("verify", "`{}` failed with {:?}", shown, outcome.exit_code);
    }

    Ok(Verification {
        command: shown,
        exit_code: outcome.exit_code,
        timed_out: outcome.timed_out,
        duration_ms: outcome.duration.as_millis() as u64,
    })
}
