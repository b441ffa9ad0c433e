use clap::Args;
use serde::Serialize;

use relabel::backup::{self, RestoreResult};

use super::expand_path;
use crate::commands::CmdResult;
use crate::output::EXIT_FAILURE;

#[derive(Args)]
pub struct RestoreArgs {
    /// Backup run directory, e.g. backups/20260101T120000Z
    run_dir: String,

    /// List what would be restored without writing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum RestoreOutput {
    #[serde(rename = "restore")]
    Restore {
        #[serde(flatten)]
        result: RestoreResult,
    },
}

pub fn run(args: RestoreArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RestoreOutput> {
    let run_dir = expand_path(&args.run_dir);
    let result = backup::restore(&run_dir, args.dry_run)?;

    // A partial restore leaves the tree half-renamed.
    let exit_code = if result.errors.is_empty() { 0 } else { EXIT_FAILURE };

    Ok((RestoreOutput::Restore { result }, exit_code))
}
