use clap::Args;
use serde::Serialize;

use relabel::defaults::{default_excludes, default_extensions};
use relabel::log_status;
use relabel::rules::{RenameRule, RuleConflict, RuleSet};

use super::expand_path;
use crate::commands::CmdResult;
use crate::output::EXIT_CONFIG;

#[derive(Args)]
pub struct CheckArgs {
    /// Rules file (.json, .yaml or .yml)
    #[arg(long, value_name = "PATH")]
    rules_file: String,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum CheckOutput {
    #[serde(rename = "check")]
    Check {
        rules_file: String,
        rules: Vec<RenameRule>,
        protected_count: usize,
        extensions: Vec<String>,
        exclude: Vec<String>,
        conflicts: Vec<RuleConflict>,
        clean: bool,
    },
}

pub fn run(args: CheckArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<CheckOutput> {
    let path = expand_path(&args.rules_file);
    let rule_set = RuleSet::load(&path)?;
    let conflicts = rule_set.conflicts();

    for conflict in &conflicts {
        log_status!("check", "{}", conflict.message);
    }

    let clean = !conflicts.iter().any(|c| c.kind.blocks_write());
    let exit_code = if clean { 0 } else { EXIT_CONFIG };

    Ok((
        CheckOutput::Check {
            rules_file: path.display().to_string(),
            protected_count: rule_set.protected.len(),
            extensions: rule_set.extensions.clone().unwrap_or_else(default_extensions),
            exclude: rule_set.excluded.clone().unwrap_or_else(default_excludes),
            rules: rule_set.rules,
            conflicts,
            clean,
        },
        exit_code,
    ))
}
