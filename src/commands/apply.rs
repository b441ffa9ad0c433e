use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use relabel::report::RunReport;
use relabel::rules::RuleSet;
use relabel::runner::{self, RunConfig};
use relabel::verify::VerifyConfig;

use super::expand_path;
use crate::commands::CmdResult;

#[derive(Args)]
pub struct ApplyArgs {
    /// Rules file (.json, .yaml or .yml)
    #[arg(long, value_name = "PATH")]
    rules_file: String,

    /// Directory to process (repeatable, defaults to the current directory)
    #[arg(long = "target", value_name = "DIR")]
    targets: Vec<String>,

    /// Comma-separated extensions to process (e.g. .ts,.tsx)
    #[arg(long, value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Comma-separated names or globs to exclude (e.g. node_modules,dist)
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Extra protected name (repeatable)
    #[arg(long, value_name = "NAME")]
    protect: Vec<String>,

    /// Compute and report changes without touching any file
    #[arg(long)]
    dry_run: bool,

    /// Write even when the rule set has conflicts
    #[arg(long)]
    force: bool,

    /// Root directory for per-run backups
    #[arg(long, default_value = relabel::defaults::DEFAULT_BACKUP_DIR)]
    backup_dir: String,

    /// Also write the report here (.md for Markdown, JSON otherwise)
    #[arg(long, value_name = "PATH")]
    report: Option<String>,

    /// Command to run after writing, e.g. "npx tsc --noEmit"
    #[arg(long, value_name = "COMMAND")]
    verify: Option<String>,

    /// Seconds before the verification command is killed
    #[arg(long, value_name = "SECS")]
    verify_timeout: Option<u64>,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum ApplyOutput {
    #[serde(rename = "apply")]
    Apply {
        rules_file: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        report_path: Option<String>,
        report: RunReport,
    },
}

pub fn run(args: ApplyArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ApplyOutput> {
    let rules_path = expand_path(&args.rules_file);
    let mut rule_set = RuleSet::load(&rules_path)?;
    rule_set.protect(args.protect.iter().cloned());

    let config = build_config(rule_set, &args)?;
    let report = runner::run(&config)?;

    let report_path = match &args.report {
        Some(raw) => {
            let path = expand_path(raw);
            report.write(&path)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    Ok((
        ApplyOutput::Apply {
            rules_file: rules_path.display().to_string(),
            report_path,
            report,
        },
        0,
    ))
}

fn build_config(rule_set: RuleSet, args: &ApplyArgs) -> relabel::Result<RunConfig> {
    let targets: Vec<PathBuf> = if args.targets.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.targets.iter().map(|t| expand_path(t)).collect()
    };

    let mut config = RunConfig::new(rule_set, targets);
    if let Some(extensions) = &args.extensions {
        config.extensions = extensions.clone();
    }
    if let Some(exclude) = &args.exclude {
        config.excluded = exclude.clone();
    }
    config.dry_run = args.dry_run;
    config.force = args.force;
    config.backup_root = expand_path(&args.backup_dir);

    if let Some(line) = &args.verify {
        config.verify = Some(VerifyConfig::from_command_line(line, None, args.verify_timeout)?);
    }

    Ok(config)
}
