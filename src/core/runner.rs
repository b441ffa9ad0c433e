//! Rename runner: walk the targets, rewrite each file and collect the report.
//!
//! A run either fails up front (bad configuration, refused conflicting rule
//! set) or completes with every per-file failure recorded in the report.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::backup::{self, BackupRun};
use crate::defaults::{default_excludes, default_extensions, DEFAULT_BACKUP_DIR};
use crate::error::{Error, Result};
use crate::refactor;
use crate::report::{FileRecord, RunReport, SkippedEntry};
use crate::rules::RuleSet;
use crate::utils::io;
use crate::verify::{self, VerifyConfig};
use crate::walker::{self, SourceFile};

pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub rule_set: RuleSet,
    pub targets: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub excluded: Vec<String>,
    pub dry_run: bool,
    /// Write even when the rule set has conflicts.
    pub force: bool,
    pub backup_root: PathBuf,
    pub verify: Option<VerifyConfig>,
}

impl RunConfig {
    /// Config with defaults, taking extensions and exclusions from the rules
    /// file when it provides them.
    pub fn new(rule_set: RuleSet, targets: Vec<PathBuf>) -> Self {
        let extensions = rule_set.extensions.clone().unwrap_or_else(default_extensions);
        let excluded = rule_set.excluded.clone().unwrap_or_else(default_excludes);
        RunConfig {
            rule_set,
            targets,
            extensions,
            excluded,
            dry_run: false,
            force: false,
            backup_root: PathBuf::from(DEFAULT_BACKUP_DIR),
            verify: None,
        }
    }
}

/// Run with the current time as the run timestamp.
pub fn run(config: &RunConfig) -> Result<RunReport> {
    run_at(config, Utc::now())
}

pub fn run_at(config: &RunConfig, started: DateTime<Utc>) -> Result<RunReport> {
    let rule_set = &config.rule_set;
    if rule_set.is_empty() {
        return Err(Error::config_invalid_value(
            "rules",
            None,
            "the rule set contains no rules",
        ));
    }
    if config.targets.is_empty() {
        return Err(Error::validation_missing_argument(vec!["target".to_string()]));
    }

    let conflicts = rule_set.conflicts();
    for conflict in &conflicts {
        log_status!("rules", "Conflict: {}", conflict.message);
    }
    let blocking: Vec<String> = conflicts
        .iter()
        .filter(|c| c.kind.blocks_write())
        .map(|c| c.message.clone())
        .collect();
    if !blocking.is_empty() && !config.dry_run && !config.force {
        return Err(Error::config_rule_conflict(blocking));
    }

    let skip: Vec<PathBuf> = config.backup_root.canonicalize().into_iter().collect();
    let walk = walker::collect_files(&config.targets, &config.extensions, &config.excluded, &skip)?;

    let labels: Vec<String> = rule_set.rules.iter().map(|r| r.describe()).collect();
    let mut report = RunReport::new(
        started.to_rfc3339_opts(SecondsFormat::Secs, true),
        config.dry_run,
        &labels,
    );
    report.conflicts = conflicts;
    for err in walk.errors {
        report.record_error(err.path, err.message);
    }

    log_status!(
        "rename",
        "Scanning {} file(s) with {} rule(s){}",
        walk.files.len(),
        rule_set.rules.len(),
        if config.dry_run { " (dry run)" } else { "" }
    );

    let mut backups = BackupRun::new(&config.backup_root, &started);

    for file in &walk.files {
        report.files_scanned += 1;
        process_file(file, config, &labels, &mut backups, &mut report);
    }

    report.backup_dir = backups.dir().map(|d| d.display().to_string());

    if let Some(verify_config) = &config.verify {
        if config.dry_run {
            log_status!("verify", "Skipping verification in dry run");
        } else {
            match verify::run_verification(verify_config) {
                Ok(verification) => report.verification = Some(verification),
                Err(e) => report.record_error(verify_config.command.join(" "), backup::describe(&e)),
            }
        }
    }

    if let Some(dir) = backups.dir() {
        write_run_report(&mut report, &dir.join(REPORT_FILE));
    }

    log_status!(
        "rename",
        "{} replacement(s) in {} file(s), {} protected skip(s), {} error(s)",
        report.total_replacements,
        report.files_modified,
        report.skipped_protected.len(),
        report.errors.len()
    );

    Ok(report)
}

fn process_file(
    file: &SourceFile,
    config: &RunConfig,
    labels: &[String],
    backups: &mut BackupRun,
    report: &mut RunReport,
) {
    let shown = file.display();

    let bytes = match io::read_bytes(&file.path, &format!("read {}", shown)) {
        Ok(bytes) => bytes,
        Err(e) => {
            report.record_error(&shown, backup::describe(&e));
            return;
        }
    };
    let Ok(source) = std::str::from_utf8(&bytes) else {
        report.record_error(&shown, "file is not valid UTF-8");
        return;
    };

    let outcome = refactor::rename_text(source, &config.rule_set.rules, &config.rule_set.protected);

    for skip in &outcome.skipped {
        report.skipped_protected.push(SkippedEntry {
            file: shown.clone(),
            line: skip.line,
            name: skip.name.clone(),
        });
    }

    if !outcome.changed() {
        return;
    }

    let mut rule_hits = BTreeMap::new();
    for (label, hits) in labels.iter().zip(&outcome.rule_hits) {
        if *hits > 0 {
            *rule_hits.entry(label.clone()).or_insert(0) += hits;
        }
    }

    let mut record = FileRecord {
        path: shown.clone(),
        sha256: sha256_hex(&bytes),
        replacements: outcome.occurrences,
        rule_hits,
        backup: None,
    };

    if !config.dry_run {
        let backup_path = match backups.backup(file, &bytes) {
            Ok(path) => path,
            Err(e) => {
                report.record_error(&shown, backup::describe(&e));
                return;
            }
        };
        if let Err(e) = io::write_file(&file.path, &outcome.text, &format!("write {}", shown)) {
            report.record_error(&shown, backup::describe(&e));
            return;
        }
        record.backup = Some(backup_path.display().to_string());
        log_status!("rename", "{}: {} replacement(s)", shown, outcome.occurrences);
    }

    report.record_file(record);
}

/// Save the report next to the backups. Files are already rewritten at this
/// point, so a failure is recorded rather than returned.
fn write_run_report(report: &mut RunReport, path: &Path) {
    if let Err(e) = report.write(path) {
        report.record_error(path.display().to_string(), backup::describe(&e));
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RenameRule, RuleScope};
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn rules(pairs: &[(&str, &str)]) -> RuleSet {
        RuleSet::from_rules(
            pairs
                .iter()
                .map(|(o, n)| RenameRule::new(o, n, RuleScope::Identifier))
                .collect(),
            Vec::new(),
        )
        .unwrap()
    }

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 6, 7, 8, 9).unwrap()
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("app");
        fs::create_dir_all(src.join("node_modules/lib")).unwrap();
        fs::write(src.join("a.ts"), "const userId = 1;\nexport { userId };\n").unwrap();
        fs::write(src.join("b.tsx"), "// userId only in a comment\n").unwrap();
        fs::write(src.join("node_modules/lib/index.js"), "userId").unwrap();
        dir
    }

    fn config(dir: &TempDir, set: RuleSet) -> RunConfig {
        let mut config = RunConfig::new(set, vec![dir.path().join("app")]);
        config.backup_root = dir.path().join("backups");
        config
    }

    #[test]
    fn sha256_is_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = project();
        let mut cfg = config(&dir, rules(&[("userId", "user_id")]));
        cfg.dry_run = true;

        let report = run_at(&cfg, started()).unwrap();
        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.files_modified, 1);
        assert_eq!(report.total_replacements, 2);
        assert!(report.backup_dir.is_none());
        assert!(!dir.path().join("backups").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("app/a.ts")).unwrap(),
            "const userId = 1;\nexport { userId };\n"
        );
    }

    #[test]
    fn write_run_backs_up_and_rewrites() {
        let dir = project();
        let cfg = config(&dir, rules(&[("userId", "user_id")]));

        let report = run_at(&cfg, started()).unwrap();
        assert_eq!(report.files_modified, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("app/a.ts")).unwrap(),
            "const user_id = 1;\nexport { user_id };\n"
        );

        let run_dir = dir.path().join("backups/20260506T070809Z");
        assert_eq!(
            fs::read_to_string(run_dir.join("app/a.ts")).unwrap(),
            "const userId = 1;\nexport { userId };\n"
        );
        assert!(run_dir.join(REPORT_FILE).exists());
        assert!(run_dir.join(backup::MANIFEST_FILE).exists());
        assert!(report.files[0].backup.is_some());
    }

    #[test]
    fn dry_and_write_reports_agree() {
        let dry_dir = project();
        let mut dry = config(&dry_dir, rules(&[("userId", "user_id")]));
        dry.dry_run = true;
        let dry_report = run_at(&dry, started()).unwrap();

        let wet_dir = project();
        let wet_report = run_at(&config(&wet_dir, rules(&[("userId", "user_id")])), started()).unwrap();

        assert_eq!(dry_report.files_scanned, wet_report.files_scanned);
        assert_eq!(dry_report.files_modified, wet_report.files_modified);
        assert_eq!(dry_report.total_replacements, wet_report.total_replacements);
        assert_eq!(dry_report.rule_hits, wet_report.rule_hits);
        assert_eq!(dry_report.skipped_protected, wet_report.skipped_protected);
        assert_eq!(dry_report.errors, wet_report.errors);
    }

    #[test]
    fn conflicting_rules_refuse_destructive_run() {
        let dir = project();
        let cfg = config(&dir, rules(&[("userId", "user_id"), ("user_id", "uid")]));
        let err = run_at(&cfg, started()).unwrap_err();
        assert_eq!(err.code.as_str(), "config.rule_conflict");
        assert_eq!(
            fs::read_to_string(dir.path().join("app/a.ts")).unwrap(),
            "const userId = 1;\nexport { userId };\n"
        );
    }

    #[test]
    fn conflicts_are_reported_in_dry_run_and_forced_runs() {
        let dir = project();
        let mut cfg = config(&dir, rules(&[("userId", "user_id"), ("user_id", "uid")]));
        cfg.dry_run = true;
        let report = run_at(&cfg, started()).unwrap();
        assert_eq!(report.conflicts.len(), 1);

        cfg.dry_run = false;
        cfg.force = true;
        let report = run_at(&cfg, started()).unwrap();
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.files_modified, 1);
    }

    #[test]
    fn protected_source_alongside_real_rename_does_not_block() {
        let dir = project();
        let cfg = config(&dir, rules(&[("userId", "user_id"), ("toFixed", "to_fixed")]));
        let report = run_at(&cfg, started()).unwrap();
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.files_modified, 1);
    }

    #[test]
    fn failed_report_write_is_recorded() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blocker"), "").unwrap();
        let mut report = RunReport::new("t".to_string(), false, &[]);
        report.backup_dir = Some("backups/x".to_string());

        write_run_report(&mut report, &dir.path().join("blocker/report.json"));

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].file.ends_with("report.json"));
        assert_eq!(report.backup_dir.as_deref(), Some("backups/x"));
    }

    #[test]
    fn second_run_is_a_no_op() {
        let dir = project();
        let cfg = config(&dir, rules(&[("userId", "user_id")]));
        run_at(&cfg, started()).unwrap();
        let second = run_at(&cfg, started()).unwrap();
        assert_eq!(second.total_replacements, 0);
        assert!(second.files.is_empty());
    }

    #[test]
    fn unreadable_files_are_recorded_and_skipped() {
        let dir = project();
        fs::write(dir.path().join("app/bad.ts"), [0xff, 0xfe, 0x00]).unwrap();
        let cfg = config(&dir, rules(&[("userId", "user_id")]));
        let report = run_at(&cfg, started()).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].file.ends_with("bad.ts"));
        assert_eq!(report.files_modified, 1);
    }

    #[test]
    fn protected_rule_records_skips() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("app/p.ts"), "const s = n.toFixed(2);\n").unwrap();
        let cfg = config(&dir, rules(&[("toFixed", "to_fixed")]));
        let report = run_at(&cfg, started()).unwrap();
        assert_eq!(report.total_replacements, 0);
        assert_eq!(report.skipped_protected.len(), 1);
        assert_eq!(report.skipped_protected[0].name, "toFixed");
        assert!(report.backup_dir.is_none());
    }

    #[test]
    fn rules_file_extensions_are_used() {
        let mut set = rules(&[("userId", "user_id")]);
        set.extensions = Some(vec![".tsx".to_string()]);
        let dir = project();
        let mut cfg = config(&dir, set);
        cfg.dry_run = true;
        let report = run_at(&cfg, started()).unwrap();
        assert_eq!(report.files_scanned, 1);
        assert_eq!(report.files_modified, 0);
    }

    #[test]
    fn empty_rule_set_is_config_error() {
        let dir = project();
        let cfg = config(&dir, RuleSet::from_rules(Vec::new(), Vec::new()).unwrap());
        assert!(run_at(&cfg, started()).unwrap_err().code.is_config());
    }

    #[cfg(unix)]
    #[test]
    fn verification_exit_code_lands_in_report() {
        let dir = project();
        let mut cfg = config(&dir, rules(&[("userId", "user_id")]));
        cfg.verify = Some(VerifyConfig::from_command_line("sh -c 'exit 4'", None, Some(10)).unwrap());
        let report = run_at(&cfg, started()).unwrap();
        let verification = report.verification.unwrap();
        assert_eq!(verification.exit_code, Some(4));
        assert!(!verification.timed_out);
    }
}
