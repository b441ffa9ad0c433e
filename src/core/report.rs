//! Run report: the single output schema for every rename run.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::{Error, Result};
use crate::rules::RuleConflict;
use crate::utils::io;
use crate::verify::Verification;

/// A per-file failure that was recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub file: String,
    pub message: String,
}

/// A protected-name occurrence that a rule matched but did not rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub file: String,
    pub line: usize,
    pub name: String,
}

/// One file the rules changed (or would change, in a dry run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: String,
    /// SHA-256 of the original content, hex encoded.
    pub sha256: String,
    pub replacements: usize,
    pub rule_hits: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// ISO 8601 start time of the run.
    pub timestamp: String,
    pub dry_run: bool,
    pub files_scanned: usize,
    pub files_modified: usize,
    pub total_replacements: usize,
    pub rule_hits: BTreeMap<String, usize>,
    pub skipped_protected: Vec<SkippedEntry>,
    pub errors: Vec<FileError>,
    pub conflicts: Vec<RuleConflict>,
    pub files: Vec<FileRecord>,
    pub backup_dir: Option<String>,
    pub verification: Option<Verification>,
}

impl RunReport {
    pub fn new(timestamp: String, dry_run: bool, rule_labels: &[String]) -> Self {
        RunReport {
            timestamp,
            dry_run,
            files_scanned: 0,
            files_modified: 0,
            total_replacements: 0,
            rule_hits: rule_labels.iter().map(|l| (l.clone(), 0)).collect(),
            skipped_protected: Vec::new(),
            errors: Vec::new(),
            conflicts: Vec::new(),
            files: Vec::new(),
            backup_dir: None,
            verification: None,
        }
    }

    pub fn record_error(&mut self, file: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FileError {
            file: file.into(),
            message: message.into(),
        });
    }

    /// Fold a modified file into the totals.
    pub fn record_file(&mut self, record: FileRecord) {
        self.files_modified += 1;
        self.total_replacements += record.replacements;
        for (label, hits) in &record.rule_hits {
            *self.rule_hits.entry(label.clone()).or_insert(0) += hits;
        }
        self.files.push(record);
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize report".to_string())))
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let mode = if self.dry_run { "dry run" } else { "applied" };

        let _ = writeln!(md, "# Rename report ({})", mode);
        let _ = writeln!(md);
        let _ = writeln!(md, "- Timestamp: {}", self.timestamp);
        let _ = writeln!(md, "- Files scanned: {}", self.files_scanned);
        let _ = writeln!(md, "- Files modified: {}", self.files_modified);
        let _ = writeln!(md, "- Total replacements: {}", self.total_replacements);
        if let Some(dir) = &self.backup_dir {
            let _ = writeln!(md, "- Backup: `{}`", dir);
        }
        if let Some(v) = &self.verification {
            let status = match (v.timed_out, v.exit_code) {
                _ if v.passed() => "passed".to_string(),
                (true, _) => "timed out".to_string(),
                (false, Some(code)) => format!("failed, exit code {}", code),
                (false, None) => "terminated by signal".to_string(),
            };
            let _ = writeln!(md, "- Verification: `{}` ({})", v.command, status);
        }

        let _ = writeln!(md);
        let _ = writeln!(md, "## Rule hits");
        let _ = writeln!(md);
        let _ = writeln!(md, "| Rule | Hits |");
        let _ = writeln!(md, "| --- | ---: |");
        for (label, hits) in &self.rule_hits {
            let _ = writeln!(md, "| `{}` | {} |", label, hits);
        }

        if !self.files.is_empty() {
            let _ = writeln!(md);
            let _ = writeln!(md, "## Files");
            let _ = writeln!(md);
            for file in &self.files {
                let _ = writeln!(md, "- `{}`: {} replacement(s)", file.path, file.replacements);
            }
        }

        if !self.conflicts.is_empty() {
            let _ = writeln!(md);
            let _ = writeln!(md, "## Rule conflicts");
            let _ = writeln!(md);
            for conflict in &self.conflicts {
                let _ = writeln!(md, "- {}", conflict.message);
            }
        }

        if !self.skipped_protected.is_empty() {
            let _ = writeln!(md);
            let _ = writeln!(md, "## Skipped protected names");
            let _ = writeln!(md);
            for skip in &self.skipped_protected {
                let _ = writeln!(md, "- `{}` at {}:{}", skip.name, skip.file, skip.line);
            }
        }

        if !self.errors.is_empty() {
            let _ = writeln!(md);
            let _ = writeln!(md, "## Errors");
            let _ = writeln!(md);
            for err in &self.errors {
                let _ = writeln!(md, "- {}: {}", err.file, err.message);
            }
        }

        md
    }

    /// Write the report, as Markdown for `.md` paths and JSON otherwise.
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => self.to_markdown(),
            _ => self.to_json()?,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            io::create_dir_all(parent, &format!("create {}", parent.display()))?;
        }
        io::write_file(path, &content, &format!("write report {}", path.display()))
    }
}
