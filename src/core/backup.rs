//! Backups: copy originals into `backups/<run_timestamp>/` before writing.
//!
//! Each run directory mirrors the processed trees and carries a
//! `manifest.json` mapping every backup back to its original location, so a
//! run can be restored without knowing where it was started from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::report::FileError;
use crate::utils::io;
use crate::walker::SourceFile;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    /// Path of the copy, relative to the run directory.
    pub backup: String,
    /// Absolute path of the original file.
    pub original: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub created_at: String,
    pub entries: Vec<BackupEntry>,
}

/// Directory name for a run started at `started`.
pub fn run_dir_name(started: &DateTime<Utc>) -> String {
    started.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Backups for a single run. The directory is created on first use, so a run
/// that changes nothing leaves nothing behind.
#[derive(Debug)]
pub struct BackupRun {
    root: PathBuf,
    name: String,
    created_at: String,
    dir: Option<PathBuf>,
    entries: Vec<BackupEntry>,
}

impl BackupRun {
    pub fn new(root: &Path, started: &DateTime<Utc>) -> Self {
        BackupRun {
            root: root.to_path_buf(),
            name: run_dir_name(started),
            created_at: started.to_rfc3339(),
            dir: None,
            entries: Vec::new(),
        }
    }

    /// The run directory, once something has been backed up.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn ensure_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.dir {
            return Ok(dir.clone());
        }

        let mut candidate = self.root.join(&self.name);
        let mut suffix = 1;
        while candidate.exists() {
            candidate = self.root.join(format!("{}-{}", self.name, suffix));
            suffix += 1;
        }
        io::create_dir_all(&candidate, &format!("create backup dir {}", candidate.display()))?;
        log_status!("backup", "Backing up originals to {}", candidate.display());

        self.dir = Some(candidate.clone());
        Ok(candidate)
    }

    /// Copy `original` (the file's bytes before rewriting) into the run
    /// directory and record it in the manifest. Returns the backup path.
    pub fn backup(&mut self, file: &SourceFile, original: &[u8]) -> Result<PathBuf> {
        let dir = self.ensure_dir()?;
        let target = dir.join(&file.mirror);
        if target.exists() {
            return Err(Error::internal_unexpected(format!(
                "backup path {} is already used by another file in this run",
                target.display()
            )));
        }
        io::write_bytes_creating_parents(
            &target,
            original,
            &format!("back up {}", file.path.display()),
        )?;

        let original_path = file
            .path
            .canonicalize()
            .unwrap_or_else(|_| file.path.clone());
        self.entries.push(BackupEntry {
            backup: file.mirror.to_string_lossy().replace('\\', "/"),
            original: original_path.to_string_lossy().to_string(),
        });
        self.write_manifest(&dir)?;

        Ok(target)
    }

    fn write_manifest(&self, dir: &Path) -> Result<()> {
        let manifest = BackupManifest {
            created_at: self.created_at.clone(),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize backup manifest".to_string()))
        })?;
        io::write_file_atomic(&dir.join(MANIFEST_FILE), &json, "write backup manifest")
    }
}

/// Outcome of restoring a backup run.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreResult {
    pub run_dir: String,
    pub dry_run: bool,
    pub restored: Vec<String>,
    pub errors: Vec<FileError>,
}

pub fn load_manifest(run_dir: &Path) -> Result<BackupManifest> {
    let path = run_dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| {
        Error::config_invalid_value(
            "backup_dir",
            Some(run_dir.display().to_string()),
            format!("cannot read {}: {}", path.display(), e),
        )
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::config_invalid_value(
            "backup_dir",
            Some(run_dir.display().to_string()),
            format!("invalid manifest {}: {}", path.display(), e),
        )
    })
}

/// Copy every backed-up file in `run_dir` back over its original.
pub fn restore(run_dir: &Path, dry_run: bool) -> Result<RestoreResult> {
    let manifest = load_manifest(run_dir)?;
    let mut result = RestoreResult {
        run_dir: run_dir.display().to_string(),
        dry_run,
        restored: Vec::new(),
        errors: Vec::new(),
    };

    for entry in &manifest.entries {
        let source = run_dir.join(&entry.backup);
        let target = PathBuf::from(&entry.original);

        let bytes = match io::read_bytes(&source, &format!("read backup {}", source.display())) {
            Ok(bytes) => bytes,
            Err(e) => {
                result.errors.push(FileError {
                    file: entry.original.clone(),
                    message: describe(&e),
                });
                continue;
            }
        };

        if !dry_run {
            if let Err(e) = io::write_bytes_creating_parents(
                &target,
                &bytes,
                &format!("restore {}", target.display()),
            ) {
                result.errors.push(FileError {
                    file: entry.original.clone(),
                    message: describe(&e),
                });
                continue;
            }
            log_status!("restore", "Restored {}", entry.original);
        }

        result.restored.push(entry.original.clone());
    }

    Ok(result)
}

/// Flatten an I/O error into a single report line.
pub(crate) fn describe(err: &Error) -> String {
    match err.details.get("error").and_then(|v| v.as_str()) {
        Some(detail) => match err.details.get("context").and_then(|v| v.as_str()) {
            Some(context) => format!("{}: {}", context, detail),
            None => detail.to_string(),
        },
        None => err.message.clone(),
    }
}
