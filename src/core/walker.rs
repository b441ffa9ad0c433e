//! Source file discovery for a rename run.

use glob_match::glob_match;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::defaults::ALWAYS_SKIP_DIRS;
use crate::error::{Error, Result};

/// A file selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as reached from the target the user gave.
    pub path: PathBuf,
    /// Backup location relative to the run directory:
    /// `<target prefix>/<path within target>`. The prefix is the target
    /// directory's name, suffixed `-2`, `-3`, ... when another target in the
    /// same run already uses that name.
    pub mirror: PathBuf,
}

impl SourceFile {
    pub fn display(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// A directory that could not be listed. Walking continues past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct WalkResult {
    pub files: Vec<SourceFile>,
    pub errors: Vec<WalkError>,
}

/// Resolve `~` and check that the target is an existing directory.
pub fn resolve_target(target: &Path) -> Result<PathBuf> {
    let raw = target.to_string_lossy();
    let expanded = PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref());

    if !expanded.exists() {
        return Err(Error::config_invalid_value(
            "target",
            Some(raw.to_string()),
            format!("target directory does not exist: {}", expanded.display()),
        ));
    }
    if !expanded.is_dir() {
        return Err(Error::config_invalid_value(
            "target",
            Some(raw.to_string()),
            format!("target is not a directory: {}", expanded.display()),
        ));
    }
    Ok(expanded)
}

/// Normalize `.ts`/`ts` to `ts`, rejecting empty entries.
pub fn normalize_extensions(extensions: &[String]) -> Result<Vec<String>> {
    let normalized: Vec<String> = extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_string())
        .collect();

    if normalized.is_empty() || normalized.iter().any(|e| e.is_empty()) {
        return Err(Error::config_invalid_value(
            "extensions",
            Some(extensions.join(",")),
            "extensions must be a non-empty list like .ts,.tsx",
        ));
    }
    Ok(normalized)
}

fn is_excluded(name: &str, excluded: &[String]) -> bool {
    if ALWAYS_SKIP_DIRS.contains(&name) {
        return true;
    }
    excluded.iter().any(|pattern| {
        if pattern.contains(['*', '?', '[', '{']) {
            glob_match(pattern, name)
        } else {
            pattern == name
        }
    })
}

/// Walk every target, returning matching files sorted by path with
/// duplicates from overlapping targets removed.
///
/// Symlinks are not followed. `skip` holds canonical directories (such as the
/// backup root) that are never descended into.
pub fn collect_files(
    targets: &[PathBuf],
    extensions: &[String],
    excluded: &[String],
    skip: &[PathBuf],
) -> Result<WalkResult> {
    let extensions = normalize_extensions(extensions)?;
    let mut seen: BTreeMap<PathBuf, SourceFile> = BTreeMap::new();
    let mut prefixes: BTreeMap<PathBuf, String> = BTreeMap::new();
    let mut errors = Vec::new();

    for target in targets {
        let root = resolve_target(target)?;
        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.clone());
        let root_name = match prefixes.get(&canonical_root) {
            Some(prefix) => prefix.clone(),
            None => {
                let prefix = unique_prefix(&canonical_root, &prefixes);
                prefixes.insert(canonical_root.clone(), prefix.clone());
                prefix
            }
        };

        let mut found = Vec::new();
        walk_recursive(&root, &extensions, excluded, skip, &mut found, &mut errors);

        for path in found {
            let relative = path.strip_prefix(&root).unwrap_or(&path).to_path_buf();
            let key = path.canonicalize().unwrap_or_else(|_| path.clone());
            seen.entry(key).or_insert_with(|| SourceFile {
                path,
                mirror: Path::new(&root_name).join(relative),
            });
        }
    }

    Ok(WalkResult {
        files: seen.into_values().collect(),
        errors,
    })
}

/// Mirror prefix for a new target root, distinct from every prefix already
/// handed out in this walk.
fn unique_prefix(root: &Path, taken: &BTreeMap<PathBuf, String>) -> String {
    let base = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string());
    let in_use = |candidate: &str| taken.values().any(|p| p == candidate);

    if !in_use(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !in_use(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn walk_recursive(
    dir: &Path,
    extensions: &[String],
    excluded: &[String],
    skip: &[PathBuf],
    files: &mut Vec<PathBuf>,
    errors: &mut Vec<WalkError>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(WalkError {
                path: dir.to_string_lossy().to_string(),
                message: format!("cannot list directory: {}", e),
            });
            return;
        }
    };

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();

        if file_type.is_dir() {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_excluded(&name, excluded) {
                continue;
            }
            if !skip.is_empty() {
                if let Ok(canonical) = path.canonicalize() {
                    if skip.contains(&canonical) {
                        continue;
                    }
                }
            }
            walk_recursive(&path, extensions, excluded, skip, files, errors);
        } else if file_type.is_file() {
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if extensions.iter().any(|e| e == ext) {
                    files.push(path);
                }
            }
        }
    }
}
