//! Numbered backup chain: naming, rotation, scanning and pruning.

use crate::error::{Error, Result};
use crate::sink::Sink;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Path of backup number `index` for `base` (`base.index`).
pub fn backup_path(base: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// What happened to one slot during rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    /// `base.index` was moved to `base.(index + 1)`.
    Renamed,
    /// There was no `base.index`; sparse chains are normal.
    Missing,
    /// The rename failed for another reason. Not propagated.
    Failed(io::ErrorKind),
}

/// One attempted rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationStep {
    pub index: usize,
    pub outcome: RenameOutcome,
}

/// Every rename attempted by [`rotate`], highest index first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationReport {
    pub steps: Vec<RotationStep>,
}

impl RotationReport {
    /// Number of backups actually shifted.
    pub fn renamed(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.outcome == RenameOutcome::Renamed)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Shift `base.(max-1)` to `base.max`, down to `base.1` to `base.2`.
///
/// Runs from the highest index down so nothing is overwritten before it has
/// been moved. `base.max` is never deleted; it is replaced when
/// `base.(max-1)` lands on it. With `max_count <= 1` nothing happens.
/// Individual rename failures are recorded, never returned.
pub fn rotate(base: &Path, max_count: usize, sink: &dyn Sink) -> RotationReport {
    let mut report = RotationReport::default();
    for index in (1..max_count).rev() {
        let current = backup_path(base, index);
        let next = backup_path(base, index + 1);
        let outcome = match fs::rename(&current, &next) {
            Ok(()) => {
                sink.info(&format!(
                    "rotated backup {} -> .{}",
                    current.display(),
                    index + 1
                ));
                RenameOutcome::Renamed
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => RenameOutcome::Missing,
            Err(e) => {
                sink.debug(&format!("skipped rotating {}: {}", current.display(), e));
                RenameOutcome::Failed(e.kind())
            }
        };
        report.steps.push(RotationStep { index, outcome });
    }
    report
}

/// An existing numbered backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub index: usize,
    pub path: PathBuf,
}

/// The numbered siblings of a file that currently exist on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupChain {
    base: PathBuf,
    entries: Vec<ChainEntry>,
}

impl BackupChain {
    /// Scan the directory holding `base` for `base.N` files (N >= 1).
    ///
    /// Entries are sorted by index. Names with a non-numeric suffix are ignored.
    pub fn scan(base: &Path) -> Result<Self> {
        let file_name = base
            .file_name()
            .ok_or_else(|| Error::not_found(base))?
            .to_string_lossy()
            .into_owned();
        let dir = match base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let prefix = format!("{}.", file_name);

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(index) = name
                .strip_prefix(&prefix)
                .and_then(|suffix| suffix.parse::<usize>().ok())
                .filter(|index| *index >= 1)
            {
                entries.push(ChainEntry {
                    index,
                    path: backup_path(base, index),
                });
            }
        }

        entries.sort_by_key(|e| e.index);
        Ok(Self {
            base: base.to_path_buf(),
            entries,
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// Entries numbered above `max_count`.
    pub fn stale(&self, max_count: usize) -> impl Iterator<Item = &ChainEntry> {
        self.entries.iter().filter(move |e| e.index > max_count)
    }
}

/// Delete backups numbered above `max_count`, left over from a run with a
/// larger maximum. Returns the removed paths.
pub fn prune_stale(base: &Path, max_count: usize, sink: &dyn Sink) -> Result<Vec<PathBuf>> {
    let chain = BackupChain::scan(base)?;
    let mut removed = Vec::new();
    for entry in chain.stale(max_count) {
        fs::remove_file(&entry.path).map_err(|e| Error::io(&entry.path, e))?;
        sink.info(&format!("pruned stale backup {}", entry.path.display()));
        removed.push(entry.path.clone());
    }
    Ok(removed)
}
