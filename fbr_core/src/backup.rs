//! Backup orchestration: precheck, rotate, copy.

use crate::copy::{Action, CopyOperation, CopyOutcome, Decision};
use crate::error::{Error, Result};
use crate::hash::Algorithm;
use crate::rotate::{RotationReport, backup_path, prune_stale, rotate};
use crate::sink::Sink;
use std::path::{Path, PathBuf};

/// Default size of the backup chain.
pub const DEFAULT_MAX_COUNT: usize = 5;

/// Knobs for a backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    /// Highest backup number kept (`file.max_count`).
    pub max_count: usize,
    /// Hash used to compare the live file with `file.1`.
    pub algorithm: Algorithm,
    /// Report chunk counts and digests.
    pub verbose: bool,
    /// Write `file.1` through a temp file renamed into place.
    pub atomic: bool,
    /// Delete backups numbered above `max_count` before rotating.
    pub prune: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_COUNT,
            algorithm: Algorithm::default(),
            verbose: false,
            atomic: false,
            prune: false,
        }
    }
}

impl BackupOptions {
    /// Defaults with the given chain length.
    pub fn with_max_count(max_count: usize) -> Self {
        Self {
            max_count,
            ..Self::default()
        }
    }
}

/// What a backup run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// The chain was rotated and `file.1` written.
    Created {
        backup: PathBuf,
        bytes: u64,
        rotation: RotationReport,
        pruned: Vec<PathBuf>,
    },
    /// `file.1` already matched; the filesystem was not touched.
    Skipped { reason: Action },
}

/// Back up one file into its numbered chain.
pub struct Rotator<'a> {
    options: BackupOptions,
    sink: &'a dyn Sink,
}

impl<'a> Rotator<'a> {
    pub fn new(options: BackupOptions, sink: &'a dyn Sink) -> Self {
        Self { options, sink }
    }

    pub fn options(&self) -> &BackupOptions {
        &self.options
    }

    /// Back up `path` to `path.1` if its contents changed since the last run.
    ///
    /// The precheck runs first and is read-only. Only when a copy is needed is
    /// the chain rotated (which may overwrite `path.max_count`) and the copy
    /// made.
    pub fn process(&self, path: &Path) -> Result<BackupOutcome> {
        if self.options.max_count < 1 {
            return Err(Error::invalid_max_count(self.options.max_count));
        }

        let backup = backup_path(path, 1);
        self.sink.info(&format!(
            "file path: {} -> backup file path: {}",
            path.display(),
            backup.display()
        ));

        let mut op = CopyOperation::new(path, &backup, self.sink)
            .algorithm(self.options.algorithm)
            .verbose(self.options.verbose)
            .atomic(self.options.atomic);

        let decision = op.precheck().inspect_err(|e| {
            self.sink.warn(&format!(
                "Error returned: {} (last action: {})",
                e,
                op.last_action()
            ))
        })?;
        if let Decision::NotNeeded { reason } = decision {
            self.sink.info(&format!("Backup not needed: {}", reason));
            return Ok(BackupOutcome::Skipped { reason });
        }

        let pruned = if self.options.prune {
            prune_stale(path, self.options.max_count, self.sink)?
        } else {
            Vec::new()
        };
        let rotation = rotate(path, self.options.max_count, self.sink);

        let mut op = op.compare_hash(true);
        match op.run() {
            Ok(CopyOutcome::Copied { bytes }) => {
                self.sink
                    .info(&format!("Completed - last action: {}", op.last_action()));
                Ok(BackupOutcome::Created {
                    backup,
                    bytes,
                    rotation,
                    pruned,
                })
            }
            Ok(CopyOutcome::Unchanged { reason }) => {
                self.sink.info(&format!("Backup not needed: {}", reason));
                Ok(BackupOutcome::Skipped { reason })
            }
            Err(e) => {
                self.sink.warn(&format!("Error returned: {}", e));
                Err(e)
            }
        }
    }
}

/// Back up `path` with default options and a chain of `max_count` backups.
pub fn process(path: &Path, max_count: usize, sink: &dyn Sink) -> Result<BackupOutcome> {
    Rotator::new(BackupOptions::with_max_count(max_count), sink).process(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::hash::Digest;
    use crate::sink::{MemorySink, NullSink};
    use std::fs;
    use tempfile::TempDir;

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn sha256_hex(path: &Path) -> String {
        Digest::hash_file(Algorithm::Sha256, path).unwrap().to_hex()
    }

    #[test]
    fn test_first_backup_then_noop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("root.go");
        fs::write(&path, b"package cmd").unwrap();

        let first = process(&path, 2, &NullSink).unwrap();
        assert!(matches!(first, BackupOutcome::Created { bytes: 11, .. }));
        assert_eq!(names(temp_dir.path()), vec!["root.go", "root.go.1"]);

        let sink = MemorySink::new();
        let second = process(&path, 2, &sink).unwrap();
        assert_eq!(
            second,
            BackupOutcome::Skipped {
                reason: Action::SumsMatch
            }
        );
        assert_eq!(names(temp_dir.path()), vec!["root.go", "root.go.1"]);
        assert!(sink.contains("Backup not needed: confirmed: file sums match"));
        assert!(!sink.contains("rotated backup"));
    }

    #[test]
    fn test_change_rotates_then_copies() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("save.dat");
        fs::write(&path, b"A").unwrap();

        process(&path, 2, &NullSink).unwrap();
        assert_eq!(fs::read(backup_path(&path, 1)).unwrap(), b"A");

        fs::write(&path, b"B").unwrap();
        let sink = MemorySink::new();
        let outcome = process(&path, 2, &sink).unwrap();

        assert_eq!(fs::read(backup_path(&path, 1)).unwrap(), b"B");
        assert_eq!(fs::read(backup_path(&path, 2)).unwrap(), b"A");
        assert!(!backup_path(&path, 3).exists());
        assert!(sink.contains("rotated backup"));
        assert!(sink.contains("Completed - last action: loop exit: write successful"));
        match outcome {
            BackupOutcome::Created { rotation, .. } => assert_eq!(rotation.renamed(), 1),
            other => panic!("expected a backup, got {:?}", other),
        }
    }

    #[test]
    fn test_two_previous_backups() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("root.go");
        fs::write(&path, b"live contents").unwrap();
        fs::write(backup_path(&path, 1), b"1").unwrap();
        fs::write(backup_path(&path, 2), b"2").unwrap();

        process(&path, 2, &NullSink).unwrap();
        assert_eq!(
            names(temp_dir.path()),
            vec!["root.go", "root.go.1", "root.go.2"]
        );

        // A second run with no change is a no-op.
        process(&path, 2, &NullSink).unwrap();

        let live = sha256_hex(&path);
        assert_eq!(sha256_hex(&backup_path(&path, 1)), live);
        assert_eq!(
            sha256_hex(&backup_path(&path, 2)),
            "6b86b273ff34fce19d6b804eff5a3f5747ada4eaa22f1d49c01e52ddb7875b4b"
        );
    }

    #[test]
    fn test_missing_source_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone");
        fs::write(backup_path(&path, 1), b"1").unwrap();
        fs::write(backup_path(&path, 2), b"2").unwrap();

        let err = process(&path, 3, &NullSink).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(names(temp_dir.path()), vec!["gone.1", "gone.2"]);
        assert_eq!(fs::read(backup_path(&path, 1)).unwrap(), b"1");
    }

    #[test]
    fn test_max_count_one_overwrites_single_backup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        fs::write(&path, b"new").unwrap();
        fs::write(backup_path(&path, 1), b"old").unwrap();

        let outcome = process(&path, 1, &NullSink).unwrap();

        assert!(matches!(outcome, BackupOutcome::Created { .. }));
        assert_eq!(names(temp_dir.path()), vec!["f", "f.1"]);
        assert_eq!(fs::read(backup_path(&path, 1)).unwrap(), b"new");
    }

    #[test]
    fn test_zero_max_count_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        fs::write(&path, b"x").unwrap();

        let err = process(&path, 0, &NullSink).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(names(temp_dir.path()), vec!["f"]);
    }

    #[test]
    fn test_stale_backups_kept_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        fs::write(&path, b"x").unwrap();
        fs::write(backup_path(&path, 4), b"stale").unwrap();

        process(&path, 2, &NullSink).unwrap();
        assert_eq!(names(temp_dir.path()), vec!["f", "f.1", "f.4"]);
    }

    #[test]
    fn test_prune_removes_stale_backups() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        fs::write(&path, b"x").unwrap();
        fs::write(backup_path(&path, 4), b"stale").unwrap();

        let options = BackupOptions {
            max_count: 2,
            prune: true,
            ..BackupOptions::default()
        };
        let outcome = Rotator::new(options, &NullSink).process(&path).unwrap();

        assert_eq!(names(temp_dir.path()), vec!["f", "f.1"]);
        match outcome {
            BackupOutcome::Created { pruned, .. } => {
                assert_eq!(pruned, vec![backup_path(&path, 4)])
            }
            other => panic!("expected a backup, got {:?}", other),
        }
    }

    #[test]
    fn test_atomic_blake3_run() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        fs::write(&path, b"first").unwrap();

        let options = BackupOptions {
            max_count: 3,
            algorithm: Algorithm::Blake3,
            atomic: true,
            ..BackupOptions::default()
        };
        let rotator = Rotator::new(options, &NullSink);
        rotator.process(&path).unwrap();
        fs::write(&path, b"second").unwrap();
        rotator.process(&path).unwrap();
        fs::write(&path, b"third").unwrap();
        rotator.process(&path).unwrap();

        assert_eq!(fs::read(backup_path(&path, 1)).unwrap(), b"third");
        assert_eq!(fs::read(backup_path(&path, 2)).unwrap(), b"second");
        assert_eq!(fs::read(backup_path(&path, 3)).unwrap(), b"first");
        assert_eq!(names(temp_dir.path()), vec!["f", "f.1", "f.2", "f.3"]);
    }
}
