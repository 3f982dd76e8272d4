//! # fbr core
//!
//! Change-aware, numbered backup rotation for a single file.
//!
//! Backing up `save.dat` writes `save.dat.1`, shifting earlier backups to
//! `save.dat.2`, `save.dat.3`, ... up to a configured maximum. Nothing happens
//! when `save.dat.1` already holds the same content, which is decided by
//! comparing SHA-256 (or BLAKE3) digests before any file is touched.
//!
//! ## Example
//!
//! ```no_run
//! use fbr_core::{BackupOptions, BackupOutcome, Rotator, TracingSink};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rotator = Rotator::new(BackupOptions::with_max_count(5), &TracingSink);
//!
//! match rotator.process(Path::new("./save.dat"))? {
//!     BackupOutcome::Created { backup, bytes, .. } => {
//!         println!("wrote {} bytes to {}", bytes, backup.display());
//!     }
//!     BackupOutcome::Skipped { reason } => println!("no backup needed: {}", reason),
//! }
//! # Ok(())
//! # }
//! ```

mod backup;
mod copy;
mod detect;
mod error;
mod hash;
mod rotate;
mod sink;

pub use backup::{BackupOptions, BackupOutcome, DEFAULT_MAX_COUNT, Rotator, process};
pub use copy::{Action, CopyOperation, CopyOutcome, Decision};
pub use detect::contents_match;
pub use error::{Error, ErrorKind, Result};
pub use hash::{Algorithm, DIGEST_SIZE, Digest, file_sum};
pub use rotate::{
    BackupChain, ChainEntry, RenameOutcome, RotationReport, RotationStep, backup_path,
    prune_stale, rotate,
};
pub use sink::{Level, MemorySink, NullSink, Sink, TracingSink};
