//! Change-aware buffered file copy.
//!
//! A [`CopyOperation`] walks a fixed sequence of stages: compare sums
//! (optional), open reader, open writer, stream, teardown. Each stage either
//! lets the next one run or stops the operation, and the first error ends it.
//! The stage that was running last is kept as an [`Action`] so a failure can
//! be reported with what was being attempted.

use crate::detect::contents_match;
use crate::error::{Error, Result};
use crate::hash::{Algorithm, CHUNK_SIZE};
use crate::sink::Sink;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The step a copy operation attempted most recently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Init,
    CompareSums,
    PathsMatch,
    SumsMatch,
    SumsDiffer,
    OpenReader,
    OpenWriter,
    ReadChunk,
    WriteChunk,
    Flush,
    Persist,
    Done,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Init => "init",
            Action::CompareSums => "comparing file sums",
            Action::PathsMatch => "confirmed: file paths match",
            Action::SumsMatch => "confirmed: file sums match",
            Action::SumsDiffer => "file sums differ",
            Action::OpenReader => "open reader",
            Action::OpenWriter => "open writer",
            Action::ReadChunk => "loop: read file contents",
            Action::WriteChunk => "loop: write buffer",
            Action::Flush => "loop exit: flush buffer",
            Action::Persist => "persist staged copy",
            Action::Done => "loop exit: write successful",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the read-only precheck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Contents differ, or there is no usable backup yet.
    CopyNeeded,
    /// Nothing to do; `reason` says why.
    NotNeeded { reason: Action },
}

/// Result of a copy that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The destination now holds a copy of the source.
    Copied { bytes: u64 },
    /// The destination already matched; nothing was written.
    Unchanged { reason: Action },
}

/// Write target: straight into the destination, or into a temp file that is
/// renamed over it once complete.
enum Target {
    Direct(File),
    Staged(NamedTempFile),
}

impl Write for Target {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Target::Direct(f) => f.write(buf),
            Target::Staged(f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Target::Direct(f) => f.flush(),
            Target::Staged(f) => f.flush(),
        }
    }
}

/// One copy from `source` to `dest`.
pub struct CopyOperation<'a> {
    source: PathBuf,
    dest: PathBuf,
    compare_hash: bool,
    verbose: bool,
    atomic: bool,
    algorithm: Algorithm,
    last_action: Action,
    sink: &'a dyn Sink,
}

impl<'a> CopyOperation<'a> {
    /// Create an operation with hash comparison, verbose output and atomic
    /// writes all disabled.
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>, sink: &'a dyn Sink) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            compare_hash: false,
            verbose: false,
            atomic: false,
            algorithm: Algorithm::default(),
            last_action: Action::Init,
            sink,
        }
    }

    /// Skip the copy when source and destination hashes already match.
    pub fn compare_hash(mut self, enabled: bool) -> Self {
        self.compare_hash = enabled;
        self
    }

    /// Report per-chunk progress and digests.
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Write into a temp file next to the destination and rename it into
    /// place on success, instead of truncating the destination up front.
    pub fn atomic(mut self, enabled: bool) -> Self {
        self.atomic = enabled;
        self
    }

    /// Hash algorithm used for comparisons.
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn compares_hash(&self) -> bool {
        self.compare_hash
    }

    /// The step attempted most recently.
    pub fn last_action(&self) -> Action {
        self.last_action
    }

    /// Decide, without writing anything, whether a copy is needed.
    ///
    /// Turns hash comparison on for this operation. Errors hashing the source
    /// (including a missing source) are returned.
    pub fn precheck(&mut self) -> Result<Decision> {
        self.compare_hash = true;
        match self.compare_sums()? {
            ControlFlow::Continue(()) => Ok(Decision::CopyNeeded),
            ControlFlow::Break(reason) => Ok(Decision::NotNeeded { reason }),
        }
    }

    /// Run every stage. Handles are released on all exit paths; on failure the
    /// last attempted action is reported through the sink.
    pub fn run(&mut self) -> Result<CopyOutcome> {
        let result = self.run_stages();
        if result.is_err() {
            self.sink.warn(&format!("last action: {}", self.last_action));
        }
        result
    }

    fn run_stages(&mut self) -> Result<CopyOutcome> {
        if let ControlFlow::Break(reason) = self.compare_sums()? {
            return Ok(CopyOutcome::Unchanged { reason });
        }
        let reader = self.open_reader()?;
        let writer = self.open_writer()?;
        let bytes = self.stream(reader, writer)?;
        Ok(CopyOutcome::Copied { bytes })
    }

    fn compare_sums(&mut self) -> Result<ControlFlow<Action>> {
        if !self.compare_hash {
            return Ok(ControlFlow::Continue(()));
        }
        self.last_action = Action::CompareSums;
        if self.source.as_os_str() == self.dest.as_os_str() {
            self.last_action = Action::PathsMatch;
            return Ok(ControlFlow::Break(Action::PathsMatch));
        }

        let quiet = crate::sink::NullSink;
        let sink: &dyn Sink = if self.verbose { self.sink } else { &quiet };
        if contents_match(&self.source, &self.dest, self.algorithm, sink)? {
            self.last_action = Action::SumsMatch;
            Ok(ControlFlow::Break(Action::SumsMatch))
        } else {
            self.last_action = Action::SumsDiffer;
            Ok(ControlFlow::Continue(()))
        }
    }

    fn open_reader(&mut self) -> Result<BufReader<File>> {
        self.last_action = Action::OpenReader;
        let file = File::open(&self.source).map_err(|e| Error::io(&self.source, e))?;
        self.sink
            .info(&format!("opened reader for {}", self.source.display()));
        Ok(BufReader::new(file))
    }

    fn open_writer(&mut self) -> Result<BufWriter<Target>> {
        self.last_action = Action::OpenWriter;
        let target = if self.atomic {
            let dir = match self.dest.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            Target::Staged(NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?)
        } else {
            Target::Direct(File::create(&self.dest).map_err(|e| Error::io(&self.dest, e))?)
        };
        self.sink
            .info(&format!("opened writer for {}", self.dest.display()));
        Ok(BufWriter::new(target))
    }

    fn stream(&mut self, mut reader: BufReader<File>, mut writer: BufWriter<Target>) -> Result<u64> {
        let mut buf = [0u8; CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            self.last_action = Action::ReadChunk;
            let n = match reader.read(&mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io(&self.source, e)),
            };
            if n == 0 {
                break;
            }
            self.last_action = Action::WriteChunk;
            writer
                .write_all(&buf[..n])
                .map_err(|e| Error::io(&self.dest, e))?;
            total += n as u64;
            if self.verbose {
                self.sink.debug(&format!(" - buffered: {}", n));
            }
        }

        self.last_action = Action::Flush;
        writer.flush().map_err(|e| Error::io(&self.dest, e))?;
        let target = writer
            .into_inner()
            .map_err(|e| Error::io(&self.dest, e.into_error()))?;
        if let Target::Staged(temp) = target {
            self.last_action = Action::Persist;
            // Temp files are created 0600; keep what a direct write would have.
            let permissions = fs::metadata(&self.dest)
                .or_else(|_| fs::metadata(&self.source))
                .map(|meta| meta.permissions())
                .map_err(|e| Error::io(&self.source, e))?;
            temp.as_file()
                .set_permissions(permissions)
                .map_err(|e| Error::io(temp.path(), e))?;
            temp.persist(&self.dest)?;
        }

        self.last_action = Action::Done;
        Ok(total)
    }
}
