//! Content equality between two files.

use crate::error::Result;
use crate::hash::{Algorithm, Digest};
use crate::sink::Sink;
use std::path::Path;

/// Decide whether `source` and `dest` hold identical contents.
///
/// Textually identical paths match without touching the filesystem, even if
/// the file does not exist. No normalization is applied: `a/./b` and `a/b`
/// are different paths here. A failure hashing `source` is returned as the
/// error and `dest` is not hashed. A failure hashing `dest` (missing or
/// unreadable) counts as "no match": an absent backup is the normal first-run
/// state.
pub fn contents_match(
    source: &Path,
    dest: &Path,
    algorithm: Algorithm,
    sink: &dyn Sink,
) -> Result<bool> {
    if source.as_os_str() == dest.as_os_str() {
        return Ok(true);
    }

    let source_digest = Digest::hash_file(algorithm, source)?;
    sink.debug(&format!("read file sum: {}", source_digest));

    let dest_digest = match Digest::hash_file(algorithm, dest) {
        Ok(digest) => digest,
        Err(e) => {
            sink.debug(&format!("write file sum unavailable: {}", e));
            return Ok(false);
        }
    };
    sink.debug(&format!("write file sum: {}", dest_digest));

    Ok(source_digest == dest_digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sink::{MemorySink, NullSink};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_same_path_matches_without_hashing() {
        let temp_dir = TempDir::new().unwrap();
        let ghost = temp_dir.path().join("does-not-exist");
        let sink = MemorySink::new();

        assert!(contents_match(&ghost, &ghost, Algorithm::Sha256, &sink).unwrap());
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_paths_are_not_normalized() {
        let temp_dir = TempDir::new().unwrap();
        let plain = temp_dir.path().join("ghost");
        let dotted = temp_dir.path().join(".").join("ghost");
        assert_ne!(plain.as_os_str(), dotted.as_os_str());

        let err = contents_match(&plain, &dotted, Algorithm::Sha256, &NullSink).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_identical_contents_match() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        fs::write(&a, b"same").unwrap();
        fs::write(&b, b"same").unwrap();

        assert!(contents_match(&a, &b, Algorithm::Sha256, &NullSink).unwrap());
    }

    #[test]
    fn test_different_contents_do_not_match() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        fs::write(&a, b"A").unwrap();
        fs::write(&b, b"B").unwrap();

        assert!(!contents_match(&a, &b, Algorithm::Blake3, &NullSink).unwrap());
    }

    #[test]
    fn test_missing_dest_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        fs::write(&a, b"A").unwrap();
        let sink = MemorySink::new();

        let matched =
            contents_match(&a, &temp_dir.path().join("a.1"), Algorithm::Sha256, &sink).unwrap();
        assert!(!matched);
        assert!(sink.contains("write file sum unavailable"));
    }

    #[test]
    fn test_missing_source_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let b = temp_dir.path().join("b");
        fs::write(&b, b"B").unwrap();

        let err = contents_match(&temp_dir.path().join("a"), &b, Algorithm::Sha256, &NullSink)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
