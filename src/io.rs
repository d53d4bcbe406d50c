// File-level differencing helpers.
//
// Convenience wrappers that load a reference/target file pair into memory
// (both inputs must be random-access; streaming is out of scope), run the
// coarse-to-fine driver, and report coverage statistics. SHA-256 digests
// of both files are computed when the `file-io` feature is enabled.

use std::io;
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::diff::{self, DiffOptions};
use crate::engine::DeltaEngine;
use crate::match_list::Match;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by [`diff_files`].
#[derive(Debug, Clone)]
pub struct FileDiffStats {
    /// Reference file size in bytes.
    pub source_size: u64,
    /// Target file size in bytes.
    pub target_size: u64,
    /// Number of matches in the final list.
    pub match_count: usize,
    /// Target bytes covered by matches.
    pub matched_bytes: u64,
    /// Target bytes left for literal encoding.
    pub literal_bytes: u64,
    /// SHA-256 of the reference file (`file-io` feature only).
    pub source_sha256: Option<[u8; 32]>,
    /// SHA-256 of the target file (`file-io` feature only).
    pub target_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file operations.
#[derive(Debug)]
pub enum IoError {
    /// I/O error (file open, read).
    Io(io::Error),
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// diff_files
// ---------------------------------------------------------------------------

/// Diff two files and return the matches plus coverage statistics.
pub fn diff_files(
    source_path: &Path,
    target_path: &Path,
    opts: &DiffOptions,
) -> Result<(Vec<Match>, FileDiffStats), IoError> {
    let source = std::fs::read(source_path)?;
    let target = std::fs::read(target_path)?;

    let engine = diff::diff_matches(source.as_slice(), target.as_slice(), opts);
    let stats = stats_for(&engine, &source, &target);
    let matches = engine.matches().copied().collect();
    Ok((matches, stats))
}

fn stats_for(
    engine: &DeltaEngine<&[u8]>,
    source: &[u8],
    target: &[u8],
) -> FileDiffStats {
    // Count covered target bytes as a union so an uncleaned (overlapping)
    // match list still yields sane numbers.
    let mut matched_bytes = 0u64;
    let mut covered_to = 0usize;
    for m in engine.matches() {
        let end = m.p2 + m.num;
        if end > covered_to {
            matched_bytes += (end - covered_to.max(m.p2)) as u64;
            covered_to = end;
        }
    }
    let literal_bytes = target.len() as u64 - matched_bytes;

    FileDiffStats {
        source_size: source.len() as u64,
        target_size: target.len() as u64,
        match_count: engine.num_matches(),
        matched_bytes,
        literal_bytes,
        source_sha256: digest(source),
        target_sha256: digest(target),
    }
}

#[cfg(feature = "file-io")]
fn digest(data: &[u8]) -> Option<[u8; 32]> {
    let mut hasher = sha2::Sha256::new();
    hasher.update(data);
    Some(hasher.finalize().into())
}

#[cfg(not(feature = "file-io"))]
fn digest(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn diff_files_counts_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let source: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
        let mut target = source.clone();
        target.splice(512..512, [7u8; 20]);

        let src = write_temp(&dir, "source.bin", &source);
        let tgt = write_temp(&dir, "target.bin", &target);

        let (matches, stats) = diff_files(&src, &tgt, &DiffOptions::default()).unwrap();
        assert_eq!(stats.source_size, 1024);
        assert_eq!(stats.target_size, 1044);
        assert_eq!(stats.match_count, matches.len());
        assert_eq!(stats.matched_bytes + stats.literal_bytes, 1044);
        assert!(stats.matched_bytes >= 1000, "stats: {stats:?}");
    }

    #[test]
    fn diff_files_missing_input_errors() {
        let dir = tempfile::tempdir().unwrap();
        let tgt = write_temp(&dir, "target.bin", b"data");
        let missing = dir.path().join("nope.bin");
        let err = diff_files(&missing, &tgt, &DiffOptions::default()).unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
    }

    #[cfg(feature = "file-io")]
    #[test]
    fn diff_files_reports_digests() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_temp(&dir, "a.bin", b"same bytes");
        let tgt = write_temp(&dir, "b.bin", b"same bytes");
        let (_, stats) = diff_files(&src, &tgt, &DiffOptions::default()).unwrap();
        assert_eq!(stats.source_sha256, stats.target_sha256);
        assert!(stats.source_sha256.is_some());
    }
}
