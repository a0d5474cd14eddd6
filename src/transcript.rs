//! Per-turn transcript persistence

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Writes a human-readable record of one exchange
pub trait TranscriptSink: Send + Sync {
    /// Persist one prompt/reply pair keyed by the turn's timestamp
    ///
    /// # Errors
    ///
    /// Returns `Error::Transcript` if the record cannot be written
    fn persist(&self, prompt: &str, reply: &str, stamp: &str) -> Result<()>;
}

/// Flat-file transcript writer: one `{stamp}-transcript.txt` per turn
pub struct FileTranscript {
    dir: PathBuf,
}

impl FileTranscript {
    /// Create a writer targeting `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the record for a given turn timestamp
    #[must_use]
    pub fn record_path(&self, stamp: &str) -> PathBuf {
        self.dir.join(format!("{stamp}-transcript.txt"))
    }
}

impl TranscriptSink for FileTranscript {
    fn persist(&self, prompt: &str, reply: &str, stamp: &str) -> Result<()> {
        let path = self.record_path(stamp);
        let contents = format!("Original Prompt: {prompt}\n\n{reply}");
        write_record(&path, &contents)?;
        tracing::debug!(path = %path.display(), "transcript written");
        Ok(())
    }
}

fn write_record(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .map_err(|e| Error::Transcript(format!("failed to write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_record_in_legacy_format() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileTranscript::new(dir.path());

        sink.persist("Who won in 1066?", "The Normans did.", "20250101-120000")
            .unwrap();

        let written =
            std::fs::read_to_string(dir.path().join("20250101-120000-transcript.txt")).unwrap();
        assert_eq!(written, "Original Prompt: Who won in 1066?\n\nThe Normans did.");
    }

    #[test]
    fn missing_directory_is_a_transcript_error() {
        let sink = FileTranscript::new("/nonexistent/transcripts");
        let err = sink.persist("p", "r", "stamp").unwrap_err();
        assert!(matches!(err, Error::Transcript(_)));
    }
}
