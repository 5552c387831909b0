use std::io;
use std::path::PathBuf;

/// Result of polling a line source once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// One decoded, trimmed line. May be empty.
    Line(String),
    /// The read timeout elapsed before a delimiter arrived.
    Timeout,
    /// The source has no more bytes to offer.
    Eof,
}

/// Common error type for the ingestion pipeline.
///
/// Every variant is fatal to the ingestion loop. Conditions that only affect
/// a single line (bad encoding, no match) are not errors and never show up
/// here.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("source failure: {context}")]
    Source {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("storage failure on {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid grammar pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("schema mismatch: found {found}, expected {expected}")]
    SchemaMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl IngestError {
    pub fn source_failure(context: impl Into<String>, source: io::Error) -> Self {
        IngestError::Source {
            context: context.into(),
            source,
        }
    }

    pub fn storage_failure(path: impl Into<PathBuf>, source: io::Error) -> Self {
        IngestError::Storage {
            path: path.into(),
            source,
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Anything the ingestion loop can poll for device lines.
pub trait LineSource {
    fn next_line(&mut self) -> IngestResult<ReadOutcome>;

    /// Frames dropped as noise so far. Sources that never drop report zero.
    fn discarded_frames(&self) -> usize {
        0
    }
}
