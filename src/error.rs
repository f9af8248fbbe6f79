//! Error type surfaced by the [`Wacz`](crate::Wacz) pipeline.
//!
//! Every failure carries the [`Stage`] it happened in and a short, human-readable
//! message. The lower-level cause is kept as `source` (and logged at trace level)
//! but never formatted into the primary message.

use std::fmt;

/// Result alias for pipeline operations.
pub type WaczResult<T> = Result<T, WaczError>;

/// Broad failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing options, detected before any output is written.
    Config,
    /// A capture file could not be read or parsed.
    Indexing,
    /// Something went wrong while writing the container.
    Assembly,
    /// The signing endpoint failed or returned an unusable envelope.
    Signing,
    /// The pipeline was driven out of order or reused.
    Misuse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Config => "configuration error",
            ErrorKind::Indexing => "indexing error",
            ErrorKind::Assembly => "assembly error",
            ErrorKind::Signing => "signing error",
            ErrorKind::Misuse => "misuse",
        };
        f.write_str(label)
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Configuring,
    Ready,
    Indexing,
    Harvesting,
    WritingIndex,
    WritingPages,
    WritingCaptures,
    WritingManifest,
    WritingDigest,
    Finalizing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Configuring => "validating options",
            Stage::Ready => "preparing the archive",
            Stage::Indexing => "indexing WARC files",
            Stage::Harvesting => "sorting index and pages",
            Stage::WritingIndex => "generating indexes/index.cdx.gz and indexes/index.idx",
            Stage::WritingPages => "generating pages/pages.jsonl",
            Stage::WritingCaptures => "storing WARC files",
            Stage::WritingManifest => "generating datapackage.json",
            Stage::WritingDigest => "generating datapackage-digest.json",
            Stage::Finalizing => "finalizing the archive",
            Stage::Done => "done",
        };
        f.write_str(label)
    }
}

/// Typed pipeline error.
#[derive(Debug, thiserror::Error)]
#[error("{kind} while {stage}: {message}")]
pub struct WaczError {
    pub kind: ErrorKind,
    pub stage: Stage,
    pub message: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl WaczError {
    pub fn new(kind: ErrorKind, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
            source: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, Stage::Configuring, message)
    }

    pub fn misuse(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Misuse, stage, message)
    }

    /// Wrap a lower-level cause. The cause is logged at trace level only.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        tracing::trace!(kind = %self.kind, stage = %self.stage, error = ?source, "underlying cause");
        self.source = Some(source);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}
