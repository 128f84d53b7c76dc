//! Error types shared across reference parsing, remote content access and
//! post-processing.
//!
//! Application glue (CLI handlers, config, keyring) uses `anyhow`; these typed
//! errors exist where callers need to branch on the failure kind, e.g. turning
//! `SourceError::Unavailable` into a skip rather than a failure.

use thiserror::Error;

/// A reference string that could not be turned into a typed id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse \"{reference}\": {reason}")]
pub struct ParseError {
    pub reference: String,
    pub reason: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("expected a content type followed by an id")]
    TooFewSegments,

    #[error("unsupported content type \"{0}\"")]
    UnknownKind(String),

    #[error("id is empty")]
    EmptyId,
}

impl ParseError {
    pub fn new(reference: &str, reason: ParseErrorKind) -> Self {
        Self {
            reference: reference.to_string(),
            reason,
        }
    }
}

/// Failure reported by the remote content service
#[derive(Debug, Error)]
pub enum SourceError {
    /// The service has no such content (retired, region-blocked, removed)
    #[error("content unavailable")]
    Unavailable,

    /// An optional resource (lyrics, artwork) does not exist for this item
    #[error("not found")]
    NotFound,

    /// The session was rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network or server fault; the same request may succeed later
    #[error("request failed: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Transient(err.to_string())
    }
}

/// Failure of the external audio converter
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("converter exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("I/O error while transcoding: {0}")]
    Io(#[from] std::io::Error),
}
