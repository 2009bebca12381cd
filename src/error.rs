//! Error types for configuration and stream reading.
//!
//! Configuration conflicts are rejected at construction time, before any
//! I/O. Read errors distinguish stream-fatal conditions (the stream can no
//! longer be read) from per-record conditions (the record is rejected but
//! the stream remains readable). Field-level and record-level structural
//! problems are not errors at this layer; they are recorded on the
//! [`RecordContext`](crate::RecordContext) so the rest of the record can
//! still be inspected.

use thiserror::Error;

/// Rejected reader/writer configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The escape character matches the field delimiter.
    #[error("escape character cannot match the field delimiter")]
    EscapeMatchesDelimiter,

    /// The line continuation character matches the field delimiter.
    #[error("line continuation character cannot match the field delimiter")]
    ContinuationMatchesDelimiter,

    /// The line continuation character matches the record terminator.
    #[error("line continuation character cannot match the record terminator")]
    ContinuationMatchesTerminator,

    /// The record terminator matches the field delimiter.
    #[error("record terminator cannot match the field delimiter")]
    TerminatorMatchesDelimiter,

    /// The quote character matches the field delimiter.
    #[error("quote character cannot match the field delimiter")]
    QuoteMatchesDelimiter,
}

/// Failure while pulling records from a character stream.
#[derive(Debug, Error)]
pub enum ReadError {
    /// An I/O error from the underlying stream, including invalid UTF-8.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The stream ended directly after an unconsumed line continuation.
    ///
    /// This is stream-fatal: subsequent reads report end-of-stream.
    #[error("unexpected end of stream after line continuation at line {line}")]
    UnterminatedContinuation { line: usize },

    /// A structurally malformed record. The rest of the line is discarded
    /// and the stream remains readable.
    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// `reset` was called after the marked lookahead window was exceeded.
    #[error("mark window of {limit} characters exceeded")]
    MarkExceeded { limit: usize },
}

impl ReadError {
    /// Whether the stream can still yield records after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ReadError::Malformed { .. })
    }
}
