//! Error types module
//!
//! Every failure in the thumbnail pipeline is classified into one of four
//! [`ErrorKind`]s. Crate-level error enums (storage, bus, cache, metadata, generator)
//! expose a `kind()` method so the worker can build a [`PipelineError`] without
//! knowing the concrete backend.

use std::fmt::{Display, Formatter, Result as FmtResult};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure classification used to decide how a message is settled and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A blob or metadata record is absent. Redelivery is not expected to help.
    NotFound,
    /// Network or backend unavailability. Redelivery is appropriate.
    Transient,
    /// Malformed payload, unsupported media kind and similar. Redelivery will not help.
    Permanent,
    /// Zero or several storage variants configured for an event.
    Configuration,
}

impl ErrorKind {
    /// Whether retrying the same unit of work may succeed.
    pub fn is_recoverable(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Transient => write!(f, "transient"),
            ErrorKind::Permanent => write!(f, "permanent"),
            ErrorKind::Configuration => write!(f, "configuration"),
        }
    }
}

/// States a "new media" message moves through while it is processed.
///
/// `Acked` and `Nakked` are terminal. A [`PipelineError`] records the last
/// non-terminal state reached before the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    MetadataFetched,
    Generated,
    Stored,
    Persisted,
    NotificationSent,
    Acked,
    Nakked,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Acked | PipelineState::Nakked)
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PipelineState::Received => write!(f, "received"),
            PipelineState::MetadataFetched => write!(f, "metadata_fetched"),
            PipelineState::Generated => write!(f, "generated"),
            PipelineState::Stored => write!(f, "stored"),
            PipelineState::Persisted => write!(f, "persisted"),
            PipelineState::NotificationSent => write!(f, "notification_sent"),
            PipelineState::Acked => write!(f, "acked"),
            PipelineState::Nakked => write!(f, "nakked"),
        }
    }
}

/// A classified pipeline failure.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error after {state}: {message}")]
pub struct PipelineError {
    kind: ErrorKind,
    state: PipelineState,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            state: PipelineState::Received,
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permanent, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Record the last state reached before the failure.
    pub fn at(mut self, state: PipelineState) -> Self {
        self.state = state;
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn only_transient_errors_are_recoverable() {
        assert!(ErrorKind::Transient.is_recoverable());
        assert!(!ErrorKind::NotFound.is_recoverable());
        assert!(!ErrorKind::Permanent.is_recoverable());
        assert!(!ErrorKind::Configuration.is_recoverable());
    }

    #[test]
    fn display_includes_kind_state_and_message() {
        let err = PipelineError::transient("imagor unavailable").at(PipelineState::MetadataFetched);
        assert_eq!(
            err.to_string(),
            "transient error after metadata_fetched: imagor unavailable"
        );
    }

    #[test]
    fn source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = PipelineError::transient("storing thumbnail").with_source(io);
        assert_eq!(err.source().unwrap().to_string(), "disk full");
    }

    #[test]
    fn terminal_states() {
        assert!(PipelineState::Acked.is_terminal());
        assert!(PipelineState::Nakked.is_terminal());
        assert!(!PipelineState::Persisted.is_terminal());
    }
}
