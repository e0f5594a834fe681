use ballot_types::SessionId;
use thiserror::Error;

/// Every way a registry call can be refused.
///
/// All variants are caller-correctable precondition failures; a refused call
/// never leaves partial state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("at least 2 candidates are required, got {count}")]
    InsufficientCandidates { count: usize },

    #[error("session duration must be a positive number of seconds that fits the clock range")]
    InvalidDuration,

    #[error("candidate {0:?} is listed more than once")]
    DuplicateCandidate(String),

    #[error("session is not active")]
    SessionNotActive,

    #[error("session voting window has ended")]
    SessionEnded,

    #[error("voter {0} has already voted in this session")]
    AlreadyVoted(String),

    #[error("candidate index {index} is out of range for {candidates} candidates")]
    InvalidCandidateIndex { index: usize, candidates: usize },

    #[error("session {0} does not exist")]
    UnknownSession(SessionId),

    #[error("session has already been finalized")]
    AlreadyFinalized,

    #[error("session voting window is still open")]
    SessionStillActive,

    #[error("results are not available until the session is finalized")]
    ResultsNotReady,

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl RegistryError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientCandidates { .. } => "InsufficientCandidates",
            Self::InvalidDuration => "InvalidDuration",
            Self::DuplicateCandidate(_) => "DuplicateCandidate",
            Self::SessionNotActive => "SessionNotActive",
            Self::SessionEnded => "SessionEnded",
            Self::AlreadyVoted(_) => "AlreadyVoted",
            Self::InvalidCandidateIndex { .. } => "InvalidCandidateIndex",
            Self::UnknownSession(_) => "UnknownSession",
            Self::AlreadyFinalized => "AlreadyFinalized",
            Self::SessionStillActive => "SessionStillActive",
            Self::ResultsNotReady => "ResultsNotReady",
            Self::Snapshot(_) => "Snapshot",
        }
    }
}
