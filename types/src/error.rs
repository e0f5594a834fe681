//! Errors raised while constructing core types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("voter identity must not be empty")]
    EmptyIdentity,

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),
}
