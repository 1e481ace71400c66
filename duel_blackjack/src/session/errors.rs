//! Session error types.

use thiserror::Error;

use crate::game::{MatchError, MatchId};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("match {0} not found")]
    MatchNotFound(MatchId),

    #[error("match is closed")]
    MatchClosed,

    #[error(transparent)]
    Rejected(#[from] MatchError),
}

pub type SessionResult<T> = Result<T, SessionError>;
