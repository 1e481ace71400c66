//! Series and rating error types.

use thiserror::Error;
use uuid::Uuid;

use crate::game::entities::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("series already finished")]
    AlreadyFinished,

    #[error("player {0} is not part of this series")]
    UnknownPlayer(PlayerId),
}

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("series {0} was already applied")]
    DuplicateApplication(Uuid),

    #[error("series {0} is still in progress")]
    SeriesInProgress(Uuid),

    #[error("rating store unavailable: {0}")]
    Unavailable(String),
}

pub type SeriesResult<T> = Result<T, SeriesError>;
pub type RatingResult<T> = Result<T, RatingError>;
