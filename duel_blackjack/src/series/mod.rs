//! Ranked series: nine main games, tiebreakers on a tie, and a single
//! rating adjustment when the series ends.

pub mod accumulator;
pub mod errors;
pub mod models;
pub mod rating;

pub use accumulator::RankedSeries;
pub use errors::{RatingError, RatingResult, SeriesError, SeriesResult};
pub use models::{HudMarker, RankTier, RankedProfile, SeriesGame, SeriesHud, SeriesMarker, SeriesStatus};
pub use rating::{DEFAULT_RATING, InMemoryRatingStore, RatingChange, RatingStore};
