//! Error types shared across the guide.
//!
//! [`GuideError`] covers catalog loading, persistence and rejected state
//! transitions. [`LocationError`] is the closed set of ways a location request
//! can fail; it is never shown to the user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuideError {
    /// The resolver or the state machine was handed no cities at all.
    /// This is a data error in the bundled catalog, not a runtime condition.
    #[error("city catalog is empty")]
    EmptyCatalog,

    #[error("unknown city '{0}'")]
    UnknownCity(String),

    #[error("dish '{0}' is not part of the current list")]
    DishNotListed(String),

    #[error("city selector is not open")]
    SelectorClosed,

    #[error("coordinate out of range: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("duplicate city id or slug '{0}'")]
    DuplicateCity(String),

    #[error("duplicate rank {rank} in city '{city_id}'")]
    DuplicateRank { city_id: String, rank: u32 },

    #[error("city table: {0}")]
    Csv(#[from] csv::Error),

    #[error("dish table: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("selection store: {0}")]
    Storage(#[from] rusqlite::Error),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    #[error("location unavailable")]
    Unavailable,
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location request timed out")]
    Timeout,
}
