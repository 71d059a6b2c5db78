use thiserror::Error;

/// Failures raised by a [`MediaBackend`](crate::media::MediaBackend) or one of
/// its handles.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MediaError {
    /// Start refused because no user gesture has been seen yet.
    #[error("playback not allowed before a user gesture")]
    NotAllowed,
    /// The source path does not resolve to a playable resource.
    #[error("audio source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Errors returned by engine operations.
///
/// None of these are fatal; the core loop logs them and carries on.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TunerError {
    #[error("no station at index {0}")]
    UnknownStation(usize),
    #[error("station {0} has no audio source")]
    MissingSource(usize),
    #[error("no card player with id {0:?}")]
    UnknownPlayer(String),
    #[error("no station carries a choice gate")]
    NoGatedStation,
    #[error("frequency {0} is not on the narrative dial")]
    UnknownFrequency(f64),
    #[error(transparent)]
    Media(#[from] MediaError),
}
