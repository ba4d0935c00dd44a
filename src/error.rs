//! Error taxonomy for the comparison pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MumbaError {
    /// The requested species has no MUMBA file mapping. Routine: callers
    /// skip the observation overlay and keep going.
    #[error("no MUMBA data for species {0}")]
    NotObserved(String),

    /// The static lookup tables are inconsistent (e.g. a mapped file with
    /// no header-offset entry). Indicates a maintenance bug, fatal.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("only plot types `timeseries` and `map` are implemented, got `{0}`")]
    UnsupportedPlotKind(String),

    #[error("only one or two runs allowed for maps, got {0}")]
    TooManyRuns(usize),

    /// Punch file or metadata file could not be decoded.
    #[error("decode error in {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MumbaError {
    pub fn decode(path: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        MumbaError::Decode {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type for `Result<T, MumbaError>`.
pub type Result<T> = std::result::Result<T, MumbaError>;
