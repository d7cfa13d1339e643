//! Error types for philtrack
//!
//! Every variant carries enough context to point the operator at the
//! offending file or particle.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// philtrack error types
#[derive(Error, Debug)]
pub enum Error {
    /// Linking stage could not produce observations for a file
    #[error("{} was skipped due to:\n{reason}", file.display())]
    Linking {
        /// File that failed to link
        file: PathBuf,
        /// Collaborator-supplied failure message
        reason: String,
    },

    /// Two consecutive observations of a particle are not strictly increasing in frame
    #[error("Frame order violated for particle {particle}: frame {frame} follows frame {previous_frame}\nObservation tables must hold at most one row per particle per frame.")]
    FrameOrder {
        /// Particle identity
        particle: i64,
        /// Frame of the earlier observation
        previous_frame: i64,
        /// Frame of the later observation
        frame: i64,
    },

    /// Invalid input (settings, conditions)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage error (Parquet/Arrow/CSV table shape)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is a per-file linking failure the pipeline skips over
    #[must_use]
    pub const fn is_linking_failure(&self) -> bool {
        matches!(self, Self::Linking { .. })
    }
}
