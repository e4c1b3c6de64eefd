//! Error types for the ACGAN crate

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by libtorch
    #[error("Torch error: {0}")]
    Tch(#[from] tch::TchError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Network error
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Progress bar template error
    #[error("Progress template error: {0}")]
    Template(#[from] indicatif::style::TemplateError),

    /// Malformed IDX file
    #[error("Invalid IDX file {path}: {reason}")]
    InvalidIdx { path: PathBuf, reason: String },

    /// Dataset content is inconsistent or unusable
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Samples cannot be laid out as the requested grid
    #[error("Render error: {0}")]
    Render(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No checkpoint at the requested location
    #[error("No checkpoint found in {0}")]
    CheckpointNotFound(PathBuf),
}

impl Error {
    pub(crate) fn invalid_idx(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidIdx {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
