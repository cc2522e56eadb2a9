//! Error types for the geocoding engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a normalization run.
///
/// Per-row resolution problems (no match, partial match, excluded feature
/// types) are never represented here; they are logged and the row is left
/// partially filled.
#[derive(Debug, Error)]
pub enum GeoError {
    // === Configuration / input errors ===
    /// Invalid user input or configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to read or write a file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse or write a delimited file.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to parse a TOML configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Malformed JSON in a remote response or a cached column.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A synonym rule could not be compiled.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Static reference data is missing a column or holds an unusable value.
    #[error("reference data error in {path}: {message}")]
    ReferenceData { path: PathBuf, message: String },

    // === Cache errors ===
    /// The feature cache could not be opened, read or written.
    #[error("feature cache error: {0}")]
    Storage(#[from] rusqlite::Error),

    // === Remote service errors ===
    /// The gazetteer service answered with a non-success status.
    #[error("remote service error: HTTP {status} for {url}")]
    RemoteService { status: u16, url: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    // === Feature validation errors ===
    /// A provider record could not be mapped onto a canonical feature.
    #[error("invalid feature: {0}")]
    InvalidFeature(String),

    /// A feature identifier does not follow the `<N|W|R><digits>` shape.
    #[error("invalid feature id: {0}")]
    InvalidFeatureId(String),
}

impl GeoError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GeoError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoError>;
