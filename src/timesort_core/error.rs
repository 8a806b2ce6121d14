use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimesortError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to place {source_path} at {destination}: {error}")]
    PlacementFailed {
        source_path: PathBuf,
        destination: PathBuf,
        error: std::io::Error,
    },

    // Filesystem errors
    #[error("Directory walker error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    // Ledger errors
    #[error("Ledger serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Metadata errors
    #[error("Failed to extract metadata from {path}: {reason}")]
    MetadataExtraction { path: PathBuf, reason: String },

    #[error("Video probe failed for {path}: {reason}")]
    VideoProbe { path: PathBuf, reason: String },

    #[error("Date parsing error: {0}")]
    InvalidDateFormat(String),

    #[error("Date formatting error: {0}")]
    DateFormat(#[from] time::error::Format),

    // Location errors
    #[error("Reverse geocoding failed: {0}")]
    Geocoding(String),

    // User interaction
    #[error("Operation cancelled by user")]
    Cancelled,
}

/// Result type for timesort operations.
pub type Result<T> = std::result::Result<T, TimesortError>;
