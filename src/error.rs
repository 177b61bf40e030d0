/// Error types for the lens catalog
///
/// Every fallible operation in the crate returns `Result<T>`.
/// Per-image failures in the apply and import flows are captured into
/// reports instead of being propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, LensError>;

#[derive(Error, Debug)]
pub enum LensError {
    /// SQLite catalog query failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Settings or exiftool output could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The exiftool process could not be started
    #[error("Failed to launch {program}: {source}")]
    ToolLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// exiftool ran but its output was unusable
    #[error("exiftool failed on {path}: {message}")]
    ToolOutput { path: PathBuf, message: String },

    /// No image with this id in the catalog
    #[error("Image {0} not found in catalog")]
    ImageNotFound(i64),

    /// A lookup table was declared with the same key twice
    #[error("Duplicate key in {table}: {key}")]
    DuplicateKey { table: &'static str, key: String },

    /// A lens preset carries a value that is not a number
    #[error("Invalid {field} for preset '{preset}': {value}")]
    InvalidPreset {
        preset: String,
        field: &'static str,
        value: String,
    },

    /// The process-wide event table was used before `events::init()`
    #[error("Event dispatch has not been initialized")]
    DispatchNotInitialized,
}
