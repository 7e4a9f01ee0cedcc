//! Error types for loading autoscaler manifests.

use thiserror::Error;

/// Result type alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors that can occur while reading or validating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid manifest: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
