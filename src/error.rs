//! Error types for bundle recognition.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the geometry, clustering, transform and recognition stages
/// and by the file collaborators around them.
#[derive(Error, Debug)]
pub enum RecoError {
    #[error("degenerate streamline: {nb_points} points, length {length}")]
    DegenerateStreamline { nb_points: usize, length: f64 },

    #[error("cannot resample to {nb_points} points, at least 2 are required")]
    InvalidResolution { nb_points: usize },

    #[error("affine matrix is singular and cannot be inverted")]
    SingularMatrix,

    #[error("invalid {name} threshold: {value}")]
    ThresholdConfiguration { name: &'static str, value: f64 },

    #[error("malformed cluster map: {0}")]
    CacheFormat(String),

    #[error("inconsistent cluster map: {0}")]
    InvalidClusterMap(String),

    #[error("attribute '{name}' has {found} entries, expected {expected}")]
    AttributeLength {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("streamline index {index} out of range for {len} streamlines")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unsupported tractogram format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("malformed affine: {0}")]
    AffineFormat(String),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RecoError>;
