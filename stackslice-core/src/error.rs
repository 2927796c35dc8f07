//! Error types for stackslice-core.

use thiserror::Error;

/// Result type alias for stackslice operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for stackslice operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Channel or grid dimensions do not match the supplied data.
    #[error("invalid dimensions: {width}x{height} does not hold {len} values")]
    InvalidDimensions {
        width: usize,
        height: usize,
        len: usize,
    },

    /// A sample position falls outside the channel.
    #[error("position ({x:.3}, {y:.3}) is outside the {width}x{height} channel")]
    OutOfBounds {
        x: f64,
        y: f64,
        width: usize,
        height: usize,
    },

    /// A profile does not have the number of samples the grid expects.
    #[error("profile has {actual} samples, grid expects {expected}")]
    ProfileLengthMismatch { expected: usize, actual: usize },

    /// Degenerate line geometry.
    #[error("invalid profile path: {0}")]
    InvalidPath(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
