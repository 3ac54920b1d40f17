//! Error types for platepack.

use thiserror::Error;

/// Result type alias for geometry kernel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the geometry kernel.
///
/// The arrangement layer recovers from every variant locally; none of them
/// escapes `arrange`.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid geometry provided.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Geometry collapsed to zero area or fewer than three distinct vertices.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Bed outline could not be interpreted as the requested bin kind.
    #[error("Invalid bed: {0}")]
    InvalidBed(String),

    /// Rotation search did not produce a usable angle.
    #[error("Rotation search failed: {0}")]
    RotationFailed(String),

    /// Computation cancelled.
    #[error("Computation cancelled")]
    Cancelled,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
