//! Error types for tile geometry and numbering.

use thiserror::Error;

/// Result type alias using TileError.
pub type TileResult<T> = Result<T, TileError>;

/// Errors raised while constructing coordinates, addresses and tiles.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileError {
    /// Non-square tile size, or a coordinate pair that does not resolve
    /// to exactly one tile address.
    #[error("Invalid tile geometry: {0}")]
    Geometry(String),

    /// A numeric argument outside its valid range (band count, zoom,
    /// tile index).
    #[error("Value out of range: {0}")]
    Range(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Unknown tile extension: {0}")]
    UnknownExtension(String),

    #[error("Unknown interpolation: {0}")]
    UnknownInterpolation(String),
}

impl TileError {
    /// Create a Geometry error.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Create a Range error.
    pub fn range(msg: impl Into<String>) -> Self {
        Self::Range(msg.into())
    }
}
