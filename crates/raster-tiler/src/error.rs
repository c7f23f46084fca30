//! Error types for tile generation.

use std::path::Path;

use thiserror::Error;
use tile_common::TileError;

/// Errors that can occur while cutting a raster into tiles.
#[derive(Error, Debug)]
pub enum TilerError {
    /// The source raster could not be opened or decoded.
    #[error("input error: {0}")]
    Input(String),

    /// Invalid tile geometry or numbering.
    #[error(transparent)]
    Tile(#[from] TileError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A tile payload did not pass validation.
    #[error("tile validation failed: {0}")]
    Validation(String),

    /// Missing or unsupported georeference.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// Crop, resize or encode failure.
    #[error("imaging error: {0}")]
    Imaging(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The receiving end of a tile queue was dropped.
    #[error("tile queue closed")]
    QueueClosed,

    /// Generation was cancelled.
    #[error("tile generation cancelled")]
    Cancelled,

    /// A worker failed outside of tile processing.
    #[error("worker error: {0}")]
    Worker(String),
}

impl TilerError {
    /// Create an Input error.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a Metadata error.
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Create an Imaging error.
    pub fn imaging(msg: impl Into<String>) -> Self {
        Self::Imaging(msg.into())
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io_at(path: &Path, err: std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.display(), err),
        ))
    }
}

impl From<image::ImageError> for TilerError {
    fn from(err: image::ImageError) -> Self {
        Self::Imaging(err.to_string())
    }
}

impl From<tiff::TiffError> for TilerError {
    fn from(err: tiff::TiffError) -> Self {
        Self::Metadata(err.to_string())
    }
}

/// Result type for tiler operations.
pub type TilerResult<T> = std::result::Result<T, TilerError>;
