//! Named resampling filters used when resizing source pixels into a tile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TileError;

/// Resampling filter for the crop/resize step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Nearest neighbor (preserves exact values).
    Nearest,
    /// Bilinear interpolation.
    Linear,
    /// Catmull-Rom cubic.
    #[default]
    Cubic,
    Gaussian,
    /// Lanczos with window 3 (sharpest, most compute).
    Lanczos3,
}

impl Interpolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Linear => "linear",
            Self::Cubic => "cubic",
            Self::Gaussian => "gaussian",
            Self::Lanczos3 => "lanczos3",
        }
    }
}

impl FromStr for Interpolation {
    type Err = TileError;

    /// Parse from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "linear" | "bilinear" => Ok(Self::Linear),
            "cubic" | "bicubic" => Ok(Self::Cubic),
            "gaussian" => Ok(Self::Gaussian),
            "lanczos3" | "lanczos" => Ok(Self::Lanczos3),
            _ => Err(TileError::UnknownInterpolation(s.to_string())),
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
