//! Output image formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TileError;

/// Encoded image format of a finished tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileExtension {
    #[default]
    Png,
    Jpg,
    Webp,
}

impl TileExtension {
    /// File extension without the leading dot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
        }
    }

    /// Whether the encoded format can carry an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, Self::Jpg)
    }
}

impl FromStr for TileExtension {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "webp" => Ok(Self::Webp),
            _ => Err(TileError::UnknownExtension(s.to_string())),
        }
    }
}

impl fmt::Display for TileExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
