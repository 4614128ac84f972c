// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Image downscaling for uploads.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::{ImageFormat, ImageReader};

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Size tier requested by `upload_image/{compression_type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionTier {
    Xs,
    S,
    M,
    L,
    Original,
}

impl CompressionTier {
    /// Longest-edge bound in pixels, `None` for the untouched original.
    pub fn max_dimension(self) -> Option<u32> {
        match self {
            Self::Xs => Some(40),
            Self::S => Some(120),
            Self::M => Some(240),
            Self::L => Some(720),
            Self::Original => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Xs => "xs",
            Self::S => "s",
            Self::M => "m",
            Self::L => "l",
            Self::Original => "original",
        }
    }
}

impl fmt::Display for CompressionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xs" => Ok(Self::Xs),
            "s" => Ok(Self::S),
            "m" => Ok(Self::M),
            "l" => Ok(Self::L),
            "original" => Ok(Self::Original),
            other => Err(format!("Invalid compression type: {other}")),
        }
    }
}

/// A re-encoded image ready for upload.
#[derive(Debug)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Downscale `bytes` so its longest edge fits `max_dimension`, keeping the
/// aspect ratio and the source format. Smaller images are re-encoded as is.
pub fn compress(bytes: &[u8], max_dimension: u32) -> Result<CompressedImage, CompressionError> {
    let format = image::guess_format(bytes).map_err(|_| CompressionError::UnsupportedFormat)?;
    let decoded = ImageReader::with_format(Cursor::new(bytes), format)
        .decode()
        .map_err(|e| CompressionError::Decode(e.to_string()))?;

    let resized = if decoded.width() > max_dimension || decoded.height() > max_dimension {
        decoded.thumbnail(max_dimension, max_dimension)
    } else {
        decoded
    };

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, format)
        .map_err(|e| CompressionError::Encode(e.to_string()))?;

    Ok(CompressedImage {
        bytes: out.into_inner(),
        content_type: mime_type(format),
    })
}

fn mime_type(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        _ => "application/octet-stream",
    }
}
