//! Caller-owned stitching results.

use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use serde::Serialize;

use crate::error::{Result, StitchError};

/// A panorama copied out of the engine into caller-owned memory.
///
/// Only successful stitches produce a `StitchResult`; failures are the `Err`
/// arm of [`crate::Result`]. A success can still carry a warning from the
/// engine (for example, the output file could not be written).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchResult {
    /// Interleaved 8-bit pixels, row-major
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Components per pixel
    pub channels: u32,
    /// Non-fatal message reported alongside a success
    pub warning: Option<String>,
}

/// How a successful stitch finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<'a> {
    Clean,
    Warning(&'a str),
}

impl StitchResult {
    /// `width * height * channels`, the size the engine declared.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    pub fn outcome(&self) -> Outcome<'_> {
        match self.warning.as_deref() {
            Some(w) => Outcome::Warning(w),
            None => Outcome::Clean,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warning.is_none()
    }

    /// View the buffer as an image. Supports 1, 3 and 4 channels.
    pub fn to_image(&self) -> Result<DynamicImage> {
        if self.data.len() != self.expected_len() {
            return Err(StitchError::BufferMismatch {
                expected: self.expected_len(),
                actual: self.data.len(),
            });
        }

        let (w, h, data) = (self.width, self.height, self.data.clone());
        let image = match self.channels {
            1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
            other => return Err(StitchError::UnsupportedChannels(other)),
        };

        image.ok_or(StitchError::BufferMismatch {
            expected: self.expected_len(),
            actual: self.data.len(),
        })
    }

    /// Encode the buffer to `path`; the format follows the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_image()?.save(path)?;
        Ok(())
    }

    pub fn summary(&self, output_path: Option<&Path>) -> StitchSummary {
        StitchSummary {
            width: self.width,
            height: self.height,
            channels: self.channels,
            bytes: self.data.len(),
            warning: self.warning.clone(),
            output_path: output_path.map(|p| p.display().to_string()),
        }
    }
}

/// Machine-readable description of a finished stitch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StitchSummary {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}
