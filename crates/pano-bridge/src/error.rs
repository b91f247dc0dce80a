//! Error types for the stitching bridge.

use pano_ffi_common::MarshalError;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, StitchError>;

/// Message used when the engine fails without saying why.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Errors surfaced to callers of the bridge.
///
/// None of these are retried by the bridge.
#[derive(Debug, Error)]
pub enum StitchError {
    /// Native configuration initialisation reported failure
    #[error(
        "failed to initialize stitcher configuration ({})",
        .path.as_deref().unwrap_or("engine default")
    )]
    ConfigInitFailed { path: Option<String> },

    /// Fewer than two images; no native call was made
    #[error("need at least two images to stitch, got {count}")]
    InsufficientImages { count: usize },

    /// More images than the native count type can express
    #[error("too many images for one stitch call: {count}")]
    TooManyImages { count: usize },

    /// An image path could not be marshalled; no native call was made
    #[error("invalid image path: {0}")]
    InvalidImagePath(#[source] MarshalError),

    /// The output path could not be marshalled; no native call was made
    #[error("invalid output path: {0}")]
    InvalidOutputPath(#[source] MarshalError),

    /// The engine completed the call but reported failure
    #[error("stitching failed: {0}")]
    StitchFailed(String),

    /// The engine returned no record at all
    #[error("native engine returned no result")]
    NullRecord,

    /// The record's dimensions cannot describe a buffer
    #[error("native engine reported invalid dimensions {width}x{height}x{channels}")]
    InvalidDimensions {
        width: i64,
        height: i64,
        channels: i64,
    },

    /// Pixel buffer length disagrees with the dimensions
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },

    /// No image layout for this channel count
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u32),

    /// Encoding the panorama failed
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The blocking worker running the native call did not complete
    #[cfg(feature = "tokio")]
    #[error("stitch worker failed: {0}")]
    Worker(String),
}

impl StitchError {
    /// Failures detected before the engine was ever called.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::InsufficientImages { .. }
                | Self::TooManyImages { .. }
                | Self::InvalidImagePath(_)
                | Self::InvalidOutputPath(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pano_ffi_common::MarshalErrorKind;

    #[test]
    fn test_config_init_message_names_source() {
        let err = StitchError::ConfigInitFailed {
            path: Some("config.cfg".into()),
        };
        assert_eq!(
            err.to_string(),
            "failed to initialize stitcher configuration (config.cfg)"
        );

        let err = StitchError::ConfigInitFailed { path: None };
        assert_eq!(
            err.to_string(),
            "failed to initialize stitcher configuration (engine default)"
        );
    }

    #[test]
    fn test_stitch_failed_carries_message_verbatim() {
        let err = StitchError::StitchFailed("overlap not found".into());
        assert_eq!(err.to_string(), "stitching failed: overlap not found");
    }

    #[test]
    fn test_precondition_classification() {
        assert!(StitchError::InsufficientImages { count: 1 }.is_precondition());
        assert!(StitchError::InvalidImagePath(MarshalError {
            index: 0,
            kind: MarshalErrorKind::InteriorNul(0),
        })
        .is_precondition());
        assert!(!StitchError::NullRecord.is_precondition());
        assert!(!StitchError::StitchFailed(UNKNOWN_ERROR.into()).is_precondition());
    }
}
