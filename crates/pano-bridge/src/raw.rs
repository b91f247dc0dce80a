//! C layout of the record returned by the native stitch call.

use std::os::raw::{c_char, c_int};

/// Status code the engine uses for success, both in
/// [`RawStitchResult::success`] and as the return of config initialisation.
pub const SUCCESS_CODE: c_int = 1;

/// Stitching result as allocated by the native engine.
///
/// Field order and types match the engine's C header. The record and
/// everything it points to belong to the engine until released with the
/// paired free call.
#[repr(C)]
#[derive(Debug)]
pub struct RawStitchResult {
    /// Interleaved 8-bit pixel data, `width * height * channels` bytes
    pub data: *mut u8,
    pub width: c_int,
    pub height: c_int,
    /// Components per pixel (3 for RGB)
    pub channels: c_int,
    /// 1 for success, 0 for failure
    pub success: c_int,
    /// Failure reason, or a warning when `success` is 1. May be null.
    pub error_message: *mut c_char,
}

impl RawStitchResult {
    #[inline]
    pub fn succeeded(&self) -> bool {
        self.success == SUCCESS_CODE
    }
}
