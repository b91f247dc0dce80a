//! Copying a native record into a [`StitchResult`].

use std::os::raw::c_int;
use std::slice;

use pano_ffi_common::cstr_to_string_lossy;
use tracing::{debug, warn};

use crate::error::{Result, StitchError, UNKNOWN_ERROR};
use crate::raw::RawStitchResult;
use crate::result::StitchResult;

/// Copy everything the caller needs out of `raw`.
///
/// The pixel count comes from the record's own dimensions, never from the
/// request. On failure the buffer is not read at all.
///
/// # Safety
/// `raw` must be a live record from the engine: `error_message` null or
/// NUL-terminated, `data` null or valid for `width * height * channels`
/// bytes whenever `success` is set.
pub unsafe fn translate(raw: &RawStitchResult) -> Result<StitchResult> {
    let message = unsafe { cstr_to_string_lossy(raw.error_message) }.filter(|m| !m.is_empty());

    if !raw.succeeded() {
        return Err(StitchError::StitchFailed(
            message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        ));
    }

    let (width, height, channels) = dimensions(raw)?;
    let len = byte_len(width, height, channels).ok_or_else(|| invalid(raw))?;

    let data = if raw.data.is_null() {
        debug!(width, height, channels, "record has no pixel buffer");
        Vec::new()
    } else if len == 0 {
        Vec::new()
    } else {
        unsafe { slice::from_raw_parts(raw.data, len) }.to_vec()
    };

    if let Some(ref w) = message {
        warn!(warning = %w, "stitch succeeded with warning");
    }

    Ok(StitchResult {
        data,
        width,
        height,
        channels,
        warning: message,
    })
}

fn dimensions(raw: &RawStitchResult) -> Result<(u32, u32, u32)> {
    let to_u32 = |v: c_int| u32::try_from(v).ok();
    match (to_u32(raw.width), to_u32(raw.height), to_u32(raw.channels)) {
        (Some(w), Some(h), Some(c)) => Ok((w, h, c)),
        _ => Err(invalid(raw)),
    }
}

fn byte_len(width: u32, height: u32, channels: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(channels as usize)
}

fn invalid(raw: &RawStitchResult) -> StitchError {
    StitchError::InvalidDimensions {
        width: raw.width.into(),
        height: raw.height.into(),
        channels: raw.channels.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::SUCCESS_CODE;
    use pretty_assertions::assert_eq;
    use std::ffi::CString;
    use std::ptr;

    fn record(data: &mut [u8], w: c_int, h: c_int, c: c_int) -> RawStitchResult {
        RawStitchResult {
            data: if data.is_empty() {
                ptr::null_mut()
            } else {
                data.as_mut_ptr()
            },
            width: w,
            height: h,
            channels: c,
            success: SUCCESS_CODE,
            error_message: ptr::null_mut(),
        }
    }

    #[test]
    fn test_copies_exactly_declared_size() {
        // Buffer is longer than the record claims; only the declared prefix is copied.
        let mut data: Vec<u8> = (0..40).collect();
        let raw = record(&mut data, 4, 3, 3);

        let result = unsafe { translate(&raw) }.unwrap();
        assert_eq!(result.data, (0..36).collect::<Vec<u8>>());
        assert_eq!(result.data.len(), result.expected_len());
        assert!(result.is_clean());
    }

    #[test]
    fn test_failure_with_message() {
        let msg = CString::new("overlap not found").unwrap();
        let mut raw = record(&mut [], 0, 0, 3);
        raw.success = 0;
        raw.error_message = msg.as_ptr() as *mut _;

        match unsafe { translate(&raw) } {
            Err(StitchError::StitchFailed(m)) => assert_eq!(m, "overlap not found"),
            other => panic!("expected StitchFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_without_message() {
        let mut raw = record(&mut [], 0, 0, 3);
        raw.success = 0;

        match unsafe { translate(&raw) } {
            Err(StitchError::StitchFailed(m)) => assert_eq!(m, UNKNOWN_ERROR),
            other => panic!("expected StitchFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_ignores_dimensions() {
        let mut raw = record(&mut [], -1, -1, -1);
        raw.success = 0;
        assert!(matches!(
            unsafe { translate(&raw) },
            Err(StitchError::StitchFailed(_))
        ));
    }

    #[test]
    fn test_success_with_warning() {
        let msg = CString::new("Warning: Failed to write output file: disk full").unwrap();
        let mut data = vec![7u8; 12];
        let mut raw = record(&mut data, 2, 2, 3);
        raw.error_message = msg.as_ptr() as *mut _;

        let result = unsafe { translate(&raw) }.unwrap();
        assert_eq!(
            result.warning.as_deref(),
            Some("Warning: Failed to write output file: disk full")
        );
        assert_eq!(result.data, vec![7u8; 12]);
    }

    #[test]
    fn test_empty_message_is_not_a_warning() {
        let msg = CString::new("").unwrap();
        let mut data = vec![1u8; 3];
        let mut raw = record(&mut data, 1, 1, 3);
        raw.error_message = msg.as_ptr() as *mut _;

        assert!(unsafe { translate(&raw) }.unwrap().is_clean());
    }

    #[test]
    fn test_negative_dimensions_rejected() {
        let mut data = vec![0u8; 3];
        let raw = record(&mut data, -4, 3, 3);
        assert!(matches!(
            unsafe { translate(&raw) },
            Err(StitchError::InvalidDimensions {
                width: -4,
                height: 3,
                channels: 3
            })
        ));
    }

    #[test]
    fn test_null_data_on_success_is_empty() {
        let raw = record(&mut [], 5, 5, 3);
        let result = unsafe { translate(&raw) }.unwrap();
        assert!(result.data.is_empty());
        assert_eq!((result.width, result.height, result.channels), (5, 5, 3));
    }
}
