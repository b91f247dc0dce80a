//! The seam between the bridge and the native stitching engine.
//!
//! [`NativeEngine`] mirrors the engine's three C entry points one-to-one.
//! The bridge never talks to the library except through this trait, so a
//! test double can stand in for it.

use std::os::raw::{c_char, c_int};
use std::sync::Arc;

use crate::raw::RawStitchResult;

/// The three entry points exported by the native engine.
///
/// # Safety
///
/// Implementations must honour the C contract: `stitch_images` returns
/// either null or a record that stays valid until it is passed to
/// `free_stitch_result`, and every pointer inside that record is either
/// null or valid for the sizes the record reports.
pub unsafe trait NativeEngine: Send + Sync {
    /// Load the engine configuration. NULL selects the engine's default file.
    ///
    /// # Safety
    /// `config_path` must be null or a valid NUL-terminated string for the
    /// duration of the call.
    unsafe fn init_stitcher_config(&self, config_path: *const c_char) -> c_int;

    /// Stitch `num_images` images into a panorama. NULL `output_path` means
    /// "do not write a file".
    ///
    /// # Safety
    /// `image_paths` must point to `num_images` valid NUL-terminated strings;
    /// `output_path` must be null or NUL-terminated.
    unsafe fn stitch_images(
        &self,
        image_paths: *mut *mut c_char,
        num_images: c_int,
        output_path: *const c_char,
    ) -> *mut RawStitchResult;

    /// Return a record to the engine's allocator.
    ///
    /// # Safety
    /// `result` must come from `stitch_images` on this engine and must not
    /// have been freed already.
    unsafe fn free_stitch_result(&self, result: *mut RawStitchResult);
}

unsafe impl<E: NativeEngine + ?Sized> NativeEngine for Arc<E> {
    unsafe fn init_stitcher_config(&self, config_path: *const c_char) -> c_int {
        unsafe { (**self).init_stitcher_config(config_path) }
    }

    unsafe fn stitch_images(
        &self,
        image_paths: *mut *mut c_char,
        num_images: c_int,
        output_path: *const c_char,
    ) -> *mut RawStitchResult {
        unsafe { (**self).stitch_images(image_paths, num_images, output_path) }
    }

    unsafe fn free_stitch_result(&self, result: *mut RawStitchResult) {
        unsafe { (**self).free_stitch_result(result) }
    }
}

#[cfg(feature = "native")]
mod sys {
    use std::os::raw::{c_char, c_int};

    use crate::raw::RawStitchResult;

    #[link(name = "openpano")]
    extern "C" {
        pub fn init_stitcher_config(config_file_path: *const c_char) -> c_int;
        pub fn stitch_images(
            image_paths: *mut *mut c_char,
            num_images: c_int,
            output_path: *const c_char,
        ) -> *mut RawStitchResult;
        pub fn free_stitch_result(result: *mut RawStitchResult);
    }
}

/// The engine linked in from `libopenpano`.
///
/// Its configuration is process-wide: every `LinkedEngine` value talks to
/// the same native state, so share one [`crate::StitchContext`] per process.
#[cfg(feature = "native")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkedEngine;

#[cfg(feature = "native")]
unsafe impl NativeEngine for LinkedEngine {
    unsafe fn init_stitcher_config(&self, config_path: *const c_char) -> c_int {
        unsafe { sys::init_stitcher_config(config_path) }
    }

    unsafe fn stitch_images(
        &self,
        image_paths: *mut *mut c_char,
        num_images: c_int,
        output_path: *const c_char,
    ) -> *mut RawStitchResult {
        unsafe { sys::stitch_images(image_paths, num_images, output_path) }
    }

    unsafe fn free_stitch_result(&self, result: *mut RawStitchResult) {
        unsafe { sys::free_stitch_result(result) }
    }
}
