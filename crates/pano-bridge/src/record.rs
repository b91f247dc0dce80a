//! Ownership guard for records returned by the engine.

use std::ptr::NonNull;

use tracing::trace;

use crate::engine::NativeEngine;
use crate::raw::RawStitchResult;

/// A record returned by one `stitch_images` call.
///
/// The guard is the only owner of the pointer. It hands the record back to
/// the engine exactly once, when dropped, including during unwinding.
/// Reads go through [`NativeRecord::get`], whose borrow cannot outlive the
/// guard, so nothing can touch the record after release.
pub struct NativeRecord<'e, E: NativeEngine + ?Sized> {
    ptr: NonNull<RawStitchResult>,
    engine: &'e E,
}

impl<'e, E: NativeEngine + ?Sized> NativeRecord<'e, E> {
    /// Take ownership of `ptr`. A null pointer yields `None` and nothing is
    /// ever released for it.
    ///
    /// # Safety
    /// `ptr` must be null or the unreleased return value of
    /// `engine.stitch_images`, and must not be used by anyone else afterwards.
    pub unsafe fn from_raw(engine: &'e E, ptr: *mut RawStitchResult) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, engine })
    }

    #[inline]
    pub fn get(&self) -> &RawStitchResult {
        unsafe { self.ptr.as_ref() }
    }
}

impl<E: NativeEngine + ?Sized> Drop for NativeRecord<'_, E> {
    fn drop(&mut self) {
        trace!(record = ?self.ptr, "releasing native record");
        unsafe { self.engine.free_stitch_result(self.ptr.as_ptr()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{StitchScript, StubEngine};
    use std::panic::{self, AssertUnwindSafe};
    use std::ptr;

    fn issue(engine: &StubEngine) -> *mut RawStitchResult {
        let mut paths = pano_ffi_common::NativeStringArray::from_strs(["a.jpg", "b.jpg"]).unwrap();
        unsafe { engine.stitch_images(paths.as_mut_ptr(), 2, ptr::null()) }
    }

    #[test]
    fn test_null_is_never_released() {
        let engine = StubEngine::new();
        let guard = unsafe { NativeRecord::from_raw(&engine, ptr::null_mut()) };
        assert!(guard.is_none());
        assert_eq!(engine.free_calls(), 0);
    }

    #[test]
    fn test_drop_releases_once() {
        let engine = StubEngine::new();
        let raw = issue(&engine);

        let guard = unsafe { NativeRecord::from_raw(&engine, raw) }.unwrap();
        assert!(guard.get().succeeded());
        drop(guard);

        assert_eq!(engine.free_calls(), 1);
        assert!(engine.is_balanced());
    }

    #[test]
    fn test_release_on_unwind() {
        let engine = StubEngine::with_script(StitchScript::fail(Some("boom")));
        let raw = issue(&engine);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let guard = unsafe { NativeRecord::from_raw(&engine, raw) }.unwrap();
            assert!(!guard.get().succeeded());
            panic!("caller failed after invocation");
        }));

        assert!(outcome.is_err());
        assert_eq!(engine.free_calls(), 1);
        assert!(engine.is_balanced());
    }
}
