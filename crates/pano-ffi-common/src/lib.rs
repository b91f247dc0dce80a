//! Common FFI utilities for the pano native bridge.
//!
//! Two directions are covered here:
//!
//! - **Outbound** (Rust caller -> native engine): [`NativeString`] and
//!   [`NativeStringArray`] convert caller-owned text into NUL-terminated
//!   buffers. Each buffer is released when its owner is dropped, on every
//!   exit path of the enclosing operation.
//! - **Inbound** (Rust code playing the native side, e.g. test doubles):
//!   helpers that hand out raw C strings and boxed slices, and the matching
//!   `free_*` functions.
//!
//! # Memory Ownership
//!
//! - Functions returning `*mut c_char` transfer ownership to the caller
//! - Callers must use corresponding `free_*` functions to deallocate
//! - NULL pointers are handled safely (no-op for free functions)

use std::ffi::{CStr, CString, NulError};
use std::os::raw::c_char;
use std::ptr;
use std::slice;

use thiserror::Error;

/// Why a caller string could not be converted to native form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MarshalErrorKind {
    /// The string contains a NUL byte, which would silently truncate it.
    #[error("interior NUL byte at offset {0}")]
    InteriorNul(usize),
}

/// Failure to marshal the argument at `index` of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("argument {index}: {kind}")]
pub struct MarshalError {
    pub index: usize,
    pub kind: MarshalErrorKind,
}

impl MarshalError {
    fn from_nul(index: usize, err: NulError) -> Self {
        Self {
            index,
            kind: MarshalErrorKind::InteriorNul(err.nul_position()),
        }
    }
}

/// A single caller string in native (NUL-terminated) form.
///
/// The buffer is owned by this value and released on drop; the pointer
/// returned by [`NativeString::as_ptr`] is valid only while it is alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeString(CString);

impl NativeString {
    /// Convert `s`, rejecting interior NUL bytes.
    pub fn new(s: &str) -> Result<Self, MarshalError> {
        CString::new(s)
            .map(Self)
            .map_err(|e| MarshalError::from_nul(0, e))
    }

    #[inline]
    pub fn as_ptr(&self) -> *const c_char {
        self.0.as_ptr()
    }
}

/// Convert one caller string, pairing the native buffer with its release.
///
/// Empty input yields `None`, which callers pass to the engine as NULL
/// ("use the engine default").
pub fn to_native_optional(s: Option<&str>) -> Result<Option<NativeString>, MarshalError> {
    match s {
        Some(s) if !s.is_empty() => NativeString::new(s).map(Some),
        _ => Ok(None),
    }
}

/// Pointer for an optional native string: NULL when absent.
#[inline]
pub fn optional_ptr(s: Option<&NativeString>) -> *const c_char {
    s.map_or(ptr::null(), NativeString::as_ptr)
}

/// An ordered batch of caller strings in `char**` form.
///
/// Conversion is collect-then-release: if element *i* is rejected, the
/// buffers for elements `0..i` are dropped before the error is returned.
/// The pointer array carries a trailing NULL, so it can also be consumed as
/// an `argv`-style list; [`NativeStringArray::len`] excludes it.
#[derive(Debug)]
pub struct NativeStringArray {
    // Owns the buffers `ptrs` points into. Moving the Vec never moves the
    // heap allocation of each CString.
    strings: Vec<CString>,
    ptrs: Vec<*mut c_char>,
}

impl NativeStringArray {
    pub fn from_strs<I, S>(items: I) -> Result<Self, MarshalError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let strings = items
            .into_iter()
            .enumerate()
            .map(|(i, s)| CString::new(s.as_ref()).map_err(|e| MarshalError::from_nul(i, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let ptrs = strings
            .iter()
            .map(|s| s.as_ptr() as *mut c_char)
            .chain(std::iter::once(ptr::null_mut()))
            .collect();

        Ok(Self { strings, ptrs })
    }

    /// Number of strings (the trailing NULL is not counted).
    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// The `char**` the engine expects. Valid while `self` is alive and not
    /// moved out of.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut *mut c_char {
        self.ptrs.as_mut_ptr()
    }}

// ============================================================================
// Native-side helpers
// ============================================================================

/// Convert a Rust string to a C string pointer, with a fallback on failure.
///
/// If the input contains null bytes, returns the fallback string instead.
/// The returned pointer is owned by the caller and must be freed.
///
/// # Example
/// ```
/// use pano_ffi_common::{cstring_new_or_fallback, free_cstring};
///
/// let ptr = cstring_new_or_fallback("hello", "error");
/// unsafe { free_cstring(ptr) };
/// ```
#[inline]
pub fn cstring_new_or_fallback(s: &str, fallback: &'static str) -> *mut c_char {
    CString::new(s)
        .unwrap_or_else(|_| CString::new(fallback).expect("fallback must be valid"))
        .into_raw()
}

/// Safely free a C string pointer.
///
/// Does nothing if the pointer is null.
///
/// # Safety
/// The pointer must have been allocated by `CString::into_raw()` or be null.
#[inline]
pub unsafe fn free_cstring(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}

/// Safely free a boxed value.
///
/// # Safety
/// The pointer must have been allocated by `Box::into_raw()` or be null.
#[inline]
pub unsafe fn free_boxed<T>(ptr: *mut T) {
    if !ptr.is_null() {
        unsafe {
            let _ = Box::from_raw(ptr);
        }
    }
}

/// Free a boxed slice and its contents.
///
/// Does nothing if the pointer is null or length is zero.
///
/// # Safety
/// The pointer must have been allocated by `Box::into_raw(slice.into_boxed_slice())`.
#[inline]
pub unsafe fn free_boxed_slice<T>(ptr: *mut T, len: usize) {
    if !ptr.is_null() && len > 0 {
        unsafe {
            let _ = Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len));
        }
    }
}

/// Convert a vector to a raw pointer and length.
///
/// Returns null pointer and 0 length for empty vectors.
#[inline]
pub fn vec_into_raw<T>(vec: Vec<T>) -> (*mut T, usize) {
    let len = vec.len();
    if len == 0 {
        (ptr::null_mut(), 0)
    } else {
        (Box::into_raw(vec.into_boxed_slice()) as *mut T, len)
    }
}

/// Convert a C string array to a `Vec<String>`.
///
/// # Safety
/// - `arr` must point to `len` valid C string pointers, or be null (if len is 0)
/// - Each string pointer must be valid and null-terminated
pub unsafe fn convert_string_array(
    arr: *const *const c_char,
    len: usize,
) -> Result<Vec<String>, String> {
    if arr.is_null() || len == 0 {
        return Ok(Vec::new());
    }

    let slice = unsafe { slice::from_raw_parts(arr, len) };
    let mut result = Vec::with_capacity(len);

    for (i, &ptr) in slice.iter().enumerate() {
        if ptr.is_null() {
            return Err(format!("null string at index {}", i));
        }
        match unsafe { CStr::from_ptr(ptr) }.to_str() {
            Ok(s) => result.push(s.to_string()),
            Err(_) => return Err(format!("invalid UTF-8 at index {}", i)),
        }
    }

    Ok(result)
}

/// Safely convert a C string pointer to a Rust string reference.
///
/// # Safety
/// The pointer must be valid and null-terminated, or null.
pub unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Result<&'a str, &'static str> {
    if ptr.is_null() {
        return Err("null pointer");
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| "invalid UTF-8")
}

/// Copy a C string into an owned `String`, replacing invalid UTF-8.
///
/// Returns `None` for a null pointer.
///
/// # Safety
/// The pointer must be valid and null-terminated, or null.
pub unsafe fn cstr_to_string_lossy(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}
