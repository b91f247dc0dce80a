//! Scripted in-process engine for tests and demos.
//!
//! [`StubEngine`] plays the native side of the contract: it hands out
//! records, pixel buffers and message strings as raw allocations, exactly as
//! a C producer would, and takes them back in `free_stitch_result`. Every
//! call is counted, so tests can assert that each issued record is released
//! exactly once and that no native call happened on rejected input.
//!
//! Releasing a pointer the stub never issued, or releasing it twice, is
//! recorded in [`StubEngine::defects`] instead of touching memory.

use std::collections::HashMap;
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use pano_ffi_common::{
    convert_string_array, cstr_to_str, cstring_new_or_fallback, free_boxed, free_boxed_slice,
    free_cstring, vec_into_raw,
};
use parking_lot::Mutex;

use crate::engine::NativeEngine;
use crate::raw::{RawStitchResult, SUCCESS_CODE};

const MESSAGE_FALLBACK: &str = "stub message contained NUL";

/// What the next stitch call should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StitchScript {
    /// A successful record. When `width * height * channels` is a valid
    /// size the payload is padded or truncated to it, so the record never
    /// under-reports its buffer.
    Succeed {
        width: c_int,
        height: c_int,
        channels: c_int,
        payload: Vec<u8>,
        message: Option<String>,
    },
    /// A record with `success = 0`
    Fail { message: Option<String> },
    /// No record at all
    ReturnNull,
}

impl StitchScript {
    pub fn succeed(width: c_int, height: c_int, channels: c_int, payload: Vec<u8>) -> Self {
        Self::Succeed {
            width,
            height,
            channels,
            payload,
            message: None,
        }
    }

    pub fn fail(message: Option<&str>) -> Self {
        Self::Fail {
            message: message.map(str::to_string),
        }
    }

    /// Attach a message to a `Succeed` script (a warning) or replace a
    /// `Fail` message. No effect on `ReturnNull`.
    pub fn with_message(mut self, msg: &str) -> Self {
        match &mut self {
            Self::Succeed { message, .. } | Self::Fail { message } => {
                *message = Some(msg.to_string())
            }
            Self::ReturnNull => {}
        }
        self
    }
}

impl Default for StitchScript {
    fn default() -> Self {
        Self::succeed(2, 2, 3, vec![0; 12])
    }
}

/// Arguments observed by one stitch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchCall {
    pub paths: Vec<String>,
    pub output_path: Option<String>,
}

/// Scripted, counting engine. See the module docs.
#[derive(Debug, Default)]
pub struct StubEngine {
    init_fails: AtomicBool,
    script: Mutex<StitchScript>,
    delay: Mutex<Option<Duration>>,

    init_calls: AtomicUsize,
    stitch_calls: AtomicUsize,
    records_issued: AtomicUsize,
    free_calls: AtomicUsize,
    defects: AtomicUsize,

    in_flight: AtomicUsize,
    init_overlaps: AtomicUsize,

    // record address -> pixel buffer length
    live: Mutex<HashMap<usize, usize>>,
    calls: Mutex<Vec<StitchCall>>,
    config_paths: Mutex<Vec<Option<String>>>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: StitchScript) -> Self {
        let engine = Self::default();
        engine.set_script(script);
        engine
    }

    pub fn set_script(&self, script: StitchScript) {
        *self.script.lock() = script;
    }

    pub fn set_init_result(&self, ok: bool) {
        self.init_fails.store(!ok, Ordering::SeqCst);
    }

    /// Make each stitch call sleep, to hold it in flight.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn stitch_calls(&self) -> usize {
        self.stitch_calls.load(Ordering::SeqCst)
    }

    /// Non-null records handed out.
    pub fn records_issued(&self) -> usize {
        self.records_issued.load(Ordering::SeqCst)
    }

    pub fn free_calls(&self) -> usize {
        self.free_calls.load(Ordering::SeqCst)
    }

    pub fn live_records(&self) -> usize {
        self.live.lock().len()
    }

    /// Frees of unknown or already-freed pointers.
    pub fn defects(&self) -> usize {
        self.defects.load(Ordering::SeqCst)
    }

    /// Init calls that arrived while a stitch was running.
    pub fn init_overlaps(&self) -> usize {
        self.init_overlaps.load(Ordering::SeqCst)
    }

    /// Every issued record was freed exactly once and nothing else was.
    pub fn is_balanced(&self) -> bool {
        self.records_issued() == self.free_calls()
            && self.live_records() == 0
            && self.defects() == 0
    }

    pub fn calls(&self) -> Vec<StitchCall> {
        self.calls.lock().clone()
    }

    pub fn config_paths(&self) -> Vec<Option<String>> {
        self.config_paths.lock().clone()
    }

    fn build_record(script: StitchScript) -> Option<(RawStitchResult, usize)> {
        let built = match script {
            StitchScript::Succeed {
                width,
                height,
                channels,
                mut payload,
                message,
            } => {
                // Unrepresentable sizes keep the caller's payload as is; an
                // empty payload then leaves `data` null.
                if let Some(len) = declared_len(width, height, channels) {
                    payload.resize(len, 0);
                }
                let (data, len) = vec_into_raw(payload);
                let record = RawStitchResult {
                    data,
                    width,
                    height,
                    channels,
                    success: SUCCESS_CODE,
                    error_message: message_ptr(message.as_deref()),
                };
                (record, len)
            }
            StitchScript::Fail { message } => {
                let record = RawStitchResult {
                    data: ptr::null_mut(),
                    width: 0,
                    height: 0,
                    channels: 3,
                    success: 0,
                    error_message: message_ptr(message.as_deref()),
                };
                (record, 0)
            }
            StitchScript::ReturnNull => return None,
        };
        Some(built)
    }
}

/// `width * height * channels`, or `None` when negative or overflowing.
fn declared_len(width: c_int, height: c_int, channels: c_int) -> Option<usize> {
    let dim = |v: c_int| usize::try_from(v).ok();
    dim(width)?.checked_mul(dim(height)?)?.checked_mul(dim(channels)?)
}

fn message_ptr(message: Option<&str>) -> *mut c_char {
    message.map_or(ptr::null_mut(), |m| {
        cstring_new_or_fallback(m, MESSAGE_FALLBACK)
    })
}

unsafe impl NativeEngine for StubEngine {
    unsafe fn init_stitcher_config(&self, config_path: *const c_char) -> c_int {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            self.init_overlaps.fetch_add(1, Ordering::SeqCst);
        }

        let path = unsafe { cstr_to_str(config_path) }.ok().map(str::to_string);
        self.config_paths.lock().push(path);

        if self.init_fails.load(Ordering::SeqCst) {
            0
        } else {
            SUCCESS_CODE
        }
    }

    unsafe fn stitch_images(
        &self,
        image_paths: *mut *mut c_char,
        num_images: c_int,
        output_path: *const c_char,
    ) -> *mut RawStitchResult {
        self.stitch_calls.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        let count = usize::try_from(num_images).unwrap_or(0);
        let paths = unsafe { convert_string_array(image_paths as *const *const c_char, count) }
            .unwrap_or_default();
        let output_path = unsafe { cstr_to_str(output_path) }.ok().map(str::to_string);
        self.calls.lock().push(StitchCall { paths, output_path });

        if let Some(delay) = *self.delay.lock() {
            thread::sleep(delay);
        }

        let script = self.script.lock().clone();
        let result = match Self::build_record(script) {
            Some((record, data_len)) => {
                let ptr = Box::into_raw(Box::new(record));
                self.live.lock().insert(ptr as usize, data_len);
                self.records_issued.fetch_add(1, Ordering::SeqCst);
                ptr
            }
            None => ptr::null_mut(),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    unsafe fn free_stitch_result(&self, result: *mut RawStitchResult) {
        self.free_calls.fetch_add(1, Ordering::SeqCst);

        let Some(data_len) = self.live.lock().remove(&(result as usize)) else {
            self.defects.fetch_add(1, Ordering::SeqCst);
            return;
        };

        unsafe {
            let record = &*result;
            free_boxed_slice(record.data, data_len);
            free_cstring(record.error_message);
            free_boxed(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pano_ffi_common::NativeStringArray;
    use pretty_assertions::assert_eq;

    fn stitch(engine: &StubEngine, paths: &[&str]) -> *mut RawStitchResult {
        let mut arr = NativeStringArray::from_strs(paths).unwrap();
        unsafe { engine.stitch_images(arr.as_mut_ptr(), paths.len() as c_int, ptr::null()) }
    }

    #[test]
    fn test_records_received_paths() {
        let engine = StubEngine::new();
        let raw = stitch(&engine, &["1.jpg", "2.jpg", "3.jpg"]);
        unsafe { engine.free_stitch_result(raw) };

        assert_eq!(
            engine.calls(),
            vec![StitchCall {
                paths: vec!["1.jpg".into(), "2.jpg".into(), "3.jpg".into()],
                output_path: None,
            }]
        );
        assert!(engine.is_balanced());
    }

    #[test]
    fn test_payload_sized_to_dimensions() {
        let engine = StubEngine::with_script(StitchScript::succeed(2, 2, 3, vec![9; 4]));
        let raw = stitch(&engine, &["a", "b"]);

        let record = unsafe { &*raw };
        let data = unsafe { std::slice::from_raw_parts(record.data, 12) };
        assert_eq!(&data[..4], &[9, 9, 9, 9]);
        assert_eq!(&data[4..], &[0; 8]);

        unsafe { engine.free_stitch_result(raw) };
        assert!(engine.is_balanced());
    }

    #[test]
    fn test_double_free_is_a_defect() {
        let engine = StubEngine::new();
        let raw = stitch(&engine, &["a", "b"]);
        unsafe {
            engine.free_stitch_result(raw);
            engine.free_stitch_result(raw);
        }
        assert_eq!(engine.defects(), 1);
        assert!(!engine.is_balanced());
    }

    #[test]
    fn test_unreleased_record_is_unbalanced() {
        let engine = StubEngine::new();
        let raw = stitch(&engine, &["a", "b"]);
        assert_eq!(engine.live_records(), 1);
        assert!(!engine.is_balanced());
        unsafe { engine.free_stitch_result(raw) };
        assert!(engine.is_balanced());
    }

    #[test]
    fn test_null_script() {
        let engine = StubEngine::with_script(StitchScript::ReturnNull);
        assert!(stitch(&engine, &["a", "b"]).is_null());
        assert_eq!(engine.stitch_calls(), 1);
        assert_eq!(engine.records_issued(), 0);
        assert!(engine.is_balanced());
    }

    #[test]
    fn test_overflowing_dimensions_keep_payload() {
        let engine = StubEngine::with_script(StitchScript::succeed(
            c_int::MAX,
            c_int::MAX,
            c_int::MAX,
            vec![],
        ));
        let raw = stitch(&engine, &["a", "b"]);

        assert!(unsafe { (*raw).data }.is_null());
        unsafe { engine.free_stitch_result(raw) };
        assert!(engine.is_balanced());
    }

    #[test]
    fn test_declared_len() {
        assert_eq!(declared_len(4, 3, 3), Some(36));
        assert_eq!(declared_len(-1, 3, 3), None);
        assert_eq!(declared_len(c_int::MAX, c_int::MAX, c_int::MAX), None);
    }

    #[test]
    fn test_with_message() {
        let script = StitchScript::fail(None).with_message("overlap not found");
        assert_eq!(script, StitchScript::fail(Some("overlap not found")));
        assert_eq!(StitchScript::ReturnNull.with_message("x"), StitchScript::ReturnNull);
    }
}
