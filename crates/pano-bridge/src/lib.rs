//! Safe bridge to the native OpenPano stitching engine.
//!
//! The engine is a pre-built C/C++ library exposing three entry points:
//! configuration loading, stitching, and releasing the result record. This
//! crate wraps them so that Rust callers never hold a raw pointer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐   ┌─────────────┐   ┌─────────┐
//! │ caller paths │──▶│ marshalling │──▶│ stitch_images│──▶│ translation │──▶│ release │
//! │   (&str)     │   │ (char**)    │   │ (native)     │   │ (copy out)  │   │ (free)  │
//! └──────────────┘   └─────────────┘   └──────────────┘   └─────────────┘   └─────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use pano_bridge::{StitchContext, StubEngine, StitchScript};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // With the `native` feature, use `StitchContext::linked()` instead.
//! let ctx = StitchContext::new(StubEngine::with_script(StitchScript::succeed(
//!     4, 3, 3, vec![0; 36],
//! )));
//!
//! ctx.require_config(Some("config.cfg"))?;
//! let pano = ctx.stitch(&["left.jpg", "right.jpg"], None)?;
//! assert_eq!(pano.data.len(), pano.expected_len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Memory Ownership
//!
//! - Path buffers are owned by the bridge and dropped when the call returns
//! - The native record is owned by a guard that frees it exactly once
//! - Pixels are copied into a `Vec<u8>` before the record is freed
//!
//! ## Thread Safety
//!
//! Engine configuration is process-wide. Initialise once through a shared
//! [`StitchContext`] before stitching concurrently; re-initialisation waits
//! for in-flight stitches on that context.

pub mod context;
pub mod engine;
pub mod error;
pub mod raw;
pub mod record;
pub mod result;
pub mod stub;
pub mod translate;

#[cfg(feature = "tokio")]
pub mod blocking;

// Re-export main types
pub use context::{ConfigSource, ConfigState, StitchContext, MIN_IMAGES};
pub use engine::NativeEngine;
pub use error::{Result, StitchError};
pub use raw::RawStitchResult;
pub use result::{Outcome, StitchResult, StitchSummary};
pub use stub::{StitchCall, StitchScript, StubEngine};

#[cfg(feature = "native")]
pub use engine::LinkedEngine;

#[cfg(feature = "tokio")]
pub use blocking::stitch_blocking;

/// Version of this bridge.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
