//! Stitching context: the engine plus its configuration lifecycle.
//!
//! The native configuration is process-wide. [`StitchContext`] makes that
//! explicit: it owns the engine handle and a reader/writer lock over the
//! configuration state. Stitches hold the read lock for the whole native
//! call; (re-)initialisation takes the write lock, so it can never overlap
//! an in-flight stitch issued through the same context.
//!
//! Intended lifecycle: initialise once, then stitch from as many threads as
//! needed. Re-initialisation is allowed but waits for in-flight stitches.

use std::os::raw::c_int;

use pano_ffi_common::{optional_ptr, to_native_optional, NativeStringArray};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::engine::NativeEngine;
use crate::error::{Result, StitchError};
use crate::raw::SUCCESS_CODE;
use crate::record::NativeRecord;
use crate::result::StitchResult;
use crate::translate::translate;

/// Minimum number of images for one stitch.
pub const MIN_IMAGES: usize = 2;

/// Where the engine's configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// NULL was passed; the engine picks its built-in default file
    EngineDefault,
    File(String),
}

impl ConfigSource {
    fn from_path(path: Option<&str>) -> Self {
        match path {
            Some(p) if !p.is_empty() => Self::File(p.to_string()),
            _ => Self::EngineDefault,
        }
    }

    fn into_path(self) -> Option<String> {
        match self {
            Self::EngineDefault => None,
            Self::File(p) => Some(p),
        }
    }
}

/// Configuration state as last observed by this context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigState {
    /// No init call yet; the engine will self-initialise on first stitch
    Uninitialized,
    /// Last init succeeded. `generation` counts successful inits.
    Ready {
        source: ConfigSource,
        generation: u64,
    },
    /// Last init failed
    Failed { source: ConfigSource },
}

struct ConfigCell {
    state: ConfigState,
    successes: u64,
}

/// The bridge: an engine plus its configuration state.
pub struct StitchContext<E: NativeEngine> {
    engine: E,
    config: RwLock<ConfigCell>,
}

#[cfg(feature = "native")]
impl StitchContext<crate::engine::LinkedEngine> {
    /// Context over the linked `libopenpano`. Create one per process.
    pub fn linked() -> Self {
        Self::new(crate::engine::LinkedEngine)
    }
}

impl<E: NativeEngine> StitchContext<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: RwLock::new(ConfigCell {
                state: ConfigState::Uninitialized,
                successes: 0,
            }),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config_state(&self) -> ConfigState {
        self.config.read().state.clone()
    }

    /// Load the engine configuration.
    ///
    /// `None` or an empty path passes NULL, selecting the engine default.
    /// Returns true only when the engine reports success code 1. Failure is
    /// not retried.
    pub fn init_config(&self, path: Option<&str>) -> bool {
        let source = ConfigSource::from_path(path);

        let native = match to_native_optional(path) {
            Ok(native) => native,
            Err(e) => {
                warn!(error = %e, "config path cannot be passed to the engine");
                self.config.write().state = ConfigState::Failed { source };
                return false;
            }
        };

        let mut cell = self.config.write();
        let code: c_int =
            unsafe { self.engine.init_stitcher_config(optional_ptr(native.as_ref())) };

        if code == SUCCESS_CODE {
            cell.successes += 1;
            info!(source = ?source, generation = cell.successes, "stitcher configuration loaded");
            cell.state = ConfigState::Ready {
                source,
                generation: cell.successes,
            };
            true
        } else {
            warn!(source = ?source, code, "stitcher configuration rejected");
            cell.state = ConfigState::Failed { source };
            false
        }
    }

    /// [`StitchContext::init_config`], with failure as a typed error.
    pub fn require_config(&self, path: Option<&str>) -> Result<()> {
        if self.init_config(path) {
            Ok(())
        } else {
            Err(StitchError::ConfigInitFailed {
                path: ConfigSource::from_path(path).into_path(),
            })
        }
    }

    /// Stitch `paths`, in order, into one panorama.
    ///
    /// `output_path` of `None` (or empty) asks the engine not to write a
    /// file; the pixels are returned either way. Blocks until the engine
    /// returns; the native call cannot be cancelled.
    ///
    /// If the last [`StitchContext::init_config`] failed, this returns
    /// [`StitchError::ConfigInitFailed`] without calling the engine. A
    /// successful re-initialisation clears that state.
    pub fn stitch<S: AsRef<str>>(
        &self,
        paths: &[S],
        output_path: Option<&str>,
    ) -> Result<StitchResult> {
        let count = check_count(paths.len())?;

        let mut images =
            NativeStringArray::from_strs(paths).map_err(StitchError::InvalidImagePath)?;
        let output = to_native_optional(output_path).map_err(StitchError::InvalidOutputPath)?;

        let config = self.config.read();
        match &config.state {
            ConfigState::Uninitialized => {
                debug!("no explicit configuration; engine falls back to its default");
            }
            ConfigState::Failed { source } => {
                return Err(StitchError::ConfigInitFailed {
                    path: source.clone().into_path(),
                });
            }
            ConfigState::Ready { .. } => {}
        }

        debug!(images = images.len(), output = ?output_path, "invoking native stitch");
        let raw = unsafe {
            self.engine
                .stitch_images(images.as_mut_ptr(), count, optional_ptr(output.as_ref()))
        };

        let record =
            unsafe { NativeRecord::from_raw(&self.engine, raw) }.ok_or(StitchError::NullRecord)?;
        let result = unsafe { translate(record.get()) };

        // Everything needed has been copied; hand the record back.
        drop(record);
        drop(config);

        result
    }

    /// Initialise with `config_path`, then stitch.
    ///
    /// The image count is checked first, so a short list makes no native
    /// call at all; a failed initialisation skips the stitch.
    pub fn stitch_with_config<S: AsRef<str>>(
        &self,
        paths: &[S],
        output_path: Option<&str>,
        config_path: Option<&str>,
    ) -> Result<StitchResult> {
        check_count(paths.len())?;
        self.require_config(config_path)?;
        self.stitch(paths, output_path)
    }
}

fn check_count(count: usize) -> Result<c_int> {
    if count < MIN_IMAGES {
        return Err(StitchError::InsufficientImages { count });
    }
    c_int::try_from(count).map_err(|_| StitchError::TooManyImages { count })
}
