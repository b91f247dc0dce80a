//! Checks performed before the bridge is involved.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::CliError;

/// Where to look for `config.cfg` when `--config` is not given.
pub const DEFAULT_CONFIG_CANDIDATES: &[&str] = &["config.cfg", "../config.cfg"];

/// Every input image must exist before stitching starts.
pub fn check_images(images: &[String]) -> Result<(), CliError> {
    for image in images {
        if !Path::new(image).exists() {
            return Err(CliError::MissingInput(PathBuf::from(image)));
        }
        debug!(path = %image, "found input image");
    }
    Ok(())
}

/// Pick the configuration file.
///
/// An explicit path must exist. Otherwise the first existing candidate
/// wins; with none, `None` lets the engine use its built-in default.
pub fn discover_config(
    explicit: Option<&str>,
    candidates: &[impl AsRef<Path>],
) -> Result<Option<String>, CliError> {
    if let Some(path) = explicit {
        if !Path::new(path).exists() {
            return Err(CliError::MissingConfig(PathBuf::from(path)));
        }
        return Ok(Some(path.to_string()));
    }

    Ok(candidates
        .iter()
        .find(|p| p.as_ref().is_file())
        .map(|p| p.as_ref().display().to_string()))
}
