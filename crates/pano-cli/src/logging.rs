//! Logging setup with pano segment prefixes.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with a default filter.
///
/// RUST_LOG takes precedence when set; `default_filter` applies otherwise.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .init();
}

/// Segment prefixes for log lines.
pub mod prefix {
    /// Startup
    pub const OPEN: &str = "✿";
    /// Stitching work
    pub const STITCH: &str = "⧉";
    /// Finished
    pub const CLOSE: &str = "❀";
}
