//! pano-stitch - stitch overlapping photographs into a panorama.
//!
//! Usage:
//!     pano-stitch left.jpg middle.jpg right.jpg -o pano.jpg
//!     pano-stitch a.jpg b.jpg --config config.cfg --buffer-only -o pano.png --json

// Without a linked engine only the tests drive `run`.
#![cfg_attr(not(feature = "native"), allow(dead_code))]

mod inputs;
mod logging;

use std::path::{Path, PathBuf};

use clap::Parser;
use pano_bridge::{NativeEngine, StitchContext, StitchError, StitchSummary};
use thiserror::Error;
use tracing::{error, info, warn};

use logging::prefix;

#[derive(Parser, Debug)]
#[command(name = "pano-stitch")]
#[command(about = "Stitch overlapping photographs into a panorama")]
#[command(version)]
struct Args {
    /// Input images, in left-to-right order
    #[arg(required = true, num_args = 2..)]
    images: Vec<String>,

    /// Output panorama path
    #[arg(short, long, default_value = "out.jpg")]
    output: String,

    /// Engine configuration file (default: ./config.cfg, then ../config.cfg)
    #[arg(short, long)]
    config: Option<String>,

    /// Do not let the engine write the file; encode the returned pixels here
    #[arg(long)]
    buffer_only: bool,

    /// Print a JSON summary on stdout
    #[arg(long)]
    json: bool,

    /// Log level (debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("image file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("config file does not exist: {}", .0.display())]
    MissingConfig(PathBuf),

    #[error(transparent)]
    Stitch(#[from] StitchError),

    #[error("summary serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[allow(dead_code)]
    #[error("no stitching engine linked; rebuild with `--features native`")]
    NoEngine,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_with_filter(&args.log_level);

    info!(
        "{} pano-stitch v{} (bridge v{})",
        prefix::OPEN,
        env!("CARGO_PKG_VERSION"),
        pano_bridge::version()
    );

    execute(&args).inspect_err(|e| error!("{} {}", prefix::CLOSE, e))?;
    Ok(())
}

fn execute(args: &Args) -> Result<(), CliError> {
    let summary = stitch_main(args)?;
    report(&summary, args.json)
}

#[cfg(feature = "native")]
fn stitch_main(args: &Args) -> Result<StitchSummary, CliError> {
    let ctx = StitchContext::linked();
    run(&ctx, args, inputs::DEFAULT_CONFIG_CANDIDATES)
}

#[cfg(not(feature = "native"))]
fn stitch_main(_args: &Args) -> Result<StitchSummary, CliError> {
    Err(CliError::NoEngine)
}

/// The whole request: validate, configure, stitch, optionally encode.
fn run<E: NativeEngine>(
    ctx: &StitchContext<E>,
    args: &Args,
    config_candidates: &[impl AsRef<Path>],
) -> Result<StitchSummary, CliError> {
    inputs::check_images(&args.images)?;

    let config = inputs::discover_config(args.config.as_deref(), config_candidates)?;
    info!(
        config = config.as_deref().unwrap_or("engine default"),
        "initializing configuration"
    );
    ctx.require_config(config.as_deref())?;

    let native_output = (!args.buffer_only).then_some(args.output.as_str());
    info!(
        "{} stitching {} images: {:?}",
        prefix::STITCH,
        args.images.len(),
        args.images
    );
    let result = ctx.stitch(&args.images, native_output)?;

    if let Some(warning) = result.warning.as_deref() {
        warn!("{} {}", prefix::STITCH, warning);
    }

    if args.buffer_only {
        result.save(&args.output)?;
    }

    info!(
        width = result.width,
        height = result.height,
        channels = result.channels,
        bytes = result.data.len(),
        output = %args.output,
        "{} stitched {} images",
        prefix::CLOSE,
        args.images.len()
    );

    Ok(result.summary(Some(Path::new(&args.output))))
}

fn report(summary: &StitchSummary, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    }
    Ok(())
}
