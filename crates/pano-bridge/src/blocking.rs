//! Running the bridge from async code.
//!
//! The native stitch call blocks and cannot be cancelled, so it runs on
//! tokio's blocking pool. Dropping the returned future only detaches the
//! caller: the worker still finishes the call and releases the record.

use std::sync::Arc;

use crate::context::StitchContext;
use crate::engine::NativeEngine;
use crate::error::{Result, StitchError};
use crate::result::StitchResult;

/// Run [`StitchContext::stitch`] on the blocking pool.
pub async fn stitch_blocking<E>(
    ctx: Arc<StitchContext<E>>,
    paths: Vec<String>,
    output_path: Option<String>,
) -> Result<StitchResult>
where
    E: NativeEngine + 'static,
{
    tokio::task::spawn_blocking(move || ctx.stitch(&paths, output_path.as_deref()))
        .await
        .map_err(|e| StitchError::Worker(e.to_string()))?
}
