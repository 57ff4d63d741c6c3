//! CLI command layer: each command returns a JSON payload for the binary to
//! print.

mod export_cmd;
mod record_cmd;
mod view_cmd;

pub use export_cmd::*;
pub use record_cmd::*;
pub use view_cmd::*;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::{StackSample, StackscopeResult, read_samples};

/// Opens and parses a stack log. With `allow_partial`, a mid-log parse
/// failure degrades to a warning and the samples read so far are used.
pub(crate) fn load_samples(path: &Path, allow_partial: bool) -> StackscopeResult<Vec<StackSample>> {
    let file = File::open(path)?;
    match read_samples(BufReader::new(file)) {
        Ok(samples) => Ok(samples),
        Err(failure) if allow_partial => {
            tracing::warn!(
                "continuing with {} samples parsed before error: {}",
                failure.samples.len(),
                failure.error
            );
            Ok(failure.samples)
        }
        Err(failure) => Err(failure.error),
    }
}
