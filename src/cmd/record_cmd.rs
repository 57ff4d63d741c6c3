//! `stackscope record`: poll a pprof goroutine endpoint into a stack log.

use clap::Args;

use std::path::PathBuf;

use crate::{Config, HttpSource, Recorder, RecorderConfig, ScopeDuration, StackscopeResult};

#[derive(Debug, Args)]
pub struct RecordOptions {
    /// Goroutine dump endpoint, e.g.
    /// `http://localhost:6060/debug/pprof/goroutine?debug=2`.
    #[arg(long)]
    pub url: String,
    /// Output stack log path.
    #[arg(long, default_value = "stack.log")]
    pub out: PathBuf,
    /// Capture interval (defaults to the configured poll).
    #[arg(long)]
    pub poll: Option<ScopeDuration>,
    /// How long to record before stopping.
    #[arg(long = "for", value_name = "DURATION", default_value = "30s")]
    pub run_for: ScopeDuration,
}

pub fn record_command(config: &Config, opts: &RecordOptions) -> StackscopeResult<serde_json::Value> {
    let poll = opts.poll.unwrap_or(config.poll);
    let recorder = Recorder::start(
        RecorderConfig {
            path: opts.out.clone(),
            poll: poll.0,
        },
        HttpSource::new(&opts.url),
    )?;
    std::thread::sleep(opts.run_for.0);
    let samples = recorder.stop()?;

    Ok(serde_json::json!({
        "schemaVersion": "stackscope.record.v1",
        "url": opts.url,
        "out": opts.out,
        "poll": poll.to_string(),
        "recordedFor": opts.run_for.to_string(),
        "samples": samples,
    }))
}
