//! Periodic stack capture into a framed log file.
//!
//! A single background thread owns both the capture source and the output
//! file, so there is exactly one in-flight capture at a time and records are
//! serialized by construction. `stop` is an atomic flag the loop observes
//! between sleep slices; once signaled the thread always terminates.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::{StackscopeError, StackscopeResult, write_record};

/// Supplies one full stack dump per capture.
pub trait StackSource: Send + 'static {
    fn capture(&mut self) -> StackscopeResult<String>;
}

impl<F> StackSource for F
where
    F: FnMut() -> StackscopeResult<String> + Send + 'static,
{
    fn capture(&mut self) -> StackscopeResult<String> {
        self()
    }
}

/// Polls a Go pprof text endpoint, e.g.
/// `http://localhost:6060/debug/pprof/goroutine?debug=2`.
pub struct HttpSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(5))
                .build(),
        }
    }
}

impl StackSource for HttpSource {
    fn capture(&mut self) -> StackscopeResult<String> {
        let body = self.agent.get(&self.url).call()?.into_string()?;
        Ok(body)
    }
}

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub path: PathBuf,
    pub poll: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stack.log"),
            poll: Duration::from_millis(125),
        }
    }
}

/// Handle to a running capture loop. Dropping a recorder signals its thread
/// to stop; `stop` additionally waits for it and reports the sample count.
pub struct Recorder {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<usize>>,
    path: PathBuf,
}

impl Recorder {
    /// Creates the output file and starts the capture thread. The first
    /// capture fires one poll interval after start.
    pub fn start<S: StackSource>(config: RecorderConfig, source: S) -> StackscopeResult<Self> {
        let file = File::create(&config.path)?;
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let poll = config.poll;
        tracing::info!(
            path = %config.path.display(),
            poll_ms = poll.as_millis() as u64,
            "logging stacks"
        );

        let handle = std::thread::Builder::new()
            .name("stackscope-recorder".to_string())
            .spawn(move || capture_loop(file, source, poll, thread_stop))?;

        Ok(Self {
            stop,
            handle: Some(handle),
            path: config.path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Signals the capture thread, waits for it to exit, and returns the
    /// number of samples written.
    pub fn stop(mut self) -> StackscopeResult<usize> {
        self.stop.store(true, Ordering::Relaxed);
        let Some(handle) = self.handle.take() else {
            return Ok(0);
        };
        let samples = handle
            .join()
            .map_err(|_| StackscopeError::Record("recorder thread panicked".to_string()))?;
        tracing::info!(samples, path = %self.path.display(), "recorder stopped");
        Ok(samples)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn capture_loop<S: StackSource>(
    file: File,
    mut source: S,
    poll: Duration,
    stop: Arc<AtomicBool>,
) -> usize {
    const STOP_CHECK: Duration = Duration::from_millis(10);

    let mut out = BufWriter::new(file);
    let mut samples = 0usize;
    let mut next = Instant::now() + poll;

    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let now = Instant::now();
        if now < next {
            std::thread::sleep(STOP_CHECK.min(next - now));
            continue;
        }
        next += poll;

        let dump = match source.capture() {
            Ok(dump) => dump,
            Err(err) => {
                tracing::warn!("stack capture failed, skipping tick: {err}");
                continue;
            }
        };
        let timestamp_ns = now_unix_ns();
        if let Err(err) = write_record(&mut out, timestamp_ns, &dump) {
            tracing::warn!("stack log write failed, stopping: {err}");
            break;
        }
        samples += 1;
    }

    if let Err(err) = out.flush() {
        tracing::warn!("stack log flush failed: {err}");
    }
    samples
}

fn now_unix_ns() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp_nanos() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_samples;
    use std::io::BufReader;

    const DUMP: &str = "goroutine 1 [running]:\n\
main.calcPI(0x1)\n\
\t/app/main.go:17 +0x5e\n";

    fn temp_log(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("stackscope-{name}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir.join("stack.log")
    }

    #[test]
    fn records_parseable_samples_until_stopped() {
        let path = temp_log("records");
        let config = RecorderConfig {
            path: path.clone(),
            poll: Duration::from_millis(5),
        };
        let source = || -> StackscopeResult<String> { Ok(DUMP.to_string()) };
        let recorder = Recorder::start(config, source).expect("start");
        std::thread::sleep(Duration::from_millis(100));
        let written = recorder.stop().expect("stop");
        assert!(written >= 1, "no samples written");

        let file = std::fs::File::open(&path).expect("open");
        let samples = read_samples(BufReader::new(file)).expect("read");
        assert_eq!(samples.len(), written);
        assert_eq!(samples[0].goroutines[0].stack[0].name, "main.calcPI");
    }

    #[test]
    fn failing_source_skips_ticks_but_stops_cleanly() {
        let path = temp_log("failing");
        let config = RecorderConfig {
            path: path.clone(),
            poll: Duration::from_millis(5),
        };
        let source =
            || -> StackscopeResult<String> { Err(StackscopeError::Record("endpoint down".to_string())) };
        let recorder = Recorder::start(config, source).expect("start");
        std::thread::sleep(Duration::from_millis(30));
        let written = recorder.stop().expect("stop");
        assert_eq!(written, 0);

        let file = std::fs::File::open(&path).expect("open");
        let samples = read_samples(BufReader::new(file)).expect("read");
        assert!(samples.is_empty());
    }

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = RecorderConfig::default();
        assert_eq!(config.path, PathBuf::from("stack.log"));
        assert_eq!(config.poll, Duration::from_millis(125));
    }
}
