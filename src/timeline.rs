//! Timeline reconstruction from ordered stack samples.
//!
//! Merges a time-ordered sequence of whole-process stack captures into a
//! per-goroutine, per-depth sequence of call spans. Call identity across
//! samples is syntactic (name, package, argument values), so boundaries are
//! heuristic: a span's duration is bounded below by the samples that observed
//! it and closed at the last time it was actually seen.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::{Args, Call, StackSample};

/// Goroutine creators whose work is sampling/profiling infrastructure noise:
/// signal handling init, tracing init, the stack logger itself, logging
/// library init, and driver RPC plumbing.
pub fn suggested_ignore() -> Vec<String> {
    [
        "signal.init.0",
        "trace.Start",
        "stacklog.Start",
        "glog.init.0",
        "klog.init.0",
        "localbinary.(*Plugin).AttachStream",
        "rpc.(*DefaultRPCClientDriverFactory).NewRPCClientDriver",
        "http.(*http2Transport).newClientConn",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Creator functions (`pkg.Func` form) whose goroutines are skipped.
    pub ignore_creators: Vec<String>,
    /// Until a span has this many samples, a same-name frame continues it
    /// even when the argument values differ.
    pub args_confirm_samples: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            ignore_creators: suggested_ignore(),
            args_confirm_samples: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub start_ns: i64,
    pub end_ns: i64,
    pub samples: usize,
    pub goroutines: BTreeMap<u64, GoroutineTimeline>,
}

impl Timeline {
    pub fn duration_ns(&self) -> u64 {
        self.end_ns.saturating_sub(self.start_ns).max(0) as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoroutineTimeline {
    pub id: u64,
    pub state: String,
    pub created_by: Option<Call>,
    pub layers: Vec<Layer>,
}

/// Call spans observed at one stack depth, in time order. Index 0 is the
/// outermost retained depth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layer {
    pub calls: Vec<CallSpan>,
}

/// A reconstructed interval during which one frame is believed active.
/// `end_ns: None` means the span is still open; every span is closed by the
/// time `build_timeline` returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSpan {
    pub name: String,
    pub package: String,
    pub args: Args,
    pub start_ns: u64,
    pub end_ns: Option<u64>,
    pub samples: usize,
    #[serde(skip)]
    last_seen_ns: i64,
}

impl CallSpan {
    fn open(call: &Call, start_ns: u64, seen_ns: i64) -> Self {
        Self {
            name: call.name.clone(),
            package: call.package.clone(),
            args: call.args.clone(),
            start_ns,
            end_ns: None,
            samples: 1,
            last_seen_ns: seen_ns,
        }
    }

    pub fn duration_ns(&self) -> u64 {
        self.end_ns
            .unwrap_or(self.start_ns)
            .saturating_sub(self.start_ns)
    }
}

/// Builds a timeline from samples ordered by time ascending.
///
/// Panics if `samples` is empty; callers guard against empty logs.
pub fn build_timeline(samples: &[StackSample], opts: &BuildOptions) -> Timeline {
    assert!(!samples.is_empty(), "build_timeline requires at least one sample");

    let start = samples[0].time_ns;
    let mut tl = Timeline {
        start_ns: start,
        end_ns: samples[samples.len() - 1].time_ns,
        samples: 0,
        goroutines: BTreeMap::new(),
    };

    for sample in samples {
        tl.samples += 1;
        for g in &sample.goroutines {
            if let Some(creator) = &g.created_by {
                if opts.ignore_creators.iter().any(|i| i == &creator.name) {
                    continue;
                }
            }
            let gt = tl
                .goroutines
                .entry(g.id)
                .or_insert_with(|| GoroutineTimeline {
                    id: g.id,
                    state: g.state.clone(),
                    created_by: g.created_by.clone(),
                    layers: Vec::new(),
                });

            let stack_len = g.stack.len();
            for (depth, call) in g.stack.iter().enumerate() {
                if internal_call(call) {
                    continue;
                }
                // Frame 0 is the top of the stack, so it maps to the deepest
                // level; the outermost frame maps to level 0. Levels are
                // computed on the unfiltered stack, so skipped frames leave
                // their layer untouched.
                let level = stack_len - depth - 1;
                let span = CallSpan::open(call, (sample.time_ns - start).max(0) as u64, sample.time_ns);

                if level >= gt.layers.len() {
                    while gt.layers.len() <= level {
                        gt.layers.push(Layer::default());
                    }
                    gt.layers[level].calls = vec![span];
                    continue;
                }
                let calls = &mut gt.layers[level].calls;
                match calls.last_mut() {
                    None => calls.push(span),
                    Some(last)
                        if last.end_ns.is_none()
                            && last.name == span.name
                            && (last.samples < opts.args_confirm_samples
                                || last.args == span.args) =>
                    {
                        last.samples += 1;
                        last.last_seen_ns = sample.time_ns;
                    }
                    Some(last) => {
                        // Close at the last time the call was actually seen,
                        // not the current sample time: err toward the smaller
                        // duration given the sampling granularity.
                        last.end_ns = Some((last.last_seen_ns - start).max(0) as u64);
                        calls.push(span);
                    }
                }
            }
        }
    }

    // Close any trailing open spans.
    for gt in tl.goroutines.values_mut() {
        for layer in &mut gt.layers {
            if let Some(last) = layer.calls.last_mut() {
                if last.end_ns.is_none() {
                    last.end_ns = Some((last.last_seen_ns - start).max(0) as u64);
                }
            }
        }
    }

    tl
}

/// Runtime plumbing excluded from timelines: raw syscalls and unexported
/// standard-library frames. Exported stdlib entry points stay visible so that
/// library calls the user made directly still show up.
fn internal_call(call: &Call) -> bool {
    if call.package == "syscall" {
        return true;
    }
    if call.is_exported() {
        return false;
    }
    call.is_stdlib()
}
