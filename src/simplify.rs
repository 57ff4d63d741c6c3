//! Timeline condensation: drops sampling noise and pass-through wrapper
//! frames so the rendered report stays reviewable.

use crate::{GoroutineTimeline, Layer, Timeline};

#[derive(Debug, Clone)]
pub struct SimplifyOptions {
    /// A span is kept only when `samples * significance_factor` reaches the
    /// timeline's total sample count. The default keeps spans covering at
    /// least ~0.4% of all samples; below that a span is more likely sampling
    /// noise than a real duration.
    pub significance_factor: usize,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        Self {
            significance_factor: 250,
        }
    }
}

/// Produces a condensed copy of a built timeline. `start_ns`, `end_ns` and
/// `samples` still describe the original capture, not the filtered view.
pub fn simplify_timeline(tl: &Timeline, opts: &SimplifyOptions) -> Timeline {
    let mut goroutines = std::collections::BTreeMap::new();

    for (gid, gt) in &tl.goroutines {
        let mut layers = Vec::new();
        for (depth, layer) in gt.layers.iter().enumerate() {
            let mut calls = Vec::new();
            for span in &layer.calls {
                if span.samples * opts.significance_factor < tl.samples {
                    tracing::debug!(
                        goroutine = gid,
                        name = %span.name,
                        samples = span.samples,
                        "dropping span below significance threshold"
                    );
                    continue;
                }
                // Interior layers only: a span indistinguishable in time and
                // package from one in the shallower layer is a pass-through
                // wrapper.
                if depth > 0 && depth != gt.layers.len() - 1 {
                    let above = &gt.layers[depth - 1];
                    let duplicate = above.calls.iter().any(|oc| {
                        oc.start_ns == span.start_ns
                            && oc.end_ns == span.end_ns
                            && oc.package == span.package
                    });
                    if duplicate {
                        tracing::debug!(
                            goroutine = gid,
                            name = %span.name,
                            "dropping span overlapping its caller"
                        );
                        continue;
                    }
                }
                calls.push(span.clone());
            }
            if calls.is_empty() {
                tracing::debug!(
                    goroutine = gid,
                    depth,
                    "dropping layer with no significant calls"
                );
                continue;
            }
            layers.push(Layer { calls });
        }
        if layers.is_empty() {
            tracing::debug!(goroutine = gid, "dropping goroutine with no layers");
            continue;
        }
        goroutines.insert(
            *gid,
            GoroutineTimeline {
                id: gt.id,
                state: gt.state.clone(),
                created_by: gt.created_by.clone(),
                layers,
            },
        );
    }

    tracing::debug!(
        before = tl.goroutines.len(),
        after = goroutines.len(),
        "simplified timeline"
    );
    Timeline {
        start_ns: tl.start_ns,
        end_ns: tl.end_ns,
        samples: tl.samples,
        goroutines,
    }
}
