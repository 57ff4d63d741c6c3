//! Indented text report for a reconstructed timeline.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{GoroutineTimeline, Timeline, format_duration_ns};

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Spans with fewer samples than this are hidden from the text report.
    /// Display-only; the timeline itself is not mutated.
    pub min_samples: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { min_samples: 2 }
    }
}

/// Renders the per-goroutine, per-layer call listing with durations and
/// sample counts.
pub fn render_text(tl: &Timeline, opts: &RenderOptions) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} samples over {} (started {})\n",
        tl.samples,
        format_duration_ns(tl.duration_ns()),
        start_stamp(tl)
    ));

    for gt in tl.goroutines.values() {
        out.push('\n');
        out.push_str(&format!("goroutine {} ({})\n", gt.id, origin(gt)));
        for (depth, layer) in gt.layers.iter().enumerate() {
            for span in &layer.calls {
                if span.samples < opts.min_samples {
                    continue;
                }
                out.push_str(&format!(
                    " {}{} execution time: {} ({} samples)\n",
                    " ".repeat(depth),
                    span.name,
                    format_duration_ns(span.duration_ns()),
                    span.samples
                ));
            }
        }
    }

    out
}

fn origin(gt: &GoroutineTimeline) -> String {
    match &gt.created_by {
        Some(creator) => format!("created by {}", creator.name),
        None => gt.state.clone(),
    }
}

fn start_stamp(tl: &Timeline) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(tl.start_ns as i128)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| tl.start_ns.to_string())
}
