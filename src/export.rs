//! Machine-readable exports: timeline JSON and folded stacks for flamegraph
//! tooling.

use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::path::Path;

use crate::{StackSample, StackscopeResult, Timeline};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldedStack {
    pub stack: String,
    pub weight: u64,
}

/// Collapses raw samples into `outermost;...;innermost count` rows, one per
/// distinct stack. The creator-ignore set applies (the same infrastructure
/// noise the timeline suppresses); the internal-frame filter does not, so the
/// collapse is a full-fidelity view of what was captured.
pub fn folded_stacks(samples: &[StackSample], ignore_creators: &[String]) -> Vec<FoldedStack> {
    let mut weights = HashMap::<String, u64>::new();
    for sample in samples {
        for g in &sample.goroutines {
            if let Some(creator) = &g.created_by {
                if ignore_creators.iter().any(|i| i == &creator.name) {
                    continue;
                }
            }
            if g.stack.is_empty() {
                continue;
            }
            let key = g
                .stack
                .iter()
                .rev()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(";");
            *weights.entry(key).or_insert(0) += 1;
        }
    }

    let mut out: Vec<FoldedStack> = weights
        .into_iter()
        .map(|(stack, weight)| FoldedStack { stack, weight })
        .collect();
    out.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.stack.cmp(&b.stack)));
    out
}

pub fn folded_to_text(folded: &[FoldedStack]) -> String {
    if folded.is_empty() {
        return "# empty log: no stacks captured".to_string();
    }
    let mut out = String::new();
    for row in folded {
        out.push_str(&format!("{} {}\n", row.stack, row.weight));
    }
    out
}

pub fn timeline_to_json(tl: &Timeline) -> StackscopeResult<String> {
    Ok(serde_json::to_string_pretty(tl)?)
}

pub fn write_text(path: &Path, content: &str) -> StackscopeResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content.as_bytes())?;
    Ok(())
}
