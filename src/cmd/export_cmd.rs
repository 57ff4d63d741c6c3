//! `stackscope export`: machine-readable outputs from a stack log.

use clap::Args;
use serde::{Deserialize, Serialize};

use std::path::PathBuf;

use crate::{
    Config, StackscopeError, StackscopeResult, build_timeline, folded_stacks, folded_to_text,
    timeline_to_json, write_text,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// The full reconstructed (unsimplified) timeline as JSON.
    Json,
    /// Collapsed `frame;frame;... count` rows for flamegraph tooling.
    Folded,
}

impl clap::ValueEnum for ExportFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Folded]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Json => clap::builder::PossibleValue::new("json"),
            Self::Folded => clap::builder::PossibleValue::new("folded"),
        })
    }
}

#[derive(Debug, Args)]
pub struct ExportOptions {
    /// Stack log produced by `stackscope record`.
    pub log: PathBuf,
    #[arg(long)]
    pub format: ExportFormat,
    /// Write the export here in addition to echoing it.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// On a malformed log, continue with the samples parsed before the error.
    #[arg(long)]
    pub allow_partial: bool,
}

pub fn export_command(config: &Config, opts: &ExportOptions) -> StackscopeResult<serde_json::Value> {
    let samples = super::load_samples(&opts.log, opts.allow_partial)?;

    let content = match opts.format {
        ExportFormat::Json => {
            if samples.is_empty() {
                return Err(StackscopeError::InvalidArgument(format!(
                    "{}: log contains no samples",
                    opts.log.display()
                )));
            }
            let timeline = build_timeline(&samples, &config.build_options());
            timeline_to_json(&timeline)?
        }
        ExportFormat::Folded => {
            folded_to_text(&folded_stacks(&samples, &config.active_ignore_creators()))
        }
    };

    if let Some(out) = &opts.out {
        write_text(out, &content)?;
    }

    Ok(serde_json::json!({
        "schemaVersion": "stackscope.export.v1",
        "log": opts.log,
        "format": opts.format,
        "out": opts.out,
        "content": content,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write_record;

    const DUMP: &str = "goroutine 1 [running]:\n\
main.calcPI(0x1)\n\
\t/app/main.go:17 +0x5e\n\
main.main()\n\
\t/app/main.go:9 +0x3a\n";

    fn write_log(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("stackscope-export-{name}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("stack.log");
        let mut buf = Vec::new();
        write_record(&mut buf, 1_000, DUMP).expect("frame");
        write_record(&mut buf, 51_000_000, DUMP).expect("frame");
        std::fs::write(&path, &buf).expect("write");
        path
    }

    #[test]
    fn folded_export_collapses_stacks() {
        let opts = ExportOptions {
            log: write_log("folded"),
            format: ExportFormat::Folded,
            out: None,
            allow_partial: false,
        };
        let value = export_command(&Config::default(), &opts).expect("export");
        assert_eq!(
            value["content"].as_str().expect("content"),
            "main.main;main.calcPI 2\n"
        );
    }

    #[test]
    fn json_export_writes_the_requested_file() {
        let log = write_log("json");
        let out = log.with_file_name("timeline.json");
        let opts = ExportOptions {
            log,
            format: ExportFormat::Json,
            out: Some(out.clone()),
            allow_partial: false,
        };
        export_command(&Config::default(), &opts).expect("export");

        let written = std::fs::read_to_string(&out).expect("read back");
        let timeline: serde_json::Value = serde_json::from_str(&written).expect("json");
        assert_eq!(timeline["samples"], 2);
        assert_eq!(
            timeline["goroutines"]["1"]["layers"][0]["calls"][0]["name"],
            "main.main"
        );
    }
}
