//! `stackscope view`: reconstruct and render a timeline from a stack log.

use clap::Args;

use std::path::PathBuf;

use crate::{
    Config, Reporter, StackscopeError, StackscopeResult, build_timeline, render_text,
    simplify_timeline,
};

#[derive(Debug, Args)]
pub struct ViewOptions {
    /// Stack log produced by `stackscope record`.
    pub log: PathBuf,
    /// Output format (defaults to the configured reporter).
    #[arg(long)]
    pub format: Option<Reporter>,
    /// Skip simplification and show the full reconstructed timeline.
    #[arg(long)]
    pub raw: bool,
    /// Additional goroutine creators to ignore (pkg.Func), repeatable.
    #[arg(long = "ignore", value_name = "PKG.FUNC")]
    pub ignore: Vec<String>,
    /// Drop the built-in creator ignore set.
    #[arg(long)]
    pub no_default_ignore: bool,
    /// Hide spans with fewer samples from the text report.
    #[arg(long)]
    pub min_samples: Option<usize>,
    /// On a malformed log, continue with the samples parsed before the error.
    #[arg(long)]
    pub allow_partial: bool,
}

pub fn view_command(config: &Config, opts: &ViewOptions) -> StackscopeResult<serde_json::Value> {
    let samples = super::load_samples(&opts.log, opts.allow_partial)?;
    if samples.is_empty() {
        return Err(StackscopeError::InvalidArgument(format!(
            "{}: log contains no samples",
            opts.log.display()
        )));
    }

    let mut build = config.build_options();
    if opts.no_default_ignore {
        build.ignore_creators.clear();
    }
    build.ignore_creators.extend(opts.ignore.iter().cloned());

    let mut timeline = build_timeline(&samples, &build);
    if !opts.raw {
        timeline = simplify_timeline(&timeline, &config.simplify_options());
    }

    match opts.format.unwrap_or(config.reporter) {
        Reporter::Json => Ok(serde_json::json!({
            "schemaVersion": "stackscope.view.v1",
            "log": opts.log,
            "format": "json",
            "timeline": serde_json::to_value(&timeline)?,
        })),
        Reporter::Pretty => {
            let mut render = config.render_options();
            if let Some(min_samples) = opts.min_samples {
                render.min_samples = min_samples;
            }
            Ok(serde_json::json!({
                "schemaVersion": "stackscope.view.v1",
                "log": opts.log,
                "format": "pretty",
                "content": render_text(&timeline, &render),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write_record;
    use std::io::Write;

    const DUMP: &str = "goroutine 1 [running]:\n\
main.calcPI(0x1)\n\
\t/app/main.go:17 +0x5e\n";

    fn write_log(name: &str, records: &[(i64, &str)]) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("stackscope-view-{name}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("stack.log");
        let mut buf = Vec::new();
        for (ts, dump) in records {
            write_record(&mut buf, *ts, dump).expect("frame");
        }
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(&buf).expect("write");
        path
    }

    fn options(log: PathBuf) -> ViewOptions {
        ViewOptions {
            log,
            format: None,
            raw: true,
            ignore: Vec::new(),
            no_default_ignore: false,
            min_samples: Some(1),
            allow_partial: false,
        }
    }

    #[test]
    fn renders_a_pretty_report() {
        let log = write_log("pretty", &[(1_000, DUMP), (51_000_000, DUMP)]);
        let value = view_command(&Config::default(), &options(log)).expect("view");

        assert_eq!(value["format"], "pretty");
        let content = value["content"].as_str().expect("content");
        assert!(content.contains("main.calcPI"), "{content}");
        assert!(content.contains("2 samples"), "{content}");
    }

    #[test]
    fn empty_log_is_an_invalid_argument() {
        let log = write_log("empty", &[]);
        let err = view_command(&Config::default(), &options(log)).expect_err("must fail");
        assert!(matches!(err, StackscopeError::InvalidArgument(_)), "{err}");
    }

    #[test]
    fn allow_partial_recovers_prefix_samples() {
        let dir =
            std::env::temp_dir().join(format!("stackscope-view-partial-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("stack.log");
        let mut buf = Vec::new();
        write_record(&mut buf, 1_000, DUMP).expect("frame");
        buf.extend_from_slice(b"garbage timestamp\n");
        std::fs::write(&path, &buf).expect("write");

        let strict = view_command(&Config::default(), &options(path.clone()));
        assert!(strict.is_err());

        let mut opts = options(path);
        opts.allow_partial = true;
        let value = view_command(&Config::default(), &opts).expect("partial view");
        assert!(value["content"].as_str().expect("content").contains("1 samples"));
    }

    #[test]
    fn json_format_exposes_the_timeline_structure() {
        let log = write_log("json", &[(1_000, DUMP), (51_000_000, DUMP)]);
        let mut opts = options(log);
        opts.format = Some(Reporter::Json);
        let value = view_command(&Config::default(), &opts).expect("view");

        let spans = &value["timeline"]["goroutines"]["1"]["layers"][0]["calls"];
        assert_eq!(spans[0]["name"], "main.calcPI");
        assert_eq!(spans[0]["samples"], 2);
    }
}
