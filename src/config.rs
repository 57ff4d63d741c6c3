//! `stackscope.toml` config loading.

use serde::{Deserialize, Serialize};

use std::path::Path;
use std::time::Duration;

use crate::{BuildOptions, RenderOptions, ScopeDuration, SimplifyOptions, suggested_ignore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reporter {
    Pretty,
    Json,
}

impl clap::ValueEnum for Reporter {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Pretty, Self::Json]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Pretty => clap::builder::PossibleValue::new("pretty"),
            Self::Json => clap::builder::PossibleValue::new("json"),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Default capture interval for `record`.
    #[serde(default = "default_poll")]
    pub poll: ScopeDuration,

    /// Replaces the built-in creator ignore set when present.
    #[serde(default)]
    pub ignore_creators: Option<Vec<String>>,

    /// Appended to the active creator ignore set.
    #[serde(default)]
    pub extra_ignore_creators: Vec<String>,

    /// Significance ratio for the simplifier.
    #[serde(default = "default_significance_factor")]
    pub significance_factor: usize,

    /// Samples before a span's argument values must match to continue it.
    #[serde(default = "default_args_confirm_samples")]
    pub args_confirm_samples: usize,

    /// Spans below this sample count are hidden from text reports.
    #[serde(default = "default_min_render_samples")]
    pub min_render_samples: usize,

    /// Default reporter for CLI commands.
    #[serde(default = "default_reporter")]
    pub reporter: Reporter,
}

fn default_poll() -> ScopeDuration {
    ScopeDuration(Duration::from_millis(125))
}

fn default_significance_factor() -> usize {
    250
}

fn default_args_confirm_samples() -> usize {
    3
}

fn default_min_render_samples() -> usize {
    2
}

fn default_reporter() -> Reporter {
    Reporter::Pretty
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll: default_poll(),
            ignore_creators: None,
            extra_ignore_creators: Vec::new(),
            significance_factor: default_significance_factor(),
            args_confirm_samples: default_args_confirm_samples(),
            min_render_samples: default_min_render_samples(),
            reporter: default_reporter(),
        }
    }
}

impl Config {
    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// The active creator ignore set: the configured override or the built-in
    /// default, plus any extras.
    pub fn active_ignore_creators(&self) -> Vec<String> {
        let mut out = self
            .ignore_creators
            .clone()
            .unwrap_or_else(suggested_ignore);
        out.extend(self.extra_ignore_creators.iter().cloned());
        out
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            ignore_creators: self.active_ignore_creators(),
            args_confirm_samples: self.args_confirm_samples,
        }
    }

    pub fn simplify_options(&self) -> SimplifyOptions {
        SimplifyOptions {
            significance_factor: self.significance_factor,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            min_samples: self.min_render_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.poll.0, Duration::from_millis(125));
        assert_eq!(cfg.significance_factor, 250);
        assert_eq!(cfg.args_confirm_samples, 3);
        assert_eq!(cfg.min_render_samples, 2);
        assert!(cfg.active_ignore_creators().contains(&"glog.init.0".to_string()));
    }

    #[test]
    fn override_replaces_and_extras_extend() {
        let cfg: Config = toml::from_str(
            r#"
            ignore_creators = ["custom.init"]
            extra_ignore_creators = ["other.Start"]
            "#,
        )
        .expect("parse");
        let active = cfg.active_ignore_creators();
        assert_eq!(active, vec!["custom.init".to_string(), "other.Start".to_string()]);
    }

    #[test]
    fn partial_files_fall_back_to_field_defaults() {
        let cfg: Config = toml::from_str("significance_factor = 100\n").expect("parse");
        assert_eq!(cfg.significance_factor, 100);
        assert_eq!(cfg.poll.0, Duration::from_millis(125));
        assert_eq!(cfg.reporter, Reporter::Pretty);
    }
}
