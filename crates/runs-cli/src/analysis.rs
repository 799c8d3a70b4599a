//! Reports that look across the commands of many runs.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use tracing::debug;

use runs_model::command::strip_prefix;
use runs_model::correlation::rank_options;
use runs_model::{Command, CrossSpec, RunEntry, DEFAULT_DELIMITER};

use crate::app::{query, App};

/// Arguments for summarising runs as a cross-product spec
#[derive(Args, Debug)]
pub struct ToJsonArgs {
    /// Runs to summarise; all runs when omitted
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Skip runs matching this pattern
    #[arg(long = "unless", value_name = "PATTERN")]
    pub unless: Vec<String>,

    /// Leave this arg or flag out of the spec
    #[arg(long = "exclude", value_name = "KEY", allow_hyphen_values = true)]
    pub exclude: Vec<String>,

    /// Prefix stripped from every command (defaults to the configured prefix)
    #[arg(long = "prefix", value_name = "PREFIX", allow_hyphen_values = true)]
    pub prefix: Option<String>,
}

impl ToJsonArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let entries = query(&app.open_db()?, &self.patterns, &self.unless)?;
        let prefix = self.prefix.as_deref().unwrap_or(&app.config.prefix);
        let spec = cross_spec(&entries, prefix, &self.exclude)?;
        app.ui().print(serde_json::to_string_pretty(&spec)?)?;
        Ok(())
    }
}

fn cross_spec(entries: &[RunEntry], prefix: &str, exclude: &[String]) -> Result<CrossSpec> {
    let commands: Vec<Command> = entries
        .iter()
        .map(|entry| Command::parse(strip_prefix(&entry.command, prefix)))
        .collect();
    Ok(CrossSpec::from_commands(&commands, exclude, DEFAULT_DELIMITER)?)
}

/// Arguments for printing the arg values seen across runs
#[derive(Args, Debug)]
pub struct FlagsArgs {
    /// Runs to inspect; all runs when omitted
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Skip runs matching this pattern
    #[arg(long = "unless", value_name = "PATTERN")]
    pub unless: Vec<String>,

    /// Prefix stripped from every command (defaults to the configured prefix)
    #[arg(long = "prefix", value_name = "PREFIX", allow_hyphen_values = true)]
    pub prefix: Option<String>,
}

impl FlagsArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let entries = query(&app.open_db()?, &self.patterns, &self.unless)?;
        let prefix = self.prefix.as_deref().unwrap_or(&app.config.prefix);
        let spec = cross_spec(&entries, prefix, &[])?;
        let mut ui = app.ui();
        for line in render_axes(&spec) {
            ui.print(line)?;
        }
        Ok(())
    }
}

const ABSENT: &str = "<absent>";

/// `key: v1 v2 ..` for every arg, then `flags: a | b ..` for the bare-flag alternatives.
fn render_axes(spec: &CrossSpec) -> Vec<String> {
    let mut lines: Vec<String> = spec
        .args
        .iter()
        .map(|(key, values)| {
            let values: Vec<String> = values
                .iter()
                .map(|value| match value {
                    Value::Null => ABSENT.to_string(),
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            format!("{key}: {}", values.join(" "))
        })
        .collect();

    if !spec.flags.is_empty() {
        let alternatives: Vec<String> = spec
            .flags
            .iter()
            .map(|alt| match alt.as_slice() {
                [] => ABSENT.to_string(),
                flags => flags.join(" "),
            })
            .collect();
        lines.push(format!("flags: {}", alternatives.join(" | ")));
    }
    lines
}

/// Arguments for correlating args with a per-run scalar
#[derive(Args, Debug)]
pub struct CorrelateArgs {
    /// Runs to include; all runs when omitted
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// File holding each run's value; `<path>` and `<name>` are substituted
    #[arg(long = "value-path", value_name = "TEMPLATE")]
    pub value_path: String,

    /// Skip runs matching this pattern
    #[arg(long = "unless", value_name = "PATTERN")]
    pub unless: Vec<String>,
}

impl CorrelateArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let entries = query(&app.open_db()?, &self.patterns, &self.unless)?;
        let samples: Vec<(Command, f64)> = entries
            .iter()
            .filter_map(|entry| {
                let file = entry.path.substitute(&self.value_path);
                match read_value(&file) {
                    Ok(value) => Some((Command::parse(&entry.command), value)),
                    Err(e) => {
                        debug!(path = %entry.path, error = %e, "Skipping run without a value");
                        None
                    }
                }
            })
            .collect();

        let mut ui = app.ui();
        for (token, coefficient) in rank_options(&samples) {
            ui.print(format!("{coefficient:+.4} {token}"))?;
        }
        Ok(())
    }
}

fn read_value(file: &str) -> Result<f64> {
    let raw = std::fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))?;
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("{file} does not hold a number"))
}
