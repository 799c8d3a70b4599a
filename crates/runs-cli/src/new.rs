use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use runs_core::{description_header, EditorError, Transaction};
use runs_model::entry::COMMIT_MESSAGE;
use runs_model::{parse_specs, RunEntry, RunPath, ValidationError, DEFAULT_DELIMITER};

use crate::app::App;

/// Arguments for creating runs
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Path of each new run
    #[arg(long = "path", value_name = "PATH", required = true, num_args = 1..)]
    pub paths: Vec<String>,

    /// Command to run; one for every path, or a single command shared by all
    #[arg(long = "command", value_name = "COMMAND", required = true, num_args = 1..)]
    pub commands: Vec<String>,

    /// Description of each run; `commit-message` uses the last commit message
    #[arg(long = "description", value_name = "TEXT", num_args = 1..)]
    pub descriptions: Vec<String>,

    /// String prepended to every command (defaults to the configured prefix)
    #[arg(long = "prefix", value_name = "PREFIX", allow_hyphen_values = true)]
    pub prefix: Option<String>,

    /// Extra argument appended to every command; `<path>` and `<name>` are substituted
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl NewArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let paths = self
            .paths
            .iter()
            .map(RunPath::new)
            .collect::<runs_model::Result<Vec<_>>>()?;
        check_count("commands", self.commands.len(), paths.len(), false)?;
        check_count("descriptions", self.descriptions.len(), paths.len(), true)?;

        let builder = CommandBuilder::new(app, self.prefix, self.args);
        let runs = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| {
                let command = &self.commands[i.min(self.commands.len() - 1)];
                let full = builder.build(command, &path);
                (path, full)
            })
            .collect();

        create_runs(app, app.transaction()?, runs, &self.descriptions)
    }
}

/// Arguments for creating runs from a cross-product spec file
#[derive(Args, Debug)]
pub struct FromJsonArgs {
    /// Parent path; runs are created at PATH/0 .. PATH/n-1
    #[arg(value_name = "PATH")]
    pub path: String,

    /// JSON file holding a spec object or an array of them
    #[arg(value_name = "SPEC")]
    pub spec: PathBuf,

    /// String prepended to every command (defaults to the configured prefix)
    #[arg(long = "prefix", value_name = "PREFIX", allow_hyphen_values = true)]
    pub prefix: Option<String>,

    /// Description shared by every run; `commit-message` uses the last commit message
    #[arg(long = "description", value_name = "TEXT")]
    pub description: Option<String>,

    /// Create at most N runs, sampled at random from the expansion
    #[arg(long = "max-runs", value_name = "N")]
    pub max_runs: Option<usize>,

    /// Extra argument appended to every command; `<path>` and `<name>` are substituted
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl FromJsonArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let base = RunPath::new(&self.path)?;
        let json = std::fs::read_to_string(&self.spec)
            .with_context(|| format!("Failed to read spec file {}", self.spec.display()))?;

        let builder = CommandBuilder::new(app, self.prefix, self.args);
        let runs = plan_from_json(&base, &json, &builder, self.max_runs)?;

        let descriptions: Vec<String> = self.description.into_iter().collect();
        create_runs(app, app.transaction()?, runs, &descriptions)
    }
}

/// One `(PATH/i, command)` per expansion of the specs in `json`, in file
/// order and numbered after sampling down to `max_runs`.
fn plan_from_json(
    base: &RunPath,
    json: &str,
    builder: &CommandBuilder,
    max_runs: Option<usize>,
) -> Result<Vec<(RunPath, String)>> {
    let mut commands = Vec::new();
    for spec in parse_specs(json)? {
        commands.extend(spec.expand(DEFAULT_DELIMITER)?);
    }

    sample(commands, max_runs)
        .iter()
        .enumerate()
        .map(|(i, command)| {
            let path = base.join(i.to_string())?;
            let full = builder.build(command, &path);
            Ok((path, full))
        })
        .collect()
}

/// Assembles `prefix command [flags] args` for one run.
struct CommandBuilder {
    prefix: String,
    /// Config `[flags]` followed by `--arg` values, unsubstituted.
    extra: Vec<String>,
}

impl CommandBuilder {
    fn new(app: &App, prefix: Option<String>, args: Vec<String>) -> Self {
        let mut extra = app.config.flags.clone();
        extra.extend(args);
        Self {
            prefix: prefix.unwrap_or_else(|| app.config.prefix.clone()),
            extra,
        }
    }

    fn build(&self, command: &str, path: &RunPath) -> String {
        let extra = self.extra.iter().map(|arg| path.substitute(arg));
        [self.prefix.clone(), command.to_string()]
            .into_iter()
            .chain(extra)
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `actual` must be 1 or `paths`; 0 is also allowed when `optional`.
fn check_count(what: &str, actual: usize, paths: usize, optional: bool) -> Result<()> {
    if actual == 1 || actual == paths || (optional && actual == 0) {
        return Ok(());
    }
    let expected = if optional {
        format!("0, 1 or {paths}")
    } else {
        format!("1 or {paths}")
    };
    Err(ValidationError::MismatchedArguments {
        what: what.to_string(),
        expected,
        actual,
    }
    .into())
}

/// Keep `max` commands chosen uniformly without replacement, in their original order.
fn sample(commands: Vec<String>, max: Option<usize>) -> Vec<String> {
    let Some(max) = max.filter(|max| *max < commands.len()) else {
        return commands;
    };
    let mut chosen = rand::seq::index::sample(&mut rand::rng(), commands.len(), max).into_vec();
    chosen.sort_unstable();
    chosen.into_iter().map(|i| commands[i].clone()).collect()
}

/// Queue one new run per `(path, command)` and commit.
///
/// `descriptions` holds none (ask the editor once for all runs), one (shared)
/// or one per run.
fn create_runs(
    app: &App,
    mut tx: Transaction,
    runs: Vec<(RunPath, String)>,
    descriptions: &[String],
) -> Result<()> {
    if runs.is_empty() {
        return Err(ValidationError::EmptyQuery("new".to_string()).into());
    }

    let descriptions = match descriptions {
        [] => vec![ask_description(&tx, &runs)?],
        given => given
            .iter()
            .map(|d| resolve_description(&tx, d))
            .collect::<Result<Vec<_>>>()?,
    };
    let commit = tx
        .env()
        .repo
        .last_commit()
        .context("Failed to read the current commit")?;

    for (i, (path, command)) in runs.into_iter().enumerate() {
        let description = &descriptions[i.min(descriptions.len() - 1)];
        tx.add_run(RunEntry {
            path,
            command,
            commit: commit.clone(),
            datetime: app.now().to_string(),
            description: description.clone(),
        })?;
    }
    tx.commit()?;
    Ok(())
}

/// Replace the `commit-message` sentinel by the last commit message.
pub fn resolve_description(tx: &Transaction, description: &str) -> Result<String> {
    if description != COMMIT_MESSAGE {
        return Ok(description.to_string());
    }
    tx.env()
        .repo
        .last_commit_message()
        .context("Failed to read the last commit message")
}

/// One editor session whose result is shared by every new run.
fn ask_description(tx: &Transaction, runs: &[(RunPath, String)]) -> Result<String> {
    let paths: Vec<&str> = runs.iter().map(|(path, _)| path.as_str()).collect();
    let command = runs.first().map(|(_, c)| c.as_str()).unwrap_or_default();
    let header = description_header(&paths.join(", "), command);
    match tx.env().editor.edit(&header, "") {
        Ok(description) => Ok(description),
        Err(EditorError::EmptyDescription) => Err(runs_core::Error::UserCancelled(
            "empty description".to_string(),
        )
        .into()),
        Err(e) => Err(runs_core::Error::from(e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn app_with_config(tmp: &TempDir, content: &str) -> App {
        std::fs::write(tmp.path().join(crate::config::CONFIG_FILE), content).unwrap();
        App::new(Config::load_or_init(tmp.path()).unwrap(), true, true)
    }

    #[test]
    fn test_command_builder_prefix_flags_and_args() {
        let tmp = TempDir::new().unwrap();
        let app = app_with_config(
            &tmp,
            "[main]\nprefix = nice\n\n[flags]\n--logdir = logs/<path>\n--cuda =\n",
        );
        let builder = CommandBuilder::new(&app, None, vec!["--name=<name>".to_string()]);
        let path = RunPath::new("sweep/lr1").unwrap();

        assert_eq!(
            builder.build("python train.py", &path),
            "nice python train.py --logdir=logs/sweep/lr1 --cuda --name=lr1"
        );
    }

    #[test]
    fn test_command_builder_explicit_empty_prefix() {
        let tmp = TempDir::new().unwrap();
        let app = app_with_config(&tmp, "[main]\nprefix = nice\n");
        let builder = CommandBuilder::new(&app, Some(String::new()), Vec::new());
        let path = RunPath::new("a").unwrap();

        assert_eq!(builder.build("  python train.py ", &path), "python train.py");
    }

    #[test]
    fn test_check_count() {
        assert!(check_count("commands", 1, 3, false).is_ok());
        assert!(check_count("commands", 3, 3, false).is_ok());
        assert!(check_count("descriptions", 0, 3, true).is_ok());

        let err = check_count("commands", 2, 3, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::MismatchedArguments { actual: 2, .. })
        ));
        assert!(check_count("commands", 0, 3, false).is_err());
    }

    #[test]
    fn test_sample_keeps_order_and_size() {
        let commands: Vec<String> = (0..10).map(|i| format!("run --seed={i}")).collect();

        let sampled = sample(commands.clone(), Some(4));
        assert_eq!(sampled.len(), 4);
        let positions: Vec<usize> = sampled
            .iter()
            .map(|c| commands.iter().position(|x| x == c).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert_eq!(sample(commands.clone(), Some(20)), commands);
        assert_eq!(sample(commands.clone(), None), commands);
    }

    fn planned(runs: &[(RunPath, String)]) -> Vec<(&str, &str)> {
        runs.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect()
    }

    #[test]
    fn test_plan_from_json_numbers_the_expansion() {
        let tmp = TempDir::new().unwrap();
        let app = app_with_config(&tmp, "[main]\nprefix =\n");
        let builder = CommandBuilder::new(&app, None, Vec::new());
        let base = RunPath::new("x").unwrap();
        let json = r#"{ "command": "run", "args": { "--lr": [0.1, 0.2], "--seed": [0, 1] } }"#;

        let runs = plan_from_json(&base, json, &builder, None).unwrap();
        assert_eq!(
            planned(&runs),
            vec![
                ("x/0", "run --lr=0.1 --seed=0"),
                ("x/1", "run --lr=0.1 --seed=1"),
                ("x/2", "run --lr=0.2 --seed=0"),
                ("x/3", "run --lr=0.2 --seed=1"),
            ]
        );
    }

    #[test]
    fn test_plan_from_json_concatenates_specs_and_builds_commands() {
        let tmp = TempDir::new().unwrap();
        let app = app_with_config(&tmp, "[main]\nprefix = nice\n");
        let builder = CommandBuilder::new(&app, None, vec!["--out=<path>".to_string()]);
        let base = RunPath::new("sweep").unwrap();
        let json = r#"[
            { "command": "train", "args": { "--lr": [1, 2] } },
            { "command": "eval", "flags": [["--fast"], []] }
        ]"#;

        let runs = plan_from_json(&base, json, &builder, None).unwrap();
        assert_eq!(
            planned(&runs),
            vec![
                ("sweep/0", "nice train --lr=1 --out=sweep/0"),
                ("sweep/1", "nice train --lr=2 --out=sweep/1"),
                ("sweep/2", "nice eval --fast --out=sweep/2"),
                ("sweep/3", "nice eval --out=sweep/3"),
            ]
        );
    }

    #[test]
    fn test_plan_from_json_samples_before_numbering() {
        let tmp = TempDir::new().unwrap();
        let app = app_with_config(&tmp, "[main]\nprefix =\n");
        let builder = CommandBuilder::new(&app, None, Vec::new());
        let base = RunPath::new("x").unwrap();
        let json = r#"{ "command": "run", "args": { "--seed": [0, 1, 2, 3, 4, 5] } }"#;

        let runs = plan_from_json(&base, json, &builder, Some(2)).unwrap();
        let paths: Vec<&str> = runs.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["x/0", "x/1"]);

        let all = plan_from_json(&base, json, &builder, None).unwrap();
        let all_commands: Vec<&String> = all.iter().map(|(_, c)| c).collect();
        let positions: Vec<usize> = runs
            .iter()
            .map(|(_, c)| all_commands.iter().position(|x| *x == c).unwrap())
            .collect();
        assert!(positions[0] < positions[1]);

        assert!(plan_from_json(&base, "[1]", &builder, None).is_err());
    }
}
