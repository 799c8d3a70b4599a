//! Cross-product specs: compress a family of commands into one JSON object
//! and expand it back.
//!
//! ```json
//! { "command": "python train.py",
//!   "args": { "--lr": [0.1, 0.2], "--seed": [0, 1] },
//!   "flags": [["--cuda"], []] }
//! ```
//!
//! Expansion takes the Cartesian product of every arg's values and every
//! bare-flag alternative. A `null` value stands for "key absent".

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::command::Command;
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSpec {
    pub command: String,
    #[serde(default)]
    pub args: BTreeMap<String, Vec<Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<Vec<String>>,
}

impl CrossSpec {
    /// Build the spec covering `commands`, ignoring args and flags whose key is in `exclude`.
    ///
    /// Every command must have the same positional stem.
    pub fn from_commands(
        commands: &[Command],
        exclude: &[String],
        delimiter: char,
    ) -> crate::Result<Self> {
        let Some(first) = commands.first() else {
            return Err(ValidationError::EmptyQuery("to-json".to_string()));
        };
        let stem = first.stem();
        let excluded = |key: &str| exclude.iter().any(|e| e == key);

        let mut per_command: Vec<BTreeMap<&str, &str>> = Vec::with_capacity(commands.len());
        let mut flag_sets: Vec<Vec<String>> = Vec::new();

        for command in commands {
            let other = command.stem();
            if other != stem {
                return Err(ValidationError::HeterogeneousStems { first: stem, other });
            }

            per_command.push(
                command
                    .key_values(delimiter)
                    .into_iter()
                    .filter(|(key, _)| !excluded(*key))
                    .collect(),
            );

            let flags: Vec<String> = command
                .flags(delimiter)
                .into_iter()
                .filter(|flag| !excluded(*flag))
                .map(str::to_string)
                .collect();
            if !flag_sets.contains(&flags) {
                flag_sets.push(flags);
            }
        }

        let keys: BTreeSet<&str> = per_command.iter().flat_map(|m| m.keys().copied()).collect();
        let mut args = BTreeMap::new();
        for key in keys {
            let mut values: Vec<Value> = Vec::new();
            let mut absent = false;
            for map in &per_command {
                match map.get(key) {
                    Some(raw) => {
                        let value = to_value(raw);
                        if !values.contains(&value) {
                            values.push(value);
                        }
                    }
                    None => absent = true,
                }
            }
            if absent {
                values.push(Value::Null);
            }
            args.insert(key.to_string(), values);
        }

        // A family without any bare flag needs no flag axis.
        if flag_sets.len() == 1 && flag_sets[0].is_empty() {
            flag_sets.clear();
        }

        Ok(Self {
            command: stem,
            args,
            flags: flag_sets,
        })
    }

    /// Expand into the full Cartesian product of command strings.
    pub fn expand(&self, delimiter: char) -> crate::Result<Vec<String>> {
        let mut axes: Vec<Vec<Option<String>>> = Vec::new();

        for (key, values) in &self.args {
            if values.is_empty() {
                return Err(ValidationError::invalid_spec(format!(
                    "arg '{key}' has no values"
                )));
            }
            let mut axis = Vec::with_capacity(values.len());
            for value in values {
                axis.push(render_value(value)?.map(|v| format!("{key}{delimiter}{v}")));
            }
            axes.push(axis);
        }

        let flag_axis: Vec<Option<String>> = if self.flags.is_empty() {
            vec![None]
        } else {
            self.flags
                .iter()
                .map(|alt| (!alt.is_empty()).then(|| alt.join(" ")))
                .collect()
        };
        axes.push(flag_axis);

        let mut combos: Vec<Vec<&str>> = vec![Vec::new()];
        for axis in &axes {
            let mut next = Vec::with_capacity(combos.len() * axis.len());
            for combo in &combos {
                for token in axis {
                    let mut extended = combo.clone();
                    if let Some(token) = token {
                        extended.push(token.as_str());
                    }
                    next.push(extended);
                }
            }
            combos = next;
        }

        Ok(combos
            .into_iter()
            .map(|tokens| {
                std::iter::once(self.command.trim())
                    .chain(tokens)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect())
    }
}

/// Parse a spec file holding one spec object or an array of them.
pub fn parse_specs(json: &str) -> crate::Result<Vec<CrossSpec>> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| ValidationError::invalid_spec(e.to_string()))?;
    let specs = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        other => {
            return Err(ValidationError::invalid_spec(format!(
                "expected an object or an array of objects, got {other}"
            )))
        }
    };
    specs
        .into_iter()
        .map(|spec| {
            serde_json::from_value(spec).map_err(|e| ValidationError::invalid_spec(e.to_string()))
        })
        .collect()
}

/// Numbers and booleans become JSON scalars only when that is lossless.
fn to_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) if value.to_string() == raw => value,
        _ => Value::String(raw.to_string()),
    }
}

fn render_value(value: &Value) -> crate::Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(_) | Value::Bool(_) => Ok(Some(value.to_string())),
        other => Err(ValidationError::invalid_spec(format!(
            "arg values must be scalars, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::DEFAULT_DELIMITER;
    use serde_json::json;

    fn commands(raw: &[&str]) -> Vec<Command> {
        raw.iter().map(|c| Command::parse(c)).collect()
    }

    #[test]
    fn test_spec_from_commands() {
        let spec = CrossSpec::from_commands(
            &commands(&[
                "run --lr=0.1 --seed=0",
                "run --lr=0.1 --seed=1",
                "run --lr=0.2 --seed=0",
            ]),
            &[],
            DEFAULT_DELIMITER,
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({ "command": "run", "args": { "--lr": [0.1, 0.2], "--seed": [0, 1] } })
        );
    }

    #[test]
    fn test_expand_is_cartesian() {
        let spec: CrossSpec = serde_json::from_value(
            json!({ "command": "run", "args": { "--lr": [0.1, 0.2], "--seed": [0, 1] } }),
        )
        .unwrap();
        let expanded = spec.expand(DEFAULT_DELIMITER).unwrap();
        assert_eq!(
            expanded,
            vec![
                "run --lr=0.1 --seed=0",
                "run --lr=0.1 --seed=1",
                "run --lr=0.2 --seed=0",
                "run --lr=0.2 --seed=1",
            ]
        );
    }

    #[test]
    fn test_absent_keys_and_flags() {
        let spec = CrossSpec::from_commands(
            &commands(&["run --x=1 --cuda", "run"]),
            &[],
            DEFAULT_DELIMITER,
        )
        .unwrap();
        assert_eq!(spec.args["--x"], vec![json!(1), Value::Null]);
        assert_eq!(spec.flags, vec![vec!["--cuda".to_string()], vec![]]);

        let expanded = spec.expand(DEFAULT_DELIMITER).unwrap();
        assert_eq!(
            expanded,
            vec!["run --x=1 --cuda", "run --x=1", "run --cuda", "run"]
        );
    }

    #[test]
    fn test_excluded_keys() {
        let spec = CrossSpec::from_commands(
            &commands(&["run --logdir=a --x=1", "run --logdir=b --x=2"]),
            &["--logdir".to_string()],
            DEFAULT_DELIMITER,
        )
        .unwrap();
        assert!(!spec.args.contains_key("--logdir"));
        assert_eq!(spec.args["--x"].len(), 2);
    }

    #[test]
    fn test_heterogeneous_stems() {
        let err = CrossSpec::from_commands(
            &commands(&["run --x=1", "walk --x=2"]),
            &[],
            DEFAULT_DELIMITER,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::HeterogeneousStems { .. }));
    }

    #[test]
    fn test_lossy_numbers_stay_strings() {
        assert_eq!(to_value("0.10"), json!("0.10"));
        assert_eq!(to_value("1e3"), json!("1e3"));
        assert_eq!(to_value("3"), json!(3));
        assert_eq!(to_value("true"), json!(true));
        assert_eq!(to_value("adam"), json!("adam"));
    }

    #[test]
    fn test_parse_specs_accepts_arrays() {
        let specs = parse_specs(r#"[{"command": "a"}, {"command": "b", "args": {"--x": [1]}}]"#)
            .unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].expand('=').unwrap(), vec!["b --x=1"]);
        assert!(parse_specs("42").is_err());
        assert!(parse_specs(r#"{"args": {}}"#).is_err());
    }

    #[test]
    fn test_nested_values_are_rejected() {
        let spec: CrossSpec =
            serde_json::from_value(json!({ "command": "run", "args": { "--x": [[1]] } })).unwrap();
        assert!(spec.expand('=').is_err());
    }
}
