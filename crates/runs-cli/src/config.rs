//! `.runsrc` discovery and parsing.
//!
//! The file is INI with two sections:
//!
//! ```ini
//! [main]
//! root = .runs
//! db_path = runs.db
//! dir_names = checkpoints tensorboard
//! prefix = CUDA_VISIBLE_DEVICES=0
//! sort = path
//!
//! [flags]
//! --logdir = <root>/tensorboard/<path>
//! --cuda =
//! ```
//!
//! A key under `[flags]` with an empty value is appended as a bare flag.

use ini::Ini;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use runs_core::{Error, Result};
use runs_model::Field;

pub const CONFIG_FILE: &str = ".runsrc";

const MAIN: &str = "main";
const FLAGS: &str = "flags";

const DEFAULT_ROOT: &str = ".runs";
const DEFAULT_DB_PATH: &str = "runs.db";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding `.runsrc`; relative paths are resolved against it.
    pub dir: PathBuf,
    pub root: PathBuf,
    pub db_path: PathBuf,
    pub dir_names: Vec<String>,
    pub prefix: String,
    /// Column query results are ordered by.
    pub sort: Field,
    /// Default args appended to every new command.
    pub flags: Vec<String>,
}

impl Config {
    /// Load the nearest `.runsrc` at or above `cwd`, writing a default one in
    /// `cwd` when there is none.
    pub fn load_or_init(cwd: &Path) -> Result<Self> {
        match find_config(cwd) {
            Some(path) => Self::load(&path),
            None => {
                let path = cwd.join(CONFIG_FILE);
                write_default(&path)?;
                Self::load(&path)
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading config");
        let ini = Ini::load_from_file(path)
            .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_ini(&ini, dir)
    }

    pub fn from_ini(ini: &Ini, dir: PathBuf) -> Result<Self> {
        let main = |key: &str| {
            ini.get_from(Some(MAIN), key)
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let sort = match main("sort") {
            Some(raw) => raw.parse::<Field>().map_err(|_| {
                let columns: Vec<&str> = Field::ALL.iter().map(Field::as_str).collect();
                Error::config(format!(
                    "invalid sort column '{raw}', expected one of: {}",
                    columns.join(", ")
                ))
            })?,
            None => Field::Path,
        };

        let flags = ini
            .section(Some(FLAGS))
            .map(|props| props.iter().map(|(key, value)| flag(key, value)).collect())
            .unwrap_or_default();

        let config = Self {
            root: dir.join(main("root").unwrap_or(DEFAULT_ROOT)),
            db_path: dir.join(main("db_path").unwrap_or(DEFAULT_DB_PATH)),
            dir_names: main("dir_names").map(split_list).unwrap_or_default(),
            prefix: main("prefix").unwrap_or_default().to_string(),
            sort,
            flags,
            dir,
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply the global command-line overrides, which win over the file.
    pub fn apply_overrides(
        &mut self,
        root: Option<PathBuf>,
        db_path: Option<PathBuf>,
        dir_names: Option<Vec<String>>,
    ) -> Result<()> {
        if let Some(root) = root {
            self.root = root;
        }
        if let Some(db_path) = db_path {
            self.db_path = db_path;
        }
        if let Some(dir_names) = dir_names {
            self.dir_names = dir_names.iter().flat_map(|d| split_list(d)).collect();
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(Error::config(format!(
                "root {} exists but is not a directory",
                self.root.display()
            )));
        }
        if self.db_path.is_dir() {
            return Err(Error::config(format!(
                "db_path {} is a directory",
                self.db_path.display()
            )));
        }
        Ok(())
    }
}

fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

fn write_default(path: &Path) -> Result<()> {
    let mut ini = Ini::new();
    ini.with_section(Some(MAIN))
        .set("root", DEFAULT_ROOT)
        .set("db_path", DEFAULT_DB_PATH)
        .set("dir_names", "")
        .set("prefix", "")
        .set("sort", Field::Path.as_str());
    ini.write_to_file(path)
        .map_err(|e| Error::filesystem(path, e))?;
    info!(path = %path.display(), "Wrote default config");
    Ok(())
}

/// Split on commas and whitespace.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn flag(key: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        key.to_string()
    } else {
        format!("{key}={value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config_is_written_and_loaded() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_or_init(tmp.path()).unwrap();

        assert!(tmp.path().join(CONFIG_FILE).is_file());
        assert_eq!(config.root, tmp.path().join(".runs"));
        assert_eq!(config.db_path, tmp.path().join("runs.db"));
        assert!(config.dir_names.is_empty());
        assert_eq!(config.prefix, "");
        assert_eq!(config.sort, Field::Path);
        assert!(config.flags.is_empty());
    }

    #[test]
    fn test_config_found_in_ancestor() {
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path(), "[main]\nroot = out\ndir_names = chk, tb\n");
        let nested = tmp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::load_or_init(&nested).unwrap();
        assert_eq!(config.dir, tmp.path());
        assert_eq!(config.root, tmp.path().join("out"));
        assert_eq!(config.dir_names, vec!["chk", "tb"]);
        assert!(!nested.join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_flags_section() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            "[main]\nprefix = nice -n 10\n\n[flags]\n--logdir = <path>/logs\n--cuda =\n",
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.prefix, "nice -n 10");
        assert_eq!(config.flags, vec!["--logdir=<path>/logs", "--cuda"]);
    }

    #[test]
    fn test_invalid_sort_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), "[main]\nsort = size\n");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("size"));
    }

    #[test]
    fn test_root_that_is_a_file_is_config_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("runs-root"), "").unwrap();
        let path = write_config(tmp.path(), "[main]\nroot = runs-root\n");

        assert!(matches!(
            Config::load(&path).unwrap_err(),
            Error::Config { .. }
        ));
    }

    #[test]
    fn test_overrides_win() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::load_or_init(tmp.path()).unwrap();
        config
            .apply_overrides(
                Some(tmp.path().join("elsewhere")),
                None,
                Some(vec!["chk tb".to_string(), "logs".to_string()]),
            )
            .unwrap();

        assert_eq!(config.root, tmp.path().join("elsewhere"));
        assert_eq!(config.db_path, tmp.path().join("runs.db"));
        assert_eq!(config.dir_names, vec!["chk", "tb", "logs"]);
    }
}
