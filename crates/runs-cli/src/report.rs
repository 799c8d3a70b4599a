//! Read-only reports over the run database.

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use runs_model::{Change, Command, DiffToken, Field, RunEntry};

use crate::app::{query, App};

/// Arguments for listing runs
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Runs to list; all runs when omitted
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Skip runs matching this pattern
    #[arg(long = "unless", value_name = "PATTERN")]
    pub unless: Vec<String>,

    /// Print every field of each run
    #[arg(long = "show-attrs")]
    pub show_attrs: bool,
}

impl LsArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let entries = query(&app.open_db()?, &self.patterns, &self.unless)?;
        let mut ui = app.ui();
        for entry in &entries {
            if self.show_attrs {
                ui.print(render_attrs(entry))?;
            } else {
                ui.print(&entry.path)?;
            }
        }
        Ok(())
    }
}

fn render_attrs(entry: &RunEntry) -> String {
    let mut out = entry.path.to_string();
    for field in Field::ALL.into_iter().filter(|f| *f != Field::Path) {
        out.push_str(&format!("\n  {field}: {}", entry.field(field)));
    }
    out
}

/// Arguments for looking up one field
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Field to print (path, command, commit, datetime, description)
    #[arg(value_name = "FIELD")]
    pub field: Field,

    /// Runs to look up; all runs when omitted
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Skip runs matching this pattern
    #[arg(long = "unless", value_name = "PATTERN")]
    pub unless: Vec<String>,
}

impl LookupArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let entries = query(&app.open_db()?, &self.patterns, &self.unless)?;
        let mut ui = app.ui();
        for line in render_lookup(&entries, self.field) {
            ui.print(line)?;
        }
        Ok(())
    }
}

/// A bare value for a single run, `path: value` lines otherwise.
fn render_lookup(entries: &[RunEntry], field: Field) -> Vec<String> {
    match entries {
        [entry] => vec![entry.field(field).to_string()],
        entries => entries
            .iter()
            .map(|entry| format!("{}: {}", entry.path, entry.field(field)))
            .collect(),
    }
}

/// Arguments for printing runs as a table
#[derive(Args, Debug)]
pub struct TableArgs {
    /// Runs to show; all runs when omitted
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Skip runs matching this pattern
    #[arg(long = "unless", value_name = "PATTERN")]
    pub unless: Vec<String>,

    /// Truncate every cell to N terminal columns
    #[arg(long = "column-width", value_name = "N", default_value_t = 100)]
    pub column_width: usize,
}

impl TableArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let entries = query(&app.open_db()?, &self.patterns, &self.unless)?;
        let mut ui = app.ui();
        for line in render_table(&entries, self.column_width) {
            ui.print(line)?;
        }
        Ok(())
    }
}

const COLUMN_GAP: &str = "  ";

fn render_table(entries: &[RunEntry], column_width: usize) -> Vec<String> {
    let header: Vec<String> = Field::ALL.iter().map(|f| f.as_str().to_uppercase()).collect();
    let rows: Vec<Vec<String>> = std::iter::once(header)
        .chain(entries.iter().map(|entry| {
            Field::ALL
                .iter()
                .map(|field| truncate(entry.field(*field), column_width))
                .collect()
        }))
        .collect();

    let widths: Vec<usize> = (0..Field::ALL.len())
        .map(|col| rows.iter().map(|row| row[col].width()).max().unwrap_or(0))
        .collect();

    rows.iter()
        .map(|row| {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| pad(cell, *width))
                .collect();
            cells.join(COLUMN_GAP).trim_end().to_string()
        })
        .collect()
}

/// Cut `text` to at most `width` display cells. Newlines become spaces.
fn truncate(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars().map(|c| if c == '\n' { ' ' } else { c }) {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

/// Arguments for printing the commands that recreate runs
#[derive(Args, Debug)]
pub struct ReproduceArgs {
    /// Runs to reproduce; all runs when omitted
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Skip runs matching this pattern
    #[arg(long = "unless", value_name = "PATTERN")]
    pub unless: Vec<String>,
}

impl ReproduceArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let entries = query(&app.open_db()?, &self.patterns, &self.unless)?;
        let mut ui = app.ui();
        for entry in &entries {
            for line in reproduce_lines(entry) {
                ui.print(line)?;
            }
        }
        Ok(())
    }
}

fn reproduce_lines(entry: &RunEntry) -> [String; 2] {
    let checkout = escape_command(&["git", "checkout", &entry.commit]);
    let new = escape_command(&[
        "runs",
        "new",
        "--path",
        entry.path.as_str(),
        "--prefix",
        "",
        "--command",
        &entry.command,
        "--description",
        &entry.description,
    ]);
    [checkout, new]
}

fn escape_command(words: &[&str]) -> String {
    shlex::try_join(words.iter().copied()).unwrap_or_else(|_| words.join(" "))
}

/// Arguments for comparing two runs' commands
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[arg(value_name = "PATH1")]
    pub path1: String,

    #[arg(value_name = "PATH2")]
    pub path2: String,
}

impl DiffArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let db = app.open_db()?;
        let left = db.entry(&self.path1)?;
        let right = db.entry(&self.path2)?;
        let tokens = Command::parse(&left.command).diff(&Command::parse(&right.command));
        app.ui().print(render_diff(&tokens))?;
        Ok(())
    }
}

/// Unchanged tokens plain, added green, deleted red.
fn render_diff(tokens: &[DiffToken]) -> String {
    tokens
        .iter()
        .map(|t| match t.change {
            Change::Unchanged => t.token.clone(),
            Change::Added => t.token.green().to_string(),
            Change::Deleted => t.token.red().to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
