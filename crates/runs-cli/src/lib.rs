//! runs command-line interface library

pub mod analysis;
pub mod app;
pub mod config;
pub mod manage;
pub mod new;
pub mod report;

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use app::App;

// Re-export CLI types for testing
pub use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "runs")]
#[command(about = "Record, launch and query experiment runs")]
#[command(version, author, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Suppress non-error output
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long = "assume-yes")]
    pub assume_yes: bool,

    /// Run database file (overrides .runsrc)
    #[arg(long = "db-path", value_name = "FILE")]
    pub db_path: Option<PathBuf>,

    /// Directory holding the per-run directories (overrides .runsrc)
    #[arg(long = "root", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Names of the directories created for each run, comma- or space-separated (overrides .runsrc)
    #[arg(long = "dir-names", value_name = "NAMES")]
    pub dir_names: Option<Vec<String>>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create runs and start their sessions
    New(new::NewArgs),
    /// Create one run per expansion of a cross-product spec file
    FromJson(new::FromJsonArgs),
    /// Remove runs, their directories and their sessions
    Rm(manage::RmArgs),
    /// Move or rename runs
    Mv(manage::MvArgs),
    /// Kill the sessions of runs
    Kill(manage::KillArgs),
    /// Send Ctrl-C to the sessions of runs
    Interrupt(manage::InterruptArgs),
    /// Change the description of runs
    ChangeDescription(manage::ChangeDescriptionArgs),
    /// List run paths
    Ls(report::LsArgs),
    /// Print one field of runs
    Lookup(report::LookupArgs),
    /// Print runs as an aligned table
    Table(report::TableArgs),
    /// Print the commands that recreate runs
    Reproduce(report::ReproduceArgs),
    /// Compare the commands of two runs
    Diff(report::DiffArgs),
    /// Summarise the commands of runs as a cross-product spec
    ToJson(analysis::ToJsonArgs),
    /// Rank args by their correlation with a per-run value
    Correlate(analysis::CorrelateArgs),
    /// Print the values each arg takes across runs
    Flags(analysis::FlagsArgs),
}

impl Commands {
    pub fn run(self, app: &App) -> Result<()> {
        match self {
            Commands::New(args) => args.run(app),
            Commands::FromJson(args) => args.run(app),
            Commands::Rm(args) => args.run(app),
            Commands::Mv(args) => args.run(app),
            Commands::Kill(args) => args.run(app),
            Commands::Interrupt(args) => args.run(app),
            Commands::ChangeDescription(args) => args.run(app),
            Commands::Ls(args) => args.run(app),
            Commands::Lookup(args) => args.run(app),
            Commands::Table(args) => args.run(app),
            Commands::Reproduce(args) => args.run(app),
            Commands::Diff(args) => args.run(app),
            Commands::ToJson(args) => args.run(app),
            Commands::Correlate(args) => args.run(app),
            Commands::Flags(args) => args.run(app),
        }
    }
}

impl Cli {
    /// Load the configuration and execute the subcommand.
    pub fn run(self) -> Result<()> {
        let app = App::from_args(&self.global)?;
        self.command.run(&app)
    }
}

/// True if `err` is the user declining a prompt, which is not a failure.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<runs_core::Error>()
            .is_some_and(runs_core::Error::is_cancelled)
    })
}
