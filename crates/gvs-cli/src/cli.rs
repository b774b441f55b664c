use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gvs",
    about = "Live Git status of a working directory",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Session config file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show changed files of the project
    Status(StatusArgs),
    /// Show added and deleted lines of a file
    Diff(DiffArgs),
    /// Find the next changed line of a file
    Next(NavArgs),
    /// Find the previous changed line of a file
    Prev(NavArgs),
    /// Keep printing the project's changes as they happen
    Watch(WatchArgs),
}

#[derive(Args)]
pub struct StatusArgs {
    pub path: Option<PathBuf>,
    /// Also list folders containing changes
    #[arg(long)]
    pub tree: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct NavArgs {
    pub file: PathBuf,
    pub line: u32,
}

#[derive(Args)]
pub struct WatchArgs {
    pub path: Option<PathBuf>,
}
