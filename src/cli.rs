use std::path::PathBuf;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "dirset",
    version,
    about = "Ensure directories exist with fixed ownership and permissions"
)]
pub struct Cli {
    /// Use an explicit configuration file instead of discovery.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    /// Print the planned action without touching the filesystem.
    #[arg(short = 'n', long = "dry-run", global = true)]
    pub dry_run: bool,
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring a directory to the configured ownership and permission state.
    Ensure(EnsureArgs),
    /// Configuration display, editing, and template generation.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Args, Debug)]
pub struct EnsureArgs {
    /// Target directory; defaults to `log_dir` from the configuration file.
    #[arg()]
    pub path: Option<Utf8PathBuf>,
    /// Owning user name.
    #[arg(long = "owner")]
    pub owner: Option<String>,
    /// Owning group name.
    #[arg(long = "group")]
    pub group: Option<String>,
    /// Permission bits in octal, e.g. 0644.
    #[arg(long = "mode")]
    pub mode: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    Show,
    Path,
    Generate {
        #[arg()]
        path: Option<PathBuf>,
        #[arg(long = "force", default_value_t = false)]
        force: bool,
    },
    SetLogDir {
        path: String,
    },
}

/// Helper entry point so `main` can stay minimal.
pub fn parse() -> Cli {
    Cli::parse()
}
