use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod flags;
pub use flags::{PolicyFlags, RunFlags};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration files
    Validate {
        /// Optional path to a specific config file to validate
        file: Option<PathBuf>,
    },

    /// Show effective configuration after merging all sources
    Show {
        /// Directory whose project config should be considered (default: current)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "wxo-lifecycle")]
#[command(
    about = "Import and remove watsonx Orchestrate resources in dependency order",
    long_about = None
)]
#[command(version = env!("WXO_LIFECYCLE_VERSION"))]
#[command(after_help = "\
EXAMPLES:
  wxo-lifecycle apply demo/manifest.toml            Import everything, dependencies first
  wxo-lifecycle teardown demo/manifest.toml         Remove everything, dependents first
  wxo-lifecycle plan demo/manifest.toml --teardown  Show the remove commands without running them
  wxo-lifecycle apply m.toml --select my_agent      Import one agent and what it needs

EXIT CODES:
  0  every step succeeded or was skipped
  1  a step failed or the run was cancelled
  2  the manifest or configuration is invalid")]
pub struct Cli {
    /// Show debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import every resource in creation order
    #[command(long_about = "Import every resource in creation order.\n\n\
        Dependencies are imported before the resources that use them. By default\n\
        the first failure stops the run and the remaining steps are skipped.")]
    Apply(RunCmd),

    /// Remove every resource in deletion order
    #[command(long_about = "Remove every resource in deletion order.\n\n\
        Dependents are removed before what they depend on. By default failures\n\
        are recorded and the run keeps going; resources that are already gone\n\
        are reported as skipped.")]
    Teardown(RunCmd),

    /// Print the ordered command lines without running them
    Plan(PlanCmd),

    /// Load and validate a manifest
    Validate {
        /// Path to the manifest (TOML or JSON)
        manifest: PathBuf,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to the manifest (TOML or JSON)
    pub manifest: PathBuf,

    #[command(flatten)]
    pub run: RunFlags,

    #[command(flatten)]
    pub policy: PolicyFlags,

    /// Show what would run without executing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Write a JSON report of the run to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct PlanCmd {
    /// Path to the manifest (TOML or JSON)
    pub manifest: PathBuf,

    #[command(flatten)]
    pub run: RunFlags,

    /// Plan the remove commands instead of the import commands
    #[arg(long)]
    pub teardown: bool,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}
