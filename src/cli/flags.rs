use clap::Parser;
use std::path::PathBuf;

/// Flags shared by every command that binds a manifest to command lines.
#[derive(Parser, Debug, Clone, Default)]
pub struct RunFlags {
    /// Only act on this resource and its dependency closure (repeatable)
    #[arg(long = "select", value_name = "NAME")]
    pub select: Vec<String>,

    /// Active Orchestrate environment (activated before the first step)
    #[arg(long = "env", value_name = "NAME")]
    pub environment: Option<String>,

    /// Per-command timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Vendor CLI to invoke instead of `orchestrate`
    #[arg(long, value_name = "PATH")]
    pub program: Option<String>,

    /// Extra variable exported to every command (KEY=VALUE)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Load exported variables from a dotenv-style file
    #[arg(long = "env-file", value_name = "PATH")]
    pub env_files: Vec<PathBuf>,
}

/// Overrides for the action's failure policy.
#[derive(Parser, Debug, Clone, Copy, Default)]
pub struct PolicyFlags {
    /// Stop at the first failed step
    #[arg(long, conflicts_with = "keep_going")]
    pub fail_fast: bool,

    /// Record failures and keep going
    #[arg(long)]
    pub keep_going: bool,
}
