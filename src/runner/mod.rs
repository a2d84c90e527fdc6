//! The command-execution boundary.
//!
//! Everything the sequencer does to the outside world goes through
//! [`CommandRunner`]. A runner spawns exactly one process per call and never
//! interprets its output: a non-zero exit is data, not an error. Only a
//! failure to spawn is reported as [`LaunchError`].

mod process;

pub use process::ProcessRunner;

use crate::error::LaunchError;
use crate::utils::shell;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable carrying the active environment name to the child
pub const ENVIRONMENT_VAR: &str = "WXO_ENVIRONMENT";

/// A program and its argument vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Program followed by arguments
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell::join_args(&self.argv()))
    }
}

/// Shared flag raised by an interrupt handler
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a command needs besides its argument vector.
///
/// The active environment is passed here explicitly rather than read from
/// the vendor CLI's own global state.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub working_dir: PathBuf,
    pub environment: Option<String>,
    pub vars: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    pub cancel: CancelFlag,
}

impl ExecContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            environment: None,
            vars: BTreeMap::new(),
            timeout: None,
            cancel: CancelFlag::new(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn with_environment(mut self, environment: Option<String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_vars(mut self, vars: BTreeMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Variables exported to the child, including the active environment
    pub fn child_env(&self) -> BTreeMap<String, String> {
        let mut env = self.vars.clone();
        if let Some(environment) = &self.environment {
            env.insert(ENVIRONMENT_VAR.to_string(), environment.clone());
        }
        env
    }
}

/// How a spawned command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "code", rename_all = "snake_case")]
pub enum ExitState {
    Exited(i32),
    /// Terminated by a signal it did not handle
    Signaled,
    TimedOut,
    Cancelled,
}

impl ExitState {
    pub fn success(&self) -> bool {
        matches!(self, ExitState::Exited(0))
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitState::Exited(code) => write!(f, "exit code {}", code),
            ExitState::Signaled => write!(f, "terminated by signal"),
            ExitState::TimedOut => write!(f, "timed out"),
            ExitState::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub state: ExitState,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.state.success()
    }

    /// Exit code when the process exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self.state {
            ExitState::Exited(code) => Some(code),
            _ => None,
        }
    }
}

pub trait CommandRunner {
    fn execute(
        &self,
        command: &CommandLine,
        context: &ExecContext,
    ) -> Result<CommandOutput, LaunchError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn execute(
        &self,
        command: &CommandLine,
        context: &ExecContext,
    ) -> Result<CommandOutput, LaunchError> {
        (**self).execute(command, context)
    }
}
