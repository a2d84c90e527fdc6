//! Process-backed runner.
//!
//! Output is drained on two reader threads so a chatty child cannot block on
//! a full pipe while we poll it for exit, deadline and cancellation.
//!
//! On unix the child leads its own process group, so a kill reaches every
//! process it forked and the reader threads see their pipes close.

use super::{CommandLine, CommandOutput, CommandRunner, ExecContext, ExitState};
use crate::error::LaunchError;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// How often a running child is checked for cancellation and deadline
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn execute(
        &self,
        command: &CommandLine,
        context: &ExecContext,
    ) -> Result<CommandOutput, LaunchError> {
        tracing::debug!(
            command = %command,
            workdir = %context.working_dir().display(),
            "spawning"
        );

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(context.working_dir())
            .envs(context.child_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| LaunchError::new(&command.program, &e))?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let started = Instant::now();
        let state = wait(&mut child, context, started).map_err(|e| {
            kill(&mut child);
            LaunchError {
                program: command.program.clone(),
                reason: format!("failed to wait for process: {}", e),
            }
        })?;

        let duration = started.elapsed();
        let output = CommandOutput {
            state,
            stdout: collect(stdout),
            stderr: collect(stderr),
            duration,
        };

        tracing::debug!(
            program = %command.program,
            state = %output.state,
            elapsed_ms = output.duration.as_millis() as u64,
            "finished"
        );

        Ok(output)
    }
}

fn wait(child: &mut Child, context: &ExecContext, started: Instant) -> std::io::Result<ExitState> {
    loop {
        if context.cancel.is_cancelled() {
            tracing::warn!(pid = child.id(), "cancelling running command");
            kill(child);
            return Ok(ExitState::Cancelled);
        }

        let slice = match context.timeout {
            Some(limit) => {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    tracing::warn!(pid = child.id(), "command exceeded its deadline");
                    kill(child);
                    return Ok(ExitState::TimedOut);
                }
                POLL_INTERVAL.min(limit - elapsed)
            }
            None => POLL_INTERVAL,
        };

        if let Some(status) = child.wait_timeout(slice)? {
            return Ok(match status.code() {
                Some(code) => ExitState::Exited(code),
                None => ExitState::Signaled,
            });
        }
    }
}

/// Best effort: the child may already have exited
fn kill(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Ok(pid) = i32::try_from(child.id()) {
        if let Err(err) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            tracing::debug!(pid, error = %err, "process group already gone");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
