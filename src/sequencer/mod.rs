//! Lifecycle sequencer - walks a bound plan one command at a time
//!
//! A sequencer owns exactly one run. It moves `NotStarted -> Running` when
//! [`LifecycleSequencer::run`] is called and ends in `Completed` or `Aborted`;
//! both are terminal and the returned [`LifecycleReport`] never changes.

pub mod report;

pub use report::{
    LifecycleReport, LifecycleStep, PartialCompletionWarning, RunOutcome, StepError, StepStatus,
};

use crate::error::{LifecycleError, Result};
use crate::plan::{Action, Plan, PlannedStep};
use crate::runner::{CommandLine, CommandOutput, CommandRunner, ExecContext, ExitState};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::time::Instant;

/// Output fragments that mean a remove target was already gone
pub const DEFAULT_MISSING_OK: &[&str] = &[
    "not found",
    "does not exist",
    "no agent found",
    "no tool found",
];

/// Shell exit codes for "not executable" and "command not found"; the text that
/// comes with them describes the program, never the resource
const SHELL_LAUNCH_FAILURES: &[i32] = &[126, 127];

/// What to do with the rest of the plan after a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failure; remaining steps are skipped
    Abort,
    /// Record the failure and keep going
    Continue,
}

impl FailurePolicy {
    /// Abort on import, continue on remove
    pub fn default_for(action: Action) -> Self {
        match action {
            Action::Import => FailurePolicy::Abort,
            Action::Remove => FailurePolicy::Continue,
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::Continue => f.write_str("continue"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    NotStarted,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct SequencerOptions {
    pub policy: FailurePolicy,
    /// Case-insensitive fragments that turn a failed remove into a skip
    pub missing_ok: Vec<String>,
    /// Record every step as skipped without running anything
    pub dry_run: bool,
    /// Print a progress line per step on stdout
    pub progress: bool,
}

impl SequencerOptions {
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            missing_ok: Vec::new(),
            dry_run: false,
            progress: false,
        }
    }

    /// Default policy and missing-resource patterns for `action`
    pub fn for_action(action: Action) -> Self {
        Self::new(FailurePolicy::default_for(action))
            .with_missing_ok(DEFAULT_MISSING_OK.iter().map(|p| p.to_string()).collect())
    }

    pub fn with_missing_ok(mut self, patterns: Vec<String>) -> Self {
        self.missing_ok = patterns;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

pub struct LifecycleSequencer<'r, R: CommandRunner + ?Sized> {
    runner: &'r R,
    context: ExecContext,
    options: SequencerOptions,
    state: SequencerState,
}

impl<'r, R: CommandRunner + ?Sized> LifecycleSequencer<'r, R> {
    pub fn new(runner: &'r R, context: ExecContext, options: SequencerOptions) -> Self {
        Self {
            runner,
            context,
            options,
            state: SequencerState::NotStarted,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Execute `plan` and return its report.
    ///
    /// Step failures are recorded in the report, never returned as `Err`.
    /// Calling this twice on one sequencer is an error.
    pub fn run(&mut self, plan: &Plan) -> Result<LifecycleReport> {
        if self.state != SequencerState::NotStarted {
            return Err(LifecycleError::SequencerReused);
        }
        self.state = SequencerState::Running;

        let action = plan.action();
        let started_at = Utc::now();
        let mut steps: Vec<LifecycleStep> = plan
            .steps()
            .iter()
            .map(|planned| LifecycleStep {
                descriptor: planned.descriptor.clone(),
                action,
                status: StepStatus::Pending,
                command: planned.command.argv(),
                error: None,
                note: None,
                duration_ms: None,
            })
            .collect();

        tracing::info!(
            action = %action,
            steps = steps.len(),
            policy = %self.options.policy,
            dry_run = self.options.dry_run,
            "starting run"
        );

        if self.options.dry_run {
            for step in &mut steps {
                step.status = StepStatus::Skipped;
                step.note = Some("dry run".to_string());
            }
            return Ok(self.finish(plan, RunOutcome::Completed, None, started_at, steps));
        }

        if let Some(preflight) = plan.preflight().filter(|_| !plan.is_empty()) {
            if let Err(err) = self.activate(preflight) {
                tracing::warn!(error = %err, "environment activation failed, nothing will run");
                for step in &mut steps {
                    step.status = StepStatus::Skipped;
                }
                return Ok(self.finish(plan, RunOutcome::Aborted, Some(err), started_at, steps));
            }
        }

        let mut aborted = false;
        for (planned, step) in plan.steps().iter().zip(steps.iter_mut()) {
            if aborted {
                step.status = StepStatus::Skipped;
                continue;
            }

            if self.context.cancel.is_cancelled() {
                tracing::warn!(resource = %step.name(), "run cancelled before step");
                step.status = StepStatus::Skipped;
                aborted = true;
                continue;
            }

            self.run_step(planned, step);

            // An interrupt usually reaches the child too, which then exits on its own
            if self.context.cancel.is_cancelled() {
                tracing::warn!(resource = %step.name(), "run cancelled during step");
                step.status = StepStatus::Failed;
                step.error = Some(StepError::Cancelled);
                step.note = None;
                aborted = true;
                continue;
            }

            if step.status == StepStatus::Failed && self.options.policy == FailurePolicy::Abort {
                tracing::warn!(resource = %step.name(), "aborting after failed step");
                aborted = true;
            }
        }

        let outcome = if aborted {
            RunOutcome::Aborted
        } else {
            RunOutcome::Completed
        };
        Ok(self.finish(plan, outcome, None, started_at, steps))
    }

    fn activate(&self, command: &CommandLine) -> std::result::Result<(), StepError> {
        if self.options.progress {
            print!("  Activating environment ... ");
            std::io::stdout().flush().unwrap_or(());
        }
        tracing::debug!(command = %command, "activating environment");

        let result = match self.runner.execute(command, &self.context) {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(StepError::from_output(&output)),
            Err(err) => Err(StepError::Launch { reason: err.reason }),
        };

        if self.options.progress {
            println!("{}", if result.is_ok() { "✓" } else { "✗" });
        }
        result
    }

    fn run_step(&self, planned: &PlannedStep, step: &mut LifecycleStep) {
        step.status = StepStatus::Running;
        if self.options.progress {
            print!(
                "  {} {} ({}) ... ",
                step.action.verb(),
                step.name(),
                step.descriptor.kind
            );
            std::io::stdout().flush().unwrap_or(());
        }
        tracing::debug!(
            resource = %step.name(),
            kind = %step.descriptor.kind,
            command = %planned.command,
            "step started"
        );

        let started = Instant::now();
        let result = self.runner.execute(&planned.command, &self.context);
        step.duration_ms = Some(started.elapsed().as_millis() as u64);

        match result {
            Ok(output) if output.success() => {
                step.status = StepStatus::Succeeded;
            }
            Ok(output) => match self.tolerated_absence(step.action, &output) {
                Some(pattern) => {
                    step.status = StepStatus::Skipped;
                    step.note = Some(format!("already absent ({})", pattern));
                }
                None => {
                    step.status = StepStatus::Failed;
                    step.error = Some(StepError::from_output(&output));
                }
            },
            Err(err) => {
                step.status = StepStatus::Failed;
                step.error = Some(StepError::Launch { reason: err.reason });
            }
        }

        match (&step.error, &step.note) {
            (Some(err), _) => {
                tracing::warn!(resource = %step.name(), error = %err, "step failed")
            }
            (None, Some(note)) => {
                tracing::info!(resource = %step.name(), note = %note, "step skipped")
            }
            (None, None) => tracing::info!(resource = %step.name(), "step succeeded"),
        }

        if self.options.progress {
            println!("{}", step.status.marker());
            if let Some(err) = &step.error {
                eprintln!("    {}", err);
            }
        }
    }

    /// Pattern matched by a failed remove whose target no longer exists
    fn tolerated_absence(&self, action: Action, output: &CommandOutput) -> Option<String> {
        match output.state {
            ExitState::Exited(code) if action == Action::Remove => {
                if SHELL_LAUNCH_FAILURES.contains(&code) {
                    return None;
                }
            }
            _ => return None,
        }

        let text = format!("{}\n{}", output.stdout, output.stderr).to_lowercase();
        self.options
            .missing_ok
            .iter()
            .find(|pattern| !pattern.is_empty() && text.contains(&pattern.to_lowercase()))
            .cloned()
    }

    fn finish(
        &mut self,
        plan: &Plan,
        outcome: RunOutcome,
        preflight_error: Option<StepError>,
        started_at: chrono::DateTime<Utc>,
        steps: Vec<LifecycleStep>,
    ) -> LifecycleReport {
        self.state = match outcome {
            RunOutcome::Completed => SequencerState::Completed,
            RunOutcome::Aborted => SequencerState::Aborted,
        };

        let report = LifecycleReport::new(
            plan.action(),
            plan.manifest_name().map(str::to_string),
            outcome,
            self.options.dry_run,
            preflight_error,
            started_at,
            steps,
        );

        match report.warning() {
            Some(warning) => tracing::warn!(%warning, "run finished with failures"),
            None => tracing::info!(
                outcome = ?report.outcome(),
                success = report.success(),
                "run finished"
            ),
        }
        report
    }
}
