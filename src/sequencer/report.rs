//! Step records and the immutable run report.

use crate::error::Result;
use crate::manifest::ResourceDescriptor;
use crate::plan::Action;
use crate::runner::CommandOutput;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Longest stderr/stdout excerpt kept in a failure record
const OUTPUT_EXCERPT_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn marker(&self) -> &'static str {
        match self {
            StepStatus::Pending => "·",
            StepStatus::Running => "…",
            StepStatus::Succeeded => "✓",
            StepStatus::Failed => "✗",
            StepStatus::Skipped => "⊘",
        }
    }
}

/// Why a step failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepError {
    /// The program could not be spawned
    Launch { reason: String },
    /// The program ran and reported failure
    CommandFailure {
        exit_code: Option<i32>,
        output: String,
    },
    TimedOut,
    Cancelled,
}

impl StepError {
    /// Classify a finished command that did not succeed
    pub fn from_output(output: &CommandOutput) -> Self {
        use crate::runner::ExitState;

        match output.state {
            ExitState::TimedOut => StepError::TimedOut,
            ExitState::Cancelled => StepError::Cancelled,
            ExitState::Exited(_) | ExitState::Signaled => StepError::CommandFailure {
                exit_code: output.exit_code(),
                output: excerpt(output),
            },
        }
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::Launch { reason } => write!(f, "could not launch: {}", reason),
            StepError::CommandFailure {
                exit_code: Some(code),
                output,
            } if output.is_empty() => write!(f, "exit code {}", code),
            StepError::CommandFailure {
                exit_code: Some(code),
                output,
            } => write!(f, "exit code {}: {}", code, first_line(output)),
            StepError::CommandFailure {
                exit_code: None,
                output,
            } if output.is_empty() => write!(f, "terminated by signal"),
            StepError::CommandFailure {
                exit_code: None,
                output,
            } => write!(f, "terminated by signal: {}", first_line(output)),
            StepError::TimedOut => write!(f, "timed out"),
            StepError::Cancelled => write!(f, "cancelled"),
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

/// Prefer stderr; fall back to stdout when the CLI reports errors there
fn excerpt(output: &CommandOutput) -> String {
    let source = if output.stderr.trim().is_empty() {
        &output.stdout
    } else {
        &output.stderr
    };
    source.trim().chars().take(OUTPUT_EXCERPT_CHARS).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleStep {
    pub descriptor: ResourceDescriptor,
    pub action: Action,
    pub status: StepStatus,
    /// Program followed by arguments
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    /// Set when a failing remove matched a missing-resource pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl LifecycleStep {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Completed,
    Aborted,
}

/// Raised at the end of a run that kept going past failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialCompletionWarning {
    pub failed: Vec<String>,
    pub total: usize,
}

impl fmt::Display for PartialCompletionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} steps failed ({})",
            self.failed.len(),
            self.total,
            self.failed.join(", ")
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LifecycleReport {
    action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<String>,
    outcome: RunOutcome,
    success: bool,
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    preflight_error: Option<StepError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<PartialCompletionWarning>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    steps: Vec<LifecycleStep>,
}

impl LifecycleReport {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        action: Action,
        manifest: Option<String>,
        outcome: RunOutcome,
        dry_run: bool,
        preflight_error: Option<StepError>,
        started_at: DateTime<Utc>,
        steps: Vec<LifecycleStep>,
    ) -> Self {
        let failed: Vec<String> = steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .map(|s| s.name().to_string())
            .collect();

        let warning = if outcome == RunOutcome::Completed && !failed.is_empty() {
            Some(PartialCompletionWarning {
                failed: failed.clone(),
                total: steps.len(),
            })
        } else {
            None
        };

        let success =
            outcome == RunOutcome::Completed && failed.is_empty() && preflight_error.is_none();

        Self {
            action,
            manifest,
            outcome,
            success,
            dry_run,
            preflight_error,
            warning,
            started_at,
            finished_at: Utc::now(),
            steps,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn manifest(&self) -> Option<&str> {
        self.manifest.as_deref()
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    /// True when every step succeeded or was legitimately skipped
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn steps(&self) -> &[LifecycleStep] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&LifecycleStep> {
        self.steps.iter().find(|s| s.name() == name)
    }

    pub fn preflight_error(&self) -> Option<&StepError> {
        self.preflight_error.as_ref()
    }

    pub fn warning(&self) -> Option<&PartialCompletionWarning> {
        self.warning.as_ref()
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// `0` on full success, `1` otherwise
    pub fn exit_code(&self) -> u8 {
        if self.success {
            0
        } else {
            1
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report as pretty JSON, creating parent directories
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Human-readable summary, one line per step
    pub fn render(&self) -> String {
        let mut out = String::new();

        if let Some(err) = &self.preflight_error {
            out.push_str(&format!("✗ environment activation: {}\n", err));
        }

        for step in &self.steps {
            out.push_str(&format!(
                "{} {} ({})",
                step.status.marker(),
                step.name(),
                step.descriptor.kind
            ));
            match (&step.error, &step.note, step.status) {
                (Some(err), _, _) => out.push_str(&format!(": {}", err)),
                (None, Some(note), _) => out.push_str(&format!(": {}", note)),
                (None, None, StepStatus::Skipped) => out.push_str(": skipped"),
                _ => {}
            }
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&self.summary());
        out
    }

    /// Verdict line with step counts, plus the partial-completion warning
    pub fn summary(&self) -> String {
        let verdict = match (self.outcome, self.success, self.dry_run) {
            (_, _, true) => "dry run, nothing executed",
            (RunOutcome::Aborted, _, _) => "aborted",
            (RunOutcome::Completed, true, _) => "completed",
            (RunOutcome::Completed, false, _) => "completed with failures",
        };
        let mut out = format!(
            "{} {}: {} succeeded, {} failed, {} skipped\n",
            self.action,
            verdict,
            self.count(StepStatus::Succeeded),
            self.count(StepStatus::Failed),
            self.count(StepStatus::Skipped)
        );

        if let Some(warning) = &self.warning {
            out.push_str(&format!("⚠ {}\n", warning));
        }

        out
    }
}
