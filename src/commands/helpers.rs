use crate::cli::{PolicyFlags, RunFlags};
use crate::config::Config;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::plan::{Action, Plan};
use crate::runner::{CancelFlag, ExecContext};
use crate::sequencer::{FailurePolicy, SequencerOptions};
use std::path::{Path, PathBuf};

/// Everything a command needs before it can run or print a plan
pub struct Prepared {
    pub manifest: Manifest,
    pub config: Config,
    pub plan: Plan,
}

/// Load manifest and config, narrow to the selection and bind the plan.
///
/// Any error here happens before a single command is issued.
pub fn prepare(
    manifest_path: &Path,
    flags: &RunFlags,
    action: Action,
    verbose: bool,
) -> Result<Prepared> {
    let manifest = Manifest::load(manifest_path)?;
    let mut config = Config::load(manifest.base_dir())?.with_run_overrides(flags, verbose)?;
    absolutize_program(&mut config)?;
    let manifest = narrow(manifest, &flags.select, action)?;
    let plan = Plan::build(&manifest, action, &config)?;

    Ok(Prepared {
        manifest,
        config,
        plan,
    })
}

fn narrow(manifest: Manifest, select: &[String], action: Action) -> Result<Manifest> {
    if select.is_empty() {
        return Ok(manifest);
    }

    let narrowed = manifest.select(select, action)?;
    tracing::debug!(
        selected = select.len(),
        kept = narrowed.len(),
        total = manifest.len(),
        "narrowed manifest"
    );
    Ok(narrowed)
}

/// Policy from flags, falling back to configuration
pub fn failure_policy(flags: &PolicyFlags, config: &Config, action: Action) -> FailurePolicy {
    if flags.fail_fast {
        FailurePolicy::Abort
    } else if flags.keep_going {
        FailurePolicy::Continue
    } else {
        config.policy.for_action(action)
    }
}

pub fn sequencer_options(
    policy: FailurePolicy,
    config: &Config,
    dry_run: bool,
) -> SequencerOptions {
    SequencerOptions::new(policy)
        .with_missing_ok(config.policy.missing_ok.clone())
        .with_dry_run(dry_run)
        .with_progress(true)
}

/// Execution context for a plan: manifest directory, environment, variables
pub fn exec_context(plan: &Plan, config: &Config, cancel: CancelFlag) -> ExecContext {
    ExecContext::new(plan.working_dir())
        .with_environment(config.cli.environment.clone())
        .with_vars(config.cli.vars.clone())
        .with_timeout(config.cli.timeout())
        .with_cancel(cancel)
}

/// Resolve the vendor program; `None` when it cannot be found
pub fn find_program(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

/// Warn early when the vendor CLI is missing; each step will then fail to launch
pub fn check_program(config: &Config) {
    match find_program(&config.cli.program) {
        Some(path) => tracing::debug!(program = %path.display(), "resolved vendor CLI"),
        None => eprintln!(
            "⚠ Warning: '{}' not found in PATH; steps will fail to launch",
            config.cli.program
        ),
    }
}

/// Make a relative program path absolute before the working directory changes
pub fn absolutize_program(config: &mut Config) -> Result<()> {
    let program = Path::new(&config.cli.program);
    if program.is_relative() && program.components().count() > 1 {
        let absolute = std::env::current_dir()?.join(program);
        config.cli.program = absolute.to_string_lossy().into_owned();
    }
    Ok(())
}

/// Short label for headers: manifest name or file name
pub fn manifest_label(manifest: &Manifest, path: &Path) -> String {
    manifest
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}
