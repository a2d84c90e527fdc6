use crate::cli::RunCmd;
use crate::commands::helpers;
use crate::error::Result;
use crate::plan::Action;
use crate::runner::{CancelFlag, ProcessRunner};
use crate::sequencer::LifecycleSequencer;

/// Run `apply` (import) or `teardown` (remove) and return the process exit code
pub fn execute(cmd: &RunCmd, action: Action, verbose: bool, cancel: CancelFlag) -> Result<u8> {
    let prepared = helpers::prepare(&cmd.manifest, &cmd.run, action, verbose)?;
    let config = &prepared.config;
    let plan = &prepared.plan;

    let policy = helpers::failure_policy(&cmd.policy, config, action);
    let title = match action {
        Action::Import => "Apply",
        Action::Remove => "Teardown",
    };
    println!(
        "\n━━━ {}: {} ({} steps, on failure: {}) ━━━",
        title,
        helpers::manifest_label(&prepared.manifest, &cmd.manifest),
        plan.steps().len(),
        policy
    );

    if cmd.dry_run {
        if let Some(preflight) = plan.preflight() {
            println!("  {}", preflight);
        }
        for step in plan.steps() {
            println!("  {}", step.command);
        }
    } else {
        helpers::check_program(config);
    }

    let runner = ProcessRunner::new();
    let context = helpers::exec_context(plan, config, cancel);
    let options = helpers::sequencer_options(policy, config, cmd.dry_run);
    let report = LifecycleSequencer::new(&runner, context, options).run(plan)?;

    if cmd.dry_run {
        println!("[Dry run - no changes made]");
    } else {
        if let Some(err) = report.preflight_error() {
            eprintln!("✗ Environment activation failed: {}", err);
        }
        println!();
        print!("{}", report.summary());
    }

    if let Some(path) = &cmd.report {
        report.write_json(path)?;
        println!("Report written to {}", path.display());
    }

    Ok(report.exit_code())
}
