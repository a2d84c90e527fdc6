use crate::cli::PlanCmd;
use crate::commands::helpers;
use crate::error::Result;
use crate::manifest::ResourceKind;
use crate::plan::{Action, Plan};
use serde::Serialize;

#[derive(Serialize)]
struct PlanView<'a> {
    action: Action,
    working_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    preflight: Option<Vec<String>>,
    steps: Vec<StepView<'a>>,
}

#[derive(Serialize)]
struct StepView<'a> {
    name: &'a str,
    kind: ResourceKind,
    command: Vec<String>,
}

impl<'a> PlanView<'a> {
    fn new(plan: &'a Plan) -> Self {
        Self {
            action: plan.action(),
            working_dir: plan.working_dir().display().to_string(),
            preflight: plan.preflight().map(|c| c.argv()),
            steps: plan
                .steps()
                .iter()
                .map(|s| StepView {
                    name: &s.descriptor.name,
                    kind: s.descriptor.kind,
                    command: s.command.argv(),
                })
                .collect(),
        }
    }
}

pub fn execute(cmd: &PlanCmd, verbose: bool) -> Result<()> {
    let action = if cmd.teardown {
        Action::Remove
    } else {
        Action::Import
    };
    let prepared = helpers::prepare(&cmd.manifest, &cmd.run, action, verbose)?;
    let plan = &prepared.plan;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&PlanView::new(plan))?);
        return Ok(());
    }

    println!(
        "{} plan for {} (in {}):",
        action,
        helpers::manifest_label(&prepared.manifest, &cmd.manifest),
        plan.working_dir().display()
    );
    if let Some(preflight) = plan.preflight() {
        println!("   0. {}", preflight);
    }
    for (i, step) in plan.steps().iter().enumerate() {
        println!("  {:>2}. {}", i + 1, step.command);
    }
    if plan.is_empty() {
        println!("  (nothing to do)");
    }

    Ok(())
}
