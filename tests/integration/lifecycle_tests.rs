use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use wxo_lifecycle::config::Config;
use wxo_lifecycle::error::{LaunchError, LifecycleError, ManifestError};
use wxo_lifecycle::manifest::{Manifest, ResourceDescriptor, ResourceKind};
use wxo_lifecycle::plan::{Action, Plan};
use wxo_lifecycle::runner::{CommandLine, CommandOutput, CommandRunner, ExecContext, ExitState};
use wxo_lifecycle::sequencer::{
    LifecycleReport, LifecycleSequencer, RunOutcome, SequencerOptions, SequencerState, StepStatus,
};
use wxo_lifecycle::template::KindTemplates;

/// Stand-in for the vendor CLI that remembers what exists.
///
/// Every command has the shape `<kind> <action> <name>`.
struct RecordingRunner {
    calls: RefCell<Vec<(String, String)>>,
    existing: RefCell<BTreeSet<String>>,
    failing: Vec<&'static str>,
    /// Report removal of an absent resource as an error instead of success
    strict_remove: bool,
}

impl RecordingRunner {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            existing: RefCell::new(BTreeSet::new()),
            failing: Vec::new(),
            strict_remove: false,
        }
    }

    fn failing(mut self, names: &[&'static str]) -> Self {
        self.failing = names.to_vec();
        self
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }

    fn names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(_, name)| name).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn execute(
        &self,
        command: &CommandLine,
        _context: &ExecContext,
    ) -> Result<CommandOutput, LaunchError> {
        let action = command.args[1].clone();
        let name = command.args[2].clone();
        self.calls.borrow_mut().push((action.clone(), name.clone()));

        let reply = |code: i32, stdout: &str| CommandOutput {
            state: ExitState::Exited(code),
            stdout: stdout.to_string(),
            stderr: String::new(),
            duration: Duration::from_millis(1),
        };

        if self.failing.contains(&name.as_str()) {
            return Ok(reply(1, "internal server error"));
        }

        let mut existing = self.existing.borrow_mut();
        Ok(match action.as_str() {
            "import" => {
                existing.insert(name);
                reply(0, "imported")
            }
            _ if existing.remove(&name) => reply(0, "removed"),
            _ if self.strict_remove => reply(1, "Resource not found"),
            _ => reply(0, "already removed"),
        })
    }
}

fn config() -> Config {
    let mut config = Config::default();
    for kind in ResourceKind::ALL {
        config.templates.insert(
            kind.as_str().to_string(),
            KindTemplates {
                import: Some(vec!["{kind}".into(), "import".into(), "{name}".into()]),
                remove: Some(vec!["{kind}".into(), "remove".into(), "{name}".into()]),
            },
        );
    }
    config
}

fn manifest(resources: Vec<ResourceDescriptor>) -> Result<Manifest, ManifestError> {
    Manifest::from_resources(resources, PathBuf::from("."))
}

fn run(runner: &RecordingRunner, manifest: &Manifest, action: Action) -> LifecycleReport {
    let plan = Plan::build(manifest, action, &config()).unwrap();
    LifecycleSequencer::new(runner, ExecContext::new("."), SequencerOptions::for_action(action))
        .run(&plan)
        .unwrap()
}

fn three_tools() -> Manifest {
    manifest(vec![
        ResourceDescriptor::new("one", ResourceKind::PythonTool),
        ResourceDescriptor::new("two", ResourceKind::PythonTool),
        ResourceDescriptor::new("three", ResourceKind::PythonTool),
    ])
    .unwrap()
}

#[test]
fn test_tool_then_agent_scenario() {
    let manifest = manifest(vec![
        ResourceDescriptor::new("a1", ResourceKind::NativeAgent).depends_on(["t1"]),
        ResourceDescriptor::new("t1", ResourceKind::PythonTool),
    ])
    .unwrap();

    let runner = RecordingRunner::new();
    let apply = run(&runner, &manifest, Action::Import);
    let teardown = run(&runner, &manifest, Action::Remove);

    assert!(apply.success() && teardown.success());
    assert_eq!(
        runner.calls(),
        vec![
            ("import".to_string(), "t1".to_string()),
            ("import".to_string(), "a1".to_string()),
            ("remove".to_string(), "a1".to_string()),
            ("remove".to_string(), "t1".to_string()),
        ]
    );
}

#[test]
fn test_import_failure_stops_after_two_invocations() {
    let runner = RecordingRunner::new().failing(&["two"]);
    let report = run(&runner, &three_tools(), Action::Import);

    assert_eq!(runner.names(), vec!["one", "two"]);
    assert_eq!(report.outcome(), RunOutcome::Aborted);
    assert_eq!(report.steps()[2].status, StepStatus::Skipped);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_remove_failure_visits_every_step() {
    let runner = RecordingRunner::new().failing(&["two"]);
    let report = run(&runner, &three_tools(), Action::Remove);

    assert_eq!(runner.names(), vec!["three", "two", "one"]);
    assert_eq!(report.outcome(), RunOutcome::Completed);
    let warning = report.warning().expect("partial completion warning");
    assert_eq!(warning.failed, vec!["two"]);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_cycle_refuses_to_run() {
    let err = manifest(vec![
        ResourceDescriptor::new("x", ResourceKind::NativeAgent).depends_on(["y"]),
        ResourceDescriptor::new("y", ResourceKind::NativeAgent).depends_on(["x"]),
    ])
    .unwrap_err();

    assert!(matches!(err, ManifestError::CyclicDependency { .. }));
    assert_eq!(LifecycleError::from(err).exit_code(), 2);
}

#[test]
fn test_teardown_twice_never_aborts() {
    let manifest = three_tools();
    let runner = RecordingRunner::new();
    run(&runner, &manifest, Action::Import);

    let first = run(&runner, &manifest, Action::Remove);
    let second = run(&runner, &manifest, Action::Remove);

    assert_eq!(first.outcome(), RunOutcome::Completed);
    assert_eq!(second.outcome(), RunOutcome::Completed);
    assert!(second.success());
}

#[test]
fn test_teardown_of_absent_resources_is_skipped() {
    let mut runner = RecordingRunner::new();
    runner.strict_remove = true;

    let report = run(&runner, &three_tools(), Action::Remove);

    assert_eq!(report.outcome(), RunOutcome::Completed);
    assert!(report.success());
    assert_eq!(report.count(StepStatus::Skipped), 3);
    assert!(report.warning().is_none());
}

#[test]
fn test_independent_resources_keep_declaration_order() {
    let manifest = manifest(vec![
        ResourceDescriptor::new("kb", ResourceKind::KnowledgeBase),
        ResourceDescriptor::new("toolkit", ResourceKind::McpToolkit),
        ResourceDescriptor::new("flow", ResourceKind::FlowTool),
    ])
    .unwrap();

    for _ in 0..5 {
        let runner = RecordingRunner::new();
        run(&runner, &manifest, Action::Import);
        assert_eq!(runner.names(), vec!["kb", "toolkit", "flow"]);
    }
}

#[test]
fn test_selection_narrows_the_run() {
    let manifest = manifest(vec![
        ResourceDescriptor::new("t1", ResourceKind::PythonTool),
        ResourceDescriptor::new("t2", ResourceKind::PythonTool),
        ResourceDescriptor::new("a1", ResourceKind::NativeAgent).depends_on(["t1"]),
    ])
    .unwrap();

    let runner = RecordingRunner::new();
    let selected = manifest.select(&["a1".to_string()], Action::Import).unwrap();
    run(&runner, &selected, Action::Import);

    assert_eq!(runner.names(), vec!["t1", "a1"]);
}

#[test]
fn test_sequencer_state_after_run() {
    let runner = RecordingRunner::new();
    let plan = Plan::build(&three_tools(), Action::Import, &config()).unwrap();
    let mut sequencer = LifecycleSequencer::new(
        &runner,
        ExecContext::new("."),
        SequencerOptions::for_action(Action::Import),
    );

    assert_eq!(sequencer.state(), SequencerState::NotStarted);
    sequencer.run(&plan).unwrap();
    assert_eq!(sequencer.state(), SequencerState::Completed);
}
