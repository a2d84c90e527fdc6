use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const BASIC_MANIFEST: &str = r#"
name = "basic"

[[resource]]
name = "hello_world_agent"
kind = "native_agent"
file = "agents/hello_world_agent.yaml"
depends_on = ["greetings"]

[[resource]]
name = "greetings"
kind = "python_tool"
file = "tools/greetings.py"
"#;

fn wxo_lifecycle(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("wxo-lifecycle"));
    cmd.env("HOME", home)
        .env_remove("WXO_LIFECYCLE_PROGRAM")
        .env_remove("WXO_LIFECYCLE_ENV")
        .env_remove("WXO_LIFECYCLE_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// A temp dir holding `manifest.toml` with `contents`
fn project(contents: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("manifest.toml"), contents).unwrap();
    dir
}

#[test]
fn test_help_output() {
    let home = tempfile::tempdir().unwrap();
    wxo_lifecycle(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dependency order"))
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_output() {
    let home = tempfile::tempdir().unwrap();
    let output = wxo_lifecycle(home.path()).arg("--version").assert().success();
    let stdout = String::from_utf8_lossy(&output.get_output().stdout);

    let version_part = stdout.strip_prefix("wxo-lifecycle ").unwrap().trim();
    assert!(
        version_part.chars().next().unwrap().is_numeric(),
        "Version should start with a number: {}",
        version_part
    );
}

#[test]
fn test_validate_ok() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);

    wxo_lifecycle(home.path())
        .arg("validate")
        .arg(dir.path().join("manifest.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Manifest is valid (2 resources)"))
        .stdout(predicate::str::contains("greetings -> hello_world_agent"));
}

#[test]
fn test_validate_cycle_exits_2() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(
        r#"
        [[resource]]
        name = "x"
        kind = "native_agent"
        depends_on = ["y"]

        [[resource]]
        name = "y"
        kind = "native_agent"
        depends_on = ["x"]
        "#,
    );

    wxo_lifecycle(home.path())
        .arg("validate")
        .arg(dir.path().join("manifest.toml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Cyclic dependency: x -> y -> x"));
}

#[test]
fn test_unknown_dependency_exits_2_without_running() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(
        r#"
        [[resource]]
        name = "agent"
        kind = "native_agent"
        file = "agent.yaml"
        depends_on = ["ghost"]
        "#,
    );

    wxo_lifecycle(home.path())
        .arg("apply")
        .arg(dir.path().join("manifest.toml"))
        .args(["--program", "false"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown resource 'ghost'"));
}

#[test]
fn test_missing_manifest_exits_2() {
    let home = tempfile::tempdir().unwrap();
    wxo_lifecycle(home.path())
        .args(["plan", "/definitely/not/here/manifest.toml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Cannot read manifest"));
}

#[test]
fn test_plan_lists_commands_in_order() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);

    wxo_lifecycle(home.path())
        .arg("plan")
        .arg(dir.path().join("manifest.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1. orchestrate tools import -k python -f tools/greetings.py",
        ))
        .stdout(predicate::str::contains(
            "2. orchestrate agents import -f agents/hello_world_agent.yaml",
        ));
}

#[test]
fn test_plan_teardown_json() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);

    let output = wxo_lifecycle(home.path())
        .arg("plan")
        .arg(dir.path().join("manifest.toml"))
        .args(["--teardown", "--json", "--env", "local"])
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(value["action"], "remove");
    assert_eq!(value["preflight"][3], "local");
    assert_eq!(value["steps"][0]["name"], "hello_world_agent");
    assert_eq!(value["steps"][1]["name"], "greetings");
}

#[test]
fn test_plan_unknown_selection_exits_2() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);

    wxo_lifecycle(home.path())
        .arg("plan")
        .arg(dir.path().join("manifest.toml"))
        .args(["--select", "nobody"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nobody"));
}

#[test]
fn test_apply_success() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);

    wxo_lifecycle(home.path())
        .arg("apply")
        .arg(dir.path().join("manifest.toml"))
        .args(["--program", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Importing greetings (python_tool) ... ✓"))
        .stdout(predicate::str::contains(
            "import completed: 2 succeeded, 0 failed, 0 skipped",
        ));
}

#[test]
fn test_apply_failure_aborts() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);

    wxo_lifecycle(home.path())
        .arg("apply")
        .arg(dir.path().join("manifest.toml"))
        .args(["--program", "false"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "import aborted: 0 succeeded, 1 failed, 1 skipped",
        ));
}

#[test]
fn test_apply_keep_going_overrides_policy() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);

    wxo_lifecycle(home.path())
        .arg("apply")
        .arg(dir.path().join("manifest.toml"))
        .args(["--program", "false", "--keep-going"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("2 failed"))
        .stdout(predicate::str::contains("⚠ 2 of 2 steps failed"));
}

#[test]
fn test_missing_program_is_a_step_failure() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);

    wxo_lifecycle(home.path())
        .arg("apply")
        .arg(dir.path().join("manifest.toml"))
        .args(["--program", "wxo-lifecycle-no-such-cli"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found in PATH"))
        .stderr(predicate::str::contains("could not launch: program not found"));
}

#[test]
fn test_dry_run_runs_nothing() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);

    wxo_lifecycle(home.path())
        .arg("teardown")
        .arg(dir.path().join("manifest.toml"))
        .args(["--program", "wxo-lifecycle-no-such-cli", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "wxo-lifecycle-no-such-cli agents remove -n hello_world_agent -k native",
        ))
        .stdout(predicate::str::contains("[Dry run - no changes made]"));
}

#[test]
fn test_report_written_as_json() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);
    let report = dir.path().join("out").join("report.json");

    wxo_lifecycle(home.path())
        .arg("teardown")
        .arg(dir.path().join("manifest.toml"))
        .args(["--program", "true", "--report"])
        .arg(&report)
        .assert()
        .success();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(value["action"], "remove");
    assert_eq!(value["outcome"], "completed");
    assert_eq!(value["success"], true);
    assert_eq!(value["steps"].as_array().unwrap().len(), 2);
}

#[test]
fn test_project_config_is_applied() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);
    std::fs::write(
        dir.path().join(".wxo-lifecycle.toml"),
        r#"[templates.python_tool]
import = ["tools", "import", "-k", "python", "-f", "{file}", "-r", "requirements.txt"]
"#,
    )
    .unwrap();

    wxo_lifecycle(home.path())
        .arg("plan")
        .arg(dir.path().join("manifest.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "tools import -k python -f tools/greetings.py -r requirements.txt",
        ));
}

#[test]
fn test_invalid_config_exits_2() {
    let home = tempfile::tempdir().unwrap();
    let dir = project(BASIC_MANIFEST);
    std::fs::write(dir.path().join(".wxo-lifecycle.toml"), "[templates.robot]\n").unwrap();

    wxo_lifecycle(home.path())
        .arg("plan")
        .arg(dir.path().join("manifest.toml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("[templates.robot]"));
}

#[test]
fn test_config_show() {
    let home = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();

    wxo_lifecycle(home.path())
        .args(["config", "show", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("program: orchestrate"))
        .stdout(predicate::str::contains("remove: continue"))
        .stdout(predicate::str::contains("knowledge-bases remove -n {name}"));
}

#[cfg(unix)]
mod scripted {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Fake vendor CLI: logs its arguments, fails or reports absence on demand
    fn fake_cli(dir: &Path, script: &str) -> std::path::PathBuf {
        let path = dir.join("fake-orchestrate");
        let body = format!("#!/bin/sh\necho \"$@\" >> calls.log\n{}\n", script);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    const THREE_TOOLS: &str = r#"
        [[resource]]
        name = "one"
        kind = "python_tool"
        file = "one.py"

        [[resource]]
        name = "two"
        kind = "python_tool"
        file = "two.py"

        [[resource]]
        name = "three"
        kind = "python_tool"
        file = "three.py"
        "#;

    fn calls(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_teardown_continues_past_failure() {
        let home = tempfile::tempdir().unwrap();
        let dir = project(THREE_TOOLS);
        let cli = fake_cli(
            dir.path(),
            "case \"$*\" in *\"-n two\"*) echo 'server error' >&2; exit 1;; esac",
        );

        wxo_lifecycle(home.path())
            .arg("teardown")
            .arg(dir.path().join("manifest.toml"))
            .arg("--program")
            .arg(&cli)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("⚠ 1 of 3 steps failed"))
            .stderr(predicate::str::contains("exit code 1: server error"));

        assert_eq!(
            calls(dir.path()),
            vec![
                "tools remove -n three",
                "tools remove -n two",
                "tools remove -n one"
            ]
        );
    }

    #[test]
    fn test_apply_stops_at_second_step() {
        let home = tempfile::tempdir().unwrap();
        let dir = project(THREE_TOOLS);
        let cli = fake_cli(dir.path(), "case \"$*\" in *two.py*) exit 3;; esac");

        wxo_lifecycle(home.path())
            .arg("apply")
            .arg(dir.path().join("manifest.toml"))
            .arg("--program")
            .arg(&cli)
            .assert()
            .code(1);

        assert_eq!(calls(dir.path()).len(), 2);
    }

    #[test]
    fn test_teardown_twice_reports_absent_as_skipped() {
        let home = tempfile::tempdir().unwrap();
        let dir = project(THREE_TOOLS);
        let cli = fake_cli(dir.path(), "echo \"Tool not found\"; exit 1");

        for _ in 0..2 {
            wxo_lifecycle(home.path())
                .arg("teardown")
                .arg(dir.path().join("manifest.toml"))
                .arg("--program")
                .arg(&cli)
                .assert()
                .success()
                .stdout(predicate::str::contains("0 failed, 3 skipped"));
        }
    }

    #[test]
    fn test_shell_command_not_found_is_a_failure() {
        let home = tempfile::tempdir().unwrap();
        let dir = project(THREE_TOOLS);
        let cli = fake_cli(dir.path(), "echo 'sh: 1: orchestrate: not found' >&2; exit 127");

        wxo_lifecycle(home.path())
            .arg("teardown")
            .arg(dir.path().join("manifest.toml"))
            .arg("--program")
            .arg(&cli)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("0 succeeded, 3 failed, 0 skipped"));
    }

    #[test]
    fn test_empty_missing_ok_disables_absence_check() {
        let home = tempfile::tempdir().unwrap();
        let dir = project(THREE_TOOLS);
        std::fs::write(
            dir.path().join(".wxo-lifecycle.toml"),
            "[policy]\nmissing_ok = []\n",
        )
        .unwrap();
        let cli = fake_cli(dir.path(), "echo \"Tool not found\"; exit 1");

        wxo_lifecycle(home.path())
            .arg("teardown")
            .arg(dir.path().join("manifest.toml"))
            .arg("--program")
            .arg(&cli)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("3 failed"));
    }

    #[test]
    fn test_environment_activation_runs_first() {
        let home = tempfile::tempdir().unwrap();
        let dir = project(THREE_TOOLS);
        let cli = fake_cli(dir.path(), "echo \"$WXO_ENVIRONMENT $GREETING\" >> env.log");

        wxo_lifecycle(home.path())
            .arg("apply")
            .arg(dir.path().join("manifest.toml"))
            .arg("--program")
            .arg(&cli)
            .args(["--env", "local", "--var", "GREETING=hello"])
            .assert()
            .success();

        let calls = calls(dir.path());
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0], "env activate local");

        let env_log = std::fs::read_to_string(dir.path().join("env.log")).unwrap();
        assert!(env_log.lines().all(|l| l == "local hello"));
    }

    #[test]
    fn test_timeout_fails_step() {
        let home = tempfile::tempdir().unwrap();
        let dir = project(THREE_TOOLS);
        let cli = fake_cli(dir.path(), "exec sleep 5");

        wxo_lifecycle(home.path())
            .arg("apply")
            .arg(dir.path().join("manifest.toml"))
            .arg("--program")
            .arg(&cli)
            .args(["--timeout", "1"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("timed out"));

        assert_eq!(calls(dir.path()).len(), 1);
    }
}
