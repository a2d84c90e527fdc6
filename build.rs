use std::env;
use std::process::Command;

fn main() {
    let version = env::var("CARGO_PKG_VERSION").unwrap();
    let profile = env::var("PROFILE").unwrap();

    let full_version = if profile == "debug" {
        // Dev build - add git hash when available
        match get_git_hash() {
            Some(hash) if is_git_dirty() => format!("{}-dev+{}.dirty", version, hash),
            Some(hash) => format!("{}-dev+{}", version, hash),
            None => format!("{}-dev", version),
        }
    } else {
        version
    };

    println!("cargo:rustc-env=WXO_LIFECYCLE_VERSION={}", full_version);

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");
}

fn get_git_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}

fn is_git_dirty() -> bool {
    // Unstaged or staged changes
    diff_reports_changes(&["diff", "--quiet"]) || diff_reports_changes(&["diff", "--cached", "--quiet"])
}

fn diff_reports_changes(args: &[&str]) -> bool {
    Command::new("git")
        .args(args)
        .status()
        .map(|status| !status.success())
        .unwrap_or(false)
}
