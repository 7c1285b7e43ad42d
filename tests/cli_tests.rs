//! Binary-level tests: help output and exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn release_builder() -> Command {
    let mut cmd = Command::cargo_bin("react_release_builder").expect("binary is built");
    for var in [
        "RELEASE_CWD",
        "RELEASE_TEMP_ROOT",
        "RELEASE_CHANNEL",
        "RELEASE_CONFIRMED",
        "RELEASE_INSTALL_COMMAND",
        "RELEASE_BUILD_COMMAND",
        "RELEASE_BUILD_TIMEOUT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_flags() {
    release_builder()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--temp-root"))
        .stdout(predicate::str::contains("--channel"))
        .stdout(predicate::str::contains("--yes"));
}

#[test]
fn test_outside_a_checkout_fails_before_staging() {
    let repo = TempDir::new().expect("Failed to create temp dir");
    let temp_root = TempDir::new().expect("Failed to create temp dir");

    release_builder()
        .arg("--cwd")
        .arg(repo.path())
        .arg("--temp-root")
        .arg(temp_root.path())
        .arg("--yes")
        .env("GIT_CEILING_DIRECTORIES", repo.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Incomplete build info"));

    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
}

#[test]
fn test_zero_timeout_is_rejected() {
    let repo = TempDir::new().expect("Failed to create temp dir");

    release_builder()
        .arg("--cwd")
        .arg(repo.path())
        .args(["--build-timeout", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout"));
}

#[test]
fn test_unknown_channel_is_a_usage_error() {
    release_builder()
        .args(["--channel", "nightly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nightly"));
}

fn git(dir: &std::path::Path, args: &[&str]) -> bool {
    std::process::Command::new("git")
        .args([
            "-c",
            "user.name=Release Bot",
            "-c",
            "user.email=release@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .is_ok_and(|out| out.status.success())
}

fn committed_checkout() -> Option<TempDir> {
    let repo = TempDir::new().expect("Failed to create temp dir");
    let root = repo.path();
    std::fs::create_dir_all(root.join("packages/react")).unwrap();
    std::fs::write(
        root.join("packages/react/package.json"),
        r#"{"name":"react","version":"19.0.0"}"#,
    )
    .unwrap();
    std::fs::write(root.join("ReactVersions.js"), "const ReactVersion = '19.1.0';\n").unwrap();

    let ready = git(root, &["init", "-q"])
        && git(root, &["add", "-A"])
        && git(root, &["commit", "-q", "-m", "Initial commit"]);
    ready.then_some(repo)
}

#[cfg(unix)]
#[test]
fn test_full_run_prints_summary_and_exits_zero() {
    let Some(repo) = committed_checkout() else {
        eprintln!("git unavailable; skipping full release run");
        return;
    };
    let temp_root = TempDir::new().expect("Failed to create temp dir");

    release_builder()
        .arg("--cwd")
        .arg(repo.path())
        .arg("--temp-root")
        .arg(temp_root.path())
        .arg("--yes")
        .args(["--install-command", ""])
        .args(["--build-command", "mkdir -p build/node_modules/react"])
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .code(0)
        .stdout(predicate::str::contains("Pre-release summary"))
        .stdout(predicate::str::contains("--ci-build"))
        .stdout(predicate::str::contains("--dry").not());

    let staged: Vec<_> = std::fs::read_dir(temp_root.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(staged.len(), 1);
    let staging = &staged[0];
    assert!(
        staging
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with("react-"))
    );
    assert_eq!(std::fs::read_dir(staging.join("build/packed")).unwrap().count(), 1);
    assert!(!repo.path().join("build").exists());
}
