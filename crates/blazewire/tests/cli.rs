#![cfg(feature = "cli")]

use std::process::Command;

fn blazewire() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_blazewire"));
    cmd.arg("--log-level").arg("error");
    cmd
}

#[test]
fn version_prints_package_version() {
    let output = blazewire().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("blazewire {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_lists_features() {
    let output = blazewire()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: blazewire"));
    assert!(stdout.contains("cli=true"));
}

#[test]
fn invalid_timeout_is_usage_error() {
    let output = blazewire()
        .args(["ping", "127.0.0.1", "--timeout", "0s"])
        .output()
        .expect("ping should run");

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("timeout must be greater than zero"));
}

#[test]
fn unreachable_controller_is_transport_error() {
    let output = blazewire()
        .args(["--format", "json", "ping", "127.0.0.1:1", "--timeout", "1s"])
        .output()
        .expect("ping should run");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("connect failed"));
    assert!(output.stdout.is_empty());
}
