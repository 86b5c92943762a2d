//! Smoke tests -- verify the binary runs and key modules load.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("incident-sentinel")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains(
            "Real-time incident classification and alerting",
        ));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("incident-sentinel")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("incident-sentinel"));
}

#[test]
fn test_serve_subcommand_exists() {
    Command::cargo_bin("incident-sentinel")
        .unwrap()
        .arg("serve")
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn test_generate_subcommand_exists() {
    Command::cargo_bin("incident-sentinel")
        .unwrap()
        .arg("generate")
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn test_incidents_subcommand_exists() {
    Command::cargo_bin("incident-sentinel")
        .unwrap()
        .arg("incidents")
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn test_generate_rejects_bad_anomaly_rate() {
    Command::cargo_bin("incident-sentinel")
        .unwrap()
        .args(["generate", "--count", "1", "--anomaly-rate", "150"])
        .assert()
        .failure();
}
