//! End-to-end tests of the `android-signing` command-line tool.
//!
//! Each test runs the compiled binary inside its own temporary project
//! directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const MANIFEST: &str = "
version = 1

[application]
id = \"ussd_emulator\"
name = \"USSD Emulator\"

[android]
application-id = \"com.iden.ussd_emulator\"
namespace = \"com.iden.ussd_emulator\"
ndk-version = \"27.0.12077973\"
jvm-target = \"11\"
";

const COMPLETE: &str = "\
keyAlias=app
keyPassword=p1
storeFile=release.jks
storePassword=p2
";

/// Create a project directory with a manifest and optional credentials.
fn project(credentials: Option<&str>) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("android-signing.toml"), MANIFEST).unwrap();
    if let Some(v) = credentials {
        std::fs::write(dir.path().join("key.properties"), v).unwrap();
    }
    dir
}

#[allow(deprecated)]
fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("android-signing").unwrap();
    cmd.current_dir(dir.path());
    cmd.env_remove("ANDROID_SIGNING_LOG");
    cmd
}

#[test]
fn test_resolve_release_from_credentials() {
    let dir = project(Some(COMPLETE));

    cmd(&dir)
        .args(["resolve", "--variant", "release"])
        .assert()
        .success()
        .stdout(predicate::str::contains("android.injected.signing.key.alias=app\n"))
        .stdout(predicate::str::contains("android.injected.signing.key.password=p1\n"))
        .stdout(predicate::str::contains("android.injected.signing.store.password=p2\n"))
        .stdout(predicate::str::contains("release.jks\n"));
}

#[test]
fn test_resolve_release_without_credentials_falls_back() {
    let dir = project(None);

    cmd(&dir)
        .args(["resolve", "--variant", "release"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("debug identity"));
}

#[test]
fn test_resolve_debug_ignores_credentials() {
    let dir = project(Some("keyAlias=app\n"));

    cmd(&dir)
        .args(["resolve", "--variant", "debug"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_resolve_missing_field_fails() {
    let dir = project(Some("keyAlias=app\nkeyPassword=p1\nstoreFile=release.jks\n"));

    cmd(&dir)
        .args(["resolve", "--variant", "release"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("missing 'storePassword'"));
}

#[test]
fn test_resolve_empty_field_fails() {
    let dir = project(Some("keyAlias=\nkeyPassword=p1\nstoreFile=release.jks\nstorePassword=p2\n"));

    cmd(&dir)
        .args(["resolve", "--variant", "release"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing 'keyAlias'"));
}

#[test]
fn test_resolve_credentials_override_without_manifest() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("signing.properties"), COMPLETE).unwrap();

    cmd(&dir)
        .args(["resolve", "--variant", "Release", "--credentials", "signing.properties"])
        .assert()
        .success()
        .stdout(predicate::str::contains("android.injected.signing.key.alias=app"));
}

#[test]
fn test_resolve_invalid_variant() {
    let dir = project(None);

    cmd(&dir)
        .args(["resolve", "--variant", "profile"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid build variant"));
}

#[test]
fn test_missing_manifest_fails() {
    let dir = TempDir::new().unwrap();

    cmd(&dir)
        .args(["resolve", "--variant", "release"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot parse signing manifest"));
}

#[test]
fn test_evaluate_reports_fallback() {
    let dir = project(None);

    let output = cmd(&dir).arg("evaluate").output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["credentials-present"], false);
    assert_eq!(json["android"]["namespace"], "com.iden.ussd_emulator");
    assert_eq!(json["variants"][0]["variant"], "debug");
    assert_eq!(json["variants"][1]["variant"], "release");
    assert_eq!(json["variants"][1]["signing"]["config"], "debug");
    assert_eq!(json["variants"][1]["signing"]["release-fallback"], true);
}

#[test]
fn test_evaluate_with_credentials_hides_passwords() {
    let dir = project(Some(COMPLETE));

    let output = cmd(&dir).arg("evaluate").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("\"p1\"") && !stdout.contains("\"p2\""));

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["variants"][1]["signing"]["source"], "credentials-file");
    assert_eq!(json["variants"][1]["signing"]["alias"], "app");
    assert_eq!(json["variants"][1]["minify"], true);
}

#[test]
fn test_evaluate_missing_field_fails() {
    let dir = project(Some("storeFile=release.jks\n"));

    cmd(&dir)
        .arg("evaluate")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("missing 'keyAlias'"));
}

#[test]
fn test_emit_writes_and_removes() {
    let dir = project(Some(COMPLETE));
    let output = dir.path().join("build").join("signing.properties");

    cmd(&dir)
        .args(["emit", "--variant", "release", "--output", "build/signing.properties"])
        .assert()
        .success();

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.contains("android.injected.signing.key.alias=app\n"));

    cmd(&dir)
        .args(["emit", "--variant", "debug", "--output", "build/signing.properties"])
        .assert()
        .success();

    assert!(!output.exists());
}

#[test]
fn test_verbose_logs_to_stderr() {
    let dir = project(Some(COMPLETE));

    cmd(&dir)
        .args(["--verbose", "resolve", "--variant", "release"])
        .assert()
        .success()
        .stderr(predicate::str::contains("credentials file loaded"))
        .stderr(predicate::str::contains("p1").not());
}
