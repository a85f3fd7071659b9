use std::fs;
use std::path::Path;
use std::process::Command;

const BASE_CONFIG: &str = r#"
store:
  hosts:
    - "127.0.0.1:1"
  namespace: test
  set_name: phones
seed:
  count: 10
"#;

fn write_configuration(root: &Path) {
    let directory = root.join("configuration");
    fs::create_dir_all(&directory).unwrap();
    fs::write(directory.join("base.yaml"), BASE_CONFIG).unwrap();
    fs::write(directory.join("dev.yaml"), "{}\n").unwrap();
}

#[test]
fn unreachable_store_exits_with_failure_and_logs_the_hosts() {
    let workdir = tempfile::tempdir().unwrap();
    write_configuration(workdir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_customers"))
        .current_dir(workdir.path())
        .env("APP_ENVIRONMENT", "dev")
        .env("RUST_LOG", "info")
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!output.status.success(), "unexpected success, stdout: {stdout}");
    assert!(
        stdout
            .lines()
            .any(|line| line.contains("connection error") && line.contains("127.0.0.1:1")),
        "missing connection error line, stdout: {stdout}"
    );
}

#[test]
fn invalid_configuration_exits_with_failure() {
    let workdir = tempfile::tempdir().unwrap();
    write_configuration(workdir.path());
    fs::write(
        workdir.path().join("configuration").join("dev.yaml"),
        "seed:\n  count: 0\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_customers"))
        .current_dir(workdir.path())
        .env("APP_ENVIRONMENT", "dev")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("seed.count"));
}
