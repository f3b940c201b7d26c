use std::path::Path;
use std::process::{Command, Output};

fn php_devserver(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_php-devserver"))
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .unwrap()
}

fn write_config(dir: &Path, document_root: &Path) -> std::path::PathBuf {
    let path = dir.join("devserver.json");
    let config = serde_json::json!({
        "documentRoot": document_root,
        "lockDir": dir,
        "probeTimeoutMs": 500,
    });
    std::fs::write(&path, config.to_string()).unwrap();
    path
}

#[test]
fn test_stop_twice() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), dir.path());
    std::fs::write(dir.path().join("localhost-9123.pid"), "").unwrap();

    let first = php_devserver(&config, &["server:stop", "localhost", "--port", "9123"]);
    assert_eq!(first.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&first.stdout)
        .contains("Stopped the web server listening on http://localhost:9123"));

    let second = php_devserver(&config, &["server:stop", "localhost:9123"]);
    assert_eq!(second.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&second.stderr)
        .contains("No web server is listening on http://localhost:9123"));
}

#[test]
fn test_run_with_missing_document_root() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &dir.path().join("www"));

    let output = php_devserver(&config, &["server:run", "127.0.0.1", "-p", "9124"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[cfg(unix)]
#[test]
fn test_start_on_locked_address() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), dir.path());
    std::fs::write(dir.path().join("127-0-0-1-9125.pid"), "").unwrap();

    let output = php_devserver(&config, &["server:start", "127.0.0.1:9125"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("A process is already listening on http://127.0.0.1:9125."));
    assert!(stderr.contains("--force"));
}
