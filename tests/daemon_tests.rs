#![cfg(unix)]

mod common;

use common::{fake_server, free_address, locator_for, process_alive, test_config, wait_until};
use php_devserver::server::{
    LockFile, OutputMode, RecordingReporter, ServerProcess, ServerStatus, Supervisor,
    SupervisorCommand, daemon_capability,
};
use php_devserver::{DevServer, Error};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const SERVER_SCRIPT: &str = "echo $$ > \"$4/server.pid\"\nexec sleep 30";

fn supervisor_command() -> SupervisorCommand {
    SupervisorCommand::new(env!("CARGO_BIN_EXE_php-devserver"))
}

async fn read_pid(document_root: &Path) -> i32 {
    let pid_file = document_root.join("server.pid");
    assert!(
        wait_until(Duration::from_secs(5), || {
            let pid_file = pid_file.clone();
            async move {
                std::fs::read_to_string(&pid_file)
                    .map(|s| !s.trim().is_empty())
                    .unwrap_or(false)
            }
        })
        .await,
        "server never wrote its pid"
    );
    std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap()
}

async fn wait_for_exit(pid: i32) -> bool {
    wait_until(Duration::from_secs(5), || async move { !process_alive(pid) }).await
}

#[test]
fn test_background_mode_available_on_unix() {
    assert!(daemon_capability().is_available());
}

#[tokio::test]
async fn test_supervisor_stops_server_when_lock_removed() {
    let bin = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let script = fake_server(bin.path(), SERVER_SCRIPT);
    let address = free_address();
    let lock = LockFile::in_dir(bin.path(), &address);

    let process = ServerProcess::new(script, address, root.path().to_path_buf());
    let supervisor = Supervisor::start(process, lock.clone(), Duration::from_millis(1000))
        .await
        .unwrap();

    assert_eq!(supervisor.lock().path(), lock.path());
    assert!(lock.exists());
    assert_eq!(supervisor.process().status(), ServerStatus::Running);
    let pid = read_pid(root.path()).await;

    let watch = tokio::spawn(supervisor.watch());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!watch.is_finished());
    assert!(process_alive(pid));

    lock.remove().unwrap();
    let code = tokio::time::timeout(Duration::from_secs(2) + Duration::from_millis(500), watch)
        .await
        .expect("supervisor did not stop within the poll interval")
        .unwrap()
        .unwrap();

    // SIGTERM
    assert_eq!(code, 128 + 15);
    assert!(!process_alive(pid));
}

#[tokio::test]
async fn test_supervisor_ends_when_server_exits_on_its_own() {
    let bin = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let script = fake_server(bin.path(), "sleep 0.3\nexit 4");
    let address = free_address();
    let lock = LockFile::in_dir(bin.path(), &address);

    let process = ServerProcess::new(script, address, root.path().to_path_buf());
    let supervisor = Supervisor::start(process, lock.clone(), Duration::from_millis(100))
        .await
        .unwrap();

    let code = tokio::time::timeout(Duration::from_secs(5), supervisor.watch())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(code, 4);
    // Nobody asked it to stop, so the lock is left for --force to deal with.
    assert!(lock.exists());
}

#[tokio::test]
async fn test_supervisor_spawn_failure_leaves_no_lock() {
    let dir = tempfile::tempdir().unwrap();
    let address = free_address();
    let lock = LockFile::in_dir(dir.path(), &address);

    let process = ServerProcess::new(
        dir.path().join("no-such-php"),
        address,
        dir.path().to_path_buf(),
    );
    let result = Supervisor::start(process, lock.clone(), Duration::from_millis(100)).await;

    assert!(matches!(result, Err(Error::SpawnFailed(_))));
    assert!(!lock.exists());
}

#[tokio::test]
async fn test_supervisor_removes_lock_when_server_already_exited() {
    let bin = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let script = fake_server(bin.path(), "exit 3");
    let address = free_address();
    let lock = LockFile::in_dir(bin.path(), &address);

    let mut process = ServerProcess::new(script, address, root.path().to_path_buf());
    process.start(OutputMode::Disabled).unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while process.is_running().unwrap() {
        assert!(tokio::time::Instant::now() < deadline, "server never exited");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let result = Supervisor::adopt(process, lock.clone(), Duration::from_millis(100)).await;

    assert!(matches!(result, Err(Error::SpawnFailed(_))));
    assert!(!lock.exists());
}

#[tokio::test]
async fn test_supervisor_kills_server_when_lock_cannot_be_created() {
    let bin = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let script = fake_server(bin.path(), SERVER_SCRIPT);
    let address = free_address();
    let lock = LockFile::in_dir(bin.path().join("missing"), &address);

    let mut process = ServerProcess::new(script, address, root.path().to_path_buf());
    process.start(OutputMode::Disabled).unwrap();
    let pid = process.pid().unwrap() as i32;

    let result = Supervisor::adopt(process, lock.clone(), Duration::from_millis(100)).await;
    assert!(matches!(result, Err(Error::Io(_))));
    assert!(!lock.exists());

    // Killed and reaped before adopt returned.
    assert!(!process_alive(pid));
}

#[tokio::test]
async fn test_start_and_stop_in_background() {
    let bin = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let script = fake_server(bin.path(), SERVER_SCRIPT);
    let address = free_address();
    let lock = LockFile::in_dir(bin.path(), &address);
    let reporter = RecordingReporter::new();

    let server = DevServer::new(test_config(root.path(), bin.path()))
        .with_locator(Arc::new(locator_for(script)))
        .with_reporter(Arc::new(reporter.clone()))
        .with_supervisor_command(supervisor_command());

    assert_eq!(server.start(&address, false).await, 0);
    assert!(reporter.contains(&format!("Web server listening on http://{}", address)));

    let lock_path = lock.clone();
    assert!(
        wait_until(Duration::from_secs(5), || {
            let lock = lock_path.clone();
            async move { lock.exists() }
        })
        .await,
        "supervisor never created the lock file"
    );
    let lock_files: Vec<_> = std::fs::read_dir(bin.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "pid"))
        .collect();
    assert_eq!(lock_files.len(), 1);

    let pid = read_pid(root.path()).await;
    assert!(process_alive(pid));

    assert_eq!(server.stop(&address), 0);
    assert!(wait_for_exit(pid).await, "server survived server:stop");
    assert_eq!(server.stop(&address), 1);
}

#[tokio::test]
async fn test_start_refuses_locked_address_unless_forced() {
    let bin = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let script = fake_server(bin.path(), SERVER_SCRIPT);
    let address = free_address();
    let lock = LockFile::in_dir(bin.path(), &address);
    lock.create().unwrap();
    let reporter = RecordingReporter::new();

    let server = DevServer::new(test_config(root.path(), bin.path()))
        .with_locator(Arc::new(locator_for(script)))
        .with_reporter(Arc::new(reporter.clone()))
        .with_supervisor_command(supervisor_command());

    assert_eq!(server.start(&address, false).await, 1);
    assert!(reporter.contains("Use the --force option"));
    assert!(!root.path().join("server.pid").exists());

    assert_eq!(server.start(&address, true).await, 0);
    let pid = read_pid(root.path()).await;

    assert_eq!(server.stop(&address), 0);
    assert!(wait_for_exit(pid).await, "forced server survived server:stop");
}

#[tokio::test]
async fn test_start_with_missing_document_root() {
    let dir = tempfile::tempdir().unwrap();
    let reporter = RecordingReporter::new();

    let server = DevServer::new(test_config(&dir.path().join("www"), dir.path()))
        .with_locator(Arc::new(common::unused_locator()))
        .with_reporter(Arc::new(reporter.clone()))
        .with_supervisor_command(supervisor_command());

    assert_eq!(server.start(&free_address(), true).await, 1);
    assert!(reporter.contains("does not exist"));
}
