#![allow(dead_code)]

use mockall::mock;
use php_devserver::server::ExecutableLocator;
use php_devserver::{Address, Config};
use std::future::Future;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

mock! {
    pub Locator {}

    impl ExecutableLocator for Locator {
        fn locate(&self) -> Option<PathBuf>;
    }
}

/// Locator that must never be consulted.
pub fn unused_locator() -> MockLocator {
    let mut locator = MockLocator::new();
    locator.expect_locate().times(0);
    locator
}

/// Locator returning `path`.
pub fn locator_for(path: PathBuf) -> MockLocator {
    let mut locator = MockLocator::new();
    locator.expect_locate().return_const(Some(path));
    locator
}

/// An address on 127.0.0.1 nothing is listening on.
pub fn free_address() -> Address {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Address::resolve("127.0.0.1", &port.to_string())
}

/// Configuration with its own document root and lock directory.
pub fn test_config(document_root: &Path, lock_dir: &Path) -> Config {
    Config {
        document_root: document_root.to_path_buf(),
        lock_dir: Some(lock_dir.to_path_buf()),
        probe_timeout_ms: 500,
        poll_interval_ms: 200,
        ..Config::default()
    }
}

/// Writes an executable shell script standing in for the PHP binary.
///
/// It is called as `<script> -S <address> -t <document root>`.
#[cfg(unix)]
pub fn fake_server(dir: &Path, body: &str) -> PathBuf {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-php");
    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "{}", body).unwrap();
        file.sync_all().unwrap();
    }
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Polls `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition().await
}

/// Whether a process with `pid` exists.
#[cfg(unix)]
pub fn process_alive(pid: i32) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}
