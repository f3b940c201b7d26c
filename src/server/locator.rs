use std::env;
use std::path::{Path, PathBuf};

/// Finds the web server executable.
pub trait ExecutableLocator: Send + Sync {
    /// Path to the executable, or `None` if it cannot be found.
    fn locate(&self) -> Option<PathBuf>;

    /// Name of the executable, used in error messages.
    fn name(&self) -> &str {
        "PHP"
    }
}

/// Locates the PHP CLI binary.
///
/// Lookup order: an explicitly configured path, the `PHP_BINARY` environment
/// variable, then `php` on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct PhpExecutableLocator {
    configured: Option<PathBuf>,
}

impl PhpExecutableLocator {
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self { configured }
    }
}

impl ExecutableLocator for PhpExecutableLocator {
    fn locate(&self) -> Option<PathBuf> {
        if let Some(path) = &self.configured {
            // An explicit path is authoritative, even if it's wrong.
            return is_executable(path).then(|| path.clone());
        }

        if let Some(path) = env::var_os("PHP_BINARY").map(PathBuf::from) {
            if is_executable(&path) {
                tracing::debug!(path = %path.display(), "Using PHP_BINARY");
                return Some(path);
            }
        }

        find_in_path("php")
    }
}

/// Searches `PATH` for an executable called `name`.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    let file_name = if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    };

    env::split_paths(&paths)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
