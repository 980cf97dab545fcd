use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use framework::exception;
use framework::exception::CoreRsResult;
use framework::exception::Severity;
use framework::exception::error_code;
use framework::log::log_exception;
use tempfile::TempDir;
use tracing::info;

const FILES_DIR: &str = "files";

/// Local directory of one run, downloads go to `files/`, the bundle sits beside it.
///
/// Removed by [`Workspace::close`], or on drop if the run unwinds before closing.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create(parent: &Path) -> CoreRsResult<Self> {
        fs::create_dir_all(parent).map_err(|err| {
            exception!(
                message = format!("failed to create local dir, path={}", parent.to_string_lossy()),
                source = err
            )
        })?;
        let dir = tempfile::Builder::new()
            .prefix("log-archiver-")
            .tempdir_in(parent)
            .map_err(|err| {
                exception!(
                    message = format!("failed to create workspace, parent={}", parent.to_string_lossy()),
                    source = err
                )
            })?;
        let files_dir = dir.path().join(FILES_DIR);
        fs::create_dir_all(&files_dir).map_err(|err| {
            exception!(
                message = format!("failed to create files dir, path={}", files_dir.to_string_lossy()),
                source = err
            )
        })?;
        info!(path = %dir.path().to_string_lossy(), "created workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn files_dir(&self) -> PathBuf {
        self.dir.path().join(FILES_DIR)
    }

    pub fn bundle_path(&self, file_name: &str) -> PathBuf {
        self.dir.path().join(file_name)
    }

    /// Maps an object key to its download path, keeping the key structure.
    ///
    /// Only keys made of plain `/`-separated segments are accepted, so distinct keys never share a path.
    pub fn local_path(&self, key: &str) -> CoreRsResult<PathBuf> {
        let mut path = self.files_dir();
        let mut segments = Vec::new();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(segment) => {
                    path.push(segment);
                    segments.push(segment.to_string_lossy());
                }
                Component::Prefix(_) | Component::RootDir | Component::CurDir | Component::ParentDir => {
                    return Err(exception!(
                        code = error_code::DOWNLOAD_ERROR,
                        message = format!("object key is not a relative path, key={key}")
                    ));
                }
            }
        }
        if segments.is_empty() {
            return Err(exception!(
                code = error_code::DOWNLOAD_ERROR,
                message = format!("object key is empty, key={key}")
            ));
        }
        // components() drops repeated and trailing separators and interior `.` segments
        if segments.join("/") != key {
            return Err(exception!(
                code = error_code::DOWNLOAD_ERROR,
                message = format!("object key is not in canonical form, key={key}")
            ));
        }
        Ok(path)
    }

    pub fn close(self) {
        let path = self.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => info!(path = %path.to_string_lossy(), "removed workspace"),
            Err(err) => log_exception(&exception!(
                severity = Severity::Warn,
                code = error_code::CLEANUP_ERROR,
                message = format!("failed to remove workspace, path={}", path.to_string_lossy()),
                source = err
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use framework::exception::error_code;

    use super::Workspace;

    #[test]
    fn create_and_close() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(parent.path()).unwrap();
        let path = workspace.path().to_path_buf();
        assert!(workspace.files_dir().is_dir());
        assert!(path.starts_with(parent.path()));

        fs::write(workspace.files_dir().join("a.log"), "a").unwrap();
        workspace.close();
        assert!(!path.exists());
    }

    #[test]
    fn removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let path = {
            let workspace = Workspace::create(parent.path()).unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn unique_per_run() {
        let parent = tempfile::tempdir().unwrap();
        let first = Workspace::create(parent.path()).unwrap();
        let second = Workspace::create(parent.path()).unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn local_path() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(parent.path()).unwrap();

        assert_eq!(
            workspace.local_path("app/2025/a.log").unwrap(),
            workspace.files_dir().join("app").join("2025").join("a.log")
        );
        assert_eq!(
            workspace.local_path("../escape.log").unwrap_err().code(),
            Some(error_code::DOWNLOAD_ERROR)
        );
        assert_eq!(
            workspace.local_path("/etc/passwd").unwrap_err().code(),
            Some(error_code::DOWNLOAD_ERROR)
        );
        assert!(workspace.local_path("").is_err());
    }

    #[test]
    fn reject_non_canonical_key() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(parent.path()).unwrap();

        assert!(workspace.local_path("app/a.log").is_ok());
        for key in ["app//a.log", "app/./a.log", "./app/a.log", "app/a.log/"] {
            assert_eq!(
                workspace.local_path(key).unwrap_err().code(),
                Some(error_code::DOWNLOAD_ERROR),
                "key={key}"
            );
        }
    }
}
