use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;
use tracing::Level;
use tracing::dispatcher::DefaultGuard;
use tracing::info;
use tracing::info_span;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

use crate::exception::CoreRsResult;
use crate::exception::Exception;
use crate::exception::Severity;

/// Log state of one run, events go to console and to a local file.
///
/// The subscriber is only installed while the handle is alive, dropping it restores the previous one.
pub struct RunLog {
    path: PathBuf,
    file: Arc<File>,
    _guard: DefaultGuard,
}

impl RunLog {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush(&self) -> CoreRsResult<()> {
        self.file.sync_all().map_err(|err| {
            exception!(
                message = format!("failed to flush log file, path={}", self.path.to_string_lossy()),
                source = err
            )
        })
    }
}

pub fn init_with_file(path: &Path) -> CoreRsResult<RunLog> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path).map_err(|err| {
        exception!(
            message = format!("failed to open log file, path={}", path.to_string_lossy()),
            source = err
        )
    })?;
    let file = Arc::new(file);

    let guard = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_ansi(false) // generally cloud log console doesn't support color
                .with_line_number(true)
                .with_thread_ids(true)
                .with_filter(LevelFilter::INFO),
        )
        .with(
            fmt::layer()
                .compact()
                .with_ansi(false)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_writer(Arc::clone(&file))
                .with_filter(LevelFilter::INFO),
        )
        .set_default();

    Ok(RunLog {
        path: path.to_path_buf(),
        file,
        _guard: guard,
    })
}

macro_rules! log_event {
    (level = $level:ident, error_code = $error_code:expr, $($arg:tt)+) => {
        match $level {
            ::tracing::Level::TRACE => {},
            ::tracing::Level::DEBUG => {},
            ::tracing::Level::INFO => {},
            ::tracing::Level::WARN => {
                match $error_code {
                    Some(ref error_code) => ::tracing::warn!(error_code, $($arg)+),
                    None => ::tracing::warn!($($arg)+),
                }
            },
            ::tracing::Level::ERROR => {
                match $error_code {
                    Some(ref error_code) => ::tracing::error!(error_code, $($arg)+),
                    None => ::tracing::error!($($arg)+),
                }
            }
        }
    };
}

pub async fn start_action<T, R>(action: &str, task: T) -> CoreRsResult<R>
where
    T: Future<Output = CoreRsResult<R>>,
{
    let action_id = Uuid::now_v7().to_string();
    let action_span = info_span!("action", action, action_id);
    async {
        let start_time = Instant::now();
        info!("=== action begin ===");
        let result = task.await;
        if let Err(ref e) = result {
            log_exception(e);
        }
        info!(elapsed = ?start_time.elapsed(), "=== action end ===");
        result
    }
    .instrument(action_span)
    .await
}

pub fn log_exception(e: &Exception) {
    let level = match e.severity {
        Severity::Warn => Level::WARN,
        Severity::Error => Level::ERROR,
    };
    let message = &e.message;
    log_event!(
        level = level,
        error_code = e.code,
        backtrace = e.to_string(),
        "{message}"
    );
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tracing::info;

    use super::init_with_file;
    use super::start_action;
    use crate::exception::CoreRsResult;
    use crate::exception::error_code;

    #[test]
    fn write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/run.log");

        let run_log = init_with_file(&path).unwrap();
        info!(key = "a.log", "downloaded object");
        run_log.flush().unwrap();

        let content = fs::read_to_string(run_log.path()).unwrap();
        assert!(content.contains("downloaded object"));
        assert!(content.contains("a.log"));
    }

    #[tokio::test]
    async fn log_failed_action() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let run_log = init_with_file(&path).unwrap();

        let result: CoreRsResult<()> = start_action("archive", async {
            Err(exception!(code = error_code::UPLOAD_ERROR, message = "upload failed"))
        })
        .await;
        assert!(result.is_err());
        run_log.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("=== action begin ==="));
        assert!(content.contains("upload failed"));
        assert!(content.contains("UPLOAD_ERROR"));
        assert!(content.contains("=== action end ==="));
    }
}
