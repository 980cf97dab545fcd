use std::fs;

use framework::exception;
use framework::exception::Severity;
use framework::exception::error_code;
use framework::log::RunLog;
use framework::log::log_exception;
use tracing::info;

use crate::store::ObjectStore;

const CONTENT_TYPE: &str = "text/plain";

pub fn run_log_key(log_prefix: &str, timestamp: &str) -> String {
    format!("{log_prefix}/archive-log-{timestamp}.txt")
}

/// Flushes the run log and uploads it, called at the end of every run including failed ones.
///
/// The local file is removed once uploaded and kept when the upload failed.
pub async fn upload_run_log<S>(store: &S, run_log: &RunLog, log_prefix: &str, timestamp: &str) -> bool
where
    S: ObjectStore,
{
    let key = run_log_key(log_prefix, timestamp);
    info!(key, "upload run log");
    let result = async {
        run_log.flush()?;
        store.upload(run_log.path(), &key, CONTENT_TYPE).await
    }
    .await;

    match result {
        Ok(()) => {
            remove_local_log(run_log);
            true
        }
        Err(err) => {
            log_exception(&err.with_severity(Severity::Warn));
            false
        }
    }
}

fn remove_local_log(run_log: &RunLog) {
    let path = run_log.path();
    if let Err(err) = fs::remove_file(path) {
        log_exception(&exception!(
            severity = Severity::Warn,
            code = error_code::CLEANUP_ERROR,
            message = format!("failed to remove local run log, path={}", path.to_string_lossy()),
            source = err
        ));
    }
}
