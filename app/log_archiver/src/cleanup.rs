use framework::exception;
use framework::exception::Severity;
use framework::exception::error_code;
use framework::log::log_exception;
use tracing::info;

use crate::store::ObjectStore;
use crate::upload::UploadedBundle;

/// Deletes the source objects packed into an uploaded bundle, returns the number deleted.
///
/// Failures are logged and the remaining objects are still attempted.
pub async fn delete_sources<S>(store: &S, uploaded: &UploadedBundle) -> usize
where
    S: ObjectStore,
{
    let mut deleted = 0;
    for key in uploaded.manifest() {
        match store.delete(key).await {
            Ok(()) => {
                info!(key, "deleted source object");
                deleted += 1;
            }
            Err(err) => log_exception(&exception!(
                severity = Severity::Warn,
                code = error_code::CLEANUP_ERROR,
                message = format!("failed to delete source object, key={key}"),
                source = err
            )),
        }
    }
    info!(archive = uploaded.key(), deleted, "deleted source objects");
    deleted
}
