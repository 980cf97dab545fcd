use framework::exception;
use framework::exception::Severity;
use framework::exception::error_code;
use framework::log::log_exception;
use indexmap::IndexMap;
use tracing::info;

use crate::store::ObjectStore;
use crate::upload::UploadedBundle;

// best effort, an untagged archive stays in place
pub async fn tag_bundle<S>(store: &S, uploaded: &UploadedBundle, tags: &IndexMap<String, String>) -> bool
where
    S: ObjectStore,
{
    let key = uploaded.key();
    if tags.is_empty() {
        info!(key, "no tags configured, skip tagging");
        return false;
    }

    let tags: Vec<(String, String)> = tags.iter().map(|(name, value)| (name.clone(), value.clone())).collect();
    match store.put_tags(key, &tags).await {
        Ok(()) => {
            info!(key, tags = ?tags, "tagged archive");
            true
        }
        Err(err) => {
            log_exception(&exception!(
                severity = Severity::Warn,
                code = error_code::TAG_ERROR,
                message = format!("failed to tag archive, key={key}"),
                source = err
            ));
            false
        }
    }
}
