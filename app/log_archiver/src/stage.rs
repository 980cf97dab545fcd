use std::collections::HashSet;
use std::path::PathBuf;

use framework::exception;
use framework::exception::CoreRsResult;
use framework::exception::error_code;
use tracing::info;

use crate::lister::CandidateObject;
use crate::store::ObjectStore;
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
}

// all or nothing, the first failed download aborts the run
pub async fn stage_objects<S>(
    store: &S,
    candidates: &[CandidateObject],
    workspace: &Workspace,
) -> CoreRsResult<Vec<StagedFile>>
where
    S: ObjectStore,
{
    let mut staged = Vec::with_capacity(candidates.len());
    let mut paths = HashSet::with_capacity(candidates.len());
    for candidate in candidates {
        let key = &candidate.key;
        let path = workspace.local_path(key)?;
        if !paths.insert(path.clone()) {
            return Err(exception!(
                code = error_code::DOWNLOAD_ERROR,
                message = format!("local path already staged by another key, key={key}, path={}", path.to_string_lossy())
            ));
        }
        let size = store.download(key, &path).await.map_err(|err| {
            exception!(
                code = error_code::DOWNLOAD_ERROR,
                message = format!("failed to download object, key={key}"),
                source = err
            )
        })?;
        let last_modified = candidate.last_modified.map(|time| time.to_rfc3339()).unwrap_or_default();
        info!(key, path = %path.to_string_lossy(), size, last_modified, "downloaded object");
        staged.push(StagedFile {
            key: key.clone(),
            path,
            size,
        });
    }
    Ok(staged)
}
