use framework::exception;
use framework::exception::CoreRsResult;
use framework::exception::error_code;
use tracing::info;

use crate::archive::Bundle;
use crate::archive::CONTENT_TYPE;
use crate::store::ObjectStore;

/// Receipt of a confirmed upload, only [`upload_bundle`] creates it.
#[derive(Debug)]
pub struct UploadedBundle {
    key: String,
    manifest: Vec<String>,
}

impl UploadedBundle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }
}

pub async fn upload_bundle<S>(store: &S, bundle: &Bundle) -> CoreRsResult<UploadedBundle>
where
    S: ObjectStore,
{
    let key = &bundle.key;
    info!(key, size = bundle.compressed_size, "upload archive");
    store.upload(&bundle.path, key, CONTENT_TYPE).await.map_err(|err| {
        exception!(
            code = error_code::UPLOAD_ERROR,
            message = format!("failed to upload archive, key={key}"),
            source = err
        )
    })?;
    info!(key, "uploaded archive");
    Ok(UploadedBundle {
        key: key.clone(),
        manifest: bundle.manifest.clone(),
    })
}

#[cfg(test)]
impl UploadedBundle {
    pub fn confirmed(key: &str, manifest: &[&str]) -> Self {
        Self {
            key: key.to_owned(),
            manifest: manifest.iter().map(|key| (*key).to_owned()).collect(),
        }
    }
}
