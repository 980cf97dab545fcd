use std::path::Path;

use framework::exception::CoreRsResult;
use framework::s3::MultipartConfig;
use framework::s3::S3Client;
use framework::s3::S3Object;

#[cfg(test)]
pub mod memory;

/// Object store operations the archival pipeline depends on.
pub trait ObjectStore {
    async fn check_credentials(&self) -> CoreRsResult<()>;

    async fn list_objects(&self, prefix: &str) -> CoreRsResult<Vec<S3Object>>;

    /// Streams the object to `path`, returns the number of bytes written.
    async fn download(&self, key: &str, path: &Path) -> CoreRsResult<u64>;

    /// Either the key holds the full file content afterwards, or it is not created.
    async fn upload(&self, path: &Path, key: &str, content_type: &str) -> CoreRsResult<()>;

    async fn put_tags(&self, key: &str, tags: &[(String, String)]) -> CoreRsResult<()>;

    async fn delete(&self, key: &str) -> CoreRsResult<()>;
}

pub struct S3Store {
    client: S3Client,
    multipart: MultipartConfig,
}

impl S3Store {
    pub fn new(client: S3Client, multipart: MultipartConfig) -> Self {
        Self { client, multipart }
    }
}

impl ObjectStore for S3Store {
    async fn check_credentials(&self) -> CoreRsResult<()> {
        self.client.check_credentials().await
    }

    async fn list_objects(&self, prefix: &str) -> CoreRsResult<Vec<S3Object>> {
        self.client.list_objects(prefix).await
    }

    async fn download(&self, key: &str, path: &Path) -> CoreRsResult<u64> {
        self.client.download(key, path).await
    }

    async fn upload(&self, path: &Path, key: &str, content_type: &str) -> CoreRsResult<()> {
        self.client.upload(path, key, content_type, self.multipart).await
    }

    async fn put_tags(&self, key: &str, tags: &[(String, String)]) -> CoreRsResult<()> {
        self.client.put_tags(key, tags).await
    }

    async fn delete(&self, key: &str) -> CoreRsResult<()> {
        self.client.delete(key).await
    }
}
