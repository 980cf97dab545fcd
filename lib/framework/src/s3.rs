use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::CompletedMultipartUpload;
use aws_sdk_s3::types::CompletedPart;
use aws_sdk_s3::types::Object;
use aws_sdk_s3::types::Tag;
use aws_sdk_s3::types::Tagging;
use chrono::DateTime;
use chrono::Utc;
use tokio::fs;
use tokio::fs::File;
use tokio::fs::OpenOptions;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tracing::Instrument;
use tracing::debug;
use tracing::debug_span;
use tracing::warn;

use crate::exception::CoreRsResult;

// S3 rejects parts smaller than 5MiB, except the last one
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

pub struct S3Config {
    pub bucket: String,
    pub profile: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct MultipartConfig {
    /// files at or above this size are uploaded in parts
    pub threshold: u64,
    pub part_size: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            threshold: 8 * 1024 * 1024,
            part_size: 8 * 1024 * 1024,
        }
    }
}

impl MultipartConfig {
    fn effective_part_size(&self) -> usize {
        self.part_size.max(MIN_PART_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct S3Object {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl From<&Object> for S3Object {
    fn from(object: &Object) -> Self {
        S3Object {
            key: object.key().unwrap_or_default().to_owned(),
            size: object.size().and_then(|size| u64::try_from(size).ok()).unwrap_or(0),
            last_modified: object
                .last_modified()
                .and_then(|time| DateTime::from_timestamp(time.secs(), time.subsec_nanos())),
        }
    }
}

pub struct S3Client {
    client: Client,
    bucket: String,
    profile: Option<String>,
    credentials: Option<SharedCredentialsProvider>,
}

impl S3Client {
    pub async fn new(config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(ref profile) = config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(ref region) = config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        Self {
            client: Client::new(&sdk_config),
            bucket: config.bucket.clone(),
            profile: config.profile.clone(),
            credentials: sdk_config.credentials_provider(),
        }
    }

    pub async fn check_credentials(&self) -> CoreRsResult<()> {
        let profile = self.profile.as_deref().unwrap_or("default");
        let provider = self.credentials.as_ref().ok_or_else(|| {
            exception!(message = format!("no credentials provider, profile={profile}"))
        })?;
        provider.provide_credentials().await.map_err(|err| {
            let message = format!(
                "failed to resolve credentials, profile={profile}, error={}",
                DisplayErrorContext(&err)
            );
            exception!(message = message, source = err)
        })?;
        debug!(profile, "credentials resolved");
        Ok(())
    }

    pub async fn list_objects(&self, prefix: &str) -> CoreRsResult<Vec<S3Object>> {
        let span = debug_span!("s3", operation = "list", bucket = self.bucket, prefix);
        async {
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix((!prefix.is_empty()).then(|| prefix.to_owned()))
                .into_paginator()
                .send();

            let mut objects = Vec::new();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|err| {
                    let message = format!("failed to list objects, prefix={prefix}, error={}", DisplayErrorContext(&err));
                    exception!(message = message, source = err)
                })?;
                objects.extend(page.contents().iter().map(S3Object::from));
            }
            debug!(objects = objects.len(), "listed objects");
            Ok(objects)
        }
        .instrument(span)
        .await
    }

    /// Streams the object body into a new file, an existing file at `path` is an error.
    pub async fn download(&self, key: &str, path: &Path) -> CoreRsResult<u64> {
        let span = debug_span!("s3", operation = "get", key);
        async {
            let mut output = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|err| {
                    let message = format!("failed to get object, key={key}, error={}", DisplayErrorContext(&err));
                    exception!(message = message, source = err)
                })?;

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let mut file = OpenOptions::new().write(true).create_new(true).open(path).await.map_err(|err| {
                exception!(
                    message = format!("failed to create file, path={}", path.to_string_lossy()),
                    source = err
                )
            })?;
            let mut size = 0;
            while let Some(bytes) = output.body.try_next().await.map_err(|err| {
                exception!(
                    message = format!("failed to read object body, key={key}"),
                    source = err
                )
            })? {
                file.write_all(&bytes).await?;
                size += bytes.len() as u64;
            }
            file.flush().await?;
            debug!(size, "downloaded object");
            Ok(size)
        }
        .instrument(span)
        .await
    }

    pub async fn upload(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
        multipart: MultipartConfig,
    ) -> CoreRsResult<()> {
        let span = debug_span!("s3", operation = "put", key);
        async {
            let size = fs::metadata(path).await?.len();
            if size == 0 || size < multipart.threshold {
                let body = ByteStream::from_path(path).await.map_err(|err| {
                    exception!(
                        message = format!("failed to read file, path={}", path.to_string_lossy()),
                        source = err
                    )
                })?;
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .content_type(content_type)
                    .body(body)
                    .send()
                    .await
                    .map_err(|err| {
                        let message = format!("failed to put object, key={key}, error={}", DisplayErrorContext(&err));
                        exception!(message = message, source = err)
                    })?;
            } else {
                self.multipart_upload(path, key, content_type, multipart.effective_part_size())
                    .await?;
            }
            debug!(size, "uploaded object");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn multipart_upload(&self, path: &Path, key: &str, content_type: &str, part_size: usize) -> CoreRsResult<()> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|err| {
                let message = format!(
                    "failed to create multipart upload, key={key}, error={}",
                    DisplayErrorContext(&err)
                );
                exception!(message = message, source = err)
            })?;
        let upload_id = output
            .upload_id()
            .ok_or_else(|| exception!(message = format!("multipart upload id is missing, key={key}")))?
            .to_owned();

        let result = async {
            let parts = self.upload_parts(path, key, &upload_id, part_size).await?;
            self.client
                .complete_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(&upload_id)
                .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(parts)).build())
                .send()
                .await
                .map_err(|err| {
                    let message = format!(
                        "failed to complete multipart upload, key={key}, error={}",
                        DisplayErrorContext(&err)
                    );
                    exception!(message = message, source = err)
                })?;
            Ok(())
        }
        .await;

        // uncommitted parts never become visible, abort releases them
        if result.is_err() {
            self.abort_multipart_upload(key, &upload_id).await;
        }
        result
    }

    async fn upload_parts(
        &self,
        path: &Path,
        key: &str,
        upload_id: &str,
        part_size: usize,
    ) -> CoreRsResult<Vec<CompletedPart>> {
        let mut file = File::open(path).await?;
        let mut parts = Vec::new();
        let mut part_number = 1;
        loop {
            let mut buffer = Vec::with_capacity(part_size);
            (&mut file).take(part_size as u64).read_to_end(&mut buffer).await?;
            if buffer.is_empty() {
                break;
            }

            debug!(part_number, size = buffer.len(), "upload part");
            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(buffer))
                .send()
                .await
                .map_err(|err| {
                    let message = format!(
                        "failed to upload part, key={key}, part={part_number}, error={}",
                        DisplayErrorContext(&err)
                    );
                    exception!(message = message, source = err)
                })?;
            let e_tag = output.e_tag().ok_or_else(|| {
                exception!(message = format!("part etag is missing, key={key}, part={part_number}"))
            })?;
            parts.push(CompletedPart::builder().e_tag(e_tag).part_number(part_number).build());
            part_number += 1;
        }
        Ok(parts)
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) {
        let result = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await;
        if let Err(err) = result {
            warn!(key, upload_id, "failed to abort multipart upload, error={}", DisplayErrorContext(&err));
        }
    }

    pub async fn put_tags(&self, key: &str, tags: &[(String, String)]) -> CoreRsResult<()> {
        let span = debug_span!("s3", operation = "put_tagging", key);
        async {
            let tag_set = tags
                .iter()
                .map(|(name, value)| Tag::builder().key(name).value(value).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| exception!(message = "invalid tag", source = err))?;
            let tagging = Tagging::builder()
                .set_tag_set(Some(tag_set))
                .build()
                .map_err(|err| exception!(message = "invalid tagging", source = err))?;

            self.client
                .put_object_tagging()
                .bucket(&self.bucket)
                .key(key)
                .tagging(tagging)
                .send()
                .await
                .map_err(|err| {
                    let message = format!("failed to put object tagging, key={key}, error={}", DisplayErrorContext(&err));
                    exception!(message = message, source = err)
                })?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    pub async fn delete(&self, key: &str) -> CoreRsResult<()> {
        let span = debug_span!("s3", operation = "delete", key);
        async {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|err| {
                    let message = format!("failed to delete object, key={key}, error={}", DisplayErrorContext(&err));
                    exception!(message = message, source = err)
                })?;
            Ok(())
        }
        .instrument(span)
        .await
    }
}
