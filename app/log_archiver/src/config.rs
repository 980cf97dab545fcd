use std::path::Path;
use std::path::PathBuf;

use framework::exception;
use framework::exception::CoreRsResult;
use framework::json;
use framework::s3::MIN_PART_SIZE;
use framework::s3::MultipartConfig;
use framework::s3::S3Config;
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bucket_name: String,
    /// holds archives and run logs, objects under it are never archived
    pub s3_log_directory: String,
    pub profile: Option<String>,
    pub region: Option<String>,
    #[serde(default)]
    pub source_prefix: String,
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
    #[serde(default = "default_delete_source")]
    pub delete_source: bool,
    #[serde(default = "default_tags")]
    pub tags: IndexMap<String, String>,
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold: u64,
    #[serde(default = "default_multipart_chunk_size")]
    pub multipart_chunk_size: usize,
}

fn default_archive_name() -> String {
    "weekly-archive".to_owned()
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_delete_source() -> bool {
    true
}

fn default_tags() -> IndexMap<String, String> {
    IndexMap::from([("ArchiveStatus".to_owned(), "ReadyForGlacier".to_owned())])
}

fn default_multipart_threshold() -> u64 {
    MultipartConfig::default().threshold
}

fn default_multipart_chunk_size() -> usize {
    MultipartConfig::default().part_size
}

impl AppConfig {
    pub fn load(path: &Path) -> CoreRsResult<Self> {
        let config: AppConfig = json::load_file(path)?;
        config.validate()
    }

    pub fn validate(mut self) -> CoreRsResult<Self> {
        self.s3_log_directory = self.s3_log_directory.trim_matches('/').to_owned();
        self.source_prefix = self.source_prefix.trim_start_matches('/').to_owned();

        if self.bucket_name.is_empty() {
            return Err(exception!(message = "bucket_name must not be empty"));
        }
        if self.s3_log_directory.is_empty() {
            return Err(exception!(message = "s3_log_directory must not be empty"));
        }
        if self.archive_name.is_empty() || self.archive_name.contains('/') {
            return Err(exception!(
                message = format!("archive_name must be a non-empty file name, archive_name={}", self.archive_name)
            ));
        }
        if self.multipart_chunk_size < MIN_PART_SIZE {
            return Err(exception!(
                message = format!(
                    "multipart_chunk_size must be at least {MIN_PART_SIZE}, multipart_chunk_size={}",
                    self.multipart_chunk_size
                )
            ));
        }
        Ok(self)
    }

    pub fn s3(&self) -> S3Config {
        S3Config {
            bucket: self.bucket_name.clone(),
            profile: self.profile.clone(),
            region: self.region.clone(),
        }
    }

    pub fn multipart(&self) -> MultipartConfig {
        MultipartConfig {
            threshold: self.multipart_threshold,
            part_size: self.multipart_chunk_size,
        }
    }
}
