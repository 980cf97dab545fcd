use std::fs;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::io::IntoInnerError;
use std::path::Path;
use std::path::PathBuf;

use flate2::Compression;
use flate2::write::GzEncoder;
use framework::exception;
use framework::exception::CoreRsResult;
use framework::exception::error_code;
use tracing::info;

use crate::lister::ARCHIVE_SUFFIX;
use crate::stage::StagedFile;
use crate::workspace::Workspace;

pub const CONTENT_TYPE: &str = "application/gzip";

#[derive(Debug)]
pub struct Bundle {
    pub path: PathBuf,
    pub key: String,
    /// source object keys packed into the bundle
    pub manifest: Vec<String>,
    pub original_size: u64,
    pub compressed_size: u64,
}

pub fn bundle_file_name(archive_name: &str, timestamp: &str) -> String {
    format!("{archive_name}-{timestamp}{ARCHIVE_SUFFIX}")
}

pub fn bundle_key(log_prefix: &str, archive_name: &str, timestamp: &str) -> String {
    format!("{log_prefix}/{}", bundle_file_name(archive_name, timestamp))
}

pub fn create_bundle(
    workspace: &Workspace,
    staged: &[StagedFile],
    archive_name: &str,
    timestamp: &str,
    log_prefix: &str,
) -> CoreRsResult<Bundle> {
    let path = workspace.bundle_path(&bundle_file_name(archive_name, timestamp));
    write_archive(&path, archive_name, staged).map_err(|err| {
        exception!(
            code = error_code::ARCHIVE_ERROR,
            message = format!("failed to create archive, path={}", path.to_string_lossy()),
            source = err
        )
    })?;
    let compressed_size = fs::metadata(&path)
        .map_err(|err| {
            exception!(
                code = error_code::ARCHIVE_ERROR,
                message = format!("failed to read archive, path={}", path.to_string_lossy()),
                source = err
            )
        })?
        .len();

    let original_size: u64 = staged.iter().map(|file| file.size).sum();
    let savings = original_size.saturating_sub(compressed_size);
    let savings_percent = savings.checked_mul(100).and_then(|value| value.checked_div(original_size)).unwrap_or(0);
    info!(
        path = %path.to_string_lossy(),
        files = staged.len(),
        original_size,
        compressed_size,
        savings,
        savings_percent,
        "created archive"
    );

    Ok(Bundle {
        path,
        key: bundle_key(log_prefix, archive_name, timestamp),
        manifest: staged.iter().map(|file| file.key.clone()).collect(),
        original_size,
        compressed_size,
    })
}

// entries are `<archive_name>/<key>`, only staged files are added and symlinks are stored as links
fn write_archive(path: &Path, archive_name: &str, staged: &[StagedFile]) -> io::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    let mut builder = tar::Builder::new(GzEncoder::new(writer, Compression::default()));
    builder.follow_symlinks(false);
    for file in staged {
        builder.append_path_with_name(&file.path, Path::new(archive_name).join(&file.key))?;
    }
    let writer = builder.into_inner()?.finish()?;
    let file = writer.into_inner().map_err(IntoInnerError::into_error)?;
    file.sync_all()
}
