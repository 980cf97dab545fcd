use framework::exception;
use framework::exception::CoreRsResult;
use framework::exception::error_code;
use tracing::info;

use crate::archive;
use crate::cleanup;
use crate::config::AppConfig;
use crate::lister;
use crate::lister::CandidateObject;
use crate::stage;
use crate::store::ObjectStore;
use crate::tag;
use crate::upload;
use crate::workspace::Workspace;

#[derive(Debug, Default, PartialEq)]
pub struct RunSummary {
    pub candidates: usize,
    pub archive_key: Option<String>,
    pub tagged: bool,
    pub deleted_sources: usize,
    pub original_size: u64,
    pub compressed_size: u64,
}

/// list → download → compress → upload → tag → delete sources.
///
/// The workspace is removed on every path. Source objects are only deleted after the archive upload succeeded.
pub async fn run<S>(store: &S, config: &AppConfig, timestamp: &str) -> CoreRsResult<RunSummary>
where
    S: ObjectStore,
{
    store.check_credentials().await.map_err(|err| {
        exception!(
            code = error_code::CREDENTIAL_ERROR,
            message = format!(
                "failed to check credentials, profile={}",
                config.profile.as_deref().unwrap_or("default")
            ),
            source = err
        )
    })?;

    let candidates = lister::list_candidates(store, &config.source_prefix, &config.s3_log_directory).await?;
    if candidates.is_empty() {
        info!("no candidate objects, skip archival");
        return Ok(RunSummary::default());
    }

    let workspace = Workspace::create(&config.local_dir)?;
    let result = archive_candidates(store, config, timestamp, &candidates, &workspace).await;
    workspace.close();
    result
}

async fn archive_candidates<S>(
    store: &S,
    config: &AppConfig,
    timestamp: &str,
    candidates: &[CandidateObject],
    workspace: &Workspace,
) -> CoreRsResult<RunSummary>
where
    S: ObjectStore,
{
    let staged = stage::stage_objects(store, candidates, workspace).await?;
    let bundle = archive::create_bundle(
        workspace,
        &staged,
        &config.archive_name,
        timestamp,
        &config.s3_log_directory,
    )?;
    let uploaded = upload::upload_bundle(store, &bundle).await?;

    let tagged = tag::tag_bundle(store, &uploaded, &config.tags).await;
    let deleted_sources = if config.delete_source {
        cleanup::delete_sources(store, &uploaded).await
    } else {
        info!("source deletion disabled, keep source objects");
        0
    };

    Ok(RunSummary {
        candidates: candidates.len(),
        archive_key: Some(uploaded.key().to_owned()),
        tagged,
        deleted_sources,
        original_size: bundle.original_size,
        compressed_size: bundle.compressed_size,
    })
}
