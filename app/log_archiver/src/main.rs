use chrono::Utc;
use framework::asset::asset_path_with_override;
use framework::exception::CoreRsResult;
use framework::log;
use framework::s3::S3Client;
use tracing::info;

use crate::config::AppConfig;
use crate::store::S3Store;

mod archive;
mod audit;
mod cleanup;
mod config;
mod lister;
mod pipeline;
mod stage;
mod store;
mod tag;
mod upload;
mod workspace;

#[tokio::main(flavor = "current_thread")]
async fn main() -> CoreRsResult<()> {
    let config = AppConfig::load(&asset_path_with_override("LOG_ARCHIVER_CONF", "assets/conf.json")?)?;

    let timestamp = Utc::now().format("%Y-%m-%d-%H-%M-%S").to_string();
    let run_log = log::init_with_file(&config.local_dir.join(format!("log-archiver-{timestamp}.log")))?;
    info!(
        bucket = config.bucket_name,
        log_directory = config.s3_log_directory,
        timestamp,
        "start archival"
    );

    let store = S3Store::new(S3Client::new(&config.s3()).await, config.multipart());
    let result = log::start_action("archive-logs", pipeline::run(&store, &config, &timestamp)).await;
    if let Ok(ref summary) = result {
        info!(
            candidates = summary.candidates,
            archive = summary.archive_key.as_deref().unwrap_or(""),
            tagged = summary.tagged,
            deleted_sources = summary.deleted_sources,
            original_size = summary.original_size,
            compressed_size = summary.compressed_size,
            "archival completed"
        );
    }

    // failed runs upload their log as well
    audit::upload_run_log(&store, &run_log, &config.s3_log_directory, &timestamp).await;

    result?;
    Ok(())
}
