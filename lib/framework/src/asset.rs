use std::env;
use std::env::current_exe;
use std::path::Path;
use std::path::PathBuf;

use crate::exception;
use crate::exception::CoreRsResult;

/// Resolves an asset, the path in `env_key` takes precedence over the bundled asset next to the executable.
pub fn asset_path_with_override(env_key: &str, path: &str) -> CoreRsResult<PathBuf> {
    if let Ok(value) = env::var(env_key)
        && !value.is_empty()
    {
        let override_path = PathBuf::from(value);
        return if override_path.exists() {
            Ok(override_path)
        } else {
            Err(exception!(
                message = format!(
                    "asset not found, env={env_key}, asset={}",
                    override_path.to_string_lossy()
                )
            ))
        };
    }
    asset_path(path)
}

pub fn asset_path(path: &str) -> CoreRsResult<PathBuf> {
    let exe_path = current_exe()?;
    let asset_path = find_asset_path(&exe_path, path);
    if asset_path.exists() {
        Ok(asset_path)
    } else {
        Err(exception!(
            message = format!(
                "asset not found, asset={}, exe={}",
                asset_path.to_string_lossy(),
                exe_path.to_string_lossy()
            )
        ))
    }
}

#[cfg(debug_assertions)]
fn find_asset_path(exe_path: &Path, path: &str) -> PathBuf {
    let asset_path = exe_path.with_file_name(path);
    if asset_path.exists() {
        return asset_path;
    }
    // cargo run from workspace, fall back to source folder of the binary
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        let source_path = PathBuf::from(manifest_dir).join(path);
        if source_path.exists() {
            tracing::debug!(asset = %source_path.to_string_lossy(), "load asset from source folder");
            return source_path;
        }
    }
    asset_path
}

#[cfg(not(debug_assertions))]
fn find_asset_path(exe_path: &Path, path: &str) -> PathBuf {
    exe_path.with_file_name(path)
}
