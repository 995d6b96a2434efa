//! Manifest-driven source synchronization.
//!
//! Thin wrapper over the external `repo` tool: one `init` with the
//! device profile's manifest coordinates, one `sync` with the configured
//! parallelism. No incremental-fetch logic beyond what `repo` itself
//! provides; re-running re-syncs. Nonzero exit from either invocation is
//! fatal to the run.

use std::collections::HashMap;
use std::path::Path;

use crate::error::SyncError;
use crate::kernel::sources::DeviceProfile;
use crate::system::{run_logged, ExternalCommand};

/// Arguments of the `repo init` invocation for a profile.
///
/// Split out as a pure function so the invocation shape is testable
/// without the tool installed.
pub fn init_args(profile: &DeviceProfile, manifest_file: &str) -> Vec<String> {
    vec![
        "init".to_string(),
        "--depth=1".to_string(),
        "-u".to_string(),
        profile.manifest_url.to_string(),
        "-b".to_string(),
        profile.manifest_branch.to_string(),
        "-m".to_string(),
        manifest_file.to_string(),
    ]
}

/// Arguments of the `repo sync` invocation.
pub fn sync_args(jobs: u32) -> Vec<String> {
    vec![
        "sync".to_string(),
        "-c".to_string(),
        format!("-j{}", jobs),
        "--no-tags".to_string(),
        "--fail-fast".to_string(),
    ]
}

/// Fetch the multi-repository source tree into `source_dir`.
///
/// # Arguments
/// * `profile` - device profile supplying manifest URL and branch
/// * `manifest_file` - manifest filename for `repo init -m`
/// * `jobs` - sync parallelism
/// * `source_dir` - checkout root (created by the caller)
///
/// # Errors
/// * `SyncError::ToolMissing` when `repo` is not on PATH
/// * `SyncError::InitFailed` / `SyncError::SyncFailed` on nonzero exit
pub async fn sync_source(
    profile: &DeviceProfile,
    manifest_file: &str,
    jobs: u32,
    source_dir: &Path,
) -> Result<(), SyncError> {
    which::which("repo").map_err(|e| SyncError::ToolMissing(e.to_string()))?;

    log::info!(
        "[Sync] Initializing manifest {} ({} @ {})",
        manifest_file,
        profile.manifest_url,
        profile.manifest_branch
    );

    let envs = HashMap::new();

    run_logged(ExternalCommand {
        label: "repo-init",
        program: "repo",
        args: init_args(profile, manifest_file),
        cwd: Some(source_dir),
        envs: &envs,
    })
    .await
    .map_err(|e| SyncError::InitFailed(e.to_string()))?;

    log::info!("[Sync] Syncing source tree with -j{}", jobs);

    run_logged(ExternalCommand {
        label: "repo-sync",
        program: "repo",
        args: sync_args(jobs),
        cwd: Some(source_dir),
        envs: &envs,
    })
    .await
    .map_err(|e| SyncError::SyncFailed(e.to_string()))?;

    log::info!("[Sync] Source tree ready at {}", source_dir.display());
    Ok(())
}
