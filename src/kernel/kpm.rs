//! Optional KPM binary post-patch of the boot image.
//!
//! When the feature is enabled, the released `patch_linux` binary is
//! downloaded next to the built Image, executed in place, and the
//! produced `oImage` replaces the original. Every step is fatal; the
//! downloaded binary is trusted on execution success alone, exactly like
//! the upstream pipeline (there is no signature to verify).

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::AppError;
use crate::kernel::sources::KPM_PATCHER_URL;
use crate::system::{run_logged, ExternalCommand};

/// Filename the patcher writes its output under.
const PATCHED_IMAGE_NAME: &str = "oImage";

/// Filename of the downloaded patcher binary.
const PATCHER_BINARY_NAME: &str = "patch_linux";

/// Download the patcher release asset to `dest` and mark it executable.
pub async fn download_patcher(url: &str, dest: &Path) -> Result<(), AppError> {
    log::info!("[KPM] Downloading patcher from {}", url);

    let response = reqwest::get(url)
        .await
        .map_err(|e| AppError::Download(e.to_string()))?;

    if !response.status().is_success() {
        return Err(AppError::Download(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::Download(e.to_string()))?;

    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| AppError::Io(format!("write {}: {}", dest.display(), e)))?;

    let mut perms = std::fs::metadata(dest)
        .map_err(|e| AppError::Io(e.to_string()))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(dest, perms).map_err(|e| AppError::Io(e.to_string()))?;

    log::info!(
        "[KPM] Patcher saved to {} ({} bytes, executable)",
        dest.display(),
        bytes.len()
    );
    Ok(())
}

/// Swap the patcher's output over the original Image and drop the
/// patcher binary. Split out for testability.
pub fn replace_image(boot_dir: &Path) -> Result<(), AppError> {
    let image = boot_dir.join("Image");
    let patched = boot_dir.join(PATCHED_IMAGE_NAME);
    let patcher_bin = boot_dir.join(PATCHER_BINARY_NAME);

    if !patched.is_file() {
        return Err(AppError::Io(format!(
            "patcher did not produce {}",
            patched.display()
        )));
    }

    std::fs::rename(&patched, &image)
        .map_err(|e| AppError::Io(format!("replace Image: {}", e)))?;

    if patcher_bin.exists() {
        std::fs::remove_file(&patcher_bin).map_err(|e| AppError::Io(e.to_string()))?;
    }

    log::info!("[KPM] Patched image installed at {}", image.display());
    Ok(())
}

/// Run the full post-patch sequence against the boot directory.
///
/// # Arguments
/// * `boot_dir` - directory holding the built `Image`
pub async fn patch_boot_image(boot_dir: &Path) -> Result<(), AppError> {
    let image = boot_dir.join("Image");
    if !image.is_file() {
        return Err(AppError::Io(format!(
            "boot image missing at {}",
            image.display()
        )));
    }

    let patcher_bin = boot_dir.join(PATCHER_BINARY_NAME);
    download_patcher(KPM_PATCHER_URL, &patcher_bin).await?;

    let envs = std::collections::HashMap::new();
    run_logged(ExternalCommand {
        label: "kpm-patch",
        program: "./patch_linux",
        args: vec![],
        cwd: Some(boot_dir),
        envs: &envs,
    })
    .await?;

    replace_image(boot_dir)
}
