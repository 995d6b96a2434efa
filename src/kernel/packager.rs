//! AnyKernel3 flashable-archive packaging.
//!
//! Clones the packaging template, strips version-control metadata and
//! the unwanted helper files, drops the built Image into the skeleton,
//! and compresses the staging directory with the external `zip` tool
//! into a uniquely named archive under the dist directory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::PackageError;
use crate::kernel::git::GitManager;
use crate::kernel::sources::ANYKERNEL;
use crate::models::BuildConfig;
use crate::system::paths::WorkspaceLayout;
use crate::system::{run_logged, ExternalCommand};

/// Template entries that never ship in the archive: version-control
/// metadata plus the maintainer helper script some forks carry.
pub const EXCLUDED_TEMPLATE_ENTRIES: &[&str] =
    &[".git", ".github", "LICENSE", "README.md", "push.sh"];

/// Archive-name tag derived from the kernel suffix (leading dash
/// dropped; the name pattern supplies its own separators).
pub fn suffix_tag(suffix: &str) -> &str {
    suffix.trim_start_matches('-')
}

/// Render the archive filename: `AnyKernel3_<version>_<device>_<tag>.zip`.
pub fn archive_name(ksu_version: u32, device: &str, suffix: &str) -> String {
    format!(
        "AnyKernel3_{}_{}_{}.zip",
        ksu_version,
        device,
        suffix_tag(suffix)
    )
}

/// Build the staging directory: template contents minus the excluded
/// entries, plus the boot image at the skeleton root.
pub fn stage_template(
    template_dir: &Path,
    image: &Path,
    staging_dir: &Path,
) -> Result<(), PackageError> {
    if !template_dir.is_dir() {
        return Err(PackageError::TemplateFailed(format!(
            "template missing at {}",
            template_dir.display()
        )));
    }
    if !image.is_file() {
        return Err(PackageError::ArtifactMissing(image.display().to_string()));
    }

    // Fresh staging tree every run; stale archives must never leak in.
    if staging_dir.exists() {
        fs::remove_dir_all(staging_dir)?;
    }
    copy_dir_recursive(template_dir, staging_dir)?;

    for entry in EXCLUDED_TEMPLATE_ENTRIES {
        let path = staging_dir.join(entry);
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else if path.exists() {
            fs::remove_file(&path)?;
        }
    }

    fs::copy(image, staging_dir.join("Image"))?;
    log::info!(
        "[Package] Staged template at {} (image {} bytes)",
        staging_dir.display(),
        fs::metadata(image)?.len()
    );
    Ok(())
}

/// Produce the flashable archive and place outputs in the dist dir.
///
/// # Arguments
/// * `layout` - workspace layout
/// * `config` - build configuration (device name, suffix)
/// * `ksu_version` - derived version number for the archive name
///
/// # Returns
/// Path of the archive inside the dist directory.
pub async fn package(
    layout: &WorkspaceLayout,
    config: &BuildConfig,
    ksu_version: u32,
) -> Result<PathBuf, PackageError> {
    let image = layout.boot_image();
    if !image.is_file() {
        return Err(PackageError::ArtifactMissing(image.display().to_string()));
    }

    // Template acquisition tolerates an existing checkout.
    let template_dir = layout.companion(ANYKERNEL.name);
    GitManager::acquire(&ANYKERNEL, None, &template_dir)
        .map_err(|e| PackageError::TemplateFailed(e.to_string()))?;

    let staging_dir = layout.workspace_root().join("pkg").join("AnyKernel3");
    stage_template(&template_dir, &image, &staging_dir)?;

    let archive = layout
        .dist_dir()
        .join(archive_name(ksu_version, &config.device, &config.kernel_suffix));
    if archive.exists() {
        fs::remove_file(&archive)?;
    }

    let envs = HashMap::new();
    run_logged(ExternalCommand {
        label: "zip",
        program: "zip",
        args: vec![
            "-r9".to_string(),
            archive.to_string_lossy().to_string(),
            ".".to_string(),
        ],
        cwd: Some(&staging_dir),
        envs: &envs,
    })
    .await
    .map_err(|e| PackageError::ArchiveFailed(e.to_string()))?;

    // Raw image ships beside the archive for direct fastboot use.
    fs::copy(&image, layout.dist_dir().join("Image"))?;

    log::info!("[Package] Archive ready: {}", archive.display());
    Ok(archive)
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dest.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
