//! Kernel configuration management (gki_defconfig injection)
//!
//! Appends the KernelSU/SUSFS configuration block to the GKI defconfig,
//! gates the optional KPM and LZ4KD lines on their feature flags, and
//! neutralizes the defconfig sanity check that would otherwise reject
//! the grown configuration. Injection is purely additive: pre-existing
//! keys are left alone and later lines win in the kernel's own config
//! parsing.

use std::fs;

use crate::error::PatchError;
use crate::kernel::patcher::{KernelPatcher, PatchResult};

/// Base configuration block enabling KernelSU with manual hooks and the
/// full SUSFS feature set. Order matches the upstream documentation.
pub const KSU_BASE_CONFIGS: &[&str] = &[
    "CONFIG_KSU=y",
    "CONFIG_KSU_MANUAL_HOOK=y",
    "CONFIG_KSU_SUSFS=y",
    "CONFIG_KSU_SUSFS_HAS_MAGIC_MOUNT=y",
    "CONFIG_KSU_SUSFS_SUS_PATH=y",
    "CONFIG_KSU_SUSFS_SUS_MOUNT=y",
    "CONFIG_KSU_SUSFS_AUTO_ADD_SUS_KSU_DEFAULT_MOUNT=y",
    "CONFIG_KSU_SUSFS_AUTO_ADD_SUS_BIND_MOUNT=y",
    "CONFIG_KSU_SUSFS_SUS_KSTAT=y",
    "CONFIG_KSU_SUSFS_TRY_UMOUNT=y",
    "CONFIG_KSU_SUSFS_AUTO_ADD_TRY_UMOUNT_FOR_BIND_MOUNT=y",
    "CONFIG_KSU_SUSFS_SPOOF_UNAME=y",
    "CONFIG_KSU_SUSFS_ENABLE_LOG=y",
    "CONFIG_KSU_SUSFS_HIDE_KSU_SUSFS_SYMBOLS=y",
    "CONFIG_KSU_SUSFS_SPOOF_CMDLINE_OR_BOOTCONFIG=y",
    "CONFIG_KSU_SUSFS_OPEN_REDIRECT=y",
    "CONFIG_KSU_SUSFS_SUS_SU=n",
];

/// Extra line appended when the KPM runtime-patching feature is enabled.
pub const KPM_CONFIG: &str = "CONFIG_KPM=y";

/// Compression block appended when the LZ4KD feature is enabled.
pub const LZ4KD_CONFIGS: &[&str] = &[
    "CONFIG_CRYPTO_LZ4HC=y",
    "CONFIG_CRYPTO_LZ4K=y",
    "CONFIG_CRYPTO_LZ4KD=y",
    "CONFIG_CRYPTO_842=y",
];

/// Sanity-check token removed from the build config script.
const DEFCONFIG_CHECK_ANCHOR: &str = "check_defconfig";

/// Render the complete block of lines to append for one configuration.
///
/// Pure function so the flag-gating behavior is testable in isolation.
pub fn defconfig_block(enable_kpm: bool, enable_lz4kd: bool) -> Vec<&'static str> {
    let mut block: Vec<&'static str> = KSU_BASE_CONFIGS.to_vec();
    if enable_kpm {
        block.push(KPM_CONFIG);
    }
    if enable_lz4kd {
        block.extend_from_slice(LZ4KD_CONFIGS);
    }
    block
}

impl KernelPatcher {
    /// Append the configuration block to `gki_defconfig`.
    ///
    /// Lines already present verbatim are skipped so repeated injection
    /// leaves the file byte-identical.
    pub fn inject_defconfig(&self, enable_kpm: bool, enable_lz4kd: bool) -> PatchResult<()> {
        let defconfig_path = self.layout().gki_defconfig();

        let mut content = fs::read_to_string(&defconfig_path)
            .map_err(|_| PatchError::FileNotFound(defconfig_path.display().to_string()))?;

        let mut appended = 0;
        for line in defconfig_block(enable_kpm, enable_lz4kd) {
            if content.lines().any(|existing| existing.trim() == line) {
                continue;
            }
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(line);
            content.push('\n');
            appended += 1;
        }

        fs::write(&defconfig_path, &content)
            .map_err(|e| PatchError::PatchFailed(format!("Failed to write defconfig: {}", e)))?;

        log::info!(
            "[Patcher] [KCONFIG] Appended {} lines to {} (kpm={}, lz4kd={})",
            appended,
            defconfig_path.display(),
            enable_kpm,
            enable_lz4kd
        );
        Ok(())
    }

    /// Neutralize the defconfig sanity check in `build.config.gki`.
    ///
    /// The check would reject the grown defconfig; the original pipeline
    /// blanks the token out, and this port does the same - but only
    /// after matching it explicitly. A file without the token aborts
    /// with an error naming the missing anchor.
    pub fn neutralize_defconfig_check(&self) -> PatchResult<()> {
        let config_path = self.layout().build_config_gki();

        let content = fs::read_to_string(&config_path)
            .map_err(|_| PatchError::FileNotFound(config_path.display().to_string()))?;

        if !content.contains(DEFCONFIG_CHECK_ANCHOR) {
            return Err(PatchError::AnchorMissing {
                anchor: DEFCONFIG_CHECK_ANCHOR.to_string(),
                file: config_path.display().to_string(),
            });
        }

        let neutralized = content.replace(DEFCONFIG_CHECK_ANCHOR, "");
        fs::write(&config_path, neutralized)
            .map_err(|e| PatchError::PatchFailed(format!("Failed to write build config: {}", e)))?;

        log::info!(
            "[Patcher] [KCONFIG] Removed {} from {}",
            DEFCONFIG_CHECK_ANCHOR,
            config_path.display()
        );
        Ok(())
    }
}
