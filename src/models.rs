//! Core data types for gkibuild.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Fixed offset added to the KernelSU commit count to form the
/// user-visible KernelSU version number embedded in the archive name.
pub const KSU_VERSION_OFFSET: u32 = 10700;

/// Compute the KernelSU version number from a commit count.
pub fn ksu_version(commit_count: u32) -> u32 {
    commit_count + KSU_VERSION_OFFSET
}

/// Workspace disposition after a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleanupPolicy {
    /// Leave the synced tree and build output in place for reuse.
    Keep,
    /// Delete the whole workspace after the dist outputs are copied out.
    Purge,
}

impl fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupPolicy::Keep => write!(f, "keep"),
            CleanupPolicy::Purge => write!(f, "purge"),
        }
    }
}

impl FromStr for CleanupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keep" => Ok(CleanupPolicy::Keep),
            "purge" => Ok(CleanupPolicy::Purge),
            _ => Err(format!("Unknown cleanup policy: {}", s)),
        }
    }
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        CleanupPolicy::Keep
    }
}

/// Fault-tolerance policy for a single patch-pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyMode {
    /// Failure aborts the whole run.
    Fatal,
    /// Failure is logged as a warning and the pipeline continues.
    BestEffort,
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyMode::Fatal => write!(f, "fatal"),
            ApplyMode::BestEffort => write!(f, "best-effort"),
        }
    }
}

/// One mutation of the synced source tree.
///
/// Paths are relative: copy sources against the companions directory,
/// destinations and patch working directories against the synced source
/// root. The executor resolves them against the concrete workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchAction {
    /// Copy a single file into the source tree.
    CopyFile { source: PathBuf, dest: PathBuf },
    /// Recursively copy a directory into the source tree.
    CopyDir { source: PathBuf, dest: PathBuf },
    /// Run `patch -p<strip>` with `patch_file` inside `work_dir`.
    ApplyPatch {
        patch_file: PathBuf,
        work_dir: PathBuf,
        strip: u8,
        fuzz: Option<u8>,
    },
}

/// A named, ordered entry of the patch pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchStep {
    /// Stable human-readable identifier, used in logs and the summary.
    pub name: &'static str,
    pub action: PatchAction,
    pub mode: ApplyMode,
}

/// Counters accumulated by the patch-step executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchSummary {
    pub applied: u32,
    pub best_effort_failures: u32,
}

/// Build configuration - immutable once selection is complete.
///
/// This struct is the only parameter-passing mechanism between pipeline
/// stages; no stage reads the process environment for pipeline-internal
/// values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Device profile key (see `kernel::sources::DeviceDb`).
    pub device: String,
    /// Manifest filename passed to `repo init -m`.
    pub manifest: String,
    /// Literal local-version suffix embedded into the kernel release string.
    pub kernel_suffix: String,
    /// Patch the built Image with the KPM runtime-patching support binary.
    pub enable_kpm: bool,
    /// Copy and apply the LZ4K/LZ4KD compression patch set.
    pub enable_lz4kd: bool,
    /// Workspace disposition after the run.
    pub cleanup: CleanupPolicy,
    /// Stop before any external tool would run; used by tests and rehearsals.
    pub dry_run: bool,
    /// Parallelism handed to repo/make via -j.
    pub jobs: u32,
    /// Workspace root directory.
    pub workspace: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            device: "gki-android14-6.1".to_string(),
            manifest: "default.xml".to_string(),
            kernel_suffix: "-android14-11-o-gdcf0a99f7a21".to_string(),
            enable_kpm: false,
            enable_lz4kd: false,
            cleanup: CleanupPolicy::Keep,
            dry_run: false,
            jobs: num_cpus::get() as u32,
            workspace: PathBuf::from("workspace"),
        }
    }
}

/// Artifacts of a completed run.
#[derive(Debug, Clone)]
pub struct BuildArtifacts {
    /// Final boot image (post-patched when KPM was enabled).
    pub image: PathBuf,
    /// Flashable archive in the dist directory.
    pub archive: PathBuf,
    /// Computed KernelSU version number.
    pub ksu_version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ksu_version_offset() {
        assert_eq!(ksu_version(0), 10700);
        assert_eq!(ksu_version(1), 10701);
        assert_eq!(ksu_version(1234), 11934);
    }

    #[test]
    fn test_cleanup_policy_roundtrip() {
        assert_eq!("keep".parse::<CleanupPolicy>(), Ok(CleanupPolicy::Keep));
        assert_eq!("Purge".parse::<CleanupPolicy>(), Ok(CleanupPolicy::Purge));
        assert!("wipe".parse::<CleanupPolicy>().is_err());
        assert_eq!(CleanupPolicy::Keep.to_string(), "keep");
    }

    #[test]
    fn test_default_config_flags_off() {
        let config = BuildConfig::default();
        assert!(!config.enable_kpm);
        assert!(!config.enable_lz4kd);
        assert_eq!(config.cleanup, CleanupPolicy::Keep);
        assert!(config.jobs >= 1);
    }

    #[test]
    fn test_apply_mode_display() {
        assert_eq!(ApplyMode::Fatal.to_string(), "fatal");
        assert_eq!(ApplyMode::BestEffort.to_string(), "best-effort");
    }
}
