//! Device and companion source management
//!
//! Maps device profile names to their manifest coordinates and kernel
//! versions, and centralizes the URLs of the companion repositories the
//! patch pipeline clones (KernelSU, SUSFS, the standalone patch
//! collection, and the AnyKernel3 packaging template).

use std::collections::HashMap;

/// One buildable GKI target: manifest coordinates plus the version facts
/// the patch pipeline derives companion branches from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Profile key, e.g. "gki-android14-6.1".
    pub name: &'static str,
    /// Manifest repository handed to `repo init -u`.
    pub manifest_url: &'static str,
    /// Manifest branch handed to `repo init -b`.
    pub manifest_branch: &'static str,
    /// Default manifest filename for `repo init -m`.
    pub default_manifest: &'static str,
    /// Android platform release, e.g. "android14".
    pub android_version: &'static str,
    /// Kernel version line, e.g. "6.1".
    pub kernel_version: &'static str,
    /// Subtrees of the synced source carrying a `scripts/setlocalversion`
    /// that the version mutation must rewrite.
    pub version_script_dirs: &'static [&'static str],
}

impl DeviceProfile {
    /// SUSFS companion branch for this target, e.g. "gki-android14-6.1".
    pub fn susfs_branch(&self) -> String {
        format!("gki-{}-{}", self.android_version, self.kernel_version)
    }

    /// Filename of the SUSFS kernel patch for this target.
    pub fn susfs_patch_name(&self) -> String {
        format!(
            "50_add_susfs_in_gki-{}-{}.patch",
            self.android_version, self.kernel_version
        )
    }
}

/// A companion repository consumed by the patch pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionSource {
    /// Checkout directory name under the workspace companions dir.
    pub name: &'static str,
    /// Git repository URL.
    pub git_url: &'static str,
    /// Branch to clone; `None` means the remote default branch.
    pub branch: Option<&'static str>,
}

/// KernelSU (SukiSU) root manager sources; the commit count of this
/// checkout feeds the derived version number.
pub const KERNELSU: CompanionSource = CompanionSource {
    name: "SukiSU-Ultra",
    git_url: "https://github.com/SukiSU-Ultra/SukiSU-Ultra.git",
    branch: Some("susfs-main"),
};

/// SUSFS root-hiding patches; the branch is per-target and supplied by
/// `DeviceProfile::susfs_branch`.
pub const SUSFS: CompanionSource = CompanionSource {
    name: "susfs4ksu",
    git_url: "https://gitlab.com/simonpunk/susfs4ksu.git",
    branch: None,
};

/// Standalone patch collection: manual syscall hooks, the hide-stuff
/// patch, and the LZ4K/LZ4KD compression payload.
pub const SUKISU_PATCH: CompanionSource = CompanionSource {
    name: "SukiSU_patch",
    git_url: "https://github.com/SukiSU-Ultra/SukiSU_patch.git",
    branch: None,
};

/// AnyKernel3 flashable-archive template.
pub const ANYKERNEL: CompanionSource = CompanionSource {
    name: "AnyKernel3",
    git_url: "https://github.com/osm0sis/AnyKernel3.git",
    branch: None,
};

/// Release asset URL of the KPM boot-image patcher binary.
pub const KPM_PATCHER_URL: &str =
    "https://github.com/SukiSU-Ultra/SukiSU_KernelPatch_patch/releases/download/0.11-beta/patch_linux";

const GKI_MANIFEST_URL: &str = "https://android.googlesource.com/kernel/manifest";

/// All supported GKI targets. GKI trees carry a single version script
/// under `common/`.
const PROFILES: &[DeviceProfile] = &[
    DeviceProfile {
        name: "gki-android12-5.10",
        manifest_url: GKI_MANIFEST_URL,
        manifest_branch: "common-android12-5.10",
        default_manifest: "default.xml",
        android_version: "android12",
        kernel_version: "5.10",
        version_script_dirs: &["common"],
    },
    DeviceProfile {
        name: "gki-android13-5.10",
        manifest_url: GKI_MANIFEST_URL,
        manifest_branch: "common-android13-5.10",
        default_manifest: "default.xml",
        android_version: "android13",
        kernel_version: "5.10",
        version_script_dirs: &["common"],
    },
    DeviceProfile {
        name: "gki-android13-5.15",
        manifest_url: GKI_MANIFEST_URL,
        manifest_branch: "common-android13-5.15",
        default_manifest: "default.xml",
        android_version: "android13",
        kernel_version: "5.15",
        version_script_dirs: &["common"],
    },
    DeviceProfile {
        name: "gki-android14-5.15",
        manifest_url: GKI_MANIFEST_URL,
        manifest_branch: "common-android14-5.15",
        default_manifest: "default.xml",
        android_version: "android14",
        kernel_version: "5.15",
        version_script_dirs: &["common"],
    },
    DeviceProfile {
        name: "gki-android14-6.1",
        manifest_url: GKI_MANIFEST_URL,
        manifest_branch: "common-android14-6.1",
        default_manifest: "default.xml",
        android_version: "android14",
        kernel_version: "6.1",
        version_script_dirs: &["common"],
    },
    DeviceProfile {
        name: "gki-android15-6.6",
        manifest_url: GKI_MANIFEST_URL,
        manifest_branch: "common-android15-6.6",
        default_manifest: "default.xml",
        android_version: "android15",
        kernel_version: "6.6",
        version_script_dirs: &["common"],
    },
];

/// Device profile database.
pub struct DeviceDb {
    profiles: HashMap<&'static str, &'static DeviceProfile>,
}

impl DeviceDb {
    /// Create a database with all supported GKI targets.
    pub fn new() -> Self {
        let mut profiles = HashMap::new();
        for profile in PROFILES {
            profiles.insert(profile.name, profile);
        }
        DeviceDb { profiles }
    }

    /// Look up a profile by its key.
    pub fn get(&self, name: &str) -> Option<&DeviceProfile> {
        self.profiles.get(name).copied()
    }

    /// All profile keys, sorted for stable display.
    pub fn available_devices(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.profiles.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DeviceDb {
    fn default() -> Self {
        Self::new()
    }
}
