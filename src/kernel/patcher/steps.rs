//! Declarative patch-step list construction.
//!
//! The full copy/apply sequence is produced here as a pure function of
//! the device profile and build configuration, and nowhere else. The
//! executor in `kernel::patcher` runs the list verbatim, so list order
//! IS application order: the SUSFS tree payload lands first, the main
//! SUSFS patch applies before the hide-stuff patch (which relies on the
//! tree state the main patch leaves behind and therefore runs with fuzzy
//! matching), and the syscall-hook patch closes the sequence. The LZ4KD
//! block is present exactly when the compression feature is enabled.

use std::path::PathBuf;

use crate::kernel::sources::{DeviceProfile, SUKISU_PATCH, SUSFS};
use crate::models::{ApplyMode, BuildConfig, PatchAction, PatchStep};

/// Build the ordered patch-step list for one run.
///
/// Deterministic: the same profile and configuration always produce the
/// same list, byte for byte.
pub fn build_steps(profile: &DeviceProfile, config: &BuildConfig) -> Vec<PatchStep> {
    let susfs_patch = profile.susfs_patch_name();
    let mut patch_steps = Vec::new();

    // SUSFS payload: support files first, the patch files after.
    patch_steps.push(PatchStep {
        name: "copy-susfs-fs",
        action: PatchAction::CopyDir {
            source: PathBuf::from(SUSFS.name).join("kernel_patches/fs"),
            dest: PathBuf::from("common/fs"),
        },
        mode: ApplyMode::Fatal,
    });
    patch_steps.push(PatchStep {
        name: "copy-susfs-include",
        action: PatchAction::CopyDir {
            source: PathBuf::from(SUSFS.name).join("kernel_patches/include/linux"),
            dest: PathBuf::from("common/include/linux"),
        },
        mode: ApplyMode::Fatal,
    });
    patch_steps.push(PatchStep {
        name: "copy-susfs-patch",
        action: PatchAction::CopyFile {
            source: PathBuf::from(SUSFS.name)
                .join("kernel_patches")
                .join(&susfs_patch),
            dest: PathBuf::from("common").join(&susfs_patch),
        },
        mode: ApplyMode::Fatal,
    });
    patch_steps.push(PatchStep {
        name: "copy-hide-stuff-patch",
        action: PatchAction::CopyFile {
            source: PathBuf::from(SUKISU_PATCH.name).join("69_hide_stuff.patch"),
            dest: PathBuf::from("common/69_hide_stuff.patch"),
        },
        mode: ApplyMode::Fatal,
    });
    patch_steps.push(PatchStep {
        name: "copy-syscall-hooks-patch",
        action: PatchAction::CopyFile {
            source: PathBuf::from(SUKISU_PATCH.name).join("hooks/syscall_hooks.patch"),
            dest: PathBuf::from("common/syscall_hooks.patch"),
        },
        mode: ApplyMode::Fatal,
    });

    // Optional LZ4K/LZ4KD compression payload.
    if config.enable_lz4kd {
        patch_steps.push(PatchStep {
            name: "copy-lz4k-include",
            action: PatchAction::CopyDir {
                source: PathBuf::from(SUKISU_PATCH.name).join("other/zram/lz4k/include/linux"),
                dest: PathBuf::from("common/include/linux"),
            },
            mode: ApplyMode::Fatal,
        });
        patch_steps.push(PatchStep {
            name: "copy-lz4k-lib",
            action: PatchAction::CopyDir {
                source: PathBuf::from(SUKISU_PATCH.name).join("other/zram/lz4k/lib"),
                dest: PathBuf::from("common/lib"),
            },
            mode: ApplyMode::Fatal,
        });
        patch_steps.push(PatchStep {
            name: "copy-lz4k-crypto",
            action: PatchAction::CopyDir {
                source: PathBuf::from(SUKISU_PATCH.name).join("other/zram/lz4k/crypto"),
                dest: PathBuf::from("common/crypto"),
            },
            mode: ApplyMode::Fatal,
        });
        patch_steps.push(PatchStep {
            name: "copy-lz4kd-patch",
            action: PatchAction::CopyFile {
                source: PathBuf::from(SUKISU_PATCH.name)
                    .join("other/zram/zram_patch")
                    .join(profile.kernel_version)
                    .join("lz4kd.patch"),
                dest: PathBuf::from("common/lz4kd.patch"),
            },
            mode: ApplyMode::Fatal,
        });
    }

    // Application order is load-bearing from here on.
    patch_steps.push(PatchStep {
        name: "apply-susfs",
        action: PatchAction::ApplyPatch {
            patch_file: PathBuf::from(&susfs_patch),
            work_dir: PathBuf::from("common"),
            strip: 1,
            fuzz: None,
        },
        mode: ApplyMode::Fatal,
    });
    patch_steps.push(PatchStep {
        name: "apply-hide-stuff",
        action: PatchAction::ApplyPatch {
            patch_file: PathBuf::from("69_hide_stuff.patch"),
            work_dir: PathBuf::from("common"),
            strip: 1,
            fuzz: Some(3),
        },
        mode: ApplyMode::BestEffort,
    });
    patch_steps.push(PatchStep {
        name: "apply-syscall-hooks",
        action: PatchAction::ApplyPatch {
            patch_file: PathBuf::from("syscall_hooks.patch"),
            work_dir: PathBuf::from("common"),
            strip: 1,
            fuzz: None,
        },
        mode: ApplyMode::Fatal,
    });

    if config.enable_lz4kd {
        patch_steps.push(PatchStep {
            name: "apply-lz4kd",
            action: PatchAction::ApplyPatch {
                patch_file: PathBuf::from("lz4kd.patch"),
                work_dir: PathBuf::from("common"),
                strip: 1,
                fuzz: Some(3),
            },
            mode: ApplyMode::BestEffort,
        });
    }

    patch_steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::sources::DeviceDb;

    fn profile() -> DeviceProfile {
        DeviceDb::new().get("gki-android14-6.1").unwrap().clone()
    }

    fn names(steps: &[PatchStep]) -> Vec<&'static str> {
        steps.iter().map(|s| s.name).collect()
    }

    #[test]
    fn test_step_list_deterministic() {
        let profile = profile();
        let config = BuildConfig::default();
        assert_eq!(
            build_steps(&profile, &config),
            build_steps(&profile, &config)
        );
    }

    #[test]
    fn test_lz4kd_steps_gated_by_flag() {
        let profile = profile();

        let mut config = BuildConfig::default();
        config.enable_lz4kd = false;
        let without = names(&build_steps(&profile, &config));
        assert!(!without.iter().any(|n| n.contains("lz4k")));

        config.enable_lz4kd = true;
        let with = names(&build_steps(&profile, &config));
        assert!(with.contains(&"copy-lz4kd-patch"));
        assert!(with.contains(&"apply-lz4kd"));
    }

    #[test]
    fn test_ordering_constraints() {
        let profile = profile();
        let mut config = BuildConfig::default();
        config.enable_lz4kd = true;
        let steps = build_steps(&profile, &config);
        let names = names(&steps);

        let pos = |name: &str| names.iter().position(|n| *n == name).unwrap();

        // Every copy precedes every apply
        let last_copy = names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.starts_with("copy-"))
            .map(|(i, _)| i)
            .max()
            .unwrap();
        let first_apply = names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.starts_with("apply-"))
            .map(|(i, _)| i)
            .min()
            .unwrap();
        assert!(last_copy < first_apply);

        // Hide-stuff relies on the tree state left by the main patch
        assert!(pos("apply-susfs") < pos("apply-hide-stuff"));
        assert!(pos("apply-hide-stuff") < pos("apply-syscall-hooks"));
    }

    #[test]
    fn test_fault_tolerance_policy_per_step() {
        let profile = profile();
        let mut config = BuildConfig::default();
        config.enable_lz4kd = true;
        let steps = build_steps(&profile, &config);

        let mode_of = |name: &str| steps.iter().find(|s| s.name == name).unwrap().mode;
        assert_eq!(mode_of("apply-susfs"), ApplyMode::Fatal);
        assert_eq!(mode_of("apply-syscall-hooks"), ApplyMode::Fatal);
        assert_eq!(mode_of("apply-hide-stuff"), ApplyMode::BestEffort);
        assert_eq!(mode_of("apply-lz4kd"), ApplyMode::BestEffort);
    }

    #[test]
    fn test_susfs_patch_name_follows_profile() {
        let db = DeviceDb::new();
        let profile = db.get("gki-android15-6.6").unwrap();
        let steps = build_steps(profile, &BuildConfig::default());
        let copy = steps.iter().find(|s| s.name == "copy-susfs-patch").unwrap();
        match &copy.action {
            PatchAction::CopyFile { dest, .. } => {
                assert!(dest
                    .to_string_lossy()
                    .ends_with("50_add_susfs_in_gki-android15-6.6.patch"));
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }
}
