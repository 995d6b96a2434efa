/// Centralized workspace layout: every path the pipeline touches
///
/// All paths are derived once from the configured workspace root and
/// threaded through the stages by reference. No stage computes its own
/// relative paths; this registry is the single source of truth for the
/// tree shape.
///
/// Layout:
/// ```text
/// <workspace>/
///   source/            repo-synced kernel tree
///     common/          GKI common kernel (patched in place)
///     out/             make O= build output
///   companions/        clones of KernelSU/SUSFS/patch/template repos
///   dist/              final archive + raw Image
///   logs/              per-run log files
/// ```
use std::io;
use std::path::{Path, PathBuf};

/// Registry of workspace-absolute paths used by the pipeline.
#[derive(Clone, Debug)]
pub struct WorkspaceLayout {
    workspace_root: PathBuf,
}

impl WorkspaceLayout {
    /// Create a layout rooted at `workspace_root`. Pure derivation; no
    /// filesystem access happens until `ensure_base_dirs`.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        WorkspaceLayout {
            workspace_root: workspace_root.into(),
        }
    }

    /// Create the directories every run needs before any stage starts.
    ///
    /// The synced source tree itself is created by `repo`; only the
    /// surrounding skeleton is made here. Directory-creation failure is
    /// an environment error and fatal to the run.
    pub fn ensure_base_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.workspace_root)?;
        std::fs::create_dir_all(self.source_dir())?;
        std::fs::create_dir_all(self.companions_dir())?;
        std::fs::create_dir_all(self.dist_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        log::info!(
            "[Paths] Workspace skeleton ready at {}",
            self.workspace_root.display()
        );
        Ok(())
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Root of the repo-synced kernel tree.
    pub fn source_dir(&self) -> PathBuf {
        self.workspace_root.join("source")
    }

    /// The GKI common kernel inside the synced tree.
    pub fn common_dir(&self) -> PathBuf {
        self.source_dir().join("common")
    }

    /// `scripts/setlocalversion` for a named subtree of the synced tree.
    pub fn setlocalversion(&self, subtree: &str) -> PathBuf {
        self.source_dir()
            .join(subtree)
            .join("scripts")
            .join("setlocalversion")
    }

    /// The arm64 GKI defconfig that receives the injected block.
    pub fn gki_defconfig(&self) -> PathBuf {
        self.common_dir()
            .join("arch")
            .join("arm64")
            .join("configs")
            .join("gki_defconfig")
    }

    /// Build-config script whose defconfig sanity check gets neutralized.
    pub fn build_config_gki(&self) -> PathBuf {
        self.common_dir().join("build.config.gki")
    }

    /// make O= output directory.
    pub fn out_dir(&self) -> PathBuf {
        self.source_dir().join("out")
    }

    /// Directory holding the built boot image.
    pub fn boot_dir(&self) -> PathBuf {
        self.out_dir()
            .join("arch")
            .join("arm64")
            .join("boot")
    }

    /// The boot image artifact produced by the compile step.
    pub fn boot_image(&self) -> PathBuf {
        self.boot_dir().join("Image")
    }

    /// Parent directory for companion repository clones.
    pub fn companions_dir(&self) -> PathBuf {
        self.workspace_root.join("companions")
    }

    /// Checkout directory for one named companion repository.
    pub fn companion(&self, name: &str) -> PathBuf {
        self.companions_dir().join(name)
    }

    /// Final output directory (archive + raw Image), always preserved.
    pub fn dist_dir(&self) -> PathBuf {
        self.workspace_root.join("dist")
    }

    /// Per-run log directory.
    pub fn logs_dir(&self) -> PathBuf {
        self.workspace_root.join("logs")
    }
}
