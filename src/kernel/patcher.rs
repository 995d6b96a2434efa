//! Source-tree mutation: KernelSU integration, ordered patch-step
//! execution, version-string surgery and defconfig injection.
//!
//! The patch pipeline itself is declarative: `steps::build_steps`
//! produces an ordered list of copy/apply operations as a pure function
//! of the build configuration, and `KernelPatcher::apply_steps` executes
//! the list in order with per-step fault tolerance. Getting the order
//! wrong corrupts the tree silently, so the list is the single place
//! ordering lives.

pub mod env;
pub mod kconfig;
pub mod steps;
pub mod version;

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::PatchError;
use crate::models::{ApplyMode, PatchAction, PatchStep, PatchSummary};
use crate::system::paths::WorkspaceLayout;
use crate::system::{run_logged, ExternalCommand};

/// Result type for patching operations
pub type PatchResult<T> = std::result::Result<T, PatchError>;

/// Anchor appended to `drivers/Makefile` when wiring in KernelSU.
const KERNELSU_MAKEFILE_LINE: &str = "obj-$(CONFIG_KSU) += kernelsu/";

/// Anchor appended to `drivers/Kconfig` when wiring in KernelSU.
const KERNELSU_KCONFIG_LINE: &str = "source \"drivers/kernelsu/Kconfig\"";

/// High-level source-tree patcher for orchestrator integration.
///
/// Owns no state beyond the workspace layout; every mutation takes its
/// inputs explicitly so the same patcher can be driven by tests against
/// a synthetic tree.
pub struct KernelPatcher {
    layout: WorkspaceLayout,
}

impl KernelPatcher {
    pub fn new(layout: WorkspaceLayout) -> Self {
        KernelPatcher { layout }
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Wire the KernelSU driver into the common kernel tree.
    ///
    /// Copies the KernelSU kernel sources to `drivers/kernelsu` and
    /// appends the Makefile/Kconfig hookup lines. Both appends are
    /// anchored and idempotent: an already-wired tree is left untouched.
    pub fn integrate_kernelsu(&self) -> PatchResult<()> {
        let kernelsu_src = self
            .layout
            .companion(crate::kernel::sources::KERNELSU.name)
            .join("kernel");
        let driver_dest = self.layout.common_dir().join("drivers").join("kernelsu");

        if !kernelsu_src.is_dir() {
            return Err(PatchError::SourceUnavailable(format!(
                "KernelSU kernel sources not found at {}",
                kernelsu_src.display()
            )));
        }

        copy_dir_recursive(&kernelsu_src, &driver_dest)
            .map_err(|e| PatchError::PatchFailed(format!("KernelSU copy failed: {}", e)))?;
        log::info!(
            "[Patcher] [KERNELSU] Driver sources copied to {}",
            driver_dest.display()
        );

        let makefile = self.layout.common_dir().join("drivers").join("Makefile");
        append_line_once(&makefile, KERNELSU_MAKEFILE_LINE)?;

        let kconfig = self.layout.common_dir().join("drivers").join("Kconfig");
        insert_before_last_endmenu(&kconfig, KERNELSU_KCONFIG_LINE)?;

        log::info!("[Patcher] [KERNELSU] Driver wired into drivers/Makefile and drivers/Kconfig");
        Ok(())
    }

    /// Execute the ordered patch-step list.
    ///
    /// Steps run strictly in list order. A `Fatal` step's failure aborts
    /// immediately; a `BestEffort` failure is logged as a warning,
    /// counted, and execution continues.
    pub async fn apply_steps(&self, patch_steps: &[PatchStep]) -> PatchResult<PatchSummary> {
        let mut summary = PatchSummary::default();

        for (index, step) in patch_steps.iter().enumerate() {
            log::info!(
                "[Patcher] [STEP {}/{}] {} ({})",
                index + 1,
                patch_steps.len(),
                step.name,
                step.mode
            );

            let outcome = self.run_step(step).await;
            match outcome {
                Ok(()) => summary.applied += 1,
                Err(e) => match step.mode {
                    ApplyMode::Fatal => {
                        log::error!("[Patcher] [STEP] {} failed: {}", step.name, e);
                        return Err(e);
                    }
                    ApplyMode::BestEffort => {
                        summary.best_effort_failures += 1;
                        log::warn!(
                            "[Patcher] [STEP] {} failed ({}); continuing per best-effort policy",
                            step.name,
                            e
                        );
                    }
                },
            }
        }

        log::info!(
            "[Patcher] Step execution complete: {} applied, {} best-effort failures",
            summary.applied,
            summary.best_effort_failures
        );
        Ok(summary)
    }

    async fn run_step(&self, step: &PatchStep) -> PatchResult<()> {
        match &step.action {
            PatchAction::CopyFile { source, dest } => {
                let source = self.layout.companions_dir().join(source);
                let dest = self.layout.source_dir().join(dest);
                if !source.is_file() {
                    return Err(PatchError::FileNotFound(source.display().to_string()));
                }
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| PatchError::PatchFailed(e.to_string()))?;
                }
                fs::copy(&source, &dest).map_err(|e| {
                    PatchError::PatchFailed(format!(
                        "copy {} -> {}: {}",
                        source.display(),
                        dest.display(),
                        e
                    ))
                })?;
                Ok(())
            }
            PatchAction::CopyDir { source, dest } => {
                let source = self.layout.companions_dir().join(source);
                let dest = self.layout.source_dir().join(dest);
                if !source.is_dir() {
                    return Err(PatchError::FileNotFound(source.display().to_string()));
                }
                copy_dir_recursive(&source, &dest).map_err(|e| {
                    PatchError::PatchFailed(format!(
                        "copy dir {} -> {}: {}",
                        source.display(),
                        dest.display(),
                        e
                    ))
                })
            }
            PatchAction::ApplyPatch {
                patch_file,
                work_dir,
                strip,
                fuzz,
            } => {
                let work_dir = self.layout.source_dir().join(work_dir);
                let patch_path = work_dir.join(patch_file);
                if !patch_path.is_file() {
                    return Err(PatchError::FileNotFound(patch_path.display().to_string()));
                }

                let mut args = vec![format!("-p{}", strip)];
                if let Some(fuzz) = fuzz {
                    args.push(format!("-F{}", fuzz));
                }
                args.push("-i".to_string());
                args.push(patch_file.to_string_lossy().to_string());

                let envs = HashMap::new();
                run_logged(ExternalCommand {
                    label: step.name,
                    program: "patch",
                    args,
                    cwd: Some(&work_dir),
                    envs: &envs,
                })
                .await
                .map_err(|e| PatchError::PatchFailed(e.to_string()))
            }
        }
    }
}

/// Append `line` to `file` unless an identical line already exists.
fn append_line_once(file: &Path, line: &str) -> PatchResult<()> {
    let mut content = fs::read_to_string(file)
        .map_err(|_| PatchError::FileNotFound(file.display().to_string()))?;

    if content.lines().any(|l| l.trim() == line) {
        log::debug!("[Patcher] {} already contains '{}'", file.display(), line);
        return Ok(());
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(line);
    content.push('\n');

    fs::write(file, content).map_err(|e| PatchError::PatchFailed(e.to_string()))
}

/// Insert `line` before the last `endmenu` in a Kconfig file, unless an
/// identical line already exists. The `endmenu` anchor must be present.
fn insert_before_last_endmenu(file: &Path, line: &str) -> PatchResult<()> {
    let content = fs::read_to_string(file)
        .map_err(|_| PatchError::FileNotFound(file.display().to_string()))?;

    if content.lines().any(|l| l.trim() == line) {
        log::debug!("[Patcher] {} already contains '{}'", file.display(), line);
        return Ok(());
    }

    let lines: Vec<&str> = content.lines().collect();
    let anchor_index = lines
        .iter()
        .rposition(|l| l.trim() == "endmenu")
        .ok_or_else(|| PatchError::AnchorMissing {
            anchor: "endmenu".to_string(),
            file: file.display().to_string(),
        })?;

    let mut rebuilt: Vec<&str> = Vec::with_capacity(lines.len() + 2);
    rebuilt.extend(&lines[..anchor_index]);
    rebuilt.push(line);
    rebuilt.push("");
    rebuilt.extend(&lines[anchor_index..]);

    let mut output = rebuilt.join("\n");
    output.push('\n');

    fs::write(file, output).map_err(|e| PatchError::PatchFailed(e.to_string()))
}

/// Recursively copy a directory tree, creating destination directories
/// as needed and overwriting existing files.
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
