//! Build Orchestration: 7-phase GKI pipeline (Preparation -> Sync ->
//! Patching -> Configuration -> Building -> PostPatch -> Packaging).
//!
//! The orchestrator owns the forward-only state machine and drives each
//! stage with the immutable `BuildConfig`. A fatal stage error records
//! the failure, moves the state to the terminal `Failed` phase and
//! propagates; there is no retry, no partial-result recovery, and no
//! rollback of the already-mutated source tree.

pub mod executor;
pub mod state;

use std::path::PathBuf;

pub use state::{OrchestrationState, PipelinePhase};

use crate::error::BuildError;
use crate::kernel::git::GitManager;
use crate::kernel::patcher::{env as buildenv, steps, KernelPatcher};
use crate::kernel::sources::{DeviceDb, DeviceProfile, KERNELSU, SUKISU_PATCH, SUSFS};
use crate::kernel::{kpm, manifest, packager};
use crate::models::{ksu_version, BuildArtifacts, BuildConfig, CleanupPolicy};
use crate::system::paths::WorkspaceLayout;
use crate::system::{cache, deps};

/// Outcome of a pipeline run.
#[derive(Debug)]
pub enum BuildOutcome {
    /// Full pipeline ran; artifacts are in the dist directory.
    Completed(BuildArtifacts),
    /// Dry run stopped after preparation with the plan logged.
    DryRun { planned_steps: usize },
}

/// Drives the 7-phase pipeline with progress tracking.
pub struct Orchestrator {
    config: BuildConfig,
    profile: DeviceProfile,
    layout: WorkspaceLayout,
    cache_dir: PathBuf,
    state: OrchestrationState,
}

impl Orchestrator {
    /// Create an orchestrator for one validated configuration.
    ///
    /// # Errors
    /// Returns `BuildError::PreparationFailed` when the device profile is
    /// unknown.
    pub fn new(config: BuildConfig) -> Result<Self, BuildError> {
        let db = DeviceDb::new();
        let profile = db
            .get(&config.device)
            .cloned()
            .ok_or_else(|| {
                BuildError::PreparationFailed(format!("Unknown device profile: {}", config.device))
            })?;

        let layout = WorkspaceLayout::new(config.workspace.clone());
        let state = OrchestrationState::new(config.clone());

        Ok(Orchestrator {
            config,
            profile,
            layout,
            cache_dir: cache::default_cache_dir(),
            state,
        })
    }

    /// Current pipeline state snapshot.
    pub fn state(&self) -> &OrchestrationState {
        &self.state
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Run the pipeline to completion.
    ///
    /// On failure the state machine lands in `Failed` with the error
    /// recorded before the error propagates to the caller. Either way a
    /// JSON snapshot of the final state is left next to the run log.
    pub async fn run(&mut self) -> Result<BuildOutcome, BuildError> {
        let result = match self.execute().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                log::error!("[Orchestrator] Pipeline aborted: {}", e);
                self.state.record_error(e.to_string());
                Err(e)
            }
        };
        self.persist_state_snapshot();
        result
    }

    fn transition(&mut self, next: PipelinePhase) -> Result<(), BuildError> {
        self.state
            .transition_to(next)
            .map_err(BuildError::BuildFailed)?;
        log::info!("[Orchestrator] PHASE: {}", next.as_str());
        Ok(())
    }

    /// Write the final state beside the run log. Best-effort: losing the
    /// snapshot must not change the run's outcome.
    fn persist_state_snapshot(&self) {
        let path = self.layout.logs_dir().join("state.json");
        match serde_json::to_string_pretty(&self.state) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::warn!(
                        "[Orchestrator] Could not write state snapshot {}: {}",
                        path.display(),
                        e
                    );
                }
            }
            Err(e) => log::warn!("[Orchestrator] Could not serialize state: {}", e),
        }
    }

    async fn execute(&mut self) -> Result<BuildOutcome, BuildError> {
        // =====================================================================
        // PHASE 1: PREPARATION - dependencies, workspace skeleton, cache
        // =====================================================================
        log::info!(
            "[Orchestrator] Starting pipeline: device={} suffix={} kpm={} lz4kd={}",
            self.config.device,
            self.config.kernel_suffix,
            self.config.enable_kpm,
            self.config.enable_lz4kd
        );

        deps::ensure_dependencies(self.config.dry_run)
            .await
            .map_err(|e| BuildError::PreparationFailed(e.user_message()))?;

        self.layout
            .ensure_base_dirs()
            .map_err(|e| BuildError::PreparationFailed(e.to_string()))?;

        if !self.config.dry_run {
            deps::ensure_git_identity()
                .map_err(|e| BuildError::PreparationFailed(e.to_string()))?;
            cache::ensure_cache(&self.cache_dir)
                .map_err(|e| BuildError::PreparationFailed(e.to_string()))?;
        }

        let planned_steps = steps::build_steps(&self.profile, &self.config);

        if self.config.dry_run {
            log::info!(
                "[Orchestrator] [DRY-RUN] Plan: {} patch steps for {}",
                planned_steps.len(),
                self.profile.name
            );
            for (index, step) in planned_steps.iter().enumerate() {
                log::info!(
                    "[Orchestrator] [DRY-RUN]   {}. {} ({})",
                    index + 1,
                    step.name,
                    step.mode
                );
            }
            log::info!("[Orchestrator] [DRY-RUN] Halting before source sync");
            return Ok(BuildOutcome::DryRun {
                planned_steps: planned_steps.len(),
            });
        }

        // =====================================================================
        // PHASE 2: SYNC - manifest-driven source acquisition
        // =====================================================================
        self.transition(PipelinePhase::Sync)?;
        self.state.set_progress(5);

        manifest::sync_source(
            &self.profile,
            &self.config.manifest,
            self.config.jobs,
            &self.layout.source_dir(),
        )
        .await
        .map_err(|e| BuildError::SyncFailed(e.to_string()))?;

        // =====================================================================
        // PHASE 3: PATCHING - companions, version surgery, ordered steps
        // =====================================================================
        self.transition(PipelinePhase::Patching)?;
        self.state.set_progress(25);

        let kernelsu_git = GitManager::acquire(
            &KERNELSU,
            None,
            self.layout.companion(KERNELSU.name),
        )
        .map_err(|e| BuildError::PatchingFailed(e.to_string()))?;

        let susfs_branch = self.profile.susfs_branch();
        GitManager::acquire(
            &SUSFS,
            Some(&susfs_branch),
            self.layout.companion(SUSFS.name),
        )
        .map_err(|e| BuildError::PatchingFailed(e.to_string()))?;
        GitManager::acquire(
            &SUKISU_PATCH,
            None,
            self.layout.companion(SUKISU_PATCH.name),
        )
        .map_err(|e| BuildError::PatchingFailed(e.to_string()))?;

        // Derived version number: commit count + fixed offset, computed
        // once and read-only for the rest of the run.
        let commit_count = kernelsu_git
            .commit_count()
            .map_err(|e| BuildError::PatchingFailed(e.to_string()))?;
        let version = ksu_version(commit_count);
        self.state.ksu_version = Some(version);
        log::info!(
            "[Orchestrator] KernelSU version: {} ({} commits)",
            version,
            commit_count
        );

        let patcher = KernelPatcher::new(self.layout.clone());
        patcher
            .integrate_kernelsu()
            .map_err(|e| BuildError::PatchingFailed(e.to_string()))?;
        patcher
            .mutate_version_scripts(&self.profile, &self.config.kernel_suffix)
            .map_err(|e| BuildError::PatchingFailed(e.to_string()))?;

        let summary = patcher
            .apply_steps(&planned_steps)
            .await
            .map_err(|e| BuildError::PatchingFailed(e.to_string()))?;
        self.state.record_patch_summary(summary);
        if summary.best_effort_failures > 0 {
            log::warn!(
                "[Orchestrator] {} best-effort patch step(s) failed; tree may lack optional features",
                summary.best_effort_failures
            );
        }

        // =====================================================================
        // PHASE 4: CONFIGURATION - defconfig injection
        // =====================================================================
        self.transition(PipelinePhase::Configuration)?;
        self.state.set_progress(45);

        patcher
            .inject_defconfig(self.config.enable_kpm, self.config.enable_lz4kd)
            .map_err(|e| BuildError::ConfigurationFailed(e.to_string()))?;
        patcher
            .neutralize_defconfig_check()
            .map_err(|e| BuildError::ConfigurationFailed(e.to_string()))?;

        // =====================================================================
        // PHASE 5: BUILDING - configure + compile
        // =====================================================================
        self.transition(PipelinePhase::Building)?;
        self.state.set_progress(50);

        let envs = buildenv::prepare_build_environment(&self.cache_dir);
        let progress_base = 50_u32;
        let state_progress = &mut self.state;
        executor::run_kernel_build(&self.layout, &envs, self.config.jobs, |percent| {
            // Building spans 50-90% of overall progress
            state_progress.set_progress(progress_base + percent * 40 / 100);
        })
        .await?;

        // =====================================================================
        // PHASE 6: POST-PATCH - optional KPM image patching
        // =====================================================================
        self.transition(PipelinePhase::PostPatch)?;
        self.state.set_progress(90);

        if self.config.enable_kpm {
            kpm::patch_boot_image(&self.layout.boot_dir())
                .await
                .map_err(|e| BuildError::PostPatchFailed(e.user_message()))?;
        } else {
            log::info!("[Orchestrator] KPM disabled; skipping image post-patch");
        }

        // =====================================================================
        // PHASE 7: PACKAGING - AnyKernel3 archive + cleanup policy
        // =====================================================================
        self.transition(PipelinePhase::Packaging)?;
        self.state.set_progress(95);

        let archive = packager::package(&self.layout, &self.config, version)
            .await
            .map_err(|e| BuildError::PackagingFailed(e.to_string()))?;

        self.apply_cleanup_policy()?;

        self.transition(PipelinePhase::Completed)?;
        self.state.set_progress(100);

        let elapsed = self
            .state
            .elapsed_since_start()
            .map(|d| d.as_secs())
            .unwrap_or(0);
        log::info!(
            "[Orchestrator] Pipeline completed in {}s: {}",
            elapsed,
            archive.display()
        );

        Ok(BuildOutcome::Completed(BuildArtifacts {
            image: self.layout.dist_dir().join("Image"),
            archive,
            ksu_version: version,
        }))
    }

    /// Apply the configured workspace disposition. Dist outputs and logs
    /// survive either policy.
    fn apply_cleanup_policy(&self) -> Result<(), BuildError> {
        match self.config.cleanup {
            CleanupPolicy::Keep => {
                log::info!("[Orchestrator] Cleanup policy: keep workspace");
                Ok(())
            }
            CleanupPolicy::Purge => {
                log::info!("[Orchestrator] Cleanup policy: purging synced tree and companions");
                for dir in [
                    self.layout.source_dir(),
                    self.layout.companions_dir(),
                    self.layout.workspace_root().join("pkg"),
                ] {
                    if dir.exists() {
                        std::fs::remove_dir_all(&dir).map_err(|e| {
                            BuildError::PackagingFailed(format!(
                                "purge of {} failed: {}",
                                dir.display(),
                                e
                            ))
                        })?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_rejects_unknown_device() {
        let mut config = BuildConfig::default();
        config.device = "pixel-9000".to_string();
        match Orchestrator::new(config) {
            Err(BuildError::PreparationFailed(msg)) => assert!(msg.contains("pixel-9000")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_orchestrator_starts_in_preparation() {
        let config = BuildConfig::default();
        let orchestrator = Orchestrator::new(config).expect("orchestrator");
        assert_eq!(orchestrator.state().phase, PipelinePhase::Preparation);
        assert_eq!(orchestrator.state().progress, 0);
    }

    #[tokio::test]
    async fn test_dry_run_stops_after_preparation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = BuildConfig::default();
        config.workspace = temp.path().join("ws");
        config.dry_run = true;
        config.enable_lz4kd = true;

        let mut orchestrator = Orchestrator::new(config).expect("orchestrator");
        let outcome = orchestrator.run().await.expect("dry run");
        match outcome {
            BuildOutcome::DryRun { planned_steps } => {
                // Base steps plus the LZ4KD block
                assert_eq!(planned_steps, 13);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        // Dry run never leaves Preparation
        assert_eq!(orchestrator.state().phase, PipelinePhase::Preparation);
        // Workspace skeleton was still created
        assert!(orchestrator.layout().dist_dir().is_dir());
    }

    #[tokio::test]
    async fn test_dry_run_without_lz4kd_has_fewer_steps() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = BuildConfig::default();
        config.workspace = temp.path().join("ws");
        config.dry_run = true;

        let mut orchestrator = Orchestrator::new(config).expect("orchestrator");
        match orchestrator.run().await.expect("dry run") {
            BuildOutcome::DryRun { planned_steps } => assert_eq!(planned_steps, 8),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
