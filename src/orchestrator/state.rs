//! Build State Management and Phase Tracking
//!
//! This module provides the state tracking structures used by the
//! orchestrator to manage pipeline execution across its phases.
//!
//! **Architecture**:
//! - `PipelinePhase`: Enum representing discrete pipeline phases
//! - `OrchestrationState`: Struct tracking current phase, progress, and
//!   the derived version number
//! - State transitions are forward-only; a fatal failure moves straight
//!   to the terminal `Failed` phase and the run is over

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::models::{BuildConfig, PatchSummary};

/// Pipeline phase enumeration - discrete states in the build lifecycle.
///
/// The orchestrator walks these phases strictly forward; there is no
/// re-entry and no recovery transition out of `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelinePhase {
    /// Dependency checks, workspace skeleton, cache initialization
    Preparation,

    /// Manifest-driven multi-repository source sync
    Sync,

    /// Companion clones, version-string surgery, ordered patch steps
    Patching,

    /// Defconfig injection and sanity-check neutralization
    Configuration,

    /// Cross-compile configure + compile invocations
    Building,

    /// Optional KPM binary post-patch of the boot image
    PostPatch,

    /// AnyKernel3 staging, archiving, dist copies, cleanup policy
    Packaging,

    /// Pipeline completed successfully
    Completed,

    /// Pipeline aborted; terminal
    Failed,
}

impl PipelinePhase {
    /// Get the human-readable name for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::Preparation => "preparation",
            PipelinePhase::Sync => "sync",
            PipelinePhase::Patching => "patching",
            PipelinePhase::Configuration => "configuration",
            PipelinePhase::Building => "building",
            PipelinePhase::PostPatch => "post-patch",
            PipelinePhase::Packaging => "packaging",
            PipelinePhase::Completed => "completed",
            PipelinePhase::Failed => "failed",
        }
    }

    /// Get all valid phase transitions FROM this phase.
    pub fn valid_next_phases(&self) -> Vec<PipelinePhase> {
        match self {
            PipelinePhase::Preparation => vec![PipelinePhase::Sync, PipelinePhase::Failed],
            PipelinePhase::Sync => vec![PipelinePhase::Patching, PipelinePhase::Failed],
            PipelinePhase::Patching => vec![PipelinePhase::Configuration, PipelinePhase::Failed],
            PipelinePhase::Configuration => vec![PipelinePhase::Building, PipelinePhase::Failed],
            PipelinePhase::Building => vec![PipelinePhase::PostPatch, PipelinePhase::Failed],
            PipelinePhase::PostPatch => vec![PipelinePhase::Packaging, PipelinePhase::Failed],
            PipelinePhase::Packaging => vec![PipelinePhase::Completed, PipelinePhase::Failed],
            PipelinePhase::Completed => vec![],
            PipelinePhase::Failed => vec![],
        }
    }

    /// Check if a transition to the given phase is valid.
    pub fn can_transition_to(&self, next: PipelinePhase) -> bool {
        self.valid_next_phases().contains(&next)
    }
}

/// Pipeline execution state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationState {
    /// Current pipeline phase
    pub phase: PipelinePhase,

    /// Overall progress percentage (0-100)
    pub progress: u32,

    /// Active build configuration
    pub config: BuildConfig,

    /// Number of patch steps applied
    pub patches_applied: u32,

    /// Number of best-effort patch steps that failed
    pub patches_failed: u32,

    /// Derived KernelSU version, set during Patching
    pub ksu_version: Option<u32>,

    /// Pipeline start timestamp
    pub start_time: SystemTime,

    /// Last phase update timestamp
    pub last_update_time: SystemTime,

    /// Error message if the pipeline failed
    pub error: Option<String>,
}

impl OrchestrationState {
    /// Create a new orchestration state for a pipeline execution.
    pub fn new(config: BuildConfig) -> Self {
        let now = SystemTime::now();
        OrchestrationState {
            phase: PipelinePhase::Preparation,
            progress: 0,
            config,
            patches_applied: 0,
            patches_failed: 0,
            ksu_version: None,
            start_time: now,
            last_update_time: now,
            error: None,
        }
    }

    /// Attempt to transition to the next phase.
    pub fn transition_to(&mut self, next_phase: PipelinePhase) -> Result<(), String> {
        if !self.phase.can_transition_to(next_phase) {
            return Err(format!(
                "Invalid phase transition: {} -> {}",
                self.phase.as_str(),
                next_phase.as_str()
            ));
        }
        self.phase = next_phase;
        self.last_update_time = SystemTime::now();
        Ok(())
    }

    /// Update progress percentage (0-100).
    pub fn set_progress(&mut self, percent: u32) {
        self.progress = percent.min(100);
        self.last_update_time = SystemTime::now();
    }

    /// Fold a patch-step summary into the counters.
    pub fn record_patch_summary(&mut self, summary: PatchSummary) {
        self.patches_applied += summary.applied;
        self.patches_failed += summary.best_effort_failures;
    }

    /// Record an error and mark the pipeline as failed.
    pub fn record_error(&mut self, error: String) {
        self.error = Some(error);
        self.phase = PipelinePhase::Failed;
        self.last_update_time = SystemTime::now();
    }

    /// Get time elapsed since pipeline start.
    pub fn elapsed_since_start(&self) -> Result<std::time::Duration, std::time::SystemTimeError> {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions_forward_only() {
        assert!(PipelinePhase::Preparation.can_transition_to(PipelinePhase::Sync));
        assert!(PipelinePhase::Building.can_transition_to(PipelinePhase::PostPatch));
        assert!(!PipelinePhase::Preparation.can_transition_to(PipelinePhase::Building));
        assert!(!PipelinePhase::Packaging.can_transition_to(PipelinePhase::Patching));
    }

    #[test]
    fn test_failed_is_terminal() {
        assert!(PipelinePhase::Failed.valid_next_phases().is_empty());
        assert!(PipelinePhase::Completed.valid_next_phases().is_empty());
    }

    #[test]
    fn test_every_active_phase_can_fail() {
        for phase in [
            PipelinePhase::Preparation,
            PipelinePhase::Sync,
            PipelinePhase::Patching,
            PipelinePhase::Configuration,
            PipelinePhase::Building,
            PipelinePhase::PostPatch,
            PipelinePhase::Packaging,
        ] {
            assert!(
                phase.can_transition_to(PipelinePhase::Failed),
                "{} must be able to fail",
                phase.as_str()
            );
        }
    }

    #[test]
    fn test_orchestration_state_creation() {
        let state = OrchestrationState::new(crate::models::BuildConfig::default());
        assert_eq!(state.phase, PipelinePhase::Preparation);
        assert_eq!(state.progress, 0);
        assert!(state.ksu_version.is_none());
    }

    #[test]
    fn test_transition_walks_the_pipeline() {
        let mut state = OrchestrationState::new(crate::models::BuildConfig::default());
        for next in [
            PipelinePhase::Sync,
            PipelinePhase::Patching,
            PipelinePhase::Configuration,
            PipelinePhase::Building,
            PipelinePhase::PostPatch,
            PipelinePhase::Packaging,
            PipelinePhase::Completed,
        ] {
            assert!(state.transition_to(next).is_ok());
        }
        assert_eq!(state.phase, PipelinePhase::Completed);
    }

    #[test]
    fn test_invalid_phase_transition() {
        let mut state = OrchestrationState::new(crate::models::BuildConfig::default());
        assert!(state.transition_to(PipelinePhase::Building).is_err());
    }

    #[test]
    fn test_record_error_terminates() {
        let mut state = OrchestrationState::new(crate::models::BuildConfig::default());
        state.record_error("repo sync failed".to_string());
        assert_eq!(state.phase, PipelinePhase::Failed);
        assert!(state.transition_to(PipelinePhase::Sync).is_err());
    }

    #[test]
    fn test_record_patch_summary_accumulates() {
        let mut state = OrchestrationState::new(crate::models::BuildConfig::default());
        state.record_patch_summary(PatchSummary {
            applied: 8,
            best_effort_failures: 1,
        });
        state.record_patch_summary(PatchSummary {
            applied: 2,
            best_effort_failures: 0,
        });
        assert_eq!(state.patches_applied, 10);
        assert_eq!(state.patches_failed, 1);
    }

    #[test]
    fn test_progress_clamped() {
        let mut state = OrchestrationState::new(crate::models::BuildConfig::default());
        state.set_progress(250);
        assert_eq!(state.progress, 100);
    }
}
