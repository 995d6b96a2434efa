//! gkibuild - GKI kernel build pipeline
//!
//! This crate implements a single parameterized orchestration pipeline
//! that produces a customized Android GKI kernel: dependency
//! preparation, manifest-driven source sync, the ordered
//! KernelSU/SUSFS/compression patch pipeline, defconfig injection, the
//! cross-compile build, optional KPM post-patching, and AnyKernel3
//! packaging.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures and the immutable `BuildConfig`
//! - **config**: Configuration selection (fixed / interactive / CI)
//! - **system**: External command execution, host deps, paths, cache
//! - **log_collector**: Disk-persisting logging pipeline
//! - **kernel**: Source sync, companions, patching, packaging
//! - **orchestrator**: Phase state machine and build execution

#![allow(dead_code)]

// Core foundational modules
pub mod error;
pub mod models;

// Configuration selection layer
pub mod config;

// System abstraction module (command runner, deps, paths, cache)
pub mod system;

// Disk-persisting logging pipeline
pub mod log_collector;

// Kernel source management (sync, companions, patching, packaging)
pub mod kernel;

// Phase orchestration and build execution
pub mod orchestrator;

// Re-export the log crate for macro usage
pub use log;

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

// Re-export error types for easy access
pub use error::{AppError, BuildError, ConfigError, PackageError, PatchError, Result, SyncError};

// Re-export model types for easy access
pub use models::{
    ksu_version,
    ApplyMode,
    BuildArtifacts,
    // Build structs
    BuildConfig,
    CleanupPolicy,
    PatchAction,
    PatchStep,
    PatchSummary,
    KSU_VERSION_OFFSET,
};

// Re-export the configuration selection layer
pub use config::{select, SelectionMode, SelectionOverrides};

// Re-export the logging pipeline
pub use log_collector::LogCollector;

// Re-export orchestration types
pub use orchestrator::{BuildOutcome, OrchestrationState, Orchestrator, PipelinePhase};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(VERSION, "0.1.0");
    }

    #[test]
    fn test_error_reexport() {
        // Verify error types are accessible via crate root
        let _: Result<i32> = Ok(42);
    }

    #[test]
    fn test_models_reexport() {
        // Verify model types are accessible via crate root
        let _mode = ApplyMode::Fatal;
        let _policy = CleanupPolicy::Keep;
        assert_eq!(ksu_version(0), KSU_VERSION_OFFSET);
    }

    #[test]
    fn test_enum_variants_accessible() {
        assert_eq!(PipelinePhase::Preparation, PipelinePhase::Preparation);
        assert_eq!(SelectionMode::Fixed, SelectionMode::Fixed);
    }
}
