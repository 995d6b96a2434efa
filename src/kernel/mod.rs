//! Kernel Source Management Module
//!
//! Handles interactions with the GKI kernel source tree, including:
//! - Manifest-driven multi-repository synchronization
//! - Git operations for companion repositories (cloning, commit counts)
//! - The ordered patch pipeline and configuration injection
//! - Optional KPM post-patching and AnyKernel3 packaging

// Git management submodule
pub mod git;

// Manifest sync (repo tool) submodule
pub mod manifest;

// Patch pipeline and configuration injection
pub mod patcher;

// Device and companion source URL management
pub mod sources;

// Optional KPM boot-image post-patch
pub mod kpm;

// AnyKernel3 packaging
pub mod packager;
