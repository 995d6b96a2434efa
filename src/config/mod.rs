//! Configuration module for kernel build management.
//!
//! This module provides the configuration-selection layer that produces
//! the immutable `BuildConfig` a pipeline run receives. Three sources
//! exist, merged with a fixed precedence:
//!
//! 1. Explicit CLI flags (strongest)
//! 2. The selected mode's answers: interactive prompts or CI variables
//! 3. Fixed defaults (weakest)
//!
//! The CI selector is the single sanctioned reader of the process
//! environment; pipeline stages themselves only ever see the resulting
//! struct.

pub mod ci;
pub mod interactive;

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::kernel::sources::DeviceDb;
use crate::models::{BuildConfig, CleanupPolicy};

/// Partial selection collected from one source.
///
/// `None` fields defer to the next-weaker source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionOverrides {
    pub device: Option<String>,
    pub manifest: Option<String>,
    pub kernel_suffix: Option<String>,
    pub enable_kpm: Option<bool>,
    pub enable_lz4kd: Option<bool>,
    pub cleanup: Option<CleanupPolicy>,
    pub jobs: Option<u32>,
    pub workspace: Option<PathBuf>,
}

impl SelectionOverrides {
    /// Overlay `self` on top of a weaker source; `self` wins per field.
    pub fn overlay(self, weaker: SelectionOverrides) -> SelectionOverrides {
        SelectionOverrides {
            device: self.device.or(weaker.device),
            manifest: self.manifest.or(weaker.manifest),
            kernel_suffix: self.kernel_suffix.or(weaker.kernel_suffix),
            enable_kpm: self.enable_kpm.or(weaker.enable_kpm),
            enable_lz4kd: self.enable_lz4kd.or(weaker.enable_lz4kd),
            cleanup: self.cleanup.or(weaker.cleanup),
            jobs: self.jobs.or(weaker.jobs),
            workspace: self.workspace.or(weaker.workspace),
        }
    }

    /// Resolve against the fixed defaults into a concrete configuration.
    pub fn merge_over(self, base: BuildConfig) -> BuildConfig {
        BuildConfig {
            device: self.device.unwrap_or(base.device),
            manifest: self.manifest.unwrap_or(base.manifest),
            kernel_suffix: self.kernel_suffix.unwrap_or(base.kernel_suffix),
            enable_kpm: self.enable_kpm.unwrap_or(base.enable_kpm),
            enable_lz4kd: self.enable_lz4kd.unwrap_or(base.enable_lz4kd),
            cleanup: self.cleanup.unwrap_or(base.cleanup),
            dry_run: base.dry_run,
            jobs: self.jobs.unwrap_or(base.jobs),
            workspace: self.workspace.unwrap_or(base.workspace),
        }
    }
}

/// Where the run's answers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Fixed defaults, adjusted only by CLI flags.
    Fixed,
    /// Terminal prompts fill what the CLI left unset.
    Interactive,
    /// CI environment variables fill what the CLI left unset.
    Ci,
}

/// Produce the validated configuration for one run.
///
/// # Arguments
/// * `mode` - answer source for fields the CLI left unset
/// * `cli` - overrides from explicit CLI flags
/// * `dry_run` - plan-only flag, passed through verbatim
pub fn select(
    mode: SelectionMode,
    cli: SelectionOverrides,
    dry_run: bool,
) -> Result<BuildConfig, ConfigError> {
    let db = DeviceDb::new();

    let secondary = match mode {
        SelectionMode::Fixed => SelectionOverrides::default(),
        SelectionMode::Interactive => interactive::prompt_overrides(&db)?,
        SelectionMode::Ci => ci::from_env(),
    };

    let mut config = cli.overlay(secondary).merge_over(BuildConfig::default());
    config.dry_run = dry_run;

    validate(&config, &db)?;
    Ok(config)
}

/// Validate a concrete configuration before the pipeline starts.
pub fn validate(config: &BuildConfig, db: &DeviceDb) -> Result<(), ConfigError> {
    if db.get(&config.device).is_none() {
        return Err(ConfigError::UnknownDevice(config.device.clone()));
    }

    if !config.kernel_suffix.starts_with('-') || config.kernel_suffix.len() < 2 {
        return Err(ConfigError::InvalidSuffix(format!(
            "'{}' must start with '-' and name a release tag",
            config.kernel_suffix
        )));
    }
    if !config
        .kernel_suffix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ConfigError::InvalidSuffix(format!(
            "'{}' contains characters outside [A-Za-z0-9._-]",
            config.kernel_suffix
        )));
    }

    if config.manifest.is_empty() || config.manifest.contains('/') {
        return Err(ConfigError::ValidationFailed(format!(
            "manifest '{}' must be a bare filename",
            config.manifest
        )));
    }

    if config.jobs == 0 {
        return Err(ConfigError::ValidationFailed(
            "jobs must be at least 1".to_string(),
        ));
    }

    Ok(())
}
