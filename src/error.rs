//! Unified error type hierarchy for gkibuild
//!
//! Provides structured error handling with SyncError, PatchError, ConfigError,
//! BuildError, PackageError, and AppError.

use std::io;
use thiserror::Error;

/// Manifest-driven source synchronization errors.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("repo init failed: {0}")]
    InitFailed(String),

    #[error("repo sync failed: {0}")]
    SyncFailed(String),

    #[error("repo tool not found: {0}")]
    ToolMissing(String),

    #[error("IO error during source sync: {0}")]
    IoError(#[from] io::Error),
}

/// Source-tree mutation errors (file copies, patch application, text surgery).
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Patch target file not found: {0}")]
    FileNotFound(String),

    #[error("Patch application failed: {0}")]
    PatchFailed(String),

    #[error("Expected anchor '{anchor}' not found in {file}")]
    AnchorMissing { anchor: String, file: String },

    #[error("Companion source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Configuration selection and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown device profile: {0}")]
    UnknownDevice(String),

    #[error("Invalid kernel suffix: {0}")]
    InvalidSuffix(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Build process execution errors.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Preparation phase failed: {0}")]
    PreparationFailed(String),

    #[error("Sync phase failed: {0}")]
    SyncFailed(String),

    #[error("Patching phase failed: {0}")]
    PatchingFailed(String),

    #[error("Configuration phase failed: {0}")]
    ConfigurationFailed(String),

    #[error("Build phase failed: {0}")]
    BuildFailed(String),

    #[error("Post-patch phase failed: {0}")]
    PostPatchFailed(String),

    #[error("Packaging phase failed: {0}")]
    PackagingFailed(String),
}

/// Flashable-archive packaging errors.
#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Required artifact missing: {0}")]
    ArtifactMissing(String),

    #[error("Template preparation failed: {0}")]
    TemplateFailed(String),

    #[error("Archive creation failed: {0}")]
    ArchiveFailed(String),

    #[error("IO error during packaging: {0}")]
    IoError(#[from] io::Error),
}

/// Global error type shared across gkibuild modules.
///
/// Provides unified error categorization and user-facing messages for
/// failures that are not specific to one pipeline stage.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// OS command failed (e.g., repo, patch, make, zip)
    #[error("Command '{cmd}' failed: {reason}")]
    OsCommand { cmd: String, reason: String },

    /// Host dependency missing or uninstallable
    #[error("Dependency error: {0}")]
    Dependency(String),

    /// Download of an external artifact failed
    #[error("Download failed: {0}")]
    Download(String),

    /// File I/O error (read/write/delete)
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid input (e.g., device name with shell chars)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Get a user-facing error message suitable for terminal display
    pub fn user_message(&self) -> String {
        match self {
            AppError::OsCommand { cmd, reason } => {
                format!("Failed to execute '{}': {}", cmd, reason)
            }
            AppError::Dependency(msg) => format!("Host dependency problem: {}", msg),
            AppError::Download(msg) => format!("Could not download artifact: {}", msg),
            AppError::Io(msg) => format!("File operation failed: {}", msg),
            AppError::InvalidInput(msg) => format!("Invalid input: {}", msg),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(e: io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Io(s)
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Io(s.to_string())
    }
}

/// Top-level result type for operations that may fail.
/// Use this as the return type for all fallible functions.
/// Example: `fn risky_operation() -> Result<String>`
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::InitFailed("exit status 1".to_string());
        assert_eq!(err.to_string(), "repo init failed: exit status 1");
    }

    #[test]
    fn test_patch_error_anchor_display() {
        let err = PatchError::AnchorMissing {
            anchor: "echo \"$res\"".to_string(),
            file: "common/scripts/setlocalversion".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Expected anchor 'echo \"$res\"' not found in common/scripts/setlocalversion"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownDevice("oneplus99".to_string());
        assert_eq!(err.to_string(), "Unknown device profile: oneplus99");
    }

    #[test]
    fn test_app_error_user_message() {
        let err = AppError::OsCommand {
            cmd: "zip".to_string(),
            reason: "exit status 12".to_string(),
        };
        assert_eq!(
            err.user_message(),
            "Failed to execute 'zip': exit status 12"
        );
    }

    #[test]
    fn test_result_type_ok() {
        let result: Result<i32> = Ok(42);
        assert!(result.is_ok());
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err("test error".into());
        assert!(result.is_err());
    }
}
