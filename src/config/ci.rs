//! CI environment selector.
//!
//! The automation variants of this pipeline take their answers from
//! fixed environment variables instead of prompts. This module is the
//! only place the process environment is consulted for pipeline
//! parameters; everything downstream sees the merged `BuildConfig`.

use crate::config::SelectionOverrides;
use crate::models::CleanupPolicy;

/// Recognized CI variables.
pub const ENV_DEVICE: &str = "DEVICE_NAME";
pub const ENV_MANIFEST: &str = "REPO_MANIFEST";
pub const ENV_SUFFIX: &str = "KERNEL_SUFFIX";
pub const ENV_KPM: &str = "ENABLE_KPM";
pub const ENV_LZ4KD: &str = "ENABLE_LZ4KD";
pub const ENV_CLEANUP: &str = "CLEANUP_POLICY";

/// Read overrides from the process environment.
pub fn from_env() -> SelectionOverrides {
    from_lookup(|key| std::env::var(key).ok())
}

/// Read overrides through an injectable lookup (tests supply a map).
///
/// Unset and unparsable values defer to weaker sources; a malformed
/// boolean is reported, not guessed.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SelectionOverrides {
    SelectionOverrides {
        device: lookup(ENV_DEVICE).filter(|v| !v.is_empty()),
        manifest: lookup(ENV_MANIFEST).filter(|v| !v.is_empty()),
        kernel_suffix: lookup(ENV_SUFFIX).filter(|v| !v.is_empty()),
        enable_kpm: lookup(ENV_KPM).and_then(|v| parse_flag(ENV_KPM, &v)),
        enable_lz4kd: lookup(ENV_LZ4KD).and_then(|v| parse_flag(ENV_LZ4KD, &v)),
        cleanup: lookup(ENV_CLEANUP).and_then(|v| v.parse::<CleanupPolicy>().ok()),
        jobs: None,
        workspace: None,
    }
}

/// Parse a `true`/`false` feature flag.
fn parse_flag(name: &str, value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        other => {
            log::warn!(
                "[Config] [CI] Ignoring {}='{}' (expected true/false)",
                name,
                other
            );
            None
        }
    }
}
