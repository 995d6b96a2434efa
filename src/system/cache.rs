//! Compiler-cache directory management.
//!
//! The cache directory is the only state intentionally reused across
//! pipeline runs. It is initialized once and marked with a sentinel file;
//! later runs see the sentinel and skip initialization. Reuse is
//! sequential only - concurrent runs against one cache are out of scope.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Presence-flag file marking an initialized cache directory.
pub const CACHE_SENTINEL: &str = ".cache_ready";

/// ccache size cap applied once at initialization.
const CCACHE_MAX_SIZE: &str = "8G";

/// Default cache location: `<user cache dir>/gkibuild`, falling back to
/// `.cache/gkibuild` under the current directory when the platform dir
/// cannot be determined.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("gkibuild")
}

/// Ensure the cache directory exists and is initialized.
///
/// Returns `true` when this call performed first-time initialization,
/// `false` when the sentinel was already present.
///
/// Initialization sets the ccache size cap; that step is best-effort
/// because the cache is an accelerator, not a correctness requirement.
pub fn ensure_cache(cache_dir: &Path) -> io::Result<bool> {
    std::fs::create_dir_all(cache_dir)?;

    let sentinel = cache_dir.join(CACHE_SENTINEL);
    if sentinel.exists() {
        log::info!(
            "[Cache] Reusing initialized cache at {}",
            cache_dir.display()
        );
        return Ok(false);
    }

    // One-time ccache sizing; missing ccache only costs rebuild speed.
    match Command::new("ccache")
        .arg("-M")
        .arg(CCACHE_MAX_SIZE)
        .env("CCACHE_DIR", cache_dir)
        .output()
    {
        Ok(output) if output.status.success() => {
            log::info!("[Cache] ccache size cap set to {}", CCACHE_MAX_SIZE);
        }
        Ok(output) => {
            log::warn!(
                "[Cache] ccache -M exited with {}; continuing without size cap",
                output.status.code().unwrap_or(-1)
            );
        }
        Err(e) => {
            log::warn!("[Cache] ccache unavailable ({}); continuing", e);
        }
    }

    std::fs::write(&sentinel, "")?;
    log::info!(
        "[Cache] Initialized cache directory at {}",
        cache_dir.display()
    );
    Ok(true)
}

/// Environment entries that route compiler caching into `cache_dir`.
pub fn cache_env(cache_dir: &Path) -> Vec<(String, String)> {
    vec![(
        "CCACHE_DIR".to_string(),
        cache_dir.to_string_lossy().to_string(),
    )]
}
