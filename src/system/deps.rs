//! Host dependency preparation.
//!
//! Probes for the external tools the pipeline shells out to, installs the
//! missing ones in a single package-manager transaction, and makes sure a
//! git identity exists so companion clones and the manifest tool do not
//! stall on first use. Install failure is fatal; there is no retry.

use std::collections::HashMap;

use crate::error::AppError;
use crate::system::{run_logged, ExternalCommand};

/// (probe binary, apt package) pairs the pipeline depends on.
///
/// The probe name is what must be resolvable on PATH; the package name is
/// what gets handed to the package manager when the probe fails.
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("repo", "repo"),
    ("git", "git"),
    ("curl", "curl"),
    ("patch", "patch"),
    ("make", "make"),
    ("zip", "zip"),
    ("bc", "bc"),
    ("bison", "bison"),
    ("flex", "flex"),
    ("ccache", "ccache"),
    ("python3", "python3"),
];

/// Probe PATH for every required tool and return the apt packages for
/// the ones that are missing.
pub fn missing_packages() -> Vec<&'static str> {
    REQUIRED_TOOLS
        .iter()
        .filter(|(tool, _)| which::which(tool).is_err())
        .map(|(_, package)| *package)
        .collect()
}

/// Ensure every required host tool is installed.
///
/// Missing packages are installed in one `apt-get install -y` invocation.
/// A nonzero exit from the installer aborts the run.
pub async fn ensure_dependencies(dry_run: bool) -> Result<(), AppError> {
    let missing = missing_packages();
    if missing.is_empty() {
        log::info!("[Deps] All required host tools present");
        return Ok(());
    }

    log::info!("[Deps] Missing host tools: {}", missing.join(", "));
    if dry_run {
        log::info!("[Deps] Dry run: skipping package installation");
        return Ok(());
    }

    let mut args = vec![
        "apt-get".to_string(),
        "install".to_string(),
        "-y".to_string(),
    ];
    args.extend(missing.iter().map(|p| p.to_string()));

    let envs = HashMap::new();
    run_logged(ExternalCommand {
        label: "apt-install",
        program: "sudo",
        args,
        cwd: None,
        envs: &envs,
    })
    .await
    .map_err(|e| AppError::Dependency(e.to_string()))
}

/// Ensure a git identity is configured, writing a build-local default
/// when either half is absent.
///
/// Companion clones and the manifest tool both refuse to operate without
/// `user.name`/`user.email` on some hosts (CI containers in particular).
pub fn ensure_git_identity() -> Result<(), git2::Error> {
    let mut config = git2::Config::open_default()?;

    if config.get_string("user.name").is_err() {
        config.set_str("user.name", "gkibuild")?;
        log::info!("[Deps] Wrote default git user.name");
    }
    if config.get_string("user.email").is_err() {
        config.set_str("user.email", "gkibuild@localhost")?;
        log::info!("[Deps] Wrote default git user.email");
    }

    Ok(())
}
