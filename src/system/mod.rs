/// System module: external command execution and toolchain path hygiene

pub mod cache;
pub mod deps;
pub mod paths;

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::error::AppError;

/// Description of one external tool invocation.
///
/// Everything the runner needs is carried explicitly; nothing is read
/// from the process environment at spawn time except what `envs` sets.
pub struct ExternalCommand<'a> {
    /// Short tag used in log lines, e.g. "repo-sync" or "zip".
    pub label: &'a str,
    pub program: &'a str,
    pub args: Vec<String>,
    pub cwd: Option<&'a Path>,
    pub envs: &'a HashMap<String, String>,
}

/// Run an external tool to completion, streaming stdout and stderr
/// line-by-line into the log pipeline.
///
/// # Arguments
/// * `spec` - the invocation description
///
/// # Returns
/// * `Ok(())` when the tool exits with status zero
/// * `Err(AppError::OsCommand)` on spawn failure or nonzero exit
pub async fn run_logged(spec: ExternalCommand<'_>) -> Result<(), AppError> {
    let mut command = Command::new(spec.program);
    command.args(&spec.args);
    if let Some(dir) = spec.cwd {
        command.current_dir(dir);
    }
    for (key, value) in spec.envs {
        command.env(key, value);
    }
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    log::info!(
        "[Run] [{}] {} {}",
        spec.label,
        spec.program,
        spec.args.join(" ")
    );

    let mut child = command.spawn().map_err(|e| AppError::OsCommand {
        cmd: spec.program.to_string(),
        reason: format!("spawn failed: {}", e),
    })?;

    let stdout = child.stdout.take().ok_or_else(|| AppError::OsCommand {
        cmd: spec.program.to_string(),
        reason: "failed to capture stdout".to_string(),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| AppError::OsCommand {
        cmd: spec.program.to_string(),
        reason: "failed to capture stderr".to_string(),
    })?;

    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();
    let mut stdout_closed = false;
    let mut stderr_closed = false;

    loop {
        if stdout_closed && stderr_closed {
            break;
        }

        tokio::select! {
            line = stdout_lines.next_line(), if !stdout_closed => {
                match line {
                    Ok(Some(line)) => log::info!("[{}] {}", spec.label, line),
                    Ok(None) => stdout_closed = true,
                    Err(e) => {
                        log::warn!("[{}] stdout read error: {}", spec.label, e);
                        stdout_closed = true;
                    }
                }
            }
            line = stderr_lines.next_line(), if !stderr_closed => {
                match line {
                    Ok(Some(line)) => log::info!("[{}] [stderr] {}", spec.label, line),
                    Ok(None) => stderr_closed = true,
                    Err(e) => {
                        log::warn!("[{}] stderr read error: {}", spec.label, e);
                        stderr_closed = true;
                    }
                }
            }
        }
    }

    let status = child.wait().await.map_err(|e| AppError::OsCommand {
        cmd: spec.program.to_string(),
        reason: format!("wait failed: {}", e),
    })?;

    if !status.success() {
        return Err(AppError::OsCommand {
            cmd: spec.program.to_string(),
            reason: format!("exit status {}", status.code().unwrap_or(-1)),
        });
    }

    log::info!("[Run] [{}] completed", spec.label);
    Ok(())
}

/// Purify PATH for toolchain enforcement.
///
/// Removes directories containing stray gcc/llvm/clang installations to
/// prevent compiler interference, rebuilding PATH with blessed locations
/// first. `/usr/bin` and `/bin` are always preserved so make, sed and
/// the other build prerequisites stay reachable.
///
/// # Arguments
/// * `clang_bin_override` - Optional clang bin directory to prioritize
///
/// # Returns
/// Purified PATH string safe for kernel compilation
pub fn purify_path(clang_bin_override: Option<&Path>) -> String {
    let mut safe_paths = Vec::new();

    if let Some(clang_dir) = clang_bin_override {
        safe_paths.push(clang_dir.to_string_lossy().to_string());
    }

    safe_paths.push("/usr/bin".to_string());
    safe_paths.push("/bin".to_string());
    safe_paths.push("/usr/local/bin".to_string());

    let current_path = std::env::var("PATH").unwrap_or_default();
    let filtered_path: Vec<&str> = current_path
        .split(':')
        .filter(|p| {
            // The essential directories already lead safe_paths; dropping
            // them here avoids duplicates in the rebuilt PATH
            if *p == "/usr/bin" || *p == "/bin" || *p == "/usr/local/bin" {
                return false;
            }
            !(p.contains("/gcc") || p.contains("/llvm") || p.contains("/clang")) && !p.is_empty()
        })
        .collect();

    let new_path = format!(
        "{}{}{}",
        safe_paths.join(":"),
        if filtered_path.is_empty() { "" } else { ":" },
        filtered_path.join(":")
    );

    log::debug!(
        "[System] [PATH-PURIFY] Constructed purified PATH ({} blessed entries)",
        safe_paths.len()
    );
    new_path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purify_path_keeps_blessed_dirs() {
        let path = purify_path(None);
        assert!(path.contains("/usr/bin"));
        assert!(path.contains("/bin"));
    }

    #[test]
    fn test_purify_path_prioritizes_override() {
        let path = purify_path(Some(Path::new("/opt/clang/bin")));
        assert!(path.starts_with("/opt/clang/bin:"));
    }

    #[tokio::test]
    async fn test_run_logged_success() {
        let envs = HashMap::new();
        let spec = ExternalCommand {
            label: "true",
            program: "true",
            args: vec![],
            cwd: None,
            envs: &envs,
        };
        assert!(run_logged(spec).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_logged_nonzero_exit() {
        let envs = HashMap::new();
        let spec = ExternalCommand {
            label: "false",
            program: "false",
            args: vec![],
            cwd: None,
            envs: &envs,
        };
        let err = run_logged(spec).await.unwrap_err();
        match err {
            AppError::OsCommand { cmd, .. } => assert_eq!(cmd, "false"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
