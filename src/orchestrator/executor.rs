//! Phase execution: build spawning and output streaming.
//!
//! Invokes the external build tool twice - the defconfig configure step
//! and the Image compile step - with the prepared toolchain environment,
//! streaming stdout/stderr through the logging pipeline with granular
//! progress tracking (CC/LD/AR line counting and [X/Y] patterns).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::error::BuildError;
use crate::system::paths::WorkspaceLayout;

// Pre-compiled progress patterns (compiled once at startup)
static STEP_COUNT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*(\d+)/(\d+)\]").expect("Invalid [X/Y] regex"));
static PERCENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*(\d+)%\]").expect("Invalid [%] regex"));

/// LTO mode handed to the build tool. Thin LTO matches the GKI release
/// configuration this pipeline targets.
const LTO_MODE: &str = "thin";

/// Arguments of the configure invocation (`make ... gki_defconfig`).
pub fn configure_args(layout: &WorkspaceLayout, jobs: u32) -> Vec<String> {
    let mut args = base_args(layout, jobs);
    args.push("gki_defconfig".to_string());
    args
}

/// Arguments of the compile invocation (`make ... Image`).
pub fn compile_args(layout: &WorkspaceLayout, jobs: u32) -> Vec<String> {
    let mut args = base_args(layout, jobs);
    args.push("Image".to_string());
    args
}

fn base_args(layout: &WorkspaceLayout, jobs: u32) -> Vec<String> {
    vec![
        format!("-j{}", jobs),
        "-C".to_string(),
        layout.common_dir().to_string_lossy().to_string(),
        format!("O={}", layout.out_dir().display()),
        "LLVM=1".to_string(),
        "LLVM_IAS=1".to_string(),
        format!("LTO={}", LTO_MODE),
    ]
}

/// Parses [X/Y] or [%] from make output for progress tracking.
///
/// Returns progress incrementally based on:
/// 1. [X/Y] compilation patterns (granular sub-percentage)
/// 2. [%] percentage patterns
/// 3. Compilation line markers (CC/LD/AR) for pseudo-progress
fn parse_build_progress(line: &str) -> Option<u32> {
    if let Some(caps) = STEP_COUNT_REGEX.captures(line) {
        if let (Ok(current), Ok(total)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) {
            if total > 0 {
                let progress = (current as f32 / total as f32 * 100.0) as u32;
                return Some(progress.min(100));
            }
        }
    }

    if let Some(caps) = PERCENT_REGEX.captures(line) {
        if let Ok(progress) = caps[1].parse::<u32>() {
            return Some(progress.min(100));
        }
    }

    if line.contains("CC ") || line.contains("LD ") || line.contains("AR ") {
        return Some(0); // Marker that compilation work is happening
    }

    None
}

/// Execute the full kernel build: configure then compile.
///
/// # Arguments
/// * `layout` - workspace layout supplying tree and output paths
/// * `envs` - prepared toolchain environment (see `patcher::env`)
/// * `jobs` - make parallelism
/// * `progress` - callback receiving coarse progress percentages
///
/// # Returns
/// * `Ok(())` when both invocations exit zero
/// * `Err(BuildError::BuildFailed)` on spawn failure or nonzero exit
pub async fn run_kernel_build<F>(
    layout: &WorkspaceLayout,
    envs: &HashMap<String, String>,
    jobs: u32,
    mut progress: F,
) -> Result<(), BuildError>
where
    F: FnMut(u32) + Send,
{
    log::info!(
        "[Build] [EXECUTOR] Configuring kernel in {} (-j{})",
        layout.common_dir().display(),
        jobs
    );
    run_make("make-defconfig", configure_args(layout, jobs), layout, envs, &mut |_| {}).await?;
    progress(10);

    log::info!("[Build] [EXECUTOR] Compiling Image (-j{}, LTO={})", jobs, LTO_MODE);
    run_make(
        "make-image",
        compile_args(layout, jobs),
        layout,
        envs,
        &mut |percent| {
            // Compile phase spans 10-100% of the Building phase budget
            progress(10 + percent * 90 / 100);
        },
    )
    .await?;
    progress(100);

    let image = layout.boot_image();
    if !image.is_file() {
        return Err(BuildError::BuildFailed(format!(
            "build completed but boot image missing at {}",
            image.display()
        )));
    }

    log::info!("[Build] [EXECUTOR] Boot image ready at {}", image.display());
    Ok(())
}

async fn run_make(
    label: &str,
    args: Vec<String>,
    layout: &WorkspaceLayout,
    envs: &HashMap<String, String>,
    progress: &mut (dyn FnMut(u32) + Send),
) -> Result<(), BuildError> {
    let mut command = Command::new("make");
    command.args(&args);
    command.current_dir(layout.source_dir());
    for (key, value) in envs {
        command.env(key, value);
    }
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|e| {
        BuildError::BuildFailed(format!(
            "Failed to spawn build process in {}: {}",
            layout.source_dir().display(),
            e
        ))
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| BuildError::BuildFailed("Failed to capture stdout".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| BuildError::BuildFailed("Failed to capture stderr".to_string()))?;

    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();

    let mut stdout_closed = false;
    let mut stderr_closed = false;
    let mut cc_line_counter = 0_usize;
    let mut last_reported = 0_u32;

    loop {
        if stdout_closed && stderr_closed {
            break;
        }

        tokio::select! {
            line_result = stdout_lines.next_line(), if !stdout_closed => {
                match line_result {
                    Ok(Some(line)) => {
                        handle_line(label, &line, false, &mut cc_line_counter, &mut last_reported, progress);
                    }
                    Ok(None) => stdout_closed = true,
                    Err(e) => {
                        log::warn!("[{}] stdout read error: {}", label, e);
                        stdout_closed = true;
                    }
                }
            }
            line_result = stderr_lines.next_line(), if !stderr_closed => {
                match line_result {
                    Ok(Some(line)) => {
                        handle_line(label, &line, true, &mut cc_line_counter, &mut last_reported, progress);
                    }
                    Ok(None) => stderr_closed = true,
                    Err(e) => {
                        log::warn!("[{}] stderr read error: {}", label, e);
                        stderr_closed = true;
                    }
                }
            }
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| BuildError::BuildFailed(format!("wait failed: {}", e)))?;

    if !status.success() {
        return Err(BuildError::BuildFailed(format!(
            "{} exited with status {}",
            label,
            status.code().unwrap_or(-1)
        )));
    }

    Ok(())
}

fn handle_line(
    label: &str,
    line: &str,
    is_stderr: bool,
    cc_line_counter: &mut usize,
    last_reported: &mut u32,
    progress: &mut dyn FnMut(u32),
) {
    if is_stderr {
        log::info!("[{}] [stderr] {}", label, line);
    } else {
        log::info!("[{}] {}", label, line);
    }

    if let Some(percent) = parse_build_progress(line) {
        if percent > *last_reported {
            *last_reported = percent;
            progress(percent);
        }
    }

    // Every 100 compilation units is a meaningful checkpoint even when
    // the output carries no [X/Y] markers.
    if line.contains("CC ") || line.contains("LD ") || line.contains("AR ") {
        *cc_line_counter += 1;
        if *cc_line_counter % 100 == 0 {
            log::info!("[{}] Compiling: processed {} files...", label, cc_line_counter);
        }
    }
}
