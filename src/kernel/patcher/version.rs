//! Version-string surgery on `scripts/setlocalversion`.
//!
//! Two textual edits against a known line shape: strip the ` -dirty`
//! marker the script would append for a modified tree, and pin the final
//! version-suffix expression to the configured literal suffix so the
//! built kernel reports a stable release string. Both edits match their
//! anchor explicitly and fail with an error naming the missing anchor;
//! neither edit is applied twice, so re-running the mutation reproduces
//! byte-identical output.

use std::fs;
use std::path::PathBuf;

use crate::error::PatchError;
use crate::kernel::patcher::{KernelPatcher, PatchResult};
use crate::kernel::sources::DeviceProfile;

/// Normalization fragment guaranteeing a dirty-free result string even
/// when an upstream change reintroduces the marker at runtime.
pub const NORMALIZE_LINE: &str = r#"res=$(echo "$res" | sed 's/-dirty//g')"#;

/// The final version-suffix expression the literal suffix replaces.
pub const FINAL_ECHO_ANCHOR: &str = r#"echo "$res""#;

/// Apply both edits to one script body.
///
/// # Arguments
/// * `content` - current file body
/// * `suffix` - literal suffix to pin, e.g. "-android14-11-o-g1234"
/// * `file_label` - path used in error messages
///
/// # Returns
/// The mutated body. Feeding the result back in returns it unchanged.
pub fn mutate_setlocalversion(
    content: &str,
    suffix: &str,
    file_label: &str,
) -> Result<String, PatchError> {
    // STEP 1: strip the space-prefixed dirty marker wherever it appears.
    // The normalization fragment's own `-dirty` (no leading space) is
    // deliberately untouched so the edit survives re-runs.
    let stripped = content.replace(" -dirty", "");

    let target_echo = format!("echo \"{}\"", suffix);
    let mut lines: Vec<String> = stripped.lines().map(|l| l.to_string()).collect();

    // Already-pinned file: only make sure the normalization fragment is
    // in place, then hand the body back untouched.
    if let Some(pinned_index) = lines.iter().rposition(|l| l.trim() == target_echo) {
        if !lines.iter().any(|l| l.trim() == NORMALIZE_LINE) {
            lines.insert(pinned_index, NORMALIZE_LINE.to_string());
        }
        return Ok(rebuild(&lines));
    }

    // STEP 2: locate the final suffix expression.
    let mut anchor_index = lines
        .iter()
        .rposition(|l| l.trim() == FINAL_ECHO_ANCHOR)
        .ok_or_else(|| PatchError::AnchorMissing {
            anchor: FINAL_ECHO_ANCHOR.to_string(),
            file: file_label.to_string(),
        })?;

    // STEP 3: insert the normalization fragment before it when missing.
    if !lines.iter().any(|l| l.trim() == NORMALIZE_LINE) {
        lines.insert(anchor_index, NORMALIZE_LINE.to_string());
        anchor_index += 1;
    }

    // STEP 4: replace the anchor with the literal suffix, preserving the
    // anchor line's indentation.
    let indent: String = lines[anchor_index]
        .chars()
        .take_while(|c| c.is_whitespace())
        .collect();
    lines[anchor_index] = format!("{}{}", indent, target_echo);

    Ok(rebuild(&lines))
}

fn rebuild(lines: &[String]) -> String {
    let mut output = lines.join("\n");
    output.push('\n');
    output
}

impl KernelPatcher {
    /// Rewrite every `scripts/setlocalversion` the device profile names.
    ///
    /// A missing script file is fatal - the profile's list is the fixed
    /// set of files this pipeline supports, not a discovery mechanism.
    ///
    /// # Returns
    /// Paths of the files actually rewritten (unchanged files are
    /// skipped to keep mtimes stable).
    pub fn mutate_version_scripts(
        &self,
        profile: &DeviceProfile,
        suffix: &str,
    ) -> PatchResult<Vec<PathBuf>> {
        let mut rewritten = Vec::new();

        for subtree in profile.version_script_dirs {
            let script = self.layout().setlocalversion(subtree);
            let label = script.display().to_string();

            let content = fs::read_to_string(&script)
                .map_err(|_| PatchError::FileNotFound(label.clone()))?;

            let mutated = mutate_setlocalversion(&content, suffix, &label)?;
            if mutated != content {
                fs::write(&script, &mutated)
                    .map_err(|e| PatchError::PatchFailed(format!("{}: {}", label, e)))?;
                log::info!("[Patcher] [VERSION] Pinned suffix in {}", label);
                rewritten.push(script);
            } else {
                log::info!("[Patcher] [VERSION] {} already pinned", label);
            }
        }

        Ok(rewritten)
    }
}
