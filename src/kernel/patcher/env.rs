//! Environment preparation and toolchain discovery for kernel builds.
//!
//! This module encapsulates all environment variable setup and toolchain
//! discovery for the cross-compile invocation:
//! 1. LLVM/Clang compiler enforcement (CC=clang, LLVM=1, LLVM_IAS=1)
//! 2. arm64 cross toolchain selection (ARCH, CROSS_COMPILE)
//! 3. Linker enforcement (LD=ld.lld, HOSTLD=ld.lld)
//! 4. Rust-for-Linux and BTF tool paths (RUSTC, PAHOLE)
//! 5. PATH purification to prevent stray compiler interference
//! 6. ccache routing into the reusable cache directory
//!
//! The executor receives this map fully prepared and applies it to the
//! spawned process; it never derives environment state on its own.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use crate::system::cache;
use crate::system::purify_path;

/// Find a toolchain binary in PATH, preferring the LLVM variant
///
/// Searches for the binary in this order:
/// 1. LLVM variant (e.g., llvm-strip for strip)
/// 2. Standard /usr/bin location
/// 3. Just the command name (rely on PATH)
///
/// Returns the resolved command name to use
pub fn find_toolchain_binary(name: &str) -> String {
    let llvm_variant = format!("llvm-{}", name);
    if Command::new(&llvm_variant)
        .arg("--version")
        .output()
        .is_ok()
    {
        log::debug!("[Patcher] [TOOLCHAIN] Found LLVM variant: {}", llvm_variant);
        return llvm_variant;
    }

    let standard_path = format!("/usr/bin/{}", name);
    if Path::new(&standard_path).exists() {
        log::debug!(
            "[Patcher] [TOOLCHAIN] Found at standard location: {}",
            standard_path
        );
        return standard_path;
    }

    log::debug!("[Patcher] [TOOLCHAIN] Using {} from PATH", name);
    name.to_string()
}

/// Prepare the purified build environment for the cross-compile.
///
/// # Arguments
/// * `cache_dir` - initialized compiler-cache directory
///
/// # Returns
/// HashMap of environment variable names to values, ready to hand to the
/// executor verbatim.
pub fn prepare_build_environment(cache_dir: &Path) -> HashMap<String, String> {
    let mut env_vars = HashMap::new();

    // ========================================================================
    // CLANG/LLVM ENFORCEMENT + ARM64 CROSS TOOLCHAIN
    // ========================================================================
    env_vars.insert("LLVM".to_string(), "1".to_string());
    env_vars.insert("LLVM_IAS".to_string(), "1".to_string());
    env_vars.insert("ARCH".to_string(), "arm64".to_string());
    env_vars.insert("SUBARCH".to_string(), "arm64".to_string());
    env_vars.insert(
        "CROSS_COMPILE".to_string(),
        "aarch64-linux-gnu-".to_string(),
    );
    env_vars.insert("CC".to_string(), "clang".to_string());
    env_vars.insert("CXX".to_string(), "clang++".to_string());
    env_vars.insert("LD".to_string(), "ld.lld".to_string());
    env_vars.insert("HOSTLD".to_string(), "ld.lld".to_string());
    env_vars.insert("HOSTCC".to_string(), "clang".to_string());
    env_vars.insert("HOSTCXX".to_string(), "clang++".to_string());

    // Rust-for-Linux and BTF generation tools
    env_vars.insert("RUSTC".to_string(), "rustc".to_string());
    env_vars.insert("PAHOLE".to_string(), "pahole".to_string());

    // Binutils replacements, preferring llvm- variants when installed
    env_vars.insert("AR".to_string(), find_toolchain_binary("ar"));
    env_vars.insert("NM".to_string(), find_toolchain_binary("nm"));
    env_vars.insert("STRIP".to_string(), find_toolchain_binary("strip"));
    env_vars.insert("OBJCOPY".to_string(), find_toolchain_binary("objcopy"));
    env_vars.insert("OBJDUMP".to_string(), find_toolchain_binary("objdump"));

    // ========================================================================
    // OPTIMIZATION + REPRODUCIBILITY
    // ========================================================================
    env_vars.insert("KCFLAGS".to_string(), "-O2".to_string());
    // Blank timestamp keeps rebuilds byte-comparable
    env_vars.insert("KBUILD_BUILD_TIMESTAMP".to_string(), "".to_string());
    env_vars.insert("KBUILD_BUILD_USER".to_string(), "gkibuild".to_string());
    env_vars.insert("KBUILD_BUILD_HOST".to_string(), "gkibuild".to_string());

    // ========================================================================
    // CCACHE ROUTING + PATH PURIFICATION
    // ========================================================================
    for (key, value) in cache::cache_env(cache_dir) {
        env_vars.insert(key, value);
    }

    let ccache_bin = Path::new("/usr/lib/ccache");
    let purified = if ccache_bin.exists() {
        purify_path(Some(ccache_bin))
    } else {
        purify_path(None)
    };
    env_vars.insert("PATH".to_string(), purified);

    log::info!("[Patcher] [ENV] Prepared LLVM/Clang arm64 toolchain enforcement");
    env_vars
}
