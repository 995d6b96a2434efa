//! Integration test suite for the configuration selection layer and
//! the flag-gated defconfig block.
//!
//! Covers:
//! - Selection precedence (CLI flags over mode answers over defaults)
//! - CI environment parsing
//! - Validation of device, suffix, manifest and jobs
//! - Defconfig block contents for every feature-flag combination

use gkibuild::config::{ci, select, SelectionMode, SelectionOverrides};
use gkibuild::error::ConfigError;
use gkibuild::kernel::patcher::kconfig::{defconfig_block, KPM_CONFIG, LZ4KD_CONFIGS};
use gkibuild::models::CleanupPolicy;
use std::collections::HashMap;

#[test]
fn fixed_mode_yields_defaults() {
    let config = select(SelectionMode::Fixed, SelectionOverrides::default(), false)
        .expect("fixed selection");
    assert_eq!(config.device, "gki-android14-6.1");
    assert_eq!(config.manifest, "default.xml");
    assert!(!config.enable_kpm);
    assert!(!config.enable_lz4kd);
    assert_eq!(config.cleanup, CleanupPolicy::Keep);
}

#[test]
fn cli_flags_beat_defaults() {
    let cli = SelectionOverrides {
        device: Some("gki-android12-5.10".to_string()),
        kernel_suffix: Some("-android12-9-gfeed".to_string()),
        enable_lz4kd: Some(true),
        jobs: Some(4),
        ..Default::default()
    };
    let config = select(SelectionMode::Fixed, cli, false).expect("selection");
    assert_eq!(config.device, "gki-android12-5.10");
    assert_eq!(config.kernel_suffix, "-android12-9-gfeed");
    assert!(config.enable_lz4kd);
    assert_eq!(config.jobs, 4);
}

#[test]
fn ci_lookup_fills_unset_fields() {
    let mut vars = HashMap::new();
    vars.insert(ci::ENV_DEVICE, "gki-android15-6.6");
    vars.insert(ci::ENV_KPM, "true");
    vars.insert(ci::ENV_LZ4KD, "true");

    let from_ci = ci::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
    assert_eq!(from_ci.device.as_deref(), Some("gki-android15-6.6"));
    assert_eq!(from_ci.enable_kpm, Some(true));
    assert_eq!(from_ci.enable_lz4kd, Some(true));

    // CLI still wins over the CI answers
    let cli = SelectionOverrides {
        enable_kpm: Some(false),
        ..Default::default()
    };
    let merged = cli.overlay(from_ci);
    assert_eq!(merged.enable_kpm, Some(false));
    assert_eq!(merged.enable_lz4kd, Some(true));
}

#[test]
fn unknown_device_is_rejected() {
    let cli = SelectionOverrides {
        device: Some("gki-android99-9.9".to_string()),
        ..Default::default()
    };
    match select(SelectionMode::Fixed, cli, false) {
        Err(ConfigError::UnknownDevice(name)) => assert_eq!(name, "gki-android99-9.9"),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn malformed_suffix_is_rejected() {
    let cli = SelectionOverrides {
        kernel_suffix: Some("no-leading-dash".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        select(SelectionMode::Fixed, cli, false),
        Err(ConfigError::InvalidSuffix(_))
    ));
}

#[test]
fn defconfig_block_gating_matrix() {
    // For all supported flag values, the generated content includes
    // exactly the flag-gated lines when enabled and omits them when
    // disabled.
    for (kpm, lz4kd) in [(false, false), (true, false), (false, true), (true, true)] {
        let block = defconfig_block(kpm, lz4kd);

        assert_eq!(
            block.contains(&KPM_CONFIG),
            kpm,
            "KPM line gating broken for kpm={}",
            kpm
        );
        for line in LZ4KD_CONFIGS {
            assert_eq!(
                block.contains(line),
                lz4kd,
                "LZ4KD line {} gating broken for lz4kd={}",
                line,
                lz4kd
            );
        }

        // The KernelSU base block is unconditional
        assert!(block.contains(&"CONFIG_KSU=y"));
    }
}

#[test]
fn defconfig_block_is_deterministic() {
    assert_eq!(defconfig_block(true, true), defconfig_block(true, true));
    assert_eq!(defconfig_block(false, false), defconfig_block(false, false));
}
