//! Pipeline-level integration tests: phase graph, dry-run behavior,
//! and the derived-version property.

use gkibuild::kernel::patcher::steps::build_steps;
use gkibuild::kernel::sources::DeviceDb;
use gkibuild::models::{ksu_version, BuildConfig, KSU_VERSION_OFFSET};
use gkibuild::orchestrator::{BuildOutcome, Orchestrator, PipelinePhase};
use proptest::prelude::*;

#[test]
fn phase_graph_is_forward_only_with_terminal_failed() {
    let order = [
        PipelinePhase::Preparation,
        PipelinePhase::Sync,
        PipelinePhase::Patching,
        PipelinePhase::Configuration,
        PipelinePhase::Building,
        PipelinePhase::PostPatch,
        PipelinePhase::Packaging,
        PipelinePhase::Completed,
    ];

    for (index, phase) in order.iter().enumerate() {
        // The one legal forward edge
        if let Some(next) = order.get(index + 1) {
            assert!(phase.can_transition_to(*next));
        }
        // No backward edges at all
        for earlier in &order[..index] {
            assert!(
                !phase.can_transition_to(*earlier),
                "{} must not return to {}",
                phase.as_str(),
                earlier.as_str()
            );
        }
    }

    assert!(PipelinePhase::Failed.valid_next_phases().is_empty());
}

#[tokio::test]
async fn dry_run_with_both_features_off_skips_optional_work() {
    // End-to-end scenario from the contract: with KPM and LZ4KD both
    // disabled, the plan carries no compression steps and the KPM
    // post-patch is a no-op. The plan is the 8 unconditional steps.
    let temp = tempfile::tempdir().expect("tempdir");
    let mut config = BuildConfig::default();
    config.workspace = temp.path().join("ws");
    config.dry_run = true;
    config.enable_kpm = false;
    config.enable_lz4kd = false;

    let db = DeviceDb::new();
    let profile = db.get(&config.device).unwrap();
    let plan = build_steps(profile, &config);
    assert!(plan.iter().all(|s| !s.name.contains("lz4k")));

    let mut orchestrator = Orchestrator::new(config).expect("orchestrator");
    match orchestrator.run().await.expect("dry run") {
        BuildOutcome::DryRun { planned_steps } => assert_eq!(planned_steps, plan.len()),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn enabling_lz4kd_grows_the_plan_only_with_lz4kd_steps() {
    let db = DeviceDb::new();
    let mut config = BuildConfig::default();
    let profile = db.get(&config.device).unwrap();

    let base = build_steps(profile, &config);
    config.enable_lz4kd = true;
    let grown = build_steps(profile, &config);

    assert!(grown.len() > base.len());
    let extra: Vec<_> = grown
        .iter()
        .filter(|s| !base.iter().any(|b| b.name == s.name))
        .collect();
    assert!(extra.iter().all(|s| s.name.contains("lz4k")));
}

proptest! {
    #[test]
    fn version_number_is_commit_count_plus_offset(count in 0u32..1_000_000) {
        prop_assert_eq!(ksu_version(count), count + KSU_VERSION_OFFSET);
        prop_assert!(ksu_version(count) >= KSU_VERSION_OFFSET);
    }

    #[test]
    fn suffix_mutation_idempotent_for_arbitrary_suffixes(
        tag in "[a-z0-9][a-z0-9.-]{0,20}"
    ) {
        use gkibuild::kernel::patcher::version::mutate_setlocalversion;

        let body = "#!/bin/sh\nres=\"${KERNELVERSION}\"\necho \"$res\"\n";
        let suffix = format!("-{}", tag);
        let once = mutate_setlocalversion(body, &suffix, "t").unwrap();
        let twice = mutate_setlocalversion(&once, &suffix, "t").unwrap();
        prop_assert_eq!(once, twice);
    }
}
