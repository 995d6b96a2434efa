//! Integration tests for AnyKernel3 packaging: staging contents,
//! exclusion filtering, and archive naming.

use gkibuild::kernel::packager::{
    archive_name, stage_template, suffix_tag, EXCLUDED_TEMPLATE_ENTRIES,
};
use std::fs;

fn fake_template(root: &std::path::Path) -> std::path::PathBuf {
    let template = root.join("AnyKernel3");
    fs::create_dir_all(template.join(".git/objects")).unwrap();
    fs::create_dir_all(template.join(".github/workflows")).unwrap();
    fs::create_dir_all(template.join("META-INF/com/google/android")).unwrap();
    fs::create_dir_all(template.join("tools")).unwrap();

    fs::write(template.join(".git/HEAD"), "ref: refs/heads/master").unwrap();
    fs::write(template.join(".github/workflows/ci.yml"), "on: push").unwrap();
    fs::write(template.join("anykernel.sh"), "# AnyKernel3 installer").unwrap();
    fs::write(
        template.join("META-INF/com/google/android/update-binary"),
        "#!/sbin/sh",
    )
    .unwrap();
    fs::write(template.join("tools/magiskboot"), "ELF").unwrap();
    fs::write(template.join("LICENSE"), "GPL-3.0").unwrap();
    fs::write(template.join("README.md"), "# AnyKernel3").unwrap();
    fs::write(template.join("push.sh"), "#!/bin/sh").unwrap();
    template
}

#[test]
fn staging_is_template_minus_exclusions_plus_image() {
    let temp = tempfile::tempdir().expect("tempdir");
    let template = fake_template(temp.path());

    let image = temp.path().join("Image");
    fs::write(&image, b"\x1f\x8b-kernel-image").unwrap();

    let staging = temp.path().join("pkg/AnyKernel3");
    stage_template(&template, &image, &staging).expect("stage");

    // Template payload is present
    assert!(staging.join("anykernel.sh").is_file());
    assert!(staging
        .join("META-INF/com/google/android/update-binary")
        .is_file());
    assert!(staging.join("tools/magiskboot").is_file());

    // Image landed at the skeleton root with identical bytes
    assert_eq!(
        fs::read(staging.join("Image")).unwrap(),
        fs::read(&image).unwrap()
    );

    // Every excluded entry is gone
    for excluded in EXCLUDED_TEMPLATE_ENTRIES {
        assert!(
            !staging.join(excluded).exists(),
            "{} must not ship in the archive",
            excluded
        );
    }
}

#[test]
fn archive_name_matches_required_pattern() {
    let name = archive_name(11934, "gki-android14-6.1", "-android14-11-o-gdcf0a99f7a21");
    assert_eq!(
        name,
        "AnyKernel3_11934_gki-android14-6.1_android14-11-o-gdcf0a99f7a21.zip"
    );
    assert!(name.starts_with("AnyKernel3_"));
    assert!(name.ends_with(".zip"));
}

#[test]
fn suffix_tag_drops_only_the_leading_dash() {
    assert_eq!(suffix_tag("-android15-8-gabc"), "android15-8-gabc");
    assert_eq!(suffix_tag("--double"), "double");
    assert_eq!(suffix_tag("plain"), "plain");
}

#[test]
fn staging_twice_produces_identical_trees() {
    let temp = tempfile::tempdir().expect("tempdir");
    let template = fake_template(temp.path());
    let image = temp.path().join("Image");
    fs::write(&image, b"kernel").unwrap();

    let staging = temp.path().join("pkg/AnyKernel3");
    stage_template(&template, &image, &staging).expect("first");
    let first: Vec<_> = walk(&staging);

    stage_template(&template, &image, &staging).expect("second");
    let second: Vec<_> = walk(&staging);

    assert_eq!(first, second);
}

fn walk(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut paths = Vec::new();
    fn inner(root: &std::path::Path, dir: &std::path::Path, out: &mut Vec<std::path::PathBuf>) {
        for entry in fs::read_dir(dir).expect("read_dir") {
            let path = entry.expect("entry").path();
            if path.is_dir() {
                inner(root, &path, out);
            } else {
                out.push(path.strip_prefix(root).unwrap().to_path_buf());
            }
        }
    }
    inner(root, root, &mut paths);
    paths.sort();
    paths
}
