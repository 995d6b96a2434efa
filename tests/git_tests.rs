//! Integration tests for companion repository management.

use gkibuild::kernel::git::GitManager;
use gkibuild::models::ksu_version;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn commit_file(repo: &git2::Repository, name: &str, message: &str) {
    let workdir = repo.workdir().expect("workdir");
    fs::write(workdir.join(name), message).expect("write file");

    let mut index = repo.index().expect("index");
    index.add_path(Path::new(name)).expect("add path");
    index.write().expect("write index");
    let tree_id = index.write_tree().expect("write tree");
    let tree = repo.find_tree(tree_id).expect("find tree");
    let sig =
        git2::Signature::now("Test User", "test@example.com").expect("signature");

    let parent = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .and_then(|oid| repo.find_commit(oid).ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .expect("commit");
}

#[test]
fn test_clone_commit_count_and_version() {
    let temp = tempdir().expect("tempdir");
    let source_path = temp.path().join("source");
    let clone_path = temp.path().join("clone");

    // 1. Create a local source repository with three commits
    let repo = git2::Repository::init(&source_path).expect("init source repo");
    commit_file(&repo, "README.md", "initial commit");
    commit_file(&repo, "kernel.c", "add kernel");
    commit_file(&repo, "susfs.c", "add susfs");

    // 2. Clone and count
    let url = source_path.to_str().unwrap();
    let manager = GitManager::clone_or_reuse(url, None, &clone_path).expect("clone");
    assert!(clone_path.join(".git").exists());
    assert!(clone_path.join("README.md").exists());

    let count = manager.commit_count().expect("commit count");
    assert_eq!(count, 3);

    // 3. The derived version number applies the fixed offset
    assert_eq!(ksu_version(count), 10703);

    // 4. HEAD hash is a full object id
    let head = manager.get_head_commit().expect("head");
    assert_eq!(head.len(), 40);
}

#[test]
fn test_reclone_reuses_existing_checkout() {
    let temp = tempdir().expect("tempdir");
    let source_path = temp.path().join("source");
    let clone_path = temp.path().join("clone");

    let repo = git2::Repository::init(&source_path).expect("init source repo");
    commit_file(&repo, "README.md", "initial commit");

    let url = source_path.to_str().unwrap();
    GitManager::clone_or_reuse(url, None, &clone_path).expect("first clone");

    // A marker file survives the second acquisition: nothing is wiped
    fs::write(clone_path.join("marker"), "keep me").unwrap();
    let manager = GitManager::clone_or_reuse(url, None, &clone_path).expect("reuse");
    assert!(clone_path.join("marker").exists());
    assert_eq!(manager.commit_count().expect("count"), 1);
}

#[test]
fn test_manager_for_missing_path_is_lazy() {
    // Opening happens on first use, so construction for a path that does
    // not exist yet must succeed.
    let manager = GitManager::new("/tmp/gkibuild-nonexistent-checkout");
    assert!(manager.is_ok());
}
