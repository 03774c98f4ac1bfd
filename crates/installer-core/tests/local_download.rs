//! End-to-end download from a local git repository using the real `git`
//! and `tar` binaries.

use installer_core::{Artifact, InstallerError, RepositoryDownloader};
use std::fs;
use std::path::Path;
use std::process::Command;

const COMPOSER_JSON: &str = "{\n    \"name\": \"acme/app\",\n    \"type\": \"project\"\n}\n";

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

fn git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Installer Tests",
            "-c",
            "user.email=tests@example.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "tag.gpgsign=false",
        ])
        .args(args)
        .current_dir(repo)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Repository with one commit tagged `v1.0.0`
fn fixture_repo() -> tempfile::TempDir {
    let repo = tempfile::tempdir().unwrap();
    git(repo.path(), &["init", "--quiet"]);

    fs::write(repo.path().join("composer.json"), COMPOSER_JSON).unwrap();
    fs::create_dir_all(repo.path().join("web")).unwrap();
    fs::write(repo.path().join("web/index.php"), "<?php\n").unwrap();

    git(repo.path(), &["add", "."]);
    git(repo.path(), &["commit", "--quiet", "-m", "Initial commit"]);
    git(repo.path(), &["tag", "v1.0.0"]);
    repo
}

#[tokio::test]
async fn test_download_tagged_local_repository() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let repo = fixture_repo();
    let dst = tempfile::tempdir().unwrap();

    let version = installer_core::download(&repo.path().to_string_lossy(), "v1.0.0", dst.path())
        .await
        .unwrap();

    assert_eq!(version, "v1.0.0");
    assert_eq!(
        fs::read(dst.path().join("composer.json")).unwrap(),
        fs::read(repo.path().join("composer.json")).unwrap()
    );
    assert!(dst.path().join("web/index.php").is_file());
    assert!(!dst.path().join(".git").exists());
}

#[tokio::test]
async fn test_local_head_resolves_short_commit() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let repo = fixture_repo();
    let dst = tempfile::tempdir().unwrap();
    let expected = git(repo.path(), &["rev-parse", "--short", "HEAD"]);

    let uri = format!("file://{}", repo.path().display());
    let artifact = Artifact::from_uri(Some(&uri)).unwrap();
    assert!(artifact.is_local());
    assert!(artifact.is_development());

    let outcome = RepositoryDownloader::new("installer-tests")
        .download(&artifact, dst.path())
        .await
        .unwrap();

    assert_eq!(outcome.version, "develop");
    assert_eq!(outcome.git_ref, expected);
    assert!(dst.path().join("composer.json").is_file());
}

#[tokio::test]
async fn test_local_unknown_tag() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let repo = fixture_repo();
    let dst = tempfile::tempdir().unwrap();

    let err = installer_core::download(&repo.path().to_string_lossy(), "v2.0.0", dst.path())
        .await
        .unwrap_err();

    assert!(matches!(err, InstallerError::RefNotFound { .. }));
    assert!(fs::read_dir(dst.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_local_repository_without_manifest() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let repo = tempfile::tempdir().unwrap();
    git(repo.path(), &["init", "--quiet"]);
    fs::write(repo.path().join("README.md"), "# Not a project\n").unwrap();
    git(repo.path(), &["add", "."]);
    git(repo.path(), &["commit", "--quiet", "-m", "Docs only"]);

    let dst = tempfile::tempdir().unwrap();
    let err = installer_core::download(&repo.path().to_string_lossy(), "HEAD", dst.path())
        .await
        .unwrap_err();

    assert!(matches!(err, InstallerError::InvalidProjectStructure { .. }));
}
