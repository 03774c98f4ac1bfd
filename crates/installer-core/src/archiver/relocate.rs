//! Moving extracted trees into place

use crate::error::{InstallerError, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Move every entry of `src` into `dst`, merging into directories that
/// already exist and replacing files of the same name.
///
/// Entries are renamed when possible; across filesystems they are copied
/// with symlinks recreated as symlinks.
pub fn move_contents(src: &Path, dst: &Path) -> Result<()> {
    let entries = fs::read_dir(src)
        .map_err(|e| InstallerError::io(format!("Failed to read {}", src.display()), e))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| InstallerError::io(format!("Failed to read {}", src.display()), e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| InstallerError::io(format!("Failed to stat {}", from.display()), e))?;

        if let Ok(existing) = fs::symlink_metadata(&to) {
            if existing.is_dir() && file_type.is_dir() {
                move_contents(&from, &to)?;
                continue;
            }
            remove_path(&to, existing.is_dir())?;
        }

        if fs::rename(&from, &to).is_err() {
            copy_tree(&from, &to)?;
        }
    }

    Ok(())
}

fn remove_path(path: &Path, is_dir: bool) -> Result<()> {
    let result = if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| InstallerError::io(format!("Failed to replace {}", path.display()), e))
}

/// Recursively copy `src` to `dst` without following symlinks
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            InstallerError::io(
                format!("Failed to walk {}", src.display()),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("walk error")),
            )
        })?;

        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);
        let file_type = entry.file_type();

        let result = if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)
        } else if file_type.is_dir() {
            fs::create_dir_all(&target)
        } else {
            fs::copy(entry.path(), &target).map(|_| ())
        };

        result.map_err(|e| {
            InstallerError::io(
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                ),
                e,
            )
        })?;
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    let points_to = fs::read_link(link)?;
    std::os::unix::fs::symlink(points_to, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    fs::copy(link, target).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_contents_merges_directories() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        fs::create_dir_all(src.path().join("web/themes")).unwrap();
        fs::write(src.path().join("composer.json"), "{}").unwrap();
        fs::write(src.path().join("web/themes/theme.info"), "new").unwrap();

        fs::create_dir_all(dst.path().join("web")).unwrap();
        fs::write(dst.path().join("web/keep.txt"), "keep").unwrap();
        fs::write(dst.path().join("composer.json"), "old").unwrap();

        move_contents(src.path(), dst.path()).unwrap();

        assert_eq!(
            fs::read_to_string(dst.path().join("composer.json")).unwrap(),
            "{}"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("web/themes/theme.info")).unwrap(),
            "new"
        );
        assert!(dst.path().join("web/keep.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_preserves_symlinks() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        fs::create_dir(src.path().join("docroot")).unwrap();
        fs::write(src.path().join("docroot/index.php"), "<?php").unwrap();
        std::os::unix::fs::symlink("docroot", src.path().join("web")).unwrap();

        let target = dst.path().join("copy");
        copy_tree(src.path(), &target).unwrap();

        let link = target.join("web");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("docroot"));
        assert_eq!(
            fs::read_to_string(target.join("docroot/index.php")).unwrap(),
            "<?php"
        );
    }
}
