//! Filesystem operations
//!
//! Directory resets, tree fingerprints and symlink-preserving copies used by
//! the pipeline and the universal merge.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::FilesystemError;

/// Relative path to content fingerprint, for one output tree
pub type FingerprintMap = BTreeMap<PathBuf, String>;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Remove a directory if present and recreate it empty
pub fn reset_dir(path: &Path) -> Result<(), FilesystemError> {
    remove_dir_all(path)?;
    create_dir_all(path)
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// SHA-256 of a file's content, hex encoded
pub fn sha256_file(path: &Path) -> Result<String, FilesystemError> {
    let read_error = |e: std::io::Error| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    };
    let mut reader = BufReader::new(File::open(path).map_err(read_error)?);
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher).map_err(read_error)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Fingerprint every file and symlink below `root`.
///
/// Symlinks are not followed; they are fingerprinted by their target so two
/// links are equal exactly when they point to the same place. Directories
/// carry no fingerprint of their own.
pub fn fingerprint_tree(root: &Path) -> Result<FingerprintMap, FilesystemError> {
    let mut map = FingerprintMap::new();

    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| FilesystemError::Walk {
            path: root.to_path_buf(),
            error: e.to_string(),
        })?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let relative = relative_to(root, entry.path())?;
        let fingerprint = if file_type.is_symlink() {
            let target = read_link(entry.path())?;
            format!("symlink:{}", target.display())
        } else {
            sha256_file(entry.path())?
        };
        map.insert(relative, fingerprint);
    }

    Ok(map)
}

/// Copy the tree below `src` into `dest`, skipping `excluded` relative paths.
///
/// Symlinks are recreated rather than followed and file permissions are
/// preserved. Returns the number of files and links copied.
pub fn copy_tree(
    src: &Path,
    dest: &Path,
    excluded: &BTreeSet<PathBuf>,
) -> Result<usize, FilesystemError> {
    create_dir_all(dest)?;
    let mut copied = 0;

    for entry in WalkDir::new(src).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| FilesystemError::Walk {
            path: src.to_path_buf(),
            error: e.to_string(),
        })?;
        let relative = relative_to(src, entry.path())?;
        if excluded.contains(&relative) {
            continue;
        }

        let target = dest.join(&relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            copied += 1;
        } else {
            copy_file(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Copy one regular file, creating parent directories
pub fn copy_file(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::copy(from, to).map_err(|e| FilesystemError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(())
}

fn copy_symlink(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    let link_target = read_link(from)?;
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    make_symlink(&link_target, to).map_err(|e| FilesystemError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        error: e.to_string(),
    })
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn make_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    let resolved = link.parent().map_or_else(|| target.to_path_buf(), |p| p.join(target));
    std::fs::copy(resolved, link).map(|_| ())
}

fn read_link(path: &Path) -> Result<PathBuf, FilesystemError> {
    std::fs::read_link(path).map_err(|e| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

fn relative_to(root: &Path, path: &Path) -> Result<PathBuf, FilesystemError> {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(|e| FilesystemError::Walk {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(files: &[(&str, &str)]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for (path, content) in files {
            write_file(&temp.path().join(path), content).unwrap();
        }
        temp
    }

    #[test]
    fn test_reset_dir_empties_directory() {
        let temp = tree(&[("work/zlib/Makefile", "all:")]);
        let dir = temp.path().join("work/zlib");

        reset_dir(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_reset_dir_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a/b");
        reset_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_fingerprint_tree_keys_relative_files() {
        let temp = tree(&[("bin/tool", "x"), ("lib/libz.a", "y"), ("share/doc/README", "z")]);
        std::fs::create_dir_all(temp.path().join("empty")).unwrap();

        let map = fingerprint_tree(temp.path()).unwrap();

        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                PathBuf::from("bin/tool"),
                PathBuf::from("lib/libz.a"),
                PathBuf::from("share/doc/README"),
            ]
        );
    }

    #[test]
    fn test_fingerprint_reflects_content() {
        let a = tree(&[("f", "same"), ("g", "one")]);
        let b = tree(&[("f", "same"), ("g", "two")]);

        let ma = fingerprint_tree(a.path()).unwrap();
        let mb = fingerprint_tree(b.path()).unwrap();

        assert_eq!(ma[Path::new("f")], mb[Path::new("f")]);
        assert_ne!(ma[Path::new("g")], mb[Path::new("g")]);
    }

    #[test]
    fn test_sha256_file_known_value() {
        let temp = tree(&[("abc", "abc")]);
        assert_eq!(
            sha256_file(&temp.path().join("abc")).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_fingerprinted_by_target_and_copied_as_links() {
        let src = tree(&[("lib/libz.so.1.2.5", "elf")]);
        std::os::unix::fs::symlink("libz.so.1.2.5", src.path().join("lib/libz.so")).unwrap();

        let map = fingerprint_tree(src.path()).unwrap();
        assert_eq!(map[Path::new("lib/libz.so")], "symlink:libz.so.1.2.5");

        let dest = TempDir::new().unwrap();
        copy_tree(src.path(), dest.path(), &BTreeSet::new()).unwrap();

        let link = dest.path().join("lib/libz.so");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_link(link).unwrap(), PathBuf::from("libz.so.1.2.5"));
    }

    #[test]
    fn test_copy_tree_skips_excluded_paths() {
        use assert_fs::prelude::*;
        use predicates::prelude::*;

        let src = assert_fs::TempDir::new().unwrap();
        src.child("include/zlib.h").write_str("h").unwrap();
        src.child("lib/libz.a").write_str("a").unwrap();
        src.child("lib/libz.la").write_str("la").unwrap();
        let dest = assert_fs::TempDir::new().unwrap();
        let excluded = BTreeSet::from([PathBuf::from("lib/libz.a")]);

        let copied = copy_tree(src.path(), dest.path(), &excluded).unwrap();

        assert_eq!(copied, 2);
        dest.child("include/zlib.h").assert("h");
        dest.child("lib/libz.la").assert(predicate::path::is_file());
        dest.child("lib/libz.a").assert(predicate::path::missing());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let src = tree(&[("bin/tool", "#!/bin/sh\n")]);
        let tool = src.path().join("bin/tool");
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let dest = TempDir::new().unwrap();
        copy_tree(src.path(), dest.path(), &BTreeSet::new()).unwrap();

        let mode = std::fs::metadata(dest.path().join("bin/tool"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
