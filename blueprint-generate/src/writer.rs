//! Atomic per-file writer.
//!
//! ## Protocol
//!
//! 1. Create the parent directory (already existing is fine).
//! 2. Write the content to a uniquely named `.<name>.XXXXXX.blueprint.tmp`
//!    file in the same directory, created exclusively so no existing file is
//!    ever reused.
//! 3. `sync_all` the temp file.
//! 4. Rename it over the final path (atomic on POSIX).
//!
//! A failure at any step removes the temp file; a pre-existing file at the
//! final path is never truncated.

use std::io::Write;
use std::path::Path;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::{write_err, GenerateError};

/// Suffix of the temp files created during a write.
pub const TMP_SUFFIX: &str = ".blueprint.tmp";

/// Hex SHA-256 of `content`.
pub fn sha256_hex(content: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(content);
    hex::encode(h.finalize())
}

/// Atomically write `content` to `path`.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), GenerateError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;

    let tmp = write_synced(path, parent, content).map_err(|e| write_err(parent, e))?;

    // Dropping the returned handle on failure deletes the temp file.
    tmp.persist(path).map_err(|e| write_err(path, e.error))?;

    tracing::info!("wrote: {}", path.display());
    Ok(())
}

fn write_synced(path: &Path, dir: &Path, content: &[u8]) -> std::io::Result<NamedTempFile> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(TMP_SUFFIX)
        .tempfile_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn writes_content_and_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("svc").join("cmd").join("main.go");
        atomic_write(&path, b"package main\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "package main\n");
    }

    #[test]
    fn temp_file_removed_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.go");
        atomic_write(&path, b"data").unwrap();
        assert_eq!(names_in(tmp.path()), ["clean.go"]);
    }

    #[test]
    fn overwrites_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("go.mod");
        fs::write(&path, "old").unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn sibling_with_temp_suffix_is_untouched() {
        let tmp = TempDir::new().unwrap();
        let user_file = tmp.path().join(format!("main.go{TMP_SUFFIX}"));
        fs::write(&user_file, "user data").unwrap();

        atomic_write(&tmp.path().join("main.go"), b"package main\n").unwrap();

        assert_eq!(fs::read_to_string(&user_file).unwrap(), "user data");
        assert_eq!(names_in(tmp.path()), ["main.go", "main.go.blueprint.tmp"]);
    }

    #[test]
    fn digest_is_stable_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(sha256_hex(b"abc"), sha256_hex(b"abc"));
    }

    #[test]
    fn rename_onto_directory_fails_and_cleans_tmp() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("occupied");
        fs::create_dir_all(path.join("child")).unwrap();

        let err = atomic_write(&path, b"content").unwrap_err();
        assert!(matches!(err, GenerateError::WriteFailed { .. }));
        assert!(path.is_dir(), "existing directory must be left alone");
        assert_eq!(names_in(root.path()), ["occupied"]);
    }

    #[test]
    #[cfg(unix)]
    fn readonly_dir_leaves_original_and_no_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();

        let path = readonly_dir.join("main.go");
        fs::write(&path, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Privileged users ignore directory permissions.
        if fs::write(readonly_dir.join("check"), "").is_ok() {
            return;
        }

        let result = atomic_write(&path, b"new content");

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let err = result.expect_err("write should fail on readonly dir");
        assert!(matches!(err, GenerateError::WriteFailed { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
        assert_eq!(names_in(&readonly_dir), ["main.go"]);
    }
}
