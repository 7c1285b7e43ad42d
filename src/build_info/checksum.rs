//! Source tree checksums.

use sha2::{Digest, Sha256};
use std::path::Path;
use walkdir::WalkDir;

/// Number of hex characters kept in the published checksum
pub const CHECKSUM_LENGTH: usize = 7;

/// Files that never contribute to the checksum
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// SHA-256 over every file under `dir`, hex encoded.
///
/// Relative paths and contents are hashed in sorted path order, so the digest
/// only depends on what is in the tree, not on directory iteration order.
pub fn hash_directory(dir: &Path) -> std::io::Result<String> {
    let mut hasher = Sha256::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if IGNORED_FILES
            .iter()
            .any(|ignored| entry.file_name() == std::ffi::OsStr::new(ignored))
        {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let relative: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        hasher.update(relative.join("/").as_bytes());
        hasher.update([0u8]);
        hasher.update(std::fs::read(entry.path())?);
        hasher.update([0u8]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Short checksum of the tree at `dir`
pub fn short_checksum(dir: &Path) -> std::io::Result<String> {
    let mut digest = hash_directory(dir)?;
    digest.truncate(CHECKSUM_LENGTH);
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let temp = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(temp.path().join("react/src")).unwrap();
        fs::write(temp.path().join("react/package.json"), "{}").unwrap();
        fs::write(temp.path().join("react/src/index.js"), "export {};").unwrap();
        temp
    }

    #[test]
    fn test_checksum_is_stable_and_short() {
        let temp = tree();
        let first = short_checksum(temp.path()).unwrap();
        let second = short_checksum(temp.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), CHECKSUM_LENGTH);
    }

    #[test]
    fn test_checksum_ignores_ds_store() {
        let temp = tree();
        let before = hash_directory(temp.path()).unwrap();
        fs::write(temp.path().join("react/.DS_Store"), "finder junk").unwrap();
        assert_eq!(before, hash_directory(temp.path()).unwrap());
    }

    #[test]
    fn test_checksum_changes_with_content_and_paths() {
        let temp = tree();
        let before = hash_directory(temp.path()).unwrap();

        fs::write(temp.path().join("react/src/index.js"), "export default 1;").unwrap();
        let edited = hash_directory(temp.path()).unwrap();
        assert_ne!(before, edited);

        fs::rename(
            temp.path().join("react/src/index.js"),
            temp.path().join("react/src/main.js"),
        )
        .unwrap();
        assert_ne!(edited, hash_directory(temp.path()).unwrap());
    }
}
