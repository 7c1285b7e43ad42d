//! Package built artifacts and unpack them again to prove packaging integrity.
//!
//! Each package under `build/node_modules` is written to a gzip tarball with
//! its files under `package/`, the same layout `npm pack` produces. The
//! tarball is extracted into `build/unpacked` and compared file by file
//! against the built package.

use crate::context::BuildContext;
use crate::error::StageError;
use crate::pipeline::Stage;
use async_trait::async_trait;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory inside each tarball holding the package files
pub const TARBALL_ROOT: &str = "package";

/// A built package found in the build output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPackage {
    /// Package name, including any `@scope/` prefix
    pub name: String,
    /// Directory holding the built files
    pub dir: PathBuf,
}

impl BuiltPackage {
    /// File-system friendly name: `@scope/pkg` becomes `scope-pkg`
    pub fn file_stem(&self) -> String {
        self.name.trim_start_matches('@').replace('/', "-")
    }
}

/// Packs and verifies every built package
#[derive(Debug, Clone, Copy, Default)]
pub struct PackAndUnpack;

impl PackAndUnpack {
    /// Create a new pack/unpack verifier
    pub fn new() -> Self {
        Self
    }
}

fn sorted_dirs(dir: &Path) -> Result<Vec<PathBuf>, StageError> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| StageError::io(dir, e))? {
        let path = entry.map_err(|e| StageError::io(dir, e))?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Packages in `build_dir`, descending one level into `@scope` directories
pub fn discover_packages(build_dir: &Path) -> Result<Vec<BuiltPackage>, StageError> {
    let mut packages = Vec::new();
    for dir in sorted_dirs(build_dir)? {
        let name = dir_name(&dir);
        if name.starts_with('@') {
            for scoped in sorted_dirs(&dir)? {
                packages.push(BuiltPackage {
                    name: format!("{}/{}", name, dir_name(&scoped)),
                    dir: scoped,
                });
            }
        } else {
            packages.push(BuiltPackage { name, dir });
        }
    }
    Ok(packages)
}

/// Write `package` into a gzip tarball at `tarball`
pub fn pack(package: &BuiltPackage, tarball: &Path) -> Result<(), StageError> {
    if let Some(parent) = tarball.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StageError::io(parent, e))?;
    }
    let file = File::create(tarball).map_err(|e| StageError::io(tarball, e))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder
        .append_dir_all(TARBALL_ROOT, &package.dir)
        .map_err(|e| StageError::io(&package.dir, e))?;
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|e| StageError::io(tarball, e))?;
    Ok(())
}

/// Extract `tarball` into a fresh `dest`
pub fn unpack(tarball: &Path, dest: &Path) -> Result<(), StageError> {
    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(|e| StageError::io(dest, e))?;
    }
    std::fs::create_dir_all(dest).map_err(|e| StageError::io(dest, e))?;
    let file = File::open(tarball).map_err(|e| StageError::io(tarball, e))?;
    tar::Archive::new(GzDecoder::new(file))
        .unpack(dest)
        .map_err(|e| StageError::io(tarball, e))
}

/// SHA-256 of every file under `root`, keyed by `/`-separated relative path.
///
/// Symlinks are followed, matching what `tar::Builder` archives.
pub fn file_digests(root: &Path) -> Result<BTreeMap<String, String>, StageError> {
    let mut digests = BTreeMap::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| StageError::io(root, e.into()))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| StageError::Other(e.into()))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let bytes = std::fs::read(entry.path()).map_err(|e| StageError::io(entry.path(), e))?;
        digests.insert(relative, hex::encode(Sha256::digest(&bytes)));
    }
    Ok(digests)
}

/// Compare a built package against its unpacked copy
pub fn verify_round_trip(package: &BuiltPackage, unpacked: &Path) -> Result<(), StageError> {
    let mismatch = |reason: String| StageError::Verification {
        package: package.name.clone(),
        reason,
    };

    let expected = file_digests(&package.dir)?;
    let actual = file_digests(unpacked)?;

    if let Some(missing) = expected.keys().find(|path| !actual.contains_key(*path)) {
        return Err(mismatch(format!("'{missing}' missing from the packed archive")));
    }
    if let Some(extra) = actual.keys().find(|path| !expected.contains_key(*path)) {
        return Err(mismatch(format!("unexpected '{extra}' in the packed archive")));
    }
    if let Some((path, _)) = expected.iter().find(|(path, digest)| actual[*path] != **digest) {
        return Err(mismatch(format!("'{path}' differs after unpacking")));
    }
    Ok(())
}

/// Pack and verify every package built for `ctx`; returns the tarballs written
pub fn pack_and_verify(ctx: &BuildContext) -> Result<Vec<PathBuf>, StageError> {
    let build_dir = ctx.build_output_dir();
    let packed_dir = ctx.temp_directory.join("build").join("packed");
    let unpacked_dir = ctx.temp_directory.join("build").join("unpacked");

    let packages = discover_packages(&build_dir)?;
    if packages.is_empty() {
        return Err(StageError::Verification {
            package: "*".to_string(),
            reason: format!("no packages found in {}", build_dir.display()),
        });
    }

    let mut stems: HashMap<String, &str> = HashMap::new();
    for package in &packages {
        if let Some(other) = stems.insert(package.file_stem(), &package.name) {
            return Err(StageError::Verification {
                package: package.name.clone(),
                reason: format!(
                    "archive name '{}' is also used by '{}'",
                    package.file_stem(),
                    other
                ),
            });
        }
    }

    let mut tarballs = Vec::with_capacity(packages.len());
    for package in &packages {
        let stem = package.file_stem();
        let tarball = packed_dir.join(format!("{}-{}.tgz", stem, ctx.version));
        let dest = unpacked_dir.join(&stem);

        pack(package, &tarball)?;
        unpack(&tarball, &dest)?;
        verify_round_trip(package, &dest.join(TARBALL_ROOT))?;

        log::debug!("Verified {} -> {}", package.name, tarball.display());
        tarballs.push(tarball);
    }
    Ok(tarballs)
}

#[async_trait]
impl Stage for PackAndUnpack {
    async fn run(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let ctx = ctx.clone();
        let tarballs = tokio::task::spawn_blocking(move || pack_and_verify(&ctx))
            .await
            .map_err(|e| StageError::Other(e.into()))??;
        log::info!("Packed and verified {} package(s)", tarballs.len());
        Ok(())
    }
}
