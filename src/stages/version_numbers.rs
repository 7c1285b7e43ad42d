//! Rewrite version-bearing files in the staging directory.

use crate::context::BuildContext;
use crate::error::StageError;
use crate::pipeline::Stage;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Source file exporting the framework version string
pub const REACT_VERSION_MODULE: &str = "shared/ReactVersion.js";

/// Dependency tables that pin sibling packages
const SIBLING_DEPENDENCY_KEYS: &[&str] = &["dependencies", "peerDependencies"];

/// Sets every staged package to the release version
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionUpdater;

impl VersionUpdater {
    /// Create a new version updater
    pub fn new() -> Self {
        Self
    }
}

fn version_error(path: &Path, reason: impl Into<String>) -> StageError {
    StageError::Version {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn read_json(path: &Path) -> Result<Value, StageError> {
    let content = std::fs::read_to_string(path).map_err(|e| StageError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| version_error(path, format!("Failed to parse JSON: {e}")))
}

/// Set `version` and sibling dependency pins in one package.json.
///
/// Returns the package name so callers can report what changed.
pub fn update_package_json(
    path: &Path,
    version: &str,
    siblings: &HashSet<String>,
) -> Result<String, StageError> {
    let mut manifest = read_json(path)?;
    let object = manifest
        .as_object_mut()
        .ok_or_else(|| version_error(path, "package.json is not an object"))?;

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| version_error(path, "Missing 'name'"))?
        .to_string();

    object.insert("version".to_string(), Value::String(version.to_string()));

    for key in SIBLING_DEPENDENCY_KEYS {
        if let Some(Value::Object(deps)) = object.get_mut(*key) {
            for (dep, range) in deps.iter_mut() {
                if siblings.contains(dep) {
                    *range = Value::String(version.to_string());
                }
            }
        }
    }

    let mut content = serde_json::to_string_pretty(&manifest)
        .map_err(|e| version_error(path, format!("Failed to serialize JSON: {e}")))?;
    content.push('\n');
    std::fs::write(path, content).map_err(|e| StageError::io(path, e))?;

    Ok(name)
}

/// Replace the exported version string in ReactVersion.js
pub fn update_react_version_module(path: &Path, react_version: &str) -> Result<(), StageError> {
    static EXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"export default\s+['"][^'"]*['"];?"#).expect("export regex is valid")
    });

    let source = std::fs::read_to_string(path).map_err(|e| StageError::io(path, e))?;
    if !EXPORT_RE.is_match(&source) {
        return Err(version_error(path, "No 'export default' version string found"));
    }
    let replacement = format!("export default '{react_version}';");
    let updated = EXPORT_RE.replace(&source, regex::NoExpand(&replacement));
    std::fs::write(path, updated.as_bytes()).map_err(|e| StageError::io(path, e))
}

/// Update `[package].version` in a Cargo.toml that declares a literal version.
///
/// Manifests inheriting the version from the workspace are left as-is.
/// Returns whether the file was changed.
pub fn update_cargo_toml(path: &Path, version: &str) -> Result<bool, StageError> {
    let content = std::fs::read_to_string(path).map_err(|e| StageError::io(path, e))?;
    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| version_error(path, format!("Failed to parse TOML: {e}")))?;

    let has_literal_version = doc
        .get("package")
        .and_then(|package| package.get("version"))
        .is_some_and(|v| v.is_str());
    if !has_literal_version {
        return Ok(false);
    }

    doc["package"]["version"] = toml_edit::value(version);
    std::fs::write(path, doc.to_string()).map_err(|e| StageError::io(path, e))?;
    Ok(true)
}

/// Package directories directly under `packages_dir`, sorted by name
fn package_dirs(packages_dir: &Path) -> Result<Vec<PathBuf>, StageError> {
    let entries = std::fs::read_dir(packages_dir).map_err(|e| StageError::io(packages_dir, e))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StageError::io(packages_dir, e))?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Apply every version rewrite for `ctx` to the staged tree
pub fn update_staged_versions(ctx: &BuildContext) -> Result<usize, StageError> {
    let packages_dir = ctx.staged_packages_dir();
    let manifests: Vec<PathBuf> = package_dirs(&packages_dir)?
        .into_iter()
        .map(|dir| dir.join("package.json"))
        .filter(|path| path.is_file())
        .collect();

    let mut siblings = HashSet::new();
    for manifest in &manifests {
        if let Some(name) = read_json(manifest)?.get("name").and_then(Value::as_str) {
            siblings.insert(name.to_string());
        }
    }

    for manifest in &manifests {
        let name = update_package_json(manifest, &ctx.version, &siblings)?;
        log::debug!("Set {} to {}", name, ctx.version);
    }

    let version_module = packages_dir.join(REACT_VERSION_MODULE);
    if version_module.is_file() {
        update_react_version_module(&version_module, &ctx.react_version)?;
        log::debug!("Set {} to {}", version_module.display(), ctx.react_version);
    }

    let mut cargo_manifests = vec![ctx.temp_directory.join("Cargo.toml")];
    cargo_manifests.extend(
        package_dirs(&packages_dir)?
            .into_iter()
            .map(|dir| dir.join("Cargo.toml")),
    );
    for cargo_toml in cargo_manifests.iter().filter(|p| p.is_file()) {
        if update_cargo_toml(cargo_toml, &ctx.version)? {
            log::debug!("Set {} to {}", cargo_toml.display(), ctx.version);
        }
    }

    Ok(manifests.len())
}

#[async_trait]
impl Stage for VersionUpdater {
    async fn run(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let ctx = ctx.clone();
        let updated = tokio::task::spawn_blocking(move || update_staged_versions(&ctx))
            .await
            .map_err(|e| StageError::Other(e.into()))??;
        log::info!("Updated {} package manifest(s)", updated);
        Ok(())
    }
}
