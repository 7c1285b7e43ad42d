//! Record build provenance in every staged package.

use crate::context::BuildContext;
use crate::error::StageError;
use crate::pipeline::Stage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// File name of the provenance record
pub const BUILD_INFO_FILE: &str = "build-info.json";

/// Provenance written next to each package.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfoRecord {
    /// Branch the release was built from
    pub branch: String,
    /// Short commit hash
    pub commit: String,
    /// Source tree checksum
    pub checksum: String,
    /// Release version
    pub version: String,
    /// Base framework version
    pub react_version: String,
    /// Where the build ran
    pub environment: String,
}

impl BuildInfoRecord {
    /// Record for a local build of `ctx`
    pub fn local(ctx: &BuildContext) -> Self {
        Self {
            branch: ctx.branch.clone(),
            commit: ctx.commit.clone(),
            checksum: ctx.checksum.clone(),
            version: ctx.version.clone(),
            react_version: ctx.react_version.clone(),
            environment: "local".to_string(),
        }
    }
}

/// Writes `build-info.json` into each staged package directory
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildInfoWriter;

impl BuildInfoWriter {
    /// Create a new build-info writer
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for BuildInfoWriter {
    async fn run(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let packages_dir = ctx.staged_packages_dir();
        let mut content = serde_json::to_string_pretty(&BuildInfoRecord::local(ctx))
            .map_err(|e| StageError::Other(e.into()))?;
        content.push('\n');

        let mut entries = tokio::fs::read_dir(&packages_dir)
            .await
            .map_err(|e| StageError::io(&packages_dir, e))?;
        let mut written = 0usize;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StageError::io(&packages_dir, e))?
        {
            let dir = entry.path();
            if !dir.join("package.json").is_file() {
                continue;
            }
            let target = dir.join(BUILD_INFO_FILE);
            tokio::fs::write(&target, &content)
                .await
                .map_err(|e| StageError::io(&target, e))?;
            written += 1;
        }

        log::info!("Wrote {} to {} package(s)", BUILD_INFO_FILE, written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writes_record_into_each_package() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path();
        for name in ["react", "react-dom"] {
            fs::create_dir_all(root.join("packages").join(name)).unwrap();
            fs::write(root.join("packages").join(name).join("package.json"), "{}").unwrap();
        }
        fs::create_dir_all(root.join("packages/not-a-package")).unwrap();

        let ctx = BuildContext {
            branch: "main".to_string(),
            commit: "abc123".to_string(),
            version: "19.1.0".to_string(),
            react_version: "19.1.0".to_string(),
            checksum: "deadbeef".to_string(),
            cwd: PathBuf::from("/repo"),
            temp_directory: root.to_path_buf(),
        };
        BuildInfoWriter::new().run(&ctx).await.unwrap();

        let written: BuildInfoRecord = serde_json::from_str(
            &fs::read_to_string(root.join("packages/react-dom/build-info.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(written, BuildInfoRecord::local(&ctx));
        assert!(root.join("packages/react/build-info.json").is_file());
        assert!(!root.join("packages/not-a-package/build-info.json").exists());

        let raw = fs::read_to_string(root.join("packages/react/build-info.json")).unwrap();
        assert!(raw.contains("\"reactVersion\": \"19.1.0\""));
    }
}
