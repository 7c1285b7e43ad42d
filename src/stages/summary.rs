//! Human-readable pre-release summary.

use crate::cli::OutputManager;
use crate::context::BuildContext;
use crate::error::StageError;
use crate::pipeline::Stage;
use async_trait::async_trait;

/// Prints where the release candidate is and what to do next
#[derive(Debug, Clone)]
pub struct SummaryReporter {
    dry_run: bool,
    output: OutputManager,
}

impl SummaryReporter {
    /// Create a reporter; `dry_run` only changes the suggested next step
    pub fn new(dry_run: bool, output: OutputManager) -> Self {
        Self { dry_run, output }
    }

    /// Reporter used by the release pipeline, which never publishes
    pub fn for_pipeline(output: OutputManager) -> Self {
        Self::new(false, output)
    }

    /// Whether the summary describes a dry run
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Summary body for `ctx`, one line per entry
pub fn summary_lines(ctx: &BuildContext, dry_run: bool) -> Vec<String> {
    let packed = ctx.temp_directory.join("build").join("packed");
    let mut publish = format!(
        "scripts/release/publish.js --tags next --ci-build {}",
        ctx.temp_directory.display()
    );
    if dry_run {
        publish.push_str(" --dry");
    }

    vec![
        format!("Version:        {}", ctx.version),
        format!("React version:  {}", ctx.react_version),
        format!("Branch:         {}", ctx.branch),
        format!("Commit:         {}", ctx.commit),
        format!("Checksum:       {}", ctx.checksum),
        format!("Staging:        {}", ctx.temp_directory.display()),
        format!("Artifacts:      {}", ctx.build_output_dir().display()),
        format!("Packages:       {}", packed.display()),
        String::new(),
        "Next step, after reviewing the artifacts:".to_string(),
        format!("  {publish}"),
    ]
}

#[async_trait]
impl Stage for SummaryReporter {
    async fn run(&self, ctx: &BuildContext) -> Result<(), StageError> {
        let io = |e: std::io::Error| StageError::io("<stdout>", e);

        self.output.section("Pre-release summary").map_err(io)?;
        self.output
            .success(&format!(
                "A release candidate has been prepared for version {}",
                ctx.version
            ))
            .map_err(io)?;
        if self.dry_run {
            self.output
                .warn("Dry run: nothing will be published")
                .map_err(io)?;
        }
        for line in summary_lines(ctx, self.dry_run) {
            self.output.indent(&line).map_err(io)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx() -> BuildContext {
        BuildContext {
            branch: "main".to_string(),
            commit: "abc123".to_string(),
            version: "19.1.0".to_string(),
            react_version: "19.1.0".to_string(),
            checksum: "deadbeef".to_string(),
            cwd: PathBuf::from("/repo"),
            temp_directory: PathBuf::from("/tmp/react-abc123"),
        }
    }

    #[test]
    fn test_summary_reports_build_facts() {
        let lines = summary_lines(&ctx(), false);
        assert!(lines.iter().any(|l| l.contains("19.1.0")));
        assert!(lines.iter().any(|l| l.contains("deadbeef")));
        assert!(lines.iter().any(|l| l.contains("/tmp/react-abc123")));
        assert!(!lines.iter().any(|l| l.contains("--dry")));
    }

    #[test]
    fn test_dry_run_changes_next_step() {
        let lines = summary_lines(&ctx(), true);
        assert!(lines.last().is_some_and(|l| l.ends_with("--dry")));
    }

    #[tokio::test]
    async fn test_quiet_reporter_succeeds() {
        let reporter = SummaryReporter::new(false, OutputManager::new(true));
        assert!(!reporter.is_dry_run());
        reporter.run(&ctx()).await.unwrap();
    }
}
