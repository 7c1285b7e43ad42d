//! Compile distributable artifacts from the staged tree.

use crate::context::BuildContext;
use crate::error::StageError;
use crate::pipeline::Stage;
use async_trait::async_trait;
use std::time::Duration;

/// Default dependency install command
pub const DEFAULT_INSTALL_COMMAND: &str = "yarn install --frozen-lockfile";

/// Default build command
pub const DEFAULT_BUILD_COMMAND: &str = "yarn build";

/// Runs the install and build commands inside the staging directory
#[derive(Debug, Clone)]
pub struct ArtifactBuilder {
    commands: Vec<String>,
    timeout_secs: Option<u64>,
}

impl Default for ArtifactBuilder {
    fn default() -> Self {
        Self::new(
            vec![
                DEFAULT_INSTALL_COMMAND.to_string(),
                DEFAULT_BUILD_COMMAND.to_string(),
            ],
            None,
        )
    }
}

impl ArtifactBuilder {
    /// Create a builder running `commands` in order, each bounded by `timeout_secs`
    pub fn new(commands: Vec<String>, timeout_secs: Option<u64>) -> Self {
        Self {
            commands,
            timeout_secs,
        }
    }

    async fn run_command(&self, command: &str, ctx: &BuildContext) -> Result<(), StageError> {
        if command.trim().is_empty() {
            return Ok(());
        }

        log::info!("Running '{}' in {}", command, ctx.temp_directory.display());
        let mut cmd = shell(command);
        cmd.current_dir(&ctx.temp_directory).kill_on_drop(true);
        let output = cmd.output();

        let output = match self.timeout_secs {
            Some(seconds) => tokio::time::timeout(Duration::from_secs(seconds), output)
                .await
                .map_err(|_| StageError::Timeout {
                    command: command.to_string(),
                    seconds,
                })?,
            None => output.await,
        }
        .map_err(|e| StageError::Command {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(StageError::Command {
                command: command.to_string(),
                reason: format!(
                    "exited with {}:\n{}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(())
    }
}

/// Command line run through the platform shell, so quoting works as typed
#[cfg(unix)]
fn shell(command: &str) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[async_trait]
impl Stage for ArtifactBuilder {
    async fn run(&self, ctx: &BuildContext) -> Result<(), StageError> {
        for command in &self.commands {
            self.run_command(command, ctx).await?;
        }

        let output_dir = ctx.build_output_dir();
        if !output_dir.is_dir() {
            return Err(StageError::Command {
                command: self.commands.join(" && "),
                reason: format!("no build output at {}", output_dir.display()),
            });
        }

        log::info!("Built artifacts in {}", output_dir.display());
        Ok(())
    }
}
