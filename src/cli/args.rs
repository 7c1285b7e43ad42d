//! Command line argument parsing and validation.
//!
//! Every flag is optional and has an environment-variable fallback, so the
//! tool runs with no arguments from inside a checkout.

use crate::PipelineConfig;
use crate::build_info::ReleaseChannel;
use crate::stages::build_artifacts::{DEFAULT_BUILD_COMMAND, DEFAULT_INSTALL_COMMAND};
use clap::Parser;
use std::path::PathBuf;

/// Build a release candidate in an isolated staging directory
#[derive(Parser, Debug)]
#[command(
    name = "react_release_builder",
    version,
    about = "Build a versioned, checksummed release candidate",
    long_about = "Resolve build info, stage a copy of the repository under the system temp
directory (react-<commit>), rewrite versions, record build info, build, and verify packaging.

Re-running for the same commit reuses the staging directory."
)]
pub struct Args {
    /// Repository root (defaults to the git toplevel of the current directory)
    #[arg(long, env = "RELEASE_CWD", value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Directory the staging directory is created in
    #[arg(long, env = "RELEASE_TEMP_ROOT", value_name = "DIR")]
    pub temp_root: Option<PathBuf>,

    /// Release channel
    #[arg(long, env = "RELEASE_CHANNEL", value_enum, default_value_t = ReleaseChannel::Stable)]
    pub channel: ReleaseChannel,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y', env = "RELEASE_CONFIRMED")]
    pub yes: bool,

    /// Dependency install command run before the build (empty to skip)
    #[arg(long, env = "RELEASE_INSTALL_COMMAND", default_value = DEFAULT_INSTALL_COMMAND)]
    pub install_command: String,

    /// Build command (run through the shell)
    #[arg(long, env = "RELEASE_BUILD_COMMAND", default_value = DEFAULT_BUILD_COMMAND)]
    pub build_command: String,

    /// Timeout for each build command, in seconds
    #[arg(long, env = "RELEASE_BUILD_TIMEOUT", value_name = "SECS")]
    pub build_timeout: Option<u64>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.build_command.trim().is_empty() {
            return Err("Build command must not be empty".to_string());
        }
        if self.build_timeout == Some(0) {
            return Err("Build timeout must be at least one second".to_string());
        }
        if let Some(cwd) = &self.cwd
            && !cwd.is_dir()
        {
            return Err(format!("Repository root {} is not a directory", cwd.display()));
        }
        Ok(())
    }

    /// Pipeline configuration for a resolved repository root
    pub fn pipeline_config(&self, cwd: PathBuf) -> PipelineConfig {
        let mut build_commands = Vec::new();
        if !self.install_command.trim().is_empty() {
            build_commands.push(self.install_command.clone());
        }
        build_commands.push(self.build_command.clone());

        PipelineConfig {
            cwd,
            temp_root: self.temp_root.clone().unwrap_or_else(std::env::temp_dir),
            channel: self.channel,
            assume_confirmed: self.yes,
            build_commands,
            build_timeout_secs: self.build_timeout,
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new() -> Self {
        Self {
            output: super::OutputManager::new(false),
        }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_need_no_flags() {
        let args = Args::try_parse_from(["react_release_builder"]).unwrap();
        assert!(!args.yes);
        assert_eq!(args.channel, ReleaseChannel::Stable);

        let config = args.pipeline_config(PathBuf::from("/repo"));
        assert_eq!(
            config.build_commands,
            vec![
                DEFAULT_INSTALL_COMMAND.to_string(),
                DEFAULT_BUILD_COMMAND.to_string()
            ]
        );
        assert_eq!(config.temp_root, std::env::temp_dir());
    }

    #[test]
    fn test_empty_install_command_is_skipped() {
        let args = Args::try_parse_from([
            "react_release_builder",
            "--install-command",
            "",
            "--build-command",
            "make dist",
            "--channel",
            "experimental",
            "--yes",
        ])
        .unwrap();
        let config = args.pipeline_config(PathBuf::from("/repo"));
        assert_eq!(config.build_commands, vec!["make dist".to_string()]);
        assert_eq!(config.channel, ReleaseChannel::Experimental);
        assert!(config.assume_confirmed);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let args =
            Args::try_parse_from(["react_release_builder", "--build-timeout", "0"]).unwrap();
        assert!(args.validate().is_err());
    }
}
