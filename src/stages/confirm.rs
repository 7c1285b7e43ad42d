//! Yes/no gate before anything is staged.

use crate::context::BuildContext;
use crate::error::StageError;
use crate::pipeline::Stage;
use async_trait::async_trait;
use std::io::{BufRead, Write};

/// Question asked before the release build starts
pub const CONFIRMATION_PROMPT: &str = "Have you run the build-and-test script? (y/N) ";

/// Where the gate gets its answer from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationMode {
    /// Ask on stdin
    Interactive,
    /// Answer already known; the gate does not prompt
    Assume(bool),
}

/// Aborts the pipeline unless the operator confirms testing was done
#[derive(Debug, Clone)]
pub struct ConfirmationGate {
    mode: ConfirmationMode,
}

impl ConfirmationGate {
    /// Create a gate with the given answer source
    pub fn new(mode: ConfirmationMode) -> Self {
        Self { mode }
    }
}

/// Interpret a typed answer; only `y`/`yes` confirm
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn ask_stdin() -> std::io::Result<String> {
    let mut stdout = std::io::stdout();
    stdout.write_all(CONFIRMATION_PROMPT.as_bytes())?;
    stdout.flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer)
}

#[async_trait]
impl Stage for ConfirmationGate {
    async fn run(&self, _ctx: &BuildContext) -> Result<(), StageError> {
        let confirmed = match self.mode {
            ConfirmationMode::Assume(answer) => {
                log::debug!("Confirmation pre-answered: {}", answer);
                answer
            }
            ConfirmationMode::Interactive => {
                let answer = tokio::task::spawn_blocking(ask_stdin)
                    .await
                    .map_err(|e| StageError::Other(e.into()))?
                    .map_err(|e| StageError::io("<stdin>", e))?;
                is_affirmative(&answer)
            }
        };

        if confirmed {
            Ok(())
        } else {
            Err(StageError::Rejected)
        }
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
    fn test_is_affirmative() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("yep"));
    }

    #[tokio::test]
    async fn test_assumed_answers() {
        let ctx = ctx();
        assert!(ConfirmationGate::new(ConfirmationMode::Assume(true)).run(&ctx).await.is_ok());
        assert!(matches!(
            ConfirmationGate::new(ConfirmationMode::Assume(false)).run(&ctx).await,
            Err(StageError::Rejected)
        ));
    }
}
