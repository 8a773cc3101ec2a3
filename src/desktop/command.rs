//! Running external desktop tools

use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

/// Longest stderr excerpt carried in an error
const STDERR_EXCERPT: usize = 300;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Run a tool to completion with stdin closed; non-zero exit is an error
pub fn run_tool(program: &str, args: &[&str]) -> Result<(), ToolError> {
    let mut command = Command::new(program);
    command.args(args);
    run_command(command)
}

pub fn run_command(mut command: Command) -> Result<(), ToolError> {
    let program = command.get_program().to_string_lossy().into_owned();
    debug!(program = %program, args = ?command.get_args().collect::<Vec<_>>(), "Running tool");

    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
    Err(ToolError::Failed {
        program,
        status: output.status.to_string(),
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        assert!(run_tool("true", &[]).is_ok());
    }

    #[test]
    fn test_non_zero_exit_carries_stderr() {
        let err = run_tool("sh", &["-c", "echo broken >&2; exit 3"]).unwrap_err();
        match err {
            ToolError::Failed { program, stderr, .. } => {
                assert_eq!(program, "sh");
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_program() {
        let err = run_tool("plasma-daynight-sync-no-such-tool", &[]).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
