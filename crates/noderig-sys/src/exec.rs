//! External command execution seam.
//!
//! Every host mutation goes through [`SystemExec`] so the provisioning
//! steps can be exercised in tests without touching a real host (see
//! [`crate::fakes::FakeExec`]).

use async_trait::async_trait;
use noderig_core::{ProvisionError, Result};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one external command.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,
}

impl CmdOutput {
    /// Whether the command exited zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// A successful empty output, useful as a fake default.
    pub fn ok() -> Self {
        Self {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Capability interface for running host commands and resolving binaries.
#[async_trait]
pub trait SystemExec: Send + Sync {
    /// Run a command to completion and capture its output.
    ///
    /// A nonzero exit is returned as `Ok` with the code; `Err` means the
    /// command could not be spawned at all.
    async fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput>;

    /// Whether `binary` resolves on the system PATH.
    fn binary_on_path(&self, binary: &str) -> bool;
}

/// Real host executor backed by `tokio::process`.
pub struct HostExec;

#[async_trait]
impl SystemExec for HostExec {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput> {
        debug!(program, ?args, "running host command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProvisionError::step(program, format!("failed to spawn: {}", e)))?;

        Ok(CmdOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn binary_on_path(&self, binary: &str) -> bool {
        let Some(path) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&path).any(|dir| dir.join(binary).is_file())
    }
}

/// Run a command and convert any failure into a fatal, step-named error.
///
/// Used by steps whose failure policy is fatal (runtime install, supervisor
/// registration, image pull, unit start).
pub async fn run_checked(
    exec: &dyn SystemExec,
    step: &str,
    program: &str,
    args: &[&str],
) -> Result<CmdOutput> {
    let output = exec
        .run(program, args)
        .await
        .map_err(|e| ProvisionError::step(step, e))?;

    if !output.success() {
        return Err(ProvisionError::step(
            step,
            format!(
                "'{} {}' exited with code {}: {}",
                program,
                args.join(" "),
                output.exit_code,
                output.stderr.trim()
            ),
        ));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_host_exec_captures_stdout() {
        let output = HostExec.run("echo", &["hello"]).await.unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_host_exec_nonzero_exit_is_ok() {
        let output = HostExec.run("false", &[]).await.unwrap();
        assert!(!output.success());
        assert_ne!(output.exit_code, 0);
    }

    #[tokio::test]
    async fn test_host_exec_spawn_failure_is_err() {
        let result = HostExec.run("definitely-not-a-binary-xyz", &[]).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_binary_on_path() {
        assert!(HostExec.binary_on_path("sh"));
        assert!(!HostExec.binary_on_path("definitely-not-a-binary-xyz"));
    }

    #[tokio::test]
    async fn test_run_checked_names_the_step() {
        let err = run_checked(&HostExec, "unit_start", "false", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unit_start"));
    }
}
