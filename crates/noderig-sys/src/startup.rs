//! Workload artifact pull and the live compose log source.

use crate::exec::{run_checked, SystemExec};
use async_trait::async_trait;
use noderig_core::readiness::LogSource;
use noderig_core::workload::COMPOSE_FILE;
use noderig_core::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Pull the workload image referenced by the compose file. The workload
/// cannot start without the artifact, so failure here is fatal.
pub async fn pull_workload_image(exec: &dyn SystemExec, install_dir: &Path) -> Result<()> {
    let compose_path = install_dir.join(COMPOSE_FILE);
    run_checked(
        exec,
        "image_pull",
        "docker",
        &["compose", "-f", &compose_path.to_string_lossy(), "pull"],
    )
    .await?;

    info!("workload image pulled");
    Ok(())
}

/// [`LogSource`] backed by `docker compose logs` against the generated
/// compose file. The log stream is read-only, text, unstructured.
pub struct ComposeLogSource<'a> {
    exec: &'a dyn SystemExec,
    compose_path: PathBuf,
}

impl<'a> ComposeLogSource<'a> {
    pub fn new(exec: &'a dyn SystemExec, install_dir: &Path) -> Self {
        Self {
            exec,
            compose_path: install_dir.join(COMPOSE_FILE),
        }
    }
}

#[async_trait]
impl LogSource for ComposeLogSource<'_> {
    async fn fetch(&mut self) -> String {
        let result = self
            .exec
            .run(
                "docker",
                &[
                    "compose",
                    "-f",
                    &self.compose_path.to_string_lossy(),
                    "logs",
                    "--no-color",
                    "--tail",
                    "200",
                ],
            )
            .await;

        match result {
            Ok(output) if output.success() => output.stdout,
            Ok(output) => {
                debug!(
                    exit_code = output.exit_code,
                    "compose logs unavailable, treating buffer as empty"
                );
                String::new()
            }
            Err(e) => {
                debug!("compose logs fetch failed: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CmdOutput;
    use crate::fakes::FakeExec;

    #[tokio::test]
    async fn test_pull_uses_compose_file_in_install_dir() {
        let fake = FakeExec::new();
        pull_workload_image(&fake, Path::new("/opt/noderig"))
            .await
            .unwrap();
        assert!(fake.ran("docker compose -f /opt/noderig/docker-compose.yml pull"));
    }

    #[tokio::test]
    async fn test_pull_failure_is_fatal() {
        let fake = FakeExec::new().with_failure(
            "pull",
            CmdOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: "manifest unknown".to_string(),
            },
        );

        let err = pull_workload_image(&fake, Path::new("/opt/noderig"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("image_pull"));
    }

    #[tokio::test]
    async fn test_log_source_returns_buffer() {
        let fake = FakeExec::new().with_failure(
            "logs",
            CmdOutput {
                exit_code: 0,
                stdout: "node | applied block 12345\n".to_string(),
                stderr: String::new(),
            },
        );

        let mut source = ComposeLogSource::new(&fake, Path::new("/opt/noderig"));
        let buffer = source.fetch().await;
        assert!(buffer.contains("applied block"));
    }

    #[tokio::test]
    async fn test_log_source_degrades_to_empty_on_failure() {
        let fake = FakeExec::new().with_failure(
            "logs",
            CmdOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: "no such service".to_string(),
            },
        );

        let mut source = ComposeLogSource::new(&fake, Path::new("/opt/noderig"));
        assert_eq!(source.fetch().await, "");
    }
}
