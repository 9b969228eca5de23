//! Container runtime installation.
//!
//! Ensures Docker Engine and the compose plugin are installed and the
//! runtime service is enabled and running. Idempotent: when the `docker`
//! binary already resolves on PATH the whole sequence is skipped.
//!
//! Failure policy: every step here is fatal. A broken package index,
//! unreachable vendor repository, or failing service enable indicates an
//! environment the tool cannot safely work around.

use crate::exec::{run_checked, SystemExec};
use noderig_core::Result;
use tracing::info;

const DOCKER_KEYRING: &str = "/etc/apt/keyrings/docker.asc";
const DOCKER_LIST: &str = "/etc/apt/sources.list.d/docker.list";

/// Ensure the container runtime is installed, enabled and running.
///
/// Returns `true` when an installation was performed, `false` when the
/// runtime was already present and the sequence was skipped.
pub async fn ensure_container_runtime(exec: &dyn SystemExec) -> Result<bool> {
    if exec.binary_on_path("docker") {
        info!("container runtime already installed, skipping");
        return Ok(false);
    }

    info!("container runtime not found, installing Docker Engine");

    run_checked(exec, "runtime_index_refresh", "apt-get", &["update"]).await?;

    run_checked(
        exec,
        "runtime_prerequisites",
        "apt-get",
        &["install", "-y", "ca-certificates", "curl", "gnupg", "lsb-release"],
    )
    .await?;

    // Vendor signing key, fetched over the network.
    run_checked(
        exec,
        "runtime_signing_key",
        "sh",
        &[
            "-c",
            &format!(
                "install -m 0755 -d /etc/apt/keyrings && \
                 curl -fsSL https://download.docker.com/linux/ubuntu/gpg -o {key} && \
                 chmod a+r {key}",
                key = DOCKER_KEYRING
            ),
        ],
    )
    .await?;

    // Vendor repository keyed by host architecture and OS codename.
    run_checked(
        exec,
        "runtime_repository",
        "sh",
        &[
            "-c",
            &format!(
                "echo \"deb [arch=$(dpkg --print-architecture) signed-by={key}] \
                 https://download.docker.com/linux/ubuntu $(lsb_release -cs) stable\" \
                 > {list}",
                key = DOCKER_KEYRING,
                list = DOCKER_LIST
            ),
        ],
    )
    .await?;

    run_checked(exec, "runtime_index_refresh", "apt-get", &["update"]).await?;

    run_checked(
        exec,
        "runtime_packages",
        "apt-get",
        &[
            "install",
            "-y",
            "docker-ce",
            "docker-ce-cli",
            "containerd.io",
            "docker-buildx-plugin",
            "docker-compose-plugin",
        ],
    )
    .await?;

    run_checked(
        exec,
        "runtime_service",
        "systemctl",
        &["enable", "--now", "docker"],
    )
    .await?;

    info!("container runtime installed and running");
    Ok(true)
}
