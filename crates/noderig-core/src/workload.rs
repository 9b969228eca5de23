//! Workload specification and compose-file generation.
//!
//! The rendered compose file is a pure function of [`WorkloadInputs`] plus
//! fixed constants: re-rendering with the same inputs must produce
//! byte-identical output. The only conditional is the RPC port binding,
//! which stays loopback-only unless external exposure was requested.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::Result;

/// Control/RPC port of the node workload.
pub const RPC_PORT: u16 = 3001;

/// Prometheus metrics port of the node workload.
pub const METRICS_PORT: u16 = 6182;

/// Peer-to-peer gossip port range, always exposed through the firewall.
pub const P2P_PORT_RANGE: (u16, u16) = (4000, 4010);

/// Default container image for the reference deployment.
pub const DEFAULT_IMAGE: &str = "ghcr.io/noderig/dex-node:latest";

/// Name of the rendered compose file inside the install directory.
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Workload-owned data categories, each its own directory under
/// `<install_dir>/data`.
pub const DATA_CATEGORIES: [&str; 4] = ["trades", "fills", "order_statuses", "raw_book_diffs"];

/// The small input set the generator is driven by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadInputs {
    pub install_dir: PathBuf,
    pub image_reference: String,
    pub external_rpc_exposed: bool,
}

/// One host-to-container port binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub host_addr: String,
    pub host_port_range: String,
    pub container_port_range: String,
}

impl PortBinding {
    fn render(&self) -> String {
        format!(
            "{}:{}:{}",
            self.host_addr, self.host_port_range, self.container_port_range
        )
    }
}

/// Resource ceilings applied to the workload container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    pub cpu_limit: String,
    pub mem_limit: String,
    pub pid_limit: u32,
    pub max_open_files: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_limit: "8".to_string(),
            mem_limit: "48g".to_string(),
            pid_limit: 4096,
            max_open_files: 1_048_576,
        }
    }
}

/// Declarative description of what should be running.
///
/// Once written to the install directory this file is the source of truth;
/// the supervisor only issues compose up/down against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub image_reference: String,
    pub command_args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub port_bindings: Vec<PortBinding>,
    pub resource_limits: ResourceLimits,
    pub volumes: Vec<String>,
    pub read_only_root: bool,
}

impl WorkloadSpec {
    /// Build the spec from the generator's input set. Deterministic.
    pub fn from_inputs(inputs: &WorkloadInputs) -> Self {
        let rpc_addr = if inputs.external_rpc_exposed {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        };

        WorkloadSpec {
            image_reference: inputs.image_reference.clone(),
            command_args: vec![
                "run-node".to_string(),
                "--serve-rpc".to_string(),
                "--serve-metrics".to_string(),
            ],
            env: vec![("NODE_HOME".to_string(), "/home/node".to_string())],
            port_bindings: vec![
                PortBinding {
                    host_addr: rpc_addr.to_string(),
                    host_port_range: RPC_PORT.to_string(),
                    container_port_range: RPC_PORT.to_string(),
                },
                PortBinding {
                    host_addr: "127.0.0.1".to_string(),
                    host_port_range: METRICS_PORT.to_string(),
                    container_port_range: METRICS_PORT.to_string(),
                },
                PortBinding {
                    host_addr: "0.0.0.0".to_string(),
                    host_port_range: format!("{}-{}", P2P_PORT_RANGE.0, P2P_PORT_RANGE.1),
                    container_port_range: format!("{}-{}", P2P_PORT_RANGE.0, P2P_PORT_RANGE.1),
                },
            ],
            resource_limits: ResourceLimits::default(),
            volumes: vec!["node-data".to_string()],
            read_only_root: false,
        }
    }

    /// Render the compose file content. Pure; byte-stable across calls.
    pub fn render_compose(&self) -> String {
        let mut out = String::new();
        out.push_str("services:\n");
        out.push_str("  node:\n");
        out.push_str(&format!("    image: {}\n", self.image_reference));
        out.push_str("    container_name: noderig-node\n");
        out.push_str("    restart: unless-stopped\n");

        out.push_str("    command:\n");
        for arg in &self.command_args {
            out.push_str(&format!("      - \"{}\"\n", arg));
        }

        out.push_str("    environment:\n");
        for (key, value) in &self.env {
            out.push_str(&format!("      {}: \"{}\"\n", key, value));
        }

        out.push_str("    ports:\n");
        for binding in &self.port_bindings {
            out.push_str(&format!("      - \"{}\"\n", binding.render()));
        }

        out.push_str(&format!("    cpus: \"{}\"\n", self.resource_limits.cpu_limit));
        out.push_str(&format!(
            "    mem_limit: {}\n",
            self.resource_limits.mem_limit
        ));
        out.push_str(&format!(
            "    pids_limit: {}\n",
            self.resource_limits.pid_limit
        ));
        out.push_str("    ulimits:\n");
        out.push_str("      nofile:\n");
        out.push_str(&format!(
            "        soft: {}\n",
            self.resource_limits.max_open_files
        ));
        out.push_str(&format!(
            "        hard: {}\n",
            self.resource_limits.max_open_files
        ));

        if self.read_only_root {
            out.push_str("    read_only: true\n");
        }

        out.push_str("    volumes:\n");
        for volume in &self.volumes {
            out.push_str(&format!("      - {}:/home/node/data\n", volume));
        }
        out.push_str("      - ./data:/home/node/export\n");

        out.push_str("volumes:\n");
        for volume in &self.volumes {
            out.push_str(&format!("  {}:\n", volume));
        }

        out
    }

    /// Write the compose file and the per-category data directories under
    /// the install dir. Overwrites any existing compose file in place.
    pub fn write_compose(&self, install_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(install_dir)?;
        for category in DATA_CATEGORIES {
            std::fs::create_dir_all(install_dir.join("data").join(category))?;
        }

        let compose_path = install_dir.join(COMPOSE_FILE);
        std::fs::write(&compose_path, self.render_compose())?;

        info!(path = ?compose_path, "wrote workload compose file");
        Ok(compose_path)
    }
}
