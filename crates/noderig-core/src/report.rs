//! Final provisioning summary.
//!
//! Two outputs from the same facts: [`RunReport`] renders the
//! operator-facing text, [`RunSummary`] persists a machine-readable JSON
//! record next to the compose file for later tooling. Pure formatting,
//! no decision logic. The public IP is supplied by the caller
//! (best-effort lookup) and degrades to an explicit sentinel.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::gate::Deficiency;
use crate::hardware::HardwareProfile;
use crate::readiness::ReadinessSignal;
use crate::workload::{DATA_CATEGORIES, METRICS_PORT, RPC_PORT};
use crate::Result;

/// Sentinel used when the public-IP lookup failed.
pub const UNKNOWN_IP: &str = "unknown";

/// Name of the machine-readable summary inside the install directory.
pub const SUMMARY_FILE: &str = "provision-report.json";

/// Self-contained record of a completed provisioning run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Hardware facts the compliance gate saw.
    pub profile: HardwareProfile,
    pub install_dir: PathBuf,
    pub external_rpc_exposed: bool,
    /// Detected public IP, absent when the lookup failed.
    pub public_ip: Option<String>,
    /// Shortfalls the operator explicitly accepted at the gate.
    pub accepted_deficiencies: Vec<Deficiency>,
    pub readiness: ReadinessSignal,
    pub warnings: Vec<String>,
}

impl RunSummary {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the summary to `<install_dir>/provision-report.json`,
    /// overwriting any record from a previous run.
    pub fn write(&self, install_dir: &Path) -> Result<PathBuf> {
        let path = install_dir.join(SUMMARY_FILE);
        std::fs::write(&path, self.to_json()?)?;
        Ok(path)
    }
}

/// Inputs to the summary. Everything is already decided by this point.
#[derive(Debug, Clone)]
pub struct RunReport<'a> {
    pub install_dir: &'a Path,
    pub external_rpc_exposed: bool,
    pub public_ip: Option<String>,
    pub readiness: &'a ReadinessSignal,
    pub warnings: &'a [String],
}

impl RunReport<'_> {
    /// Render the operator-facing summary.
    pub fn render(&self) -> String {
        let ip = self.public_ip.as_deref().unwrap_or(UNKNOWN_IP);
        let rpc_host = if self.external_rpc_exposed {
            ip
        } else {
            "127.0.0.1"
        };

        let mut out = String::new();
        out.push_str("Provisioning complete\n");
        out.push_str("=====================\n\n");

        match self.readiness {
            ReadinessSignal::Confirmed { marker, iteration } => {
                out.push_str(&format!(
                    "Node status:  RUNNING (confirmed via \"{}\" on poll {})\n",
                    marker, iteration
                ));
            }
            ReadinessSignal::TimedOut => {
                out.push_str("Node status:  STARTED, not yet confirmed live\n");
                out.push_str(&format!(
                    "              Keep watching with: docker compose -f {}/docker-compose.yml logs -f\n",
                    self.install_dir.display()
                ));
            }
        }

        out.push_str(&format!("\nRPC endpoint:     http://{}:{}\n", rpc_host, RPC_PORT));
        if !self.external_rpc_exposed {
            out.push_str("                  (loopback-only; set NODERIG_EXPOSE_RPC=true to expose)\n");
        }
        out.push_str(&format!(
            "Metrics endpoint: http://127.0.0.1:{}\n",
            METRICS_PORT
        ));
        out.push_str(&format!("Public IP:        {}\n", ip));

        out.push_str(&format!("\nInstall dir: {}\n", self.install_dir.display()));
        out.push_str("Data layout:\n");
        for category in DATA_CATEGORIES {
            out.push_str(&format!(
                "  {}/data/{}\n",
                self.install_dir.display(),
                category
            ));
        }

        out.push_str("\nOperational commands:\n");
        out.push_str("  systemctl status noderig-node\n");
        out.push_str("  systemctl stop noderig-node\n");
        out.push_str("  systemctl start noderig-node\n");

        if !self.warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for warning in self.warnings {
                out.push_str(&format!("  - {}\n", warning));
            }
        }

        out
    }
}
