//! systemd supervisor unit for the workload.
//!
//! The unit binds start/stop to the compose plugin's up/down commands with
//! `oneshot` + `remain-after-exit` semantics: systemd considers the unit
//! active once `compose up -d` returns. Whether the workload is actually
//! live is the readiness detector's job, not the supervisor's.

use crate::exec::{run_checked, SystemExec};
use noderig_core::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Statically named unit owning the workload's lifecycle after install.
pub const UNIT_NAME: &str = "noderig-node";

/// Declarative description of the supervisor unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorUnit {
    pub name: String,
    pub working_dir: PathBuf,
    pub start_command: String,
    pub stop_command: String,
}

impl SupervisorUnit {
    /// Unit for the compose file inside `install_dir`.
    pub fn for_install_dir(install_dir: &Path) -> Self {
        Self {
            name: UNIT_NAME.to_string(),
            working_dir: install_dir.to_path_buf(),
            start_command: "/usr/bin/docker compose up -d".to_string(),
            stop_command: "/usr/bin/docker compose down".to_string(),
        }
    }

    /// Render the systemd unit file. Pure; byte-stable across calls.
    pub fn render(&self) -> String {
        format!(
            "[Unit]\n\
             Description=noderig supervised blockchain node\n\
             After=docker.service network-online.target\n\
             Requires=docker.service\n\
             \n\
             [Service]\n\
             Type=oneshot\n\
             RemainAfterExit=yes\n\
             WorkingDirectory={}\n\
             ExecStart={}\n\
             ExecStop={}\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target\n",
            self.working_dir.display(),
            self.start_command,
            self.stop_command
        )
    }

    /// Path of the unit file under `etc_root` (normally `/etc`).
    pub fn unit_path(&self, etc_root: &Path) -> PathBuf {
        etc_root
            .join("systemd/system")
            .join(format!("{}.service", self.name))
    }

    /// Write the unit file, reload systemd and enable the unit for boot.
    /// Failure to register is fatal.
    pub async fn register(&self, exec: &dyn SystemExec, etc_root: &Path) -> Result<()> {
        let path = self.unit_path(etc_root);
        std::fs::create_dir_all(etc_root.join("systemd/system"))?;
        std::fs::write(&path, self.render())?;

        run_checked(exec, "supervisor_register", "systemctl", &["daemon-reload"]).await?;
        run_checked(
            exec,
            "supervisor_register",
            "systemctl",
            &["enable", &self.name],
        )
        .await?;

        info!(unit = %self.name, path = ?path, "supervisor unit registered");
        Ok(())
    }

    /// Start the unit through the supervisor. Failure is fatal.
    pub async fn start(&self, exec: &dyn SystemExec) -> Result<()> {
        run_checked(exec, "unit_start", "systemctl", &["start", &self.name]).await?;
        info!(unit = %self.name, "workload started via supervisor");
        Ok(())
    }
}
