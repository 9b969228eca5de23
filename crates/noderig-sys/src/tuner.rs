//! Kernel, resource-limit and firewall tuning.
//!
//! The target state is described as data and applied idempotently: the
//! declarative parameter files are simply rewritten, and firewall rule
//! insertion treats "rule already exists" as success.
//!
//! Failure policy: firewall problems never fail the run (the workload can
//! run unprotected, only more exposed) and are surfaced as warnings with a
//! manual-remediation hint. Kernel-parameter problems are warnings too,
//! except in strict mode where they are fatal.

use crate::exec::SystemExec;
use noderig_core::workload::{P2P_PORT_RANGE, RPC_PORT};
use noderig_core::{ProvisionError, Result};
use std::path::Path;
use tracing::{info, warn};

/// Kernel parameters: IPv6 off at all three scopes, raised file-descriptor
/// ceiling, raised socket and SYN backlogs.
pub const SYSCTL_CONF: &str = "\
net.ipv6.conf.all.disable_ipv6 = 1
net.ipv6.conf.default.disable_ipv6 = 1
net.ipv6.conf.lo.disable_ipv6 = 1
fs.file-max = 1048576
net.core.somaxconn = 65535
net.ipv4.tcp_max_syn_backlog = 65535
";

/// Default open-file and process-count limits for all users.
pub const LIMITS_CONF: &str = "\
* soft nofile 1048576
* hard nofile 1048576
* soft nproc 65535
* hard nproc 65535
";

const SYSCTL_PATH: &str = "sysctl.d/99-noderig.conf";
const LIMITS_PATH: &str = "security/limits.d/99-noderig.conf";

/// Write the declarative kernel-parameter and limits files under
/// `etc_root` (normally `/etc`) and re-apply them.
///
/// Returns accumulated warnings; in strict mode any problem is fatal
/// instead.
pub async fn ensure_kernel_parameters(
    exec: &dyn SystemExec,
    etc_root: &Path,
    strict: bool,
) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    for (rel_path, content) in [(SYSCTL_PATH, SYSCTL_CONF), (LIMITS_PATH, LIMITS_CONF)] {
        let path = etc_root.join(rel_path);
        let write = std::fs::create_dir_all(path.parent().unwrap_or(etc_root))
            .and_then(|_| std::fs::write(&path, content));

        if let Err(e) = write {
            let message = format!("could not write {}: {}", path.display(), e);
            if strict {
                return Err(ProvisionError::step("system_tuning", message));
            }
            warn!("{}", message);
            warnings.push(message);
        }
    }

    match exec.run("sysctl", &["--system"]).await {
        Ok(output) if output.success() => {
            info!("kernel parameters applied");
        }
        Ok(output) => {
            let message = format!(
                "sysctl --system exited with code {}: {}",
                output.exit_code,
                output.stderr.trim()
            );
            if strict {
                return Err(ProvisionError::step("system_tuning", message));
            }
            warn!("{}; kernel parameters will apply on next boot", message);
            warnings.push(message);
        }
        Err(e) => {
            let message = format!("sysctl unavailable: {}", e);
            if strict {
                return Err(ProvisionError::step("system_tuning", message));
            }
            warn!("{}", message);
            warnings.push(message);
        }
    }

    Ok(warnings)
}

/// Ensure ufw is present and enabled with exactly two rule categories:
/// the P2P port range always, the RPC port only when exposure was
/// explicitly requested.
///
/// Never fatal; every problem becomes a warning carrying the manual
/// command the operator can run instead.
pub async fn ensure_firewall(exec: &dyn SystemExec, expose_rpc: bool) -> Vec<String> {
    let mut warnings = Vec::new();

    if !exec.binary_on_path("ufw") {
        info!("ufw not found, installing");
        match exec.run("apt-get", &["install", "-y", "ufw"]).await {
            Ok(output) if output.success() => {}
            Ok(output) => {
                warnings.push(format!(
                    "ufw install failed (code {}): configure the firewall manually with \
                     'apt-get install ufw && ufw enable'",
                    output.exit_code
                ));
                return warnings;
            }
            Err(e) => {
                warnings.push(format!(
                    "ufw install failed ({}): configure the firewall manually with \
                     'apt-get install ufw && ufw enable'",
                    e
                ));
                return warnings;
            }
        }
    }

    let p2p_rule = format!("{}:{}/tcp", P2P_PORT_RANGE.0, P2P_PORT_RANGE.1);
    apply_rule(exec, &p2p_rule, &mut warnings).await;

    if expose_rpc {
        apply_rule(exec, &format!("{}/tcp", RPC_PORT), &mut warnings).await;
    }

    match exec.run("ufw", &["--force", "enable"]).await {
        Ok(output) if output.success() => {
            info!("firewall enabled");
        }
        Ok(output) => {
            warnings.push(format!(
                "firewall not enabled (code {}): run 'ufw --force enable' manually",
                output.exit_code
            ));
        }
        Err(e) => {
            warnings.push(format!(
                "firewall not enabled ({}): run 'ufw --force enable' manually",
                e
            ));
        }
    }

    warnings
}

/// Insert one allow rule, tolerating "rule already exists" as success.
async fn apply_rule(exec: &dyn SystemExec, rule: &str, warnings: &mut Vec<String>) {
    match exec.run("ufw", &["allow", rule]).await {
        Ok(output) if output.success() => {}
        Ok(output) if rule_already_exists(&output.stdout, &output.stderr) => {
            info!(rule, "firewall rule already present");
        }
        Ok(output) => {
            warnings.push(format!(
                "firewall rule for {} not applied (code {}): run 'ufw allow {}' manually",
                rule, output.exit_code, rule
            ));
        }
        Err(e) => {
            warnings.push(format!(
                "firewall rule for {} not applied ({}): run 'ufw allow {}' manually",
                rule, e, rule
            ));
        }
    }
}

fn rule_already_exists(stdout: &str, stderr: &str) -> bool {
    let combined = format!("{}\n{}", stdout, stderr).to_lowercase();
    combined.contains("existing") || combined.contains("already exists")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CmdOutput;
    use crate::fakes::FakeExec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_parameter_files_written_and_applied() {
        let dir = tempdir().unwrap();
        let fake = FakeExec::new();

        let warnings = ensure_kernel_parameters(&fake, dir.path(), false)
            .await
            .unwrap();
        assert!(warnings.is_empty());

        let sysctl = std::fs::read_to_string(dir.path().join(SYSCTL_PATH)).unwrap();
        assert!(sysctl.contains("net.ipv6.conf.lo.disable_ipv6 = 1"));
        assert!(sysctl.contains("net.ipv4.tcp_max_syn_backlog = 65535"));

        let limits = std::fs::read_to_string(dir.path().join(LIMITS_PATH)).unwrap();
        assert!(limits.contains("* hard nofile 1048576"));

        assert!(fake.ran("sysctl --system"));
    }

    #[tokio::test]
    async fn test_rewriting_parameter_files_is_idempotent() {
        let dir = tempdir().unwrap();
        let fake = FakeExec::new();

        ensure_kernel_parameters(&fake, dir.path(), false).await.unwrap();
        let first = std::fs::read(dir.path().join(SYSCTL_PATH)).unwrap();

        ensure_kernel_parameters(&fake, dir.path(), false).await.unwrap();
        let second = std::fs::read(dir.path().join(SYSCTL_PATH)).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_sysctl_failure_warns_in_permissive_mode() {
        let dir = tempdir().unwrap();
        let fake = FakeExec::new().with_failure(
            "sysctl --system",
            CmdOutput {
                exit_code: 255,
                stdout: String::new(),
                stderr: "read-only file system".to_string(),
            },
        );

        let warnings = ensure_kernel_parameters(&fake, dir.path(), false)
            .await
            .unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("sysctl"));
    }

    #[tokio::test]
    async fn test_sysctl_failure_fatal_in_strict_mode() {
        let dir = tempdir().unwrap();
        let fake = FakeExec::new().with_failure(
            "sysctl --system",
            CmdOutput {
                exit_code: 255,
                stdout: String::new(),
                stderr: "read-only file system".to_string(),
            },
        );

        let err = ensure_kernel_parameters(&fake, dir.path(), true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("system_tuning"));
    }

    #[tokio::test]
    async fn test_firewall_rules_p2p_always_rpc_conditional() {
        let fake = FakeExec::new().with_binary("ufw");
        let warnings = ensure_firewall(&fake, false).await;
        assert!(warnings.is_empty());
        assert!(fake.ran("ufw allow 4000:4010/tcp"));
        assert!(!fake.ran("3001"));
        assert!(fake.ran("ufw --force enable"));

        let fake = FakeExec::new().with_binary("ufw");
        ensure_firewall(&fake, true).await;
        assert!(fake.ran("ufw allow 3001/tcp"));
    }

    #[tokio::test]
    async fn test_existing_rule_is_not_a_failure() {
        let fake = FakeExec::new().with_binary("ufw").with_failure(
            "ufw allow 4000:4010/tcp",
            CmdOutput {
                exit_code: 1,
                stdout: "Skipping adding existing rule".to_string(),
                stderr: String::new(),
            },
        );

        let warnings = ensure_firewall(&fake, false).await;
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[tokio::test]
    async fn test_firewall_failure_is_warning_with_remediation() {
        let fake = FakeExec::new().with_binary("ufw").with_failure(
            "ufw --force enable",
            CmdOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: "could not talk to kernel".to_string(),
            },
        );

        let warnings = ensure_firewall(&fake, false).await;
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("ufw --force enable"));
    }

    #[tokio::test]
    async fn test_missing_ufw_installed_first() {
        let fake = FakeExec::new();
        ensure_firewall(&fake, false).await;
        assert_eq!(fake.invocations()[0], "apt-get install -y ufw");
    }

    #[tokio::test]
    async fn test_ufw_install_failure_short_circuits_with_warning() {
        let fake = FakeExec::new().with_failure(
            "apt-get install -y ufw",
            CmdOutput {
                exit_code: 100,
                stdout: String::new(),
                stderr: "no network".to_string(),
            },
        );

        let warnings = ensure_firewall(&fake, true).await;
        assert_eq!(warnings.len(), 1);
        assert!(!fake.ran("ufw allow"));
    }
}
