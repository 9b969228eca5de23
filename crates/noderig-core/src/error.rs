//! Domain-level error taxonomy for noderig.

use crate::gate::Deficiency;

/// Errors produced during a provisioning run.
///
/// Fatal conditions abort the remaining pipeline without rollback;
/// re-running the whole sequence is safe because every step is idempotent.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The tool must run as root to mutate host state.
    #[error("root privileges required (re-run with sudo)")]
    PrivilegeRequired,

    /// A provisioning step failed. The step name is surfaced to the operator.
    #[error("step '{step}' failed: {detail}")]
    StepFailed { step: String, detail: String },

    /// An external command exited nonzero.
    #[error("command '{program}' exited with code {exit_code}: {stderr}")]
    CommandFailed {
        program: String,
        exit_code: i32,
        stderr: String,
    },

    /// Hardware below requirements in strict mode, or operator declined.
    #[error("hardware requirements not met: {0:?}")]
    RequirementsNotMet(Vec<Deficiency>),

    /// Operator declined to continue past a compliance warning.
    #[error("provisioning aborted by operator")]
    OperatorDeclined,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvisionError {
    /// Convenience constructor for a named step failure.
    pub fn step(step: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        ProvisionError::StepFailed {
            step: step.into(),
            detail: detail.to_string(),
        }
    }
}

/// Result type for noderig domain operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_error_display() {
        let err = ProvisionError::step("runtime_install", "apt-get update failed");
        assert!(err.to_string().contains("runtime_install"));
        assert!(err.to_string().contains("apt-get update failed"));

        let err = ProvisionError::CommandFailed {
            program: "sysctl".to_string(),
            exit_code: 2,
            stderr: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("sysctl"));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn test_requirements_error_lists_deficiencies() {
        let err = ProvisionError::RequirementsNotMet(vec![Deficiency::Cpu, Deficiency::Disk]);
        let msg = err.to_string();
        assert!(msg.contains("Cpu"));
        assert!(msg.contains("Disk"));
    }
}
