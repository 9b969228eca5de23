//! Compliance gate: hardware facts vs. requirement policy.
//!
//! The gate is side-effect free. It returns an explicit [`GateDecision`]
//! instead of exiting early, so the pipeline driver can log and unwind
//! deterministically.

use crate::hardware::{HardwareProfile, RequirementPolicy};
use serde::Serialize;

/// A single hardware metric below its required threshold. Accepted
/// deficiencies end up in the JSON run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Deficiency {
    Cpu,
    Ram,
    Disk,
}

/// Outcome of comparing a profile against the policy.
#[derive(Debug, Clone)]
pub struct ComplianceReport {
    /// Deficiencies found (empty means fully compliant).
    pub deficiencies: Vec<Deficiency>,

    /// Human-readable descriptions, one per deficiency.
    pub details: Vec<String>,
}

impl ComplianceReport {
    pub fn compliant(&self) -> bool {
        self.deficiencies.is_empty()
    }
}

/// How the gate treats a non-compliant host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Any deficiency is fatal, no prompt.
    Strict,
    /// Present deficiencies and ask the operator; non-affirmative aborts.
    Interactive,
}

/// Final gate decision consumed by the pipeline driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Abort(Vec<Deficiency>),
}

/// Compliance gate evaluation rules.
pub struct ComplianceGate;

impl ComplianceGate {
    /// Flag a deficiency for each metric strictly below its threshold.
    pub fn evaluate(profile: &HardwareProfile, policy: &RequirementPolicy) -> ComplianceReport {
        let mut deficiencies = Vec::new();
        let mut details = Vec::new();

        if profile.cpu_cores < policy.min_cpu_cores {
            deficiencies.push(Deficiency::Cpu);
            details.push(format!(
                "CPU cores: {} (required: {})",
                profile.cpu_cores, policy.min_cpu_cores
            ));
        }
        if profile.ram_gb < policy.min_ram_gb {
            deficiencies.push(Deficiency::Ram);
            details.push(format!(
                "RAM: {} GB (required: {} GB)",
                profile.ram_gb, policy.min_ram_gb
            ));
        }
        if profile.free_disk_gb < policy.min_disk_gb {
            deficiencies.push(Deficiency::Disk);
            details.push(format!(
                "Free disk: {} GB (required: {} GB)",
                profile.free_disk_gb, policy.min_disk_gb
            ));
        }

        ComplianceReport {
            deficiencies,
            details,
        }
    }

    /// Turn a report into a decision.
    ///
    /// `confirm` is only invoked in interactive mode and only when
    /// deficiencies exist; it should present the report and return whether
    /// the operator explicitly chose to continue. The default on
    /// non-affirmative input is abort (fail-closed).
    pub fn decide<F>(report: &ComplianceReport, mode: GateMode, confirm: F) -> GateDecision
    where
        F: FnOnce(&ComplianceReport) -> bool,
    {
        if report.compliant() {
            return GateDecision::Proceed;
        }

        match mode {
            GateMode::Strict => GateDecision::Abort(report.deficiencies.clone()),
            GateMode::Interactive => {
                if confirm(report) {
                    GateDecision::Proceed
                } else {
                    GateDecision::Abort(report.deficiencies.clone())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(cpu: u64, ram: u64, disk: u64) -> HardwareProfile {
        HardwareProfile {
            cpu_cores: cpu,
            ram_gb: ram,
            free_disk_gb: disk,
        }
    }

    #[test]
    fn test_compliant_host_proceeds_silently() {
        let report = ComplianceGate::evaluate(&profile(32, 128, 900), &RequirementPolicy::default());
        assert!(report.compliant());

        // The confirm closure must never run for a compliant host.
        let decision = ComplianceGate::decide(&report, GateMode::Interactive, |_| {
            panic!("confirm must not be called")
        });
        assert_eq!(decision, GateDecision::Proceed);
    }

    #[test]
    fn test_each_metric_flagged_independently() {
        let policy = RequirementPolicy::default();

        let report = ComplianceGate::evaluate(&profile(8, 128, 900), &policy);
        assert_eq!(report.deficiencies, vec![Deficiency::Cpu]);

        let report = ComplianceGate::evaluate(&profile(32, 32, 900), &policy);
        assert_eq!(report.deficiencies, vec![Deficiency::Ram]);

        let report = ComplianceGate::evaluate(&profile(32, 128, 100), &policy);
        assert_eq!(report.deficiencies, vec![Deficiency::Disk]);
    }

    #[test]
    fn test_threshold_is_strictly_below() {
        // Exactly at threshold is compliant.
        let report = ComplianceGate::evaluate(&profile(16, 64, 500), &RequirementPolicy::default());
        assert!(report.compliant());

        let report = ComplianceGate::evaluate(&profile(15, 64, 500), &RequirementPolicy::default());
        assert_eq!(report.deficiencies, vec![Deficiency::Cpu]);
    }

    #[test]
    fn test_strict_mode_aborts_without_prompt() {
        let report = ComplianceGate::evaluate(&profile(8, 16, 100), &RequirementPolicy::default());

        let decision = ComplianceGate::decide(&report, GateMode::Strict, |_| {
            panic!("strict mode must not prompt")
        });
        assert_eq!(
            decision,
            GateDecision::Abort(vec![Deficiency::Cpu, Deficiency::Ram, Deficiency::Disk])
        );
    }

    #[test]
    fn test_interactive_decline_aborts() {
        let report = ComplianceGate::evaluate(&profile(8, 128, 900), &RequirementPolicy::default());
        let decision = ComplianceGate::decide(&report, GateMode::Interactive, |_| false);
        assert_eq!(decision, GateDecision::Abort(vec![Deficiency::Cpu]));
    }

    #[test]
    fn test_interactive_confirm_proceeds() {
        let report = ComplianceGate::evaluate(&profile(8, 128, 900), &RequirementPolicy::default());
        let decision = ComplianceGate::decide(&report, GateMode::Interactive, |r| {
            assert_eq!(r.deficiencies, vec![Deficiency::Cpu]);
            true
        });
        assert_eq!(decision, GateDecision::Proceed);
    }
}
