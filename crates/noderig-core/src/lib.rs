//! noderig-core - domain logic for the noderig host provisioner.
//!
//! This crate holds everything that can be decided without touching the
//! host: hardware probing and the compliance gate, the workload (compose)
//! specification, the startup readiness state machine, and the final run
//! report. Host mutation lives in `noderig-sys`; wiring lives in the
//! `noderig` binary.

pub mod error;
pub mod gate;
pub mod hardware;
pub mod readiness;
pub mod report;
pub mod telemetry;
pub mod workload;

// Re-export key types
pub use error::{ProvisionError, Result};
pub use gate::{ComplianceGate, ComplianceReport, Deficiency, GateDecision, GateMode};
pub use hardware::{probe_hardware, HardwareProfile, RequirementPolicy};
pub use readiness::{watch_startup, LogSource, ReadinessConfig, ReadinessSignal};
pub use report::{RunReport, RunSummary, SUMMARY_FILE, UNKNOWN_IP};
pub use telemetry::init_tracing;
pub use workload::{WorkloadInputs, WorkloadSpec, DEFAULT_IMAGE};
