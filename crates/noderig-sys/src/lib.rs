//! noderig-sys - host-mutating provisioning steps.
//!
//! Each operation here is an idempotent "ensure target state" function:
//! repeated invocation converges to the same end state instead of failing
//! or duplicating work. All host commands go through the [`SystemExec`]
//! seam so tests drive the steps with [`fakes::FakeExec`].
//!
//! The tool assumes it is the sole writer to the host's package state,
//! kernel-parameter files, firewall rule set, install directory and
//! systemd unit directory for the duration of a run. Concurrent runs on
//! the same host are out of scope and may race.

pub mod exec;
pub mod fakes;
pub mod netinfo;
pub mod runtime;
pub mod startup;
pub mod supervisor;
pub mod tuner;

// Re-export key types
pub use exec::{run_checked, CmdOutput, HostExec, SystemExec};
pub use netinfo::detect_public_ip;
pub use runtime::ensure_container_runtime;
pub use startup::{pull_workload_image, ComposeLogSource};
pub use supervisor::{SupervisorUnit, UNIT_NAME};
pub use tuner::{ensure_firewall, ensure_kernel_parameters};
