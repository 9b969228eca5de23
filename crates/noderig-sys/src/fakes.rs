//! In-memory [`SystemExec`] fake for tests.
//!
//! Records every invocation and replays scripted outcomes, so provisioning
//! steps can be verified command-by-command without a host.

use crate::exec::{CmdOutput, SystemExec};
use async_trait::async_trait;
use noderig_core::{ProvisionError, Result};
use std::collections::HashSet;
use std::sync::Mutex;

/// Scripted executor. The default answers every command with success and
/// reports no binaries on PATH.
#[derive(Default)]
pub struct FakeExec {
    invocations: Mutex<Vec<String>>,
    binaries: HashSet<String>,
    failures: Vec<(String, CmdOutput)>,
    spawn_failures: HashSet<String>,
}

impl FakeExec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `binary` resolves on PATH.
    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binaries.insert(binary.to_string());
        self
    }

    /// Answer any command whose rendered line contains `pattern` with the
    /// given output instead of success.
    pub fn with_failure(mut self, pattern: &str, output: CmdOutput) -> Self {
        self.failures.push((pattern.to_string(), output));
        self
    }

    /// Make any command whose rendered line contains `pattern` fail to
    /// spawn entirely.
    pub fn with_spawn_failure(mut self, pattern: &str) -> Self {
        self.spawn_failures.insert(pattern.to_string());
        self
    }

    /// Every command line run so far, in order.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }

    /// Whether any recorded command line contains `pattern`.
    pub fn ran(&self, pattern: &str) -> bool {
        self.invocations().iter().any(|line| line.contains(pattern))
    }
}

#[async_trait]
impl SystemExec for FakeExec {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput> {
        let line = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };
        self.invocations.lock().unwrap().push(line.clone());

        if self
            .spawn_failures
            .iter()
            .any(|pattern| line.contains(pattern))
        {
            return Err(ProvisionError::step(program, "failed to spawn (scripted)"));
        }

        for (pattern, output) in &self.failures {
            if line.contains(pattern) {
                return Ok(output.clone());
            }
        }

        Ok(CmdOutput::ok())
    }

    fn binary_on_path(&self, binary: &str) -> bool {
        self.binaries.contains(binary)
    }
}
