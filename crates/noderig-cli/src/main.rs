//! noderig - one-shot host provisioner for a supervised blockchain-node
//! container.
//!
//! Brings a bare Debian-family machine to a running, systemd-supervised
//! Docker workload in one strictly linear pass:
//!
//! 1. privilege check and hardware probe
//! 2. compliance gate (abort / confirm-and-continue)
//! 3. container runtime install (skipped when already present)
//! 4. kernel, limits and firewall tuning
//! 5. compose file generation
//! 6. supervisor unit registration
//! 7. image pull, unit start, startup readiness detection
//! 8. final report
//!
//! Every step is idempotent; a failed run can simply be re-run. There is
//! no rollback. Concurrent runs on the same host are out of scope.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn, Level};

use noderig_core::{
    probe_hardware, watch_startup, ComplianceGate, ComplianceReport, Deficiency, GateDecision,
    GateMode, HardwareProfile, ProvisionError, ReadinessConfig, ReadinessSignal,
    RequirementPolicy, RunReport, RunSummary, WorkloadInputs, WorkloadSpec, DEFAULT_IMAGE,
};
use noderig_sys::{
    detect_public_ip, ensure_container_runtime, ensure_firewall, ensure_kernel_parameters,
    pull_workload_image, ComposeLogSource, HostExec, SupervisorUnit, SystemExec,
};

#[derive(Parser)]
#[command(name = "noderig")]
#[command(author = "Noderig Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Provision this host as a supervised blockchain node", long_about = None)]
struct Cli {
    /// Install directory for the compose file and node data
    #[arg(long, default_value = "/opt/noderig")]
    install_dir: PathBuf,

    /// Container image reference for the node workload
    #[arg(long, default_value = DEFAULT_IMAGE)]
    image: String,

    /// Expose the RPC port on all interfaces instead of loopback-only
    #[arg(long, env = "NODERIG_EXPOSE_RPC", default_value_t = false)]
    expose_rpc: bool,

    /// Treat any hardware shortfall or tuning failure as fatal (no prompts)
    #[arg(long)]
    strict: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

/// Resolved configuration for one provisioning run.
struct ProvisionConfig {
    install_dir: PathBuf,
    /// Root for host config files; `/etc` outside of tests.
    etc_root: PathBuf,
    image_reference: String,
    expose_rpc: bool,
    strict: bool,
    readiness: ReadinessConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // Durable install log for post-mortem review. If the install dir cannot
    // be created yet (e.g. missing privilege), log to the terminal only and
    // let the privilege check produce the real diagnostic.
    let log_file = std::fs::create_dir_all(&cli.install_dir)
        .ok()
        .map(|_| cli.install_dir.join("install.log"));
    noderig_core::init_tracing(cli.json, level, log_file.as_deref());

    let exec = HostExec;
    ensure_root(&exec).await?;

    let profile = probe_hardware(&cli.install_dir);
    info!(
        cpu_cores = profile.cpu_cores,
        ram_gb = profile.ram_gb,
        free_disk_gb = profile.free_disk_gb,
        "host hardware probed"
    );

    let config = ProvisionConfig {
        install_dir: cli.install_dir.clone(),
        etc_root: PathBuf::from("/etc"),
        image_reference: cli.image.clone(),
        expose_rpc: cli.expose_rpc,
        strict: cli.strict,
        readiness: ReadinessConfig::default(),
    };

    let outcome = run_pipeline(&config, profile, &exec, prompt_continue)
        .await
        .context("provisioning failed")?;

    let public_ip = detect_public_ip().await;

    let summary = RunSummary {
        profile,
        install_dir: config.install_dir.clone(),
        external_rpc_exposed: config.expose_rpc,
        public_ip: public_ip.clone(),
        accepted_deficiencies: outcome.accepted_deficiencies,
        readiness: outcome.readiness.clone(),
        warnings: outcome.warnings.clone(),
    };
    match summary.write(&config.install_dir) {
        Ok(path) => info!(path = ?path, "machine-readable run summary written"),
        Err(e) => warn!("could not write run summary: {}", e),
    }

    let report = RunReport {
        install_dir: &config.install_dir,
        external_rpc_exposed: config.expose_rpc,
        public_ip,
        readiness: &outcome.readiness,
        warnings: &outcome.warnings,
    };
    println!("{}", report.render());

    Ok(())
}

/// The tool mutates package state, kernel files and systemd units; root is
/// required up front, fatal otherwise.
async fn ensure_root(exec: &dyn SystemExec) -> std::result::Result<(), ProvisionError> {
    let output = exec.run("id", &["-u"]).await?;
    if output.stdout.trim() == "0" {
        Ok(())
    } else {
        Err(ProvisionError::PrivilegeRequired)
    }
}

/// Everything a finished run hands back for the report and summary.
#[derive(Debug)]
struct PipelineOutcome {
    readiness: ReadinessSignal,
    warnings: Vec<String>,
    /// Deficiencies the operator chose to continue past (empty on a
    /// compliant host).
    accepted_deficiencies: Vec<Deficiency>,
}

/// Run the provisioning steps in order, fail-fast, no rollback.
///
/// `confirm` is only consulted by the compliance gate in interactive
/// (non-strict) mode.
async fn run_pipeline<F>(
    config: &ProvisionConfig,
    profile: HardwareProfile,
    exec: &dyn SystemExec,
    confirm: F,
) -> std::result::Result<PipelineOutcome, ProvisionError>
where
    F: FnOnce(&ComplianceReport) -> bool,
{
    // Compliance gate: the only interactive branch point. Side-effect free,
    // so an abort here leaves the host untouched.
    let report = ComplianceGate::evaluate(&profile, &RequirementPolicy::default());
    let mode = if config.strict {
        GateMode::Strict
    } else {
        GateMode::Interactive
    };
    if let GateDecision::Abort(deficiencies) = ComplianceGate::decide(&report, mode, confirm) {
        return Err(match mode {
            GateMode::Strict => ProvisionError::RequirementsNotMet(deficiencies),
            GateMode::Interactive => ProvisionError::OperatorDeclined,
        });
    }
    let accepted_deficiencies = report.deficiencies;

    ensure_container_runtime(exec).await?;

    let mut warnings = ensure_kernel_parameters(exec, &config.etc_root, config.strict).await?;
    warnings.extend(ensure_firewall(exec, config.expose_rpc).await);

    let inputs = WorkloadInputs {
        install_dir: config.install_dir.clone(),
        image_reference: config.image_reference.clone(),
        external_rpc_exposed: config.expose_rpc,
    };
    WorkloadSpec::from_inputs(&inputs).write_compose(&config.install_dir)?;

    let unit = SupervisorUnit::for_install_dir(&config.install_dir);
    unit.register(exec, &config.etc_root).await?;

    pull_workload_image(exec, &config.install_dir).await?;
    unit.start(exec).await?;

    let mut source = ComposeLogSource::new(exec, &config.install_dir);
    let readiness = watch_startup(&config.readiness, &mut source).await;
    if readiness == ReadinessSignal::TimedOut {
        warn!("workload started but liveness was not confirmed within the poll budget");
    }

    Ok(PipelineOutcome {
        readiness,
        warnings,
        accepted_deficiencies,
    })
}

/// Present gate deficiencies and ask for explicit continuation.
/// Non-affirmative input aborts (fail-closed).
fn prompt_continue(report: &ComplianceReport) -> bool {
    println!("This host is below the recommended hardware requirements:");
    for detail in &report.details {
        println!("  - {}", detail);
    }
    print!("Continue anyway? [y/N]: ");
    std::io::stdout().flush().ok();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    is_affirmative(&answer)
}

/// Only an explicit yes continues.
fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
