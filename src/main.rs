//! kuc - upload kubeadm and kubelet configuration to a bootstrapped cluster.
//!
//! Runs the `upload-config` init phase, either whole or one sub-phase at a
//! time, persisting the configuration the node was initialized with into
//! the cluster's control plane.

mod config;
mod constants;
mod error;
mod init;
mod k8s;
mod kubeadm;
mod phases;
mod workflow;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::{debug, error, warn};

use config::{Args, Command, Config};
use init::InitData;
use kubeadm::loader::load_init_configuration;
use workflow::{Phase, Runner};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = Config::from_args(args);

    if let Err(e) = init_tracing(&config.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    debug!("Starting kuc v{}", config::VERSION);

    if let Err(e) = run(&config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// Phases of `init`, in execution order.
fn init_phases() -> Vec<Phase> {
    vec![phases::upload_config::new_upload_config_phase()]
}

/// Main application logic.
async fn run(config: &Config) -> Result<()> {
    let runner = Runner::new(init_phases())?.with_skip_phases(config.skip_phases.clone());

    match &config.command {
        Command::Phases => {
            print_phases(&runner);
            Ok(())
        }
        Command::Explain { path } => explain_phase(&runner, path),
        Command::Init => run_phases(&runner, &[], config).await,
        Command::Phase { path } => run_phases(&runner, path, config).await,
    }
}

/// Load the configuration and run the phases addressed by `path`.
async fn run_phases(runner: &Runner, path: &[String], config: &Config) -> Result<()> {
    // Reject unknown phase names before touching the config file.
    if runner.plan(path)?.is_empty() {
        warn!("Nothing to run: every selected phase is skipped");
        return Ok(());
    }

    let cfg = load_init_configuration(config.config_path.as_deref(), &config.load_options)?;
    let data = InitData::new(cfg, config.kubeconfig_path.clone(), config.dry_run);

    let executed = runner.run(path, &data).await?;
    debug!("Completed phases: {}", executed.join(", "));

    Ok(())
}

/// Print the phase tree with the flags each phase uses.
fn print_phases(runner: &Runner) {
    for row in runner.describe() {
        let indent = "  ".repeat(row.depth);
        let short_name = row.name.rsplit('/').next().unwrap_or(&row.name);

        let aliases = if row.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", row.aliases.join(", "))
        };
        println!("{}{}{}  {}", indent, short_name.bold(), aliases, row.short);

        if !row.flags.is_empty() {
            let flags: Vec<String> = row.flags.iter().map(|f| format!("--{f}")).collect();
            println!("{}  {} {}", indent, "flags:".dimmed(), flags.join(", "));
        }
    }
}

/// Print the long description, example and flags of one phase.
fn explain_phase(runner: &Runner, path: &[String]) -> Result<()> {
    let (name, phase) = runner.find(path)?;

    println!("{}: {}", name.bold(), phase.short);
    if !phase.long.is_empty() {
        println!();
        println!("{}", phase.long);
    }
    if !phase.example.is_empty() {
        println!();
        println!("{}", "Examples:".bold());
        println!("{}", phase.example);
    }
    if !phase.phases.is_empty() {
        println!();
        println!("{}", "Sub-phases:".bold());
        for child in &phase.phases {
            println!("  {}  {}", child.name, child.short);
        }
    }
    if !phase.cmd_flags.is_empty() {
        println!();
        println!("{}", "Flags:".bold());
        for flag in &phase.cmd_flags {
            println!("  --{}", flag);
        }
    }

    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(log_level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to initialize log filter: {}", e))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
