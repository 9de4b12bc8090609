//! CLI configuration and argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::constants::DEFAULT_KUBECONFIG_PATH;
use crate::kubeadm::loader::LoadOptions;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = env!("BUILD_COMMIT");
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Upload kubeadm and kubelet configuration to a freshly bootstrapped cluster.
///
/// Runs the `upload-config` init phase as a whole or one sub-phase at a time.
#[derive(Parser, Debug, Clone)]
#[command(name = "kuc")]
#[command(about = "Upload kubeadm and kubelet configuration to the cluster")]
#[command(version = const_format::formatcp!(
    "{} (commit: {}, build date: {})",
    VERSION, COMMIT, BUILD_DATE
))]
pub struct Args {
    /// Path to a kubeadm configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The kubeconfig file to use when talking to the cluster
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_KUBECONFIG_PATH)]
    pub kubeconfig: PathBuf,

    /// Kubernetes version of the control plane (overrides the config file)
    #[arg(long, global = true)]
    pub kubernetes_version: Option<String>,

    /// Name of this node (overrides the config file, defaults to the host name)
    #[arg(long, global = true)]
    pub node_name: Option<String>,

    /// Print the objects that would be written without touching the cluster
    #[arg(long, global = true, default_value = "false")]
    pub dry_run: bool,

    /// Phases to skip, by full name (e.g. upload-config/kubelet)
    #[arg(long, global = true, value_delimiter = ',')]
    pub skip_phases: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "KUC_LOG_LEVEL")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run every phase
    Init,

    /// Run a single phase and its sub-phases
    #[command(after_help = r#"Examples:
  kuc phase upload-config                 Upload kubeadm and kubelet configuration
  kuc phase upload-config kubelet         Upload only the kubelet configuration
  kuc phase uploadconfig/kubeadm          Aliases and '/' separated paths work too"#)]
    Phase {
        /// Phase path, e.g. `upload-config kubelet`
        #[arg(value_name = "PHASE", required = true)]
        path: Vec<String>,
    },

    /// List available phases and the flags each one uses
    Phases,

    /// Show the full description and examples of a phase
    Explain {
        /// Phase path, e.g. `upload-config kubelet`
        #[arg(value_name = "PHASE", required = true)]
        path: Vec<String>,
    },
}

/// Application configuration derived from CLI args.
#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: Option<PathBuf>,
    pub kubeconfig_path: PathBuf,
    pub load_options: LoadOptions,
    pub dry_run: bool,
    pub skip_phases: Vec<String>,
    pub log_level: String,
    pub command: Command,
}

impl Config {
    /// Create config from CLI arguments.
    pub fn from_args(args: Args) -> Self {
        let skip_phases = args
            .skip_phases
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            config_path: args.config,
            kubeconfig_path: args.kubeconfig,
            load_options: LoadOptions {
                kubernetes_version: args.kubernetes_version,
                node_name: args.node_name,
            },
            dry_run: args.dry_run,
            skip_phases,
            log_level: args.log_level,
            command: args.command,
        }
    }
}
