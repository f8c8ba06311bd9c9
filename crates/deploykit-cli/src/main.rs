//! deploykit - Terraform + EKS + Helm deployment CLI
//!
//! ## Commands
//!
//! - `deploy`: provision (if needed), install releases, validate
//! - `destroy`: uninstall releases, then destroy the infrastructure
//! - `validate`: check an existing deployment
//! - `outputs`: print Terraform outputs as JSON
//! - `releases`: list Helm releases in the topology's namespace
//!
//! Exit codes: 0 on success, 1 on failure, 130 when interrupted.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use deploykit_core::config::keys;
use deploykit_core::telemetry::{init_tracing, level_for};
use deploykit_core::{obs, EnvFile, SystemCommandRunner};
use deploykit_orchestrator::{
    ClusterOrchestrator, DeployOptions, PublicFullnode, Topology, ValidatorVfn,
};
use deploykit_validate::{HttpHealthProbe, KubeconfigConnector, ValidationSettings};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "deploykit")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Provision an EKS cluster, roll out nodes with Helm and validate them", long_about = None)]
struct Cli {
    /// Environment file with deployment settings
    #[arg(long, global = true, env = "DEPLOYKIT_ENV_FILE", default_value = ".env")]
    env_file: PathBuf,

    /// Deployment topology
    #[arg(long, global = true, value_enum, default_value_t = TopologyKind::PublicFullnode)]
    topology: TopologyKind,

    /// Terraform working directory (default: TERRAFORM_DIR or terraform/<topology>)
    #[arg(long, global = true)]
    terraform_dir: Option<PathBuf>,

    /// Helm chart directory (default: CHART_DIR or the topology's chart)
    #[arg(long, global = true)]
    chart_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TopologyKind {
    PublicFullnode,
    ValidatorVfn,
}

impl TopologyKind {
    fn slug(self) -> &'static str {
        match self {
            TopologyKind::PublicFullnode => "public-fullnode",
            TopologyKind::ValidatorVfn => "validator-vfn",
        }
    }

    fn default_chart(self) -> &'static str {
        match self {
            TopologyKind::PublicFullnode => "charts/movement-fullnode",
            TopologyKind::ValidatorVfn => "charts/movement-node",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Provision infrastructure, deploy releases and validate them
    Deploy {
        /// Run Terraform even if the cluster already exists
        #[arg(long)]
        force_create: bool,

        /// Skip the load balancer / API health check
        #[arg(long)]
        no_api_check: bool,

        /// Pass --wait to Helm with this timeout in seconds
        #[arg(long)]
        helm_wait: Option<u64>,
    },

    /// Uninstall releases and destroy the infrastructure
    Destroy,

    /// Validate an existing deployment
    Validate {
        /// Skip the load balancer / API health check
        #[arg(long)]
        no_api_check: bool,
    },

    /// Print Terraform outputs as JSON
    Outputs,

    /// List Helm releases in the deployment namespace
    Releases,
}

/// Filesystem locations derived from flags and the environment file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    root: PathBuf,
    terraform_dir: PathBuf,
    chart_dir: PathBuf,
}

impl Layout {
    /// Relative paths resolve against the environment file's directory.
    fn resolve(cli: &Cli, env: &EnvFile) -> Self {
        let root = cli
            .env_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let pick = |flag: &Option<PathBuf>, key: &str, default: String| {
            let path = flag
                .clone()
                .or_else(|| env.get(key).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(default));
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        };
        let terraform_dir = pick(
            &cli.terraform_dir,
            keys::TERRAFORM_DIR,
            format!("terraform/{}", cli.topology.slug()),
        );
        let chart_dir = pick(
            &cli.chart_dir,
            keys::CHART_DIR,
            cli.topology.default_chart().to_string(),
        );
        Self {
            root,
            terraform_dir,
            chart_dir,
        }
    }
}

fn build_topology(kind: TopologyKind, env: &EnvFile, layout: &Layout) -> Result<Box<dyn Topology>> {
    let topology: Box<dyn Topology> = match kind {
        TopologyKind::PublicFullnode => Box::new(PublicFullnode::from_env(
            env,
            &layout.root,
            &layout.chart_dir,
        )?),
        TopologyKind::ValidatorVfn => {
            Box::new(ValidatorVfn::from_env(env, &layout.chart_dir)?)
        }
    };
    Ok(topology)
}

async fn run(cli: Cli) -> Result<()> {
    let env = EnvFile::load(&cli.env_file)
        .with_context(|| format!("Failed to load environment file {}", cli.env_file.display()))?;
    let layout = Layout::resolve(&cli, &env);
    let topology = build_topology(cli.topology, &env, &layout)?;

    let runner = Arc::new(SystemCommandRunner::with_aws(&env.aws_context()));
    let http_timeout = ValidationSettings::from_env(&env)?.http_timeout;
    let orchestrator = ClusterOrchestrator::new(
        &layout.terraform_dir,
        runner,
        Arc::new(KubeconfigConnector::new(None)),
        Arc::new(HttpHealthProbe::new(http_timeout)?),
    );

    match cli.command {
        Commands::Deploy {
            force_create,
            no_api_check,
            helm_wait,
        } => {
            let options = DeployOptions {
                skip_if_exists: !force_create,
                validate_api: !no_api_check,
                helm_wait: helm_wait.map(std::time::Duration::from_secs),
                ..Default::default()
            };
            let report = orchestrator.deploy(topology.as_ref(), &options).await?;
            if cli.json {
                println!("{}", serde_json::to_string(&report)?);
            }
        }
        Commands::Destroy => orchestrator.destroy(topology.as_ref()).await?,
        Commands::Validate { no_api_check } => {
            let outcome = orchestrator
                .validate(topology.as_ref(), !no_api_check)
                .await?;
            if cli.json {
                println!("{}", serde_json::to_string(&outcome)?);
            }
        }
        Commands::Outputs => {
            let outputs = orchestrator.outputs().await?;
            println!("{}", serde_json::to_string_pretty(&outputs)?);
        }
        Commands::Releases => orchestrator.releases(topology.as_ref()).await?,
    }
    Ok(())
}

/// Resolves on Ctrl-C. Without a signal handler it never resolves.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json, level_for(cli.verbose));

    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                obs::error(format!("{e:#}"));
                ExitCode::FAILURE
            }
        },
        _ = interrupted() => {
            obs::warn("Operation interrupted by user");
            ExitCode::from(130)
        }
    }
}
