//! leastload — run a balancer against synthetic request traffic.
//!
//! # Usage
//!
//! ```text
//! leastload run --workers 7 --requests 4000
//! leastload run --config leastload.toml --balancer round-robin --format json
//! leastload names 30
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use leastload_core::{BalancerKind, ExpiryPolicy, LeastLoadConfig, worker_names};
use leastload_sim::Simulation;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "leastload",
    about = "Least-loaded balancing over leased workers",
    version,
    propagate_version = true
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive a balancer with synthetic requests and print a summary.
    Run {
        /// Path to leastload.toml. Defaults apply when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum)]
        balancer: Option<BalancerArg>,

        /// Number of workers.
        #[arg(short, long)]
        workers: Option<usize>,

        /// Number of requests to issue.
        #[arg(short, long)]
        requests: Option<usize>,

        /// Which lease a fired expiry check removes.
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        /// Seed for lease durations and request timings.
        #[arg(long)]
        seed: Option<u64>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Print the generated worker names.
    Names {
        count: usize,
    },
    /// Print the effective configuration as TOML.
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BalancerArg {
    LeastLoaded,
    RoundRobin,
}

impl From<BalancerArg> for BalancerKind {
    fn from(arg: BalancerArg) -> Self {
        match arg {
            BalancerArg::LeastLoaded => BalancerKind::LeastLoaded,
            BalancerArg::RoundRobin => BalancerKind::RoundRobin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Owner,
    FirstExpired,
}

impl From<PolicyArg> for ExpiryPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Owner => ExpiryPolicy::Owner,
            PolicyArg::FirstExpired => ExpiryPolicy::FirstExpired,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<LeastLoadConfig> {
    match path {
        Some(path) => LeastLoadConfig::from_file(path),
        None => Ok(LeastLoadConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,leastload=debug"))?;
    let logs = tracing_subscriber::fmt().with_env_filter(filter);
    if cli.log_json {
        logs.json().init();
    } else {
        logs.init();
    }

    match cli.command {
        Command::Run {
            config,
            balancer,
            workers,
            requests,
            policy,
            seed,
            format,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(balancer) = balancer {
                config.simulation.balancer = balancer.into();
            }
            if let Some(workers) = workers {
                config.simulation.workers = workers;
            }
            if let Some(requests) = requests {
                config.simulation.requests = requests;
            }
            if let Some(policy) = policy {
                config.lease.policy = policy.into();
            }

            let summary = Simulation::new(config, seed)?.run().await?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
                _ => println!("{summary}"),
            }
            Ok(())
        }
        Command::Names { count } => {
            println!("{}", worker_names(count).join(" "));
            Ok(())
        }
        Command::Config { config } => {
            print!("{}", load_config(config.as_ref())?.to_toml_string()?);
            Ok(())
        }
    }
}
