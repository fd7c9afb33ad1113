//! Loadsim CLI
//!
//! Runs the balancer comparison for one or more experiments and prints a
//! table per experiment.
//!
//! ```bash
//! # The two built-in experiments
//! loadsim
//!
//! # One custom experiment
//! loadsim --lambda 0.9 --servers 20 --time-limit 30 --policies rand,sq2,sq
//!
//! # Experiments from a file, results as JSON
//! loadsim --experiments experiments.json --output results.json
//! ```

use anyhow::Context;
use clap::Parser;
use std::fs;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loadsim_engine::{
    experiment::{load_experiments, parse_policies},
    report::render_table,
    run_benchmarks, Experiment,
};

#[derive(Parser, Debug)]
#[command(name = "loadsim")]
#[command(about = "Compare load-balancing policies on a real-time queueing simulation", long_about = None)]
struct Args {
    /// Arrival rate per server (customers/sec)
    #[arg(long)]
    lambda: Option<f64>,

    /// Service rate per server (customers/sec)
    #[arg(long)]
    mu: Option<f64>,

    /// Number of servers
    #[arg(short = 'n', long)]
    servers: Option<usize>,

    /// Run duration in seconds
    #[arg(short, long)]
    time_limit: Option<f64>,

    /// Stop after this many completed customers
    #[arg(short, long)]
    customer_limit: Option<usize>,

    /// Policies to compare (comma-separated: rand,single,sq,sq<d>)
    #[arg(short, long, default_value = "rand,single,sq,sq2")]
    policies: String,

    /// JSON file holding an array of experiments
    #[arg(short, long, conflicts_with_all = ["lambda", "mu", "servers", "time_limit", "customer_limit"])]
    experiments: Option<String>,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<String>,
}

impl Args {
    fn has_custom_experiment(&self) -> bool {
        self.lambda.is_some()
            || self.mu.is_some()
            || self.servers.is_some()
            || self.time_limit.is_some()
            || self.customer_limit.is_some()
    }

    fn experiments(&self) -> anyhow::Result<Vec<Experiment>> {
        if let Some(path) = &self.experiments {
            return load_experiments(path)
                .with_context(|| format!("Failed to load experiments from {}", path));
        }
        if !self.has_custom_experiment() {
            return Ok(Experiment::builtin());
        }

        Ok(vec![Experiment {
            lambda: self.lambda.unwrap_or(0.75),
            mu: self.mu.unwrap_or(1.0),
            server_count: self.servers.unwrap_or(10),
            time_limit_secs: self.time_limit,
            customer_limit: self.customer_limit,
        }])
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadsim=info,loadsim_engine=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let policies = parse_policies(&args.policies)?;
    let experiments = args.experiments()?;

    let mut reports = Vec::with_capacity(experiments.len());
    for experiment in &experiments {
        info!(?experiment, "Running experiment");
        let report = run_benchmarks(experiment, &policies).await?;
        println!("{}", render_table(&report));
        reports.push(report);
    }

    if let Some(path) = args.output {
        let json = serde_json::to_string_pretty(&reports)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path))?;
        info!(path = %path, "Results written");
    }

    Ok(())
}
