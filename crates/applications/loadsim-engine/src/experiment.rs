//! Balancing policy presets and benchmark runs
//!
//! Compares the four balancers side by side for one experiment:
//!
//! - **Rand**: route each arrival to a uniformly random server
//! - **Single**: one server N times as fast
//! - **SQ**: join the shortest of all N queues
//! - **SQ(d)**: join the shortest of d randomly sampled queues
//!
//! All four are parameterisations of [`crate::balancer::PowerOfDChoices`].

use crate::config::SimulationConfig;
use crate::error::{Result, SimulationError};
use crate::metrics::Summary;
use crate::sampler::secs_to_duration;
use crate::simulator::Simulator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Per-server parameters of one comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Arrival rate per server λ
    pub lambda: f64,
    /// Service rate per server μ
    pub mu: f64,
    pub server_count: usize,
    pub time_limit_secs: Option<f64>,
    pub customer_limit: Option<usize>,
}

impl Experiment {
    /// The two comparisons run when no experiment file is given:
    /// a one-minute run, and a run capped at 500 customers
    pub fn builtin() -> Vec<Experiment> {
        vec![
            Experiment {
                lambda: 0.75,
                mu: 1.0,
                server_count: 10,
                time_limit_secs: Some(60.0),
                customer_limit: None,
            },
            Experiment {
                lambda: 0.75,
                mu: 1.0,
                server_count: 10,
                time_limit_secs: None,
                customer_limit: Some(500),
            },
        ]
    }
}

/// Load a JSON array of experiments
pub fn load_experiments(path: impl AsRef<Path>) -> Result<Vec<Experiment>> {
    let contents = std::fs::read_to_string(path)?;
    let experiments: Vec<Experiment> = serde_json::from_str(&contents)?;
    if experiments.is_empty() {
        return Err(SimulationError::config("experiment file lists no experiments"));
    }
    Ok(experiments)
}

/// Balancing policy under comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Policy {
    Random,
    SingleServer,
    ShortestQueue,
    ShortestQueueSubset(usize),
}

impl Policy {
    /// The default comparison set: Rand, Single, SQ, SQ(2)
    pub fn defaults() -> Vec<Policy> {
        vec![
            Policy::Random,
            Policy::SingleServer,
            Policy::ShortestQueue,
            Policy::ShortestQueueSubset(2),
        ]
    }

    /// Build the run configuration for this policy
    ///
    /// Every policy sees the same aggregate arrival rate λ·N. The single
    /// server gets the aggregate service rate μ·N.
    pub fn configure(&self, experiment: &Experiment) -> SimulationConfig {
        let n = experiment.server_count;
        let arrival_rate = experiment.lambda * n as f64;

        let (service_rate, servers, choices) = match *self {
            Policy::Random => (experiment.mu, n, 1),
            Policy::SingleServer => (experiment.mu * n as f64, 1, 1),
            Policy::ShortestQueue => (experiment.mu, n, n),
            Policy::ShortestQueueSubset(d) => (experiment.mu, n, d),
        };

        let mut config = SimulationConfig::new(arrival_rate, service_rate, servers).with_choices(choices);
        if let Some(secs) = experiment.time_limit_secs {
            config = config.with_time_limit(secs_to_duration(secs));
        }
        if let Some(limit) = experiment.customer_limit {
            config = config.with_customer_limit(limit);
        }
        config
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Random => write!(f, "Rand"),
            Policy::SingleServer => write!(f, "Single"),
            Policy::ShortestQueue => write!(f, "SQ"),
            Policy::ShortestQueueSubset(d) => write!(f, "SQ({})", d),
        }
    }
}

impl FromStr for Policy {
    type Err = SimulationError;

    /// Parse `rand`, `single`, `sq` or `sq<d>` (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "rand" | "random" => Ok(Policy::Random),
            "single" => Ok(Policy::SingleServer),
            "sq" => Ok(Policy::ShortestQueue),
            other => other
                .strip_prefix("sq")
                .and_then(|d| d.parse::<usize>().ok())
                .map(Policy::ShortestQueueSubset)
                .ok_or_else(|| SimulationError::config(format!("Unknown policy: {}", s))),
        }
    }
}

/// Parse a comma-separated policy list
pub fn parse_policies(list: &str) -> Result<Vec<Policy>> {
    list.split(',')
        .filter(|p| !p.trim().is_empty())
        .map(Policy::from_str)
        .collect()
}

/// One line of a benchmark table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub policy: Policy,
    pub label: String,
    pub summary: Option<Summary>,
    pub error: Option<String>,
}

/// Results of every policy for one experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub experiment: Experiment,
    pub rows: Vec<BenchmarkRow>,
}

/// Run every policy against the experiment, one after another
///
/// All configurations are validated before the first run starts. A run that
/// completes no customers produces a row carrying the error.
pub async fn run_benchmarks(experiment: &Experiment, policies: &[Policy]) -> Result<ExperimentReport> {
    let simulators = policies
        .iter()
        .map(|policy| -> Result<(Policy, Simulator)> {
            Ok((*policy, Simulator::new(policy.configure(experiment))?))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(simulators.len());
    for (policy, simulator) in simulators {
        info!(policy = %policy, "Starting benchmark run");
        let run = simulator.run().await;

        let row = match run.summary() {
            Ok(summary) => BenchmarkRow {
                policy,
                label: policy.to_string(),
                summary: Some(summary),
                error: None,
            },
            Err(e) => {
                warn!(policy = %policy, error = %e, "Benchmark run produced no statistics");
                BenchmarkRow {
                    policy,
                    label: policy.to_string(),
                    summary: None,
                    error: Some(e.to_string()),
                }
            }
        };
        rows.push(row);
    }

    Ok(ExperimentReport {
        experiment: experiment.clone(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::assert_err;

    fn experiment() -> Experiment {
        Experiment {
            lambda: 0.75,
            mu: 1.0,
            server_count: 10,
            time_limit_secs: Some(1.5),
            customer_limit: Some(500),
        }
    }

    #[test]
    fn test_policy_configuration() {
        let exp = experiment();

        let random = Policy::Random.configure(&exp);
        assert!((random.arrival_rate - 7.5).abs() < 1e-12);
        assert_eq!(random.service_rate, 1.0);
        assert_eq!((random.server_count, random.choices), (10, 1));

        let single = Policy::SingleServer.configure(&exp);
        assert!((single.arrival_rate - 7.5).abs() < 1e-12);
        assert_eq!(single.service_rate, 10.0);
        assert_eq!((single.server_count, single.choices), (1, 1));

        let sq = Policy::ShortestQueue.configure(&exp);
        assert_eq!((sq.server_count, sq.choices), (10, 10));

        let sq2 = Policy::ShortestQueueSubset(2).configure(&exp);
        assert_eq!((sq2.server_count, sq2.choices), (10, 2));
        assert_eq!(sq2.time_limit, Some(Duration::from_millis(1500)));
        assert_eq!(sq2.customer_limit, Some(500));

        for policy in Policy::defaults() {
            assert!(policy.configure(&exp).validate().is_ok());
        }
    }

    #[test]
    fn test_policy_labels() {
        let labels: Vec<String> = Policy::defaults().iter().map(|p| p.to_string()).collect();
        assert_eq!(labels, vec!["Rand", "Single", "SQ", "SQ(2)"]);
    }

    #[test]
    fn test_parse_policies() {
        let policies = parse_policies("rand, Single,sq,sq3,").unwrap();
        assert_eq!(
            policies,
            vec![
                Policy::Random,
                Policy::SingleServer,
                Policy::ShortestQueue,
                Policy::ShortestQueueSubset(3),
            ]
        );

        assert_err!(parse_policies("rand,fastest"));
        assert_err!(parse_policies("sqx"));
    }

    #[test]
    fn test_builtin_experiments() {
        let builtin = Experiment::builtin();
        assert_eq!(builtin.len(), 2);
        assert_eq!(builtin[0].time_limit_secs, Some(60.0));
        assert_eq!(builtin[1].customer_limit, Some(500));
    }

    #[test]
    fn test_load_experiments() {
        let path = std::env::temp_dir().join(format!("loadsim-experiments-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"lambda": 0.5, "mu": 1.0, "server_count": 4, "time_limit_secs": 2.0, "customer_limit": null}]"#,
        )
        .unwrap();

        let experiments = load_experiments(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(experiments.len(), 1);
        assert_eq!(experiments[0].server_count, 4);

        assert!(matches!(
            load_experiments("/nonexistent/loadsim.json"),
            Err(SimulationError::Io(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_benchmarks_rejects_invalid_policy_before_running() {
        let exp = experiment();
        let result = run_benchmarks(&exp, &[Policy::Random, Policy::ShortestQueueSubset(11)]).await;
        assert!(matches!(result, Err(SimulationError::Config(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_benchmarks_produces_one_row_per_policy() {
        let exp = Experiment {
            lambda: 40.0,
            mu: 50.0,
            server_count: 4,
            time_limit_secs: Some(5.0),
            customer_limit: Some(20),
        };
        let report = run_benchmarks(&exp, &Policy::defaults()).await.unwrap();

        assert_eq!(report.rows.len(), 4);
        for row in &report.rows {
            let summary = row.summary.as_ref().expect("run produced statistics");
            assert_eq!(summary.customers, 20);
            assert!(row.error.is_none());
        }
    }
}
