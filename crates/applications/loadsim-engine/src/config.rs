//! Simulation configuration and validation

use crate::error::{Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default capacity of the shared arrival queue
pub const DEFAULT_ARRIVAL_QUEUE_CAPACITY: usize = 8192;

/// Default capacity of each server's private queue
pub const DEFAULT_SERVER_QUEUE_CAPACITY: usize = 2048;

/// Default capacity of the shared output queue
pub const DEFAULT_OUTPUT_QUEUE_CAPACITY: usize = 2048;

/// Parameters of a single simulation run
///
/// Rates are per second of wall-clock time. At least one of `time_limit` and
/// `customer_limit` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Aggregate arrival rate λ
    pub arrival_rate: f64,
    /// Per-server service rate μ
    pub service_rate: f64,
    /// Number of servers N
    pub server_count: usize,
    /// Size d of the random candidate subset, 1 ≤ d ≤ N
    pub choices: usize,
    pub time_limit: Option<Duration>,
    pub customer_limit: Option<usize>,

    #[serde(default = "default_arrival_capacity")]
    pub arrival_queue_capacity: usize,
    #[serde(default = "default_server_capacity")]
    pub server_queue_capacity: usize,
    #[serde(default = "default_output_capacity")]
    pub output_queue_capacity: usize,
}

fn default_arrival_capacity() -> usize {
    DEFAULT_ARRIVAL_QUEUE_CAPACITY
}

fn default_server_capacity() -> usize {
    DEFAULT_SERVER_QUEUE_CAPACITY
}

fn default_output_capacity() -> usize {
    DEFAULT_OUTPUT_QUEUE_CAPACITY
}

impl SimulationConfig {
    /// Create a configuration with no termination trigger yet
    ///
    /// `choices` starts at 1 (random routing).
    pub fn new(arrival_rate: f64, service_rate: f64, server_count: usize) -> Self {
        SimulationConfig {
            arrival_rate,
            service_rate,
            server_count,
            choices: 1,
            time_limit: None,
            customer_limit: None,
            arrival_queue_capacity: DEFAULT_ARRIVAL_QUEUE_CAPACITY,
            server_queue_capacity: DEFAULT_SERVER_QUEUE_CAPACITY,
            output_queue_capacity: DEFAULT_OUTPUT_QUEUE_CAPACITY,
        }
    }

    /// Set the candidate subset size d
    pub fn with_choices(mut self, choices: usize) -> Self {
        self.choices = choices;
        self
    }

    /// Stop the run after this much wall-clock time
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Stop the run once this many customers have completed
    pub fn with_customer_limit(mut self, limit: usize) -> Self {
        self.customer_limit = Some(limit);
        self
    }

    /// Override the three queue capacities
    pub fn with_queue_capacities(mut self, arrival: usize, server: usize, output: usize) -> Self {
        self.arrival_queue_capacity = arrival;
        self.server_queue_capacity = server;
        self.output_queue_capacity = output;
        self
    }

    /// Reject configurations that cannot be simulated
    pub fn validate(&self) -> Result<()> {
        if !self.arrival_rate.is_finite() || self.arrival_rate <= 0.0 {
            return Err(SimulationError::config(format!(
                "arrival_rate must be positive and finite, got {}",
                self.arrival_rate
            )));
        }
        if !self.service_rate.is_finite() || self.service_rate <= 0.0 {
            return Err(SimulationError::config(format!(
                "service_rate must be positive and finite, got {}",
                self.service_rate
            )));
        }
        if self.server_count == 0 {
            return Err(SimulationError::config("server_count must be at least 1"));
        }
        if self.choices == 0 || self.choices > self.server_count {
            return Err(SimulationError::config(format!(
                "choices must be within [1, {}], got {}",
                self.server_count, self.choices
            )));
        }

        match (self.time_limit, self.customer_limit) {
            (None, None) => {
                return Err(SimulationError::config(
                    "at least one of time_limit and customer_limit is required",
                ));
            }
            (Some(limit), _) if limit.is_zero() => {
                return Err(SimulationError::config("time_limit must be non-zero"));
            }
            (_, Some(0)) => {
                return Err(SimulationError::config("customer_limit must be non-zero"));
            }
            _ => {}
        }

        if self.arrival_queue_capacity == 0
            || self.server_queue_capacity == 0
            || self.output_queue_capacity == 0
        {
            return Err(SimulationError::config("queue capacities must be non-zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn base() -> SimulationConfig {
        SimulationConfig::new(7.5, 1.0, 10).with_time_limit(Duration::from_secs(1))
    }

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::new(1.0, 1.0, 4);
        assert_eq!(config.choices, 1);
        assert_eq!(config.arrival_queue_capacity, 8192);
        assert_eq!(config.server_queue_capacity, 2048);
        assert_eq!(config.output_queue_capacity, 2048);
    }

    #[test]
    fn test_valid_configurations() {
        assert_ok!(base().validate());
        assert_ok!(base().with_choices(10).validate());
        assert_ok!(
            SimulationConfig::new(1.0, 1.0, 1)
                .with_customer_limit(5)
                .validate()
        );
    }

    #[test]
    fn test_rejects_non_positive_rates() {
        let mut config = base();
        config.arrival_rate = 0.0;
        assert_err!(config.validate());

        let mut config = base();
        config.service_rate = -1.0;
        assert_err!(config.validate());

        let mut config = base();
        config.arrival_rate = f64::NAN;
        assert_err!(config.validate());

        let mut config = base();
        config.service_rate = f64::NAN;
        assert_err!(config.validate());

        let mut config = base();
        config.service_rate = f64::INFINITY;
        assert_err!(config.validate());
    }

    #[test]
    fn test_rejects_bad_server_and_choice_counts() {
        let mut config = base();
        config.server_count = 0;
        assert_err!(config.validate());

        assert_err!(base().with_choices(0).validate());
        assert_err!(base().with_choices(11).validate());
    }

    #[test]
    fn test_requires_termination_trigger() {
        let config = SimulationConfig::new(1.0, 1.0, 2);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SimulationError::Config(_)));

        assert_err!(
            SimulationConfig::new(1.0, 1.0, 2)
                .with_time_limit(Duration::ZERO)
                .validate()
        );
        assert_err!(
            SimulationConfig::new(1.0, 1.0, 2)
                .with_customer_limit(0)
                .validate()
        );
    }

    #[test]
    fn test_rejects_zero_capacity() {
        assert_err!(base().with_queue_capacities(0, 16, 16).validate());
        assert_err!(base().with_queue_capacities(16, 0, 16).validate());
        assert_err!(base().with_queue_capacities(16, 16, 0).validate());
    }

    #[test]
    fn test_deserialize_with_default_capacities() {
        let json = r#"{
            "arrival_rate": 7.5,
            "service_rate": 1.0,
            "server_count": 10,
            "choices": 2,
            "time_limit": { "secs": 1, "nanos": 0 },
            "customer_limit": null
        }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.choices, 2);
        assert_eq!(config.time_limit, Some(Duration::from_secs(1)));
        assert_eq!(config.server_queue_capacity, DEFAULT_SERVER_QUEUE_CAPACITY);
        assert_ok!(config.validate());
    }
}
