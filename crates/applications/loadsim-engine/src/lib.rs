//! Loadsim Simulation Engine
//!
//! Real-time simulator of multi-server queueing networks for comparing
//! load-balancing policies under Poisson arrivals and exponential service.
//!
//! ```text
//! Generator → arrival queue → Dispatcher (power-of-d) → N server queues → Workers → output queue → collector
//! ```
//!
//! Simulated time is wall-clock time: every interarrival gap and service
//! duration is actually slept. Runs are not reproducible.

pub mod balancer;
pub mod config;
pub mod error;
pub mod experiment;
pub mod generator;
pub mod metrics;
pub mod queue;
pub mod report;
pub mod sampler;
pub mod server;
pub mod shutdown;
pub mod simulator;
pub mod types;

pub use config::SimulationConfig;
pub use error::{Result, SimulationError};
pub use experiment::{Experiment, ExperimentReport, Policy, run_benchmarks};
pub use metrics::Summary;
pub use shutdown::ShutdownSignal;
pub use simulator::{SimulationRun, Simulator, TaskTally};
pub use types::{Customer, TerminationReason};
