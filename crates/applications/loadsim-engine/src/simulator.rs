//! Real-time queueing network simulator
//!
//! Wires one arrival generator, one dispatcher and N server workers together
//! behind a shared [`ShutdownSignal`], then collects completed customers
//! until a termination trigger fires.
//!
//! ```text
//! Generator ─► arrival queue ─► Dispatcher ─┬─► server queue 0 ─► Worker 0 ─┐
//!                                           ├─► server queue 1 ─► Worker 1 ─┼─► output queue ─► collector
//!                                           └─► ...                         ┘
//! ```
//!
//! Lifecycle: Setup → Running → Terminating → Done. The deadline watcher and
//! the collector's customer limit race to set the signal; the first one wins
//! and the other becomes a no-op. The collector never returns without the
//! signal set, so no task keeps producing after [`Simulator::run`] returns.
//! Servers that are mid-service finish that one customer and then exit.

use crate::balancer::Dispatcher;
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::generator::ArrivalGenerator;
use crate::metrics::Summary;
use crate::queue::ServerQueue;
use crate::server::{ServerStats, ServerWorker};
use crate::shutdown::ShutdownSignal;
use crate::types::{Customer, TerminationReason};
use futures::future::join_all;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of one simulation run
#[derive(Debug)]
pub struct SimulationRun {
    /// Completed customers in completion order
    pub customers: Vec<Customer>,
    pub termination: TerminationReason,
    /// Wall-clock time from setup to collection end
    pub elapsed: Duration,
    workers: Vec<JoinHandle<TaskOutcome>>,
}

/// What one background task reported when it exited
#[derive(Debug)]
enum TaskOutcome {
    Generator(u64),
    Dispatcher(u64),
    Server(ServerStats),
    Watcher,
}

/// Counters gathered from the background tasks of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskTally {
    /// Customers created by the arrival generator
    pub generated: u64,
    /// Customers routed to a server queue
    pub dispatched: u64,
    /// Completed customers handed to the output queue
    pub served: u64,
    /// Completed customers dropped on a full output queue after shutdown
    pub dropped: u64,
    /// Tasks still running when the join timed out
    pub unfinished: usize,
}

impl SimulationRun {
    /// Aggregate statistics for this run
    pub fn summary(&self) -> Result<Summary> {
        Summary::from_customers(&self.customers, Some(self.termination))
    }

    /// Wait for the background tasks to exit and total their counters
    ///
    /// Tasks still running when `timeout` elapses are counted in
    /// [`TaskTally::unfinished`] and left detached.
    pub async fn join_workers(&mut self, timeout: Duration) -> TaskTally {
        let deadline = tokio::time::Instant::now() + timeout;
        let handles = std::mem::take(&mut self.workers);

        let joined = join_all(
            handles
                .into_iter()
                .map(|handle| tokio::time::timeout_at(deadline, handle)),
        )
        .await;

        let mut tally = TaskTally::default();
        for outcome in joined {
            match outcome {
                Ok(Ok(TaskOutcome::Generator(generated))) => tally.generated += generated,
                Ok(Ok(TaskOutcome::Dispatcher(dispatched))) => tally.dispatched += dispatched,
                Ok(Ok(TaskOutcome::Server(stats))) => {
                    tally.served += stats.served;
                    tally.dropped += stats.dropped;
                }
                Ok(Ok(TaskOutcome::Watcher)) => {}
                Ok(Err(e)) => warn!(error = %e, "Simulation task failed"),
                Err(_) => tally.unfinished += 1,
            }
        }

        info!(
            generated = tally.generated,
            dispatched = tally.dispatched,
            served = tally.served,
            dropped = tally.dropped,
            unfinished = tally.unfinished,
            "Simulation tasks joined"
        );
        tally
    }
}

/// Single-use simulator for one validated configuration
#[derive(Debug)]
pub struct Simulator {
    config: SimulationConfig,
}

impl Simulator {
    /// Validate the configuration; nothing is started yet
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Simulator { config })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run the simulation to completion
    ///
    /// Must be called from within a tokio runtime; the multi-threaded
    /// runtime lets servers run in parallel.
    pub async fn run(self) -> SimulationRun {
        let config = self.config;
        let started = Instant::now();
        let shutdown = ShutdownSignal::new();
        let mut workers = Vec::with_capacity(config.server_count + 3);

        // Setup
        let (arrival_tx, arrival_rx) = mpsc::channel(config.arrival_queue_capacity);
        let (output_tx, mut output_rx) = mpsc::channel(config.output_queue_capacity);

        let mut servers = Vec::with_capacity(config.server_count);
        for index in 0..config.server_count {
            let (queue, receiver) = ServerQueue::bounded(index, config.server_queue_capacity);
            servers.push(queue);

            let worker = ServerWorker::new(
                index,
                config.service_rate,
                receiver,
                output_tx.clone(),
                shutdown.clone(),
            );
            workers.push(tokio::spawn(async move { TaskOutcome::Server(worker.run().await) }));
        }
        // Only workers hold the output sender; the queue closes when they all exit
        drop(output_tx);

        let dispatcher = Dispatcher::new(config.choices, arrival_rx, servers, shutdown.clone());
        workers.push(tokio::spawn(async move { TaskOutcome::Dispatcher(dispatcher.run().await) }));

        let generator = ArrivalGenerator::new(config.arrival_rate, arrival_tx, shutdown.clone());
        workers.push(tokio::spawn(async move { TaskOutcome::Generator(generator.run().await) }));

        if let Some(limit) = config.time_limit {
            workers.push(spawn_deadline_watcher(limit, shutdown.clone()));
        }

        info!(
            arrival_rate = config.arrival_rate,
            service_rate = config.service_rate,
            servers = config.server_count,
            choices = config.choices,
            time_limit = ?config.time_limit,
            customer_limit = ?config.customer_limit,
            "Simulation running"
        );

        // Running, then Terminating once the signal is set
        let mut customers = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = output_rx.recv() => match next {
                    Some(customer) => {
                        debug!(customer = customer.id, collected = customers.len() + 1, "Customer collected");
                        customers.push(customer);

                        if Some(customers.len()) == config.customer_limit {
                            shutdown.trigger(TerminationReason::CustomerLimit);
                            break;
                        }
                    }
                    // Workers only exit after the signal is set, so this
                    // arm is a fallback that keeps the loop total
                    None => {
                        shutdown.trigger(TerminationReason::WorkersExited);
                        break;
                    }
                },
            }
        }

        // Done. Every exit path above leaves the signal set.
        let termination = shutdown
            .reason()
            .unwrap_or(TerminationReason::WorkersExited);
        let elapsed = started.elapsed();

        info!(
            customers = customers.len(),
            undrained = output_rx.len(),
            reason = ?termination,
            elapsed_secs = elapsed.as_secs_f64(),
            "Simulation finished"
        );

        SimulationRun {
            customers,
            termination,
            elapsed,
            workers,
        }
    }
}

/// Set the signal once `limit` has elapsed, unless something else set it first
fn spawn_deadline_watcher(limit: Duration, shutdown: ShutdownSignal) -> JoinHandle<TaskOutcome> {
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(limit) => {
                shutdown.trigger(TerminationReason::Deadline);
            }
        }
        TaskOutcome::Watcher
    })
}
