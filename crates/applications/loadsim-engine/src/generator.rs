//! Poisson arrival generation paced by real elapsed time

use crate::sampler::VariateSampler;
use crate::shutdown::ShutdownSignal;
use crate::types::Customer;
use rand::Rng;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Emits customers into the shared arrival queue until shutdown
pub struct ArrivalGenerator<R = rand::rngs::StdRng> {
    sampler: VariateSampler<R>,
    arrivals: mpsc::Sender<Customer>,
    shutdown: ShutdownSignal,
    next_id: u64,
}

impl ArrivalGenerator {
    /// Create a generator for aggregate arrival rate λ
    pub fn new(
        arrival_rate: f64,
        arrivals: mpsc::Sender<Customer>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self::with_sampler(VariateSampler::new(arrival_rate), arrivals, shutdown)
    }
}

impl<R: Rng> ArrivalGenerator<R> {
    pub fn with_sampler(
        sampler: VariateSampler<R>,
        arrivals: mpsc::Sender<Customer>,
        shutdown: ShutdownSignal,
    ) -> Self {
        ArrivalGenerator {
            sampler,
            arrivals,
            shutdown,
            next_id: 0,
        }
    }

    /// Run until the shutdown signal is observed
    ///
    /// Each iteration races the sampled interarrival wait against shutdown.
    /// A signal that is already set always wins. Returns the number of
    /// customers generated.
    pub async fn run(mut self) -> u64 {
        info!(rate = self.sampler.rate(), "Arrival generator started");

        loop {
            let interval = self.sampler.sample_interval();

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    let customer = Customer::new(self.next_id, Instant::now());
                    self.next_id += 1;

                    debug!(customer = customer.id, "Customer arrived");

                    // A full arrival queue applies backpressure, but never
                    // past shutdown.
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => break,
                        sent = self.arrivals.send(customer) => {
                            if sent.is_err() {
                                debug!("Arrival queue closed, generator stopping");
                                break;
                            }
                        }
                    }
                }
            }
        }

        info!(generated = self.next_id, "Arrival generator stopped");
        self.next_id
    }
}
