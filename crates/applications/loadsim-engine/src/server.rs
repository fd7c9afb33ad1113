//! Server workers
//!
//! A worker serves its private queue strictly FIFO. Waiting for the next
//! customer races against shutdown, and a signal that is already set wins
//! over a non-empty queue. Service itself is not raced. Once a
//! customer is picked up, the full sampled service duration elapses before
//! the worker looks at the signal again.
//!
//! Completed customers go to the shared output queue. After shutdown nobody
//! may be draining that queue any more, so emission switches to a
//! non-blocking send and drops the customer if the queue is full.

use crate::sampler::VariateSampler;
use crate::shutdown::ShutdownSignal;
use crate::types::Customer;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-worker counters reported when the worker exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub served: u64,
    pub dropped: u64,
}

/// One server: consumes its queue, simulates service, emits completions
pub struct ServerWorker<R = rand::rngs::StdRng> {
    index: usize,
    sampler: VariateSampler<R>,
    queue: mpsc::Receiver<Customer>,
    output: mpsc::Sender<Customer>,
    shutdown: ShutdownSignal,
}

impl ServerWorker {
    pub fn new(
        index: usize,
        service_rate: f64,
        queue: mpsc::Receiver<Customer>,
        output: mpsc::Sender<Customer>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self::with_sampler(index, VariateSampler::new(service_rate), queue, output, shutdown)
    }
}

impl<R: Rng> ServerWorker<R> {
    pub fn with_sampler(
        index: usize,
        sampler: VariateSampler<R>,
        queue: mpsc::Receiver<Customer>,
        output: mpsc::Sender<Customer>,
        shutdown: ShutdownSignal,
    ) -> Self {
        ServerWorker {
            index,
            sampler,
            queue,
            output,
            shutdown,
        }
    }

    /// Serve customers until shutdown or until the queue closes
    pub async fn run(mut self) -> ServerStats {
        let mut stats = ServerStats::default();
        debug!(server = self.index, "Server worker started");

        loop {
            // Biased: a set signal beats a non-empty queue, so no new
            // service starts after shutdown
            let mut customer = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = self.queue.recv() => match next {
                    Some(customer) => customer,
                    None => break,
                },
            };

            customer.waiting_time = Some(customer.arrival_time.elapsed());
            let service_time = self.sampler.sample_interval();

            // Not cancellable: started service always runs to completion
            tokio::time::sleep(service_time).await;
            customer.service_time = Some(service_time);

            debug!(
                server = self.index,
                customer = customer.id,
                waiting_us = customer.waiting().as_micros() as u64,
                service_us = service_time.as_micros() as u64,
                "Customer served"
            );

            if self.emit(customer).await {
                stats.served += 1;
            } else {
                stats.dropped += 1;
            }
        }

        info!(
            server = self.index,
            served = stats.served,
            dropped = stats.dropped,
            "Server worker stopped"
        );
        stats
    }

    /// Hand a completed customer to the output queue
    ///
    /// Blocks for space only while the run is live. Returns `false` if the
    /// customer was dropped.
    async fn emit(&self, customer: Customer) -> bool {
        if !self.shutdown.is_set() {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {}
                permit = self.output.reserve() => {
                    return match permit {
                        Ok(permit) => {
                            permit.send(customer);
                            true
                        }
                        Err(_) => false,
                    };
                }
            }
        }

        match self.output.try_send(customer) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(customer)) => {
                warn!(
                    server = self.index,
                    customer = customer.id,
                    "Output queue full after shutdown, dropping completed customer"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}
