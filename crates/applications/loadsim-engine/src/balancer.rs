//! Power-of-d-choices dispatch
//!
//! One parameterised policy covers every balancer under comparison:
//!
//! - `d = 1`: uniformly random routing
//! - `d = N`: join the shortest of all queues
//! - `N = 1`: single server, no choice at all
//! - `1 < d < N`: sample `d` distinct servers, join the shortest of those
//!
//! Ties go to the candidate drawn first.

use crate::queue::{QueueDepth, ServerQueue};
use crate::shutdown::ShutdownSignal;
use crate::types::Customer;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Server selection by sampling `d` candidates and picking the shallowest
pub struct PowerOfDChoices<R = StdRng> {
    choices: usize,
    rng: R,
}

impl PowerOfDChoices {
    /// Entropy-seeded selector sampling `choices` candidates per arrival
    pub fn new(choices: usize) -> Self {
        Self::with_rng(choices, StdRng::from_entropy())
    }
}

impl<R: Rng> PowerOfDChoices<R> {
    pub fn with_rng(choices: usize, rng: R) -> Self {
        PowerOfDChoices { choices, rng }
    }

    pub fn choices(&self) -> usize {
        self.choices
    }

    /// Pick the index of the queue that should receive the next customer
    ///
    /// Only the depths of the sampled candidates are read. `queues` must be
    /// non-empty; `d` is clamped to the number of queues.
    pub fn select<Q: QueueDepth>(&mut self, queues: &[Q]) -> usize {
        let n = queues.len();
        if n <= 1 {
            return 0;
        }
        let d = self.choices.clamp(1, n);

        let mut candidates = index::sample(&mut self.rng, n, d).into_iter();
        let mut best = candidates.next().unwrap_or(0);
        let mut best_depth = queues[best].depth();

        for i in candidates {
            let depth = queues[i].depth();
            if depth < best_depth {
                best = i;
                best_depth = depth;
            }
        }

        best
    }
}

/// Routes arrivals from the shared arrival queue to server queues
pub struct Dispatcher<R = StdRng> {
    policy: PowerOfDChoices<R>,
    arrivals: mpsc::Receiver<Customer>,
    servers: Vec<ServerQueue>,
    shutdown: ShutdownSignal,
}

impl Dispatcher {
    pub fn new(
        choices: usize,
        arrivals: mpsc::Receiver<Customer>,
        servers: Vec<ServerQueue>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self::with_policy(PowerOfDChoices::new(choices), arrivals, servers, shutdown)
    }
}

impl<R: Rng> Dispatcher<R> {
    pub fn with_policy(
        policy: PowerOfDChoices<R>,
        arrivals: mpsc::Receiver<Customer>,
        servers: Vec<ServerQueue>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Dispatcher {
            policy,
            arrivals,
            servers,
            shutdown,
        }
    }

    /// Dispatch until shutdown
    ///
    /// Arrivals still buffered when shutdown is observed are abandoned.
    /// Returns the number of customers routed.
    pub async fn run(mut self) -> u64 {
        info!(
            servers = self.servers.len(),
            choices = self.policy.choices(),
            "Dispatcher started"
        );
        let mut dispatched = 0u64;

        loop {
            // A set signal wins over buffered arrivals
            let customer = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = self.arrivals.recv() => match next {
                    Some(customer) => customer,
                    None => {
                        debug!("Arrival queue closed, dispatcher stopping");
                        break;
                    }
                },
            };

            if self.servers.is_empty() {
                warn!("No server queues to dispatch to");
                break;
            }
            let target = self.policy.select(&self.servers);
            let id = customer.id;

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                sent = self.servers[target].enqueue(customer) => {
                    if sent.is_err() {
                        warn!(server = target, customer = id, "Server queue closed, dropping customer");
                        continue;
                    }
                }
            }

            debug!(server = target, customer = id, "Customer dispatched");
            dispatched += 1;
        }

        info!(dispatched, abandoned = self.arrivals.len(), "Dispatcher stopped");
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TerminationReason;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::time::{Duration, Instant};

    /// Depth source that counts how often it was consulted
    struct CountingDepth<'a> {
        depth: usize,
        reads: &'a Cell<usize>,
    }

    impl QueueDepth for CountingDepth<'_> {
        fn depth(&self) -> usize {
            self.reads.set(self.reads.get() + 1);
            self.depth
        }
    }

    #[test]
    fn test_full_choice_picks_global_minimum() {
        let depths = vec![5usize, 3, 9, 0, 4, 7];
        let mut policy = PowerOfDChoices::with_rng(depths.len(), StdRng::seed_from_u64(3));

        for _ in 0..100 {
            assert_eq!(policy.select(&depths), 3);
        }
    }

    #[test]
    fn test_full_choice_tie_goes_to_first_drawn() {
        let depths = vec![2usize, 1, 1, 1];
        let mut policy = PowerOfDChoices::with_rng(4, StdRng::seed_from_u64(11));

        let mut picked = HashSet::new();
        for _ in 0..200 {
            let i = policy.select(&depths);
            assert_eq!(depths[i], 1);
            picked.insert(i);
        }
        // Draw order is random, so every tied queue wins sometimes
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn test_single_choice_reads_one_depth() {
        let reads = Cell::new(0);
        let depths: Vec<_> = (0..8).map(|i| CountingDepth { depth: i, reads: &reads }).collect();
        let mut policy = PowerOfDChoices::with_rng(1, StdRng::seed_from_u64(5));

        let mut picked = HashSet::new();
        for round in 1..=400 {
            picked.insert(policy.select(&depths));
            assert_eq!(reads.get(), round);
        }
        // Random routing ignores depth and reaches every server
        assert_eq!(picked.len(), 8);
    }

    #[test]
    fn test_single_server_never_reads_depth() {
        let reads = Cell::new(0);
        let depths = vec![CountingDepth { depth: 42, reads: &reads }];
        let mut policy = PowerOfDChoices::with_rng(1, StdRng::seed_from_u64(5));

        for _ in 0..10 {
            assert_eq!(policy.select(&depths), 0);
        }
        assert_eq!(reads.get(), 0);
    }

    #[test]
    fn test_subset_reads_exactly_d_depths() {
        let reads = Cell::new(0);
        let depths: Vec<_> = (0..10).map(|i| CountingDepth { depth: 10 - i, reads: &reads }).collect();
        let mut policy = PowerOfDChoices::with_rng(2, StdRng::seed_from_u64(9));

        for _ in 0..50 {
            reads.set(0);
            let i = policy.select(&depths);
            assert_eq!(reads.get(), 2);
            assert!(i < 10);
        }
    }

    #[test]
    fn test_subset_never_picks_deepest_of_pair() {
        // With d = 2 the globally deepest queue can only win if sampled
        // against itself, which sampling without replacement rules out.
        let depths = vec![100usize, 1, 2, 3];
        let mut policy = PowerOfDChoices::with_rng(2, StdRng::seed_from_u64(21));

        for _ in 0..500 {
            assert_ne!(policy.select(&depths), 0);
        }
    }

    #[tokio::test]
    async fn test_dispatcher_routes_to_shortest_queue() {
        let (arrival_tx, arrival_rx) = mpsc::channel(16);
        let shutdown = ShutdownSignal::new();

        let (q0, mut r0) = ServerQueue::bounded(0, 16);
        let (q1, mut r1) = ServerQueue::bounded(1, 16);

        // Preload server 0 so it is deeper than server 1
        for id in 100..103 {
            q0.enqueue(Customer::new(id, Instant::now())).await.unwrap();
        }

        let dispatcher = Dispatcher::new(2, arrival_rx, vec![q0, q1], shutdown.clone());
        let handle = tokio::spawn(dispatcher.run());

        arrival_tx.send(Customer::new(1, Instant::now())).await.unwrap();
        let routed = tokio::time::timeout(Duration::from_secs(1), r1.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(routed.id, 1);

        shutdown.trigger(TerminationReason::Deadline);
        let dispatched = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dispatched, 1);
        assert_eq!(r0.recv().await.unwrap().id, 100);
    }

    #[tokio::test]
    async fn test_dispatcher_abandons_buffered_arrivals_on_shutdown() {
        let (arrival_tx, arrival_rx) = mpsc::channel(16);
        let shutdown = ShutdownSignal::new();
        let (q0, mut r0) = ServerQueue::bounded(0, 16);

        for id in 0..5 {
            arrival_tx.send(Customer::new(id, Instant::now())).await.unwrap();
        }
        shutdown.trigger(TerminationReason::Deadline);

        let dispatcher = Dispatcher::new(1, arrival_rx, vec![q0], shutdown.clone());
        let dispatched = tokio::spawn(dispatcher.run()).await.unwrap();

        assert_eq!(dispatched, 0);
        assert!(r0.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispatcher_never_routes_after_shutdown() {
        for _ in 0..50 {
            let (arrival_tx, arrival_rx) = mpsc::channel(16);
            let shutdown = ShutdownSignal::new();
            let (q0, mut r0) = ServerQueue::bounded(0, 16);
            let (q1, mut r1) = ServerQueue::bounded(1, 16);

            for id in 0..5 {
                arrival_tx.send(Customer::new(id, Instant::now())).await.unwrap();
            }
            shutdown.trigger(TerminationReason::CustomerLimit);

            let dispatched = Dispatcher::new(2, arrival_rx, vec![q0, q1], shutdown.clone())
                .run()
                .await;

            assert_eq!(dispatched, 0);
            assert!(r0.try_recv().is_err());
            assert!(r1.try_recv().is_err());
        }
    }
}
