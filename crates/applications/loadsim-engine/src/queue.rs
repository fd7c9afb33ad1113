//! Bounded server queues
//!
//! Each server owns the receiving half of one bounded channel; the
//! dispatcher holds the sending halves and reads their current depth as the
//! load signal for power-of-d routing.

use crate::types::Customer;
use tokio::sync::mpsc;

/// Anything that can report how many customers are waiting in it
pub trait QueueDepth {
    fn depth(&self) -> usize;
}

impl QueueDepth for usize {
    fn depth(&self) -> usize {
        *self
    }
}

/// Producer handle to a single server's pending-customer queue
#[derive(Debug, Clone)]
pub struct ServerQueue {
    index: usize,
    sender: mpsc::Sender<Customer>,
}

impl ServerQueue {
    /// Create a queue for server `index` and return the consumer half
    pub fn bounded(index: usize, capacity: usize) -> (Self, mpsc::Receiver<Customer>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (ServerQueue { index, sender }, receiver)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn max_capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    /// Enqueue a customer, waiting for space if the queue is full
    ///
    /// Returns the customer back if the server has gone away.
    pub async fn enqueue(&self, customer: Customer) -> Result<(), Customer> {
        self.sender.send(customer).await.map_err(|e| e.0)
    }
}

impl QueueDepth for ServerQueue {
    /// Pending customers, counting in-flight reservations
    fn depth(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}
