//! Core types for the simulation engine

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A simulated unit of work
///
/// Created by the arrival generator, mutated exactly once by the server
/// worker that serves it, then owned by the result set.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: u64,
    pub arrival_time: Instant,
    pub waiting_time: Option<Duration>, // Set when a server picks it up
    pub service_time: Option<Duration>, // Set when service completes
}

impl Customer {
    pub fn new(id: u64, arrival_time: Instant) -> Self {
        Customer {
            id,
            arrival_time,
            waiting_time: None,
            service_time: None,
        }
    }

    /// Both waiting and service time have been recorded
    pub fn is_completed(&self) -> bool {
        self.waiting_time.is_some() && self.service_time.is_some()
    }

    /// Waiting time, zero while still queued
    pub fn waiting(&self) -> Duration {
        self.waiting_time.unwrap_or_default()
    }

    /// Service time, zero until service completes
    pub fn service(&self) -> Duration {
        self.service_time.unwrap_or_default()
    }

    /// Waiting plus service
    pub fn response_time(&self) -> Duration {
        self.waiting() + self.service()
    }

    /// Instant at which a server started serving this customer
    pub fn service_start(&self) -> Instant {
        self.arrival_time + self.waiting()
    }
}

/// Which trigger ended a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The configured run duration elapsed
    Deadline,
    /// The collection loop gathered the configured number of customers
    CustomerLimit,
    /// The output queue closed with no trigger set
    ///
    /// Workers only exit once the signal is set, so a run never ends this
    /// way in practice. The collector falls back to it to stay total.
    WorkersExited,
}
