//! Aggregate statistics over a completed result set
//!
//! Every reducer fails with [`SimulationError::EmptyResultSet`] on an empty
//! slice instead of returning zero or NaN.

use crate::error::{Result, SimulationError};
use crate::sampler::secs_to_duration;
use crate::types::{Customer, TerminationReason};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn average_by(customers: &[Customer], f: impl Fn(&Customer) -> Duration) -> Result<Duration> {
    if customers.is_empty() {
        return Err(SimulationError::EmptyResultSet);
    }
    let sum: f64 = customers.iter().map(|c| f(c).as_secs_f64()).sum();
    Ok(secs_to_duration(sum / customers.len() as f64))
}

/// Mean time between arrival and service start
pub fn average_waiting_time(customers: &[Customer]) -> Result<Duration> {
    average_by(customers, Customer::waiting)
}

/// Mean service duration
pub fn average_service_time(customers: &[Customer]) -> Result<Duration> {
    average_by(customers, Customer::service)
}

/// Mean of waiting plus service
pub fn average_response_time(customers: &[Customer]) -> Result<Duration> {
    average_by(customers, Customer::response_time)
}

/// Span from the first record's arrival to the last record's service start
///
/// Records are in completion order, so this is the window the run actually
/// covered. Saturates at zero if the last-completed customer started service
/// before the first-completed one arrived.
pub fn total_span(customers: &[Customer]) -> Result<Duration> {
    let (first, last) = match (customers.first(), customers.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(SimulationError::EmptyResultSet),
    };
    Ok(last
        .service_start()
        .saturating_duration_since(first.arrival_time))
}

/// Everything the reporting layer prints for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub customers: usize,
    pub avg_waiting_secs: f64,
    pub avg_service_secs: f64,
    pub avg_response_secs: f64,
    pub total_span_secs: f64,
    pub termination: Option<TerminationReason>,
}

impl Summary {
    /// Reduce a result set
    pub fn from_customers(
        customers: &[Customer],
        termination: Option<TerminationReason>,
    ) -> Result<Self> {
        Ok(Summary {
            customers: customers.len(),
            avg_waiting_secs: average_waiting_time(customers)?.as_secs_f64(),
            avg_service_secs: average_service_time(customers)?.as_secs_f64(),
            avg_response_secs: average_response_time(customers)?.as_secs_f64(),
            total_span_secs: total_span(customers)?.as_secs_f64(),
            termination,
        })
    }
}
