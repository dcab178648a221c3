//! Implementation of different callback functions.
//!
//! A callback observes a running integration: the controller hands it one
//! [`ProgressSnapshot`] per aggregation pass. Callbacks run on the controller
//! thread, so a slow callback delays the next poll, not the workers.

use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The aggregate statistics of a run at one controller poll.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProgressSnapshot<T> {
    /// Current estimate of the integral.
    pub estimate: T,
    /// Current sample variance.
    pub variance: T,
    /// Standard error of the estimate.
    pub error_estimate: T,
    /// Total number of integrand evaluations so far.
    pub calls: u64,
    /// Fraction of the requested precision already reached, in $[0, 1]$.
    pub progress: T,
}

/// Trait for implementing observers of a running integration.
pub trait Callback<T> {
    /// This method is called after every aggregation pass and may print
    /// information about it.
    fn poll(&self, snapshot: &ProgressSnapshot<T>);
}

/// A callback function that does nothing.
pub struct SinkCallback {}

impl<T> Callback<T> for SinkCallback {
    fn poll(&self, _: &ProgressSnapshot<T>) {}
}

/// A callback function that prints every aggregation pass.
pub struct SimpleCallback {}

impl<T> Callback<T> for SimpleCallback
where
    T: Display + Float,
{
    fn poll(&self, snapshot: &ProgressSnapshot<T>) {
        println!(
            "N={} E={} \u{b1} {} progress={}",
            snapshot.calls, snapshot.estimate, snapshot.error_estimate, snapshot.progress
        );
    }
}
