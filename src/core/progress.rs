//! Atomic publication of running statistics.
//!
//! Workers and observers never share a lock. Each worker owns one
//! [`ThreadSlot`] it alone writes; the controller owns the [`SharedState`]
//! aggregate every other thread reads. Real values travel as their bit
//! pattern inside a word-sized atomic, load and store only, so a reader can
//! tear between cells but never inside one.

use crate::core::estimators::{BasicEstimators, Estimators, WelfordEstimators};
use crate::core::Real;

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A real value stored as its bit image in an `AtomicU64`.
pub(crate) struct RealCell<T> {
    bits: AtomicU64,
    marker: PhantomData<T>,
}

impl<T: Real> RealCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            bits: AtomicU64::new(value.to_atomic_bits()),
            marker: PhantomData,
        }
    }

    pub fn load(&self) -> T {
        T::from_atomic_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: T) {
        self.bits.store(value.to_atomic_bits(), Ordering::Relaxed);
    }
}

/// The statistics slot of one worker: running mean, sum of squared
/// deviations, and call count. Written by its worker between batches, read
/// by the controller at every poll.
pub(crate) struct ThreadSlot<T> {
    mean: RealCell<T>,
    sum_sq_dev: RealCell<T>,
    calls: AtomicU64,
}

impl<T: Real> ThreadSlot<T> {
    /// A slot primed with a single evaluation, as performed during
    /// construction of an integrator.
    pub fn new(value: T) -> Self {
        Self {
            mean: RealCell::new(value),
            sum_sq_dev: RealCell::new(T::zero()),
            calls: AtomicU64::new(1),
        }
    }

    pub fn publish(&self, estimators: &WelfordEstimators<T>) {
        self.mean.store(estimators.mean());
        self.sum_sq_dev.store(estimators.sum_sq_dev());
        self.calls.store(estimators.calls(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WelfordEstimators<T> {
        WelfordEstimators::from_parts(
            self.mean.load(),
            self.sum_sq_dev.load(),
            self.calls.load(Ordering::Relaxed),
        )
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

/// The aggregate the controller publishes and any thread may observe.
pub(crate) struct SharedState<T> {
    estimate: RealCell<T>,
    variance: RealCell<T>,
    error_goal: RealCell<T>,
    total_calls: AtomicU64,
    done: AtomicBool,
}

impl<T: Real> SharedState<T> {
    /// The variance starts at the largest finite value so that no error goal
    /// is considered reached before the first aggregation.
    pub fn new(estimate: T, error_goal: T, total_calls: u64) -> Self {
        Self {
            estimate: RealCell::new(estimate),
            variance: RealCell::new(T::max_value()),
            error_goal: RealCell::new(error_goal),
            total_calls: AtomicU64::new(total_calls),
            done: AtomicBool::new(false),
        }
    }

    pub fn publish(&self, estimate: T, variance: T, total_calls: u64) {
        self.estimate.store(estimate);
        self.variance.store(variance);
        self.total_calls.store(total_calls, Ordering::Relaxed);
    }

    pub fn estimate(&self) -> T {
        self.estimate.load()
    }

    pub fn variance(&self) -> T {
        self.variance.load()
    }

    pub fn error_goal(&self) -> T {
        self.error_goal.load()
    }

    pub fn set_error_goal(&self, goal: T) {
        self.error_goal.store(goal);
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::Relaxed)
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub fn set_done(&self) {
        self.done.store(true, Ordering::Release);
    }

    pub fn clear_done(&self) {
        self.done.store(false, Ordering::Release);
    }

    /// The standard error of the current aggregate, $\sqrt{V / N}$.
    pub fn error_estimate(&self) -> T {
        (self.variance.load() / T::from_u64(self.total_calls()).unwrap()).sqrt()
    }

    /// How much of the requested precision has been reached, in $[0, 1]$.
    pub fn progress_fraction(&self) -> T {
        let r = self.error_goal.load() / self.error_estimate();
        if r * r >= T::one() {
            T::one()
        } else {
            r * r
        }
    }
}
