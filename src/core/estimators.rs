//! This module contains everything related to estimators.

use num_traits::{Float, FromPrimitive};
use serde::{Deserialize, Serialize};

/// Basic estimators, like the mean, variance, and the standard deviation.
pub trait BasicEstimators<T: Float> {
    /// Returns the mean value.
    fn mean(&self) -> T;

    /// Returns the sample variance, $V$.
    fn var(&self) -> T;

    /// Returns the standard deviation, $\sigma = \sqrt{V}$.
    fn std(&self) -> T {
        self.var().sqrt()
    }
}

/// Everything that needs to be updated.
pub trait Updateable<T> {
    /// Update this estimator with `value`.
    fn update(&mut self, value: T);
}

/// More estimators.
pub trait Estimators<T: Float + FromPrimitive>: BasicEstimators<T> {
    /// Returns the number of times, $N$, the integrand has been called.
    fn calls(&self) -> u64;

    /// Returns the standard error of the mean, $\sqrt{V / N}$.
    fn error_estimate(&self) -> T {
        (self.var() / T::from_u64(self.calls()).unwrap()).sqrt()
    }
}

/// Online mean and variance in the Welford formulation, with a Kahan
/// compensation term on the running mean.
///
/// The compensation is not optional: the uncompensated update has a drift
/// term that grows like $\epsilon N$ and eventually outruns the
/// $1/\sqrt{N}$ convergence of the estimator itself. The compensated update
/// reduces the drift to $\epsilon^2 N$, which no realistic sample count
/// reaches. The compensator is working state of the updating thread and is
/// not part of the published statistics.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WelfordEstimators<T> {
    mean: T,
    sum_sq_dev: T,
    calls: u64,
    compensator: T,
}

impl<T: Float> WelfordEstimators<T> {
    /// Creates an estimator that has seen no values.
    pub fn new() -> Self {
        Self {
            mean: T::zero(),
            sum_sq_dev: T::zero(),
            calls: 0,
            compensator: T::zero(),
        }
    }

    /// Reconstructs an estimator from published statistics. The compensator
    /// starts over from zero.
    pub fn from_parts(mean: T, sum_sq_dev: T, calls: u64) -> Self {
        Self {
            mean,
            sum_sq_dev,
            calls,
            compensator: T::zero(),
        }
    }

    /// Returns the sum of squared deviations from the mean, Welford's $S$.
    pub fn sum_sq_dev(&self) -> T {
        self.sum_sq_dev
    }
}

impl<T: Float> Default for WelfordEstimators<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float + FromPrimitive> Updateable<T> for WelfordEstimators<T> {
    fn update(&mut self, value: T) {
        self.calls += 1;
        let count = T::from_u64(self.calls).unwrap();

        let term = (value - self.mean) / count;
        let y = term - self.compensator;
        let updated = self.mean + y;
        self.compensator = (updated - self.mean) - y;
        self.sum_sq_dev = self.sum_sq_dev + (value - self.mean) * (value - updated);
        self.mean = updated;
    }
}

impl<T: Float> BasicEstimators<T> for WelfordEstimators<T> {
    fn mean(&self) -> T {
        self.mean
    }

    fn var(&self) -> T {
        if self.calls < 2 {
            T::zero()
        } else {
            self.sum_sq_dev / T::from(self.calls - 1).unwrap()
        }
    }
}

impl<T: Float + FromPrimitive> Estimators<T> for WelfordEstimators<T> {
    fn calls(&self) -> u64 {
        self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_known_dataset() {
        let mut estimators = WelfordEstimators::new();
        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            estimators.update(value);
        }

        assert_eq!(estimators.calls(), 8);
        assert_approx_eq!(estimators.mean(), 5.0, 1e-15);
        assert_approx_eq!(estimators.var(), 4.571428571428571, 1e-14);
        assert_approx_eq!(estimators.std(), 4.571428571428571_f64.sqrt(), 1e-14);
    }

    #[test]
    fn test_constant_stream_is_exact() {
        let value = 0.1 * 7.0;
        let mut estimators = WelfordEstimators::new();
        for _ in 0..100_000 {
            estimators.update(value);
        }

        // No rounding at all may accumulate for a constant input.
        assert_eq!(estimators.mean(), value);
        assert_eq!(estimators.sum_sq_dev(), 0.0);
        assert_eq!(estimators.var(), 0.0);
    }

    #[test]
    fn test_matches_two_pass_computation() {
        let values: Vec<f64> = (0..1000_u64)
            .map(|i| ((i * 2_654_435_761 % 1000) as f64).mul_add(1e-3, 0.5))
            .collect();

        let mut estimators = WelfordEstimators::new();
        for &value in &values {
            estimators.update(value);
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
            / (values.len() - 1) as f64;

        assert_approx_eq!(estimators.mean(), mean, 1e-12);
        assert_approx_eq!(estimators.var(), var, 1e-12);
    }

    #[test]
    fn test_resumes_from_published_parts() {
        let mut reference = WelfordEstimators::new();
        let mut first = WelfordEstimators::new();
        for value in [1.0, 2.0, 3.0, 4.0] {
            reference.update(value);
            first.update(value);
        }

        let mut second =
            WelfordEstimators::from_parts(first.mean(), first.sum_sq_dev(), first.calls());
        for value in [5.0, 6.0] {
            reference.update(value);
            second.update(value);
        }

        assert_eq!(second.calls(), reference.calls());
        assert_approx_eq!(second.mean(), reference.mean(), 1e-15);
        assert_approx_eq!(second.var(), reference.var(), 1e-15);
    }

    #[test]
    fn test_error_estimate_shrinks_with_calls() {
        let mut estimators = WelfordEstimators::new();
        for i in 0..100 {
            estimators.update(f64::from(i % 2));
        }
        let early = estimators.error_estimate();
        for i in 0..10_000 {
            estimators.update(f64::from(i % 2));
        }

        assert!(estimators.error_estimate() < early);
        assert_approx_eq!(estimators.mean(), 0.5, 1e-2);
    }
}
