//! Naive Monte Carlo integrator
//!
//! The integrator samples uniformly on the unit hypercube, remaps every
//! point into the integration box, and keeps going until the standard error
//! of the running estimate drops below the caller's goal. The sampling is
//! fanned out over worker threads that each own a private accumulator; a
//! controller aggregates the workers every 100 ms, publishes the combined
//! statistics for observers, and decides termination. Runs can be watched,
//! canceled, retargeted at a different precision, and restarted without
//! losing the samples already taken.

use crate::callbacks::{Callback, ProgressSnapshot, SinkCallback};
use crate::core::domain::Domain;
use crate::core::error::MonteCarloError;
use crate::core::estimators::{BasicEstimators, Estimators, Updateable};
use crate::core::progress::{SharedState, ThreadSlot};
use crate::core::{Integrand, Real};

use rand::distributions::{Distribution, Standard};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crossbeam as cb;

use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Number of integrand evaluations a worker performs between publishing its
/// statistics and checking for termination.
///
/// Publishing after fewer calls would let the controller terminate on an
/// under-resolved variance estimate: 1/sqrt(2048) is about 0.02, so a batch
/// recovers two digits of the spread before the first aggregation can act on
/// it. Cancellation latency is bounded by one batch per worker.
const BATCH_CALLS: u64 = 2048;

/// Pause between aggregation passes of the controller.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The recognized construction options.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Options {
    /// Perturb domain endpoints one representable step inward so the
    /// integrand is never evaluated exactly on a boundary.
    pub singular: bool,
    /// Number of worker threads; `None` means the detected hardware
    /// parallelism. Clamped to at least one.
    pub threads: Option<usize>,
    /// Master seed for the sample stream. Zero means a nondeterministic seed
    /// is drawn from entropy for every run.
    pub seed: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            singular: true,
            threads: None,
            seed: 0,
        }
    }
}

/// Handle to an integration run in flight.
///
/// The run proceeds on its own threads; this handle is the single consumer
/// of its outcome.
pub struct RunHandle<T> {
    join: JoinHandle<Result<T, MonteCarloError<T>>>,
}

impl<T> RunHandle<T> {
    /// Blocks until the run terminates and returns the final estimate, or
    /// the failure a worker stored.
    ///
    /// # Errors
    ///
    /// Returns [`MonteCarloError::NonFiniteValue`] if the integrand produced
    /// `inf` or `nan`, or [`MonteCarloError::IntegrandPanic`] if a panic
    /// escaped it. Cancellation is not an error.
    pub fn wait(self) -> Result<T, MonteCarloError<T>> {
        self.join.join().expect("the integration driver panicked")
    }

    /// Returns `true` once the run has terminated, without blocking.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// A parallel naive Monte Carlo integrator.
///
/// Constructed from an integrand, the bounds of the integration box, and a
/// target for the standard error of the estimate. [`integrate`] drives the
/// estimate toward the goal asynchronously; every observable below may be
/// read, and the goal moved, from any thread while the run is hot.
///
/// [`integrate`]: Self::integrate
pub struct NaiveMonteCarlo<T, F, R = Pcg64> {
    shared: Arc<Shared<T, F>>,
    engine: PhantomData<fn() -> R>,
}

impl<T, F, R> NaiveMonteCarlo<T, F, R>
where
    T: Real,
    F: Integrand<T> + 'static,
    R: Rng + SeedableRng + 'static,
    Standard: Distribution<T>,
{
    /// Creates an integrator with the default [`Options`].
    ///
    /// # Errors
    ///
    /// See [`NaiveMonteCarlo::with_options`].
    pub fn new(
        integrand: F,
        bounds: &[(T, T)],
        error_goal: T,
    ) -> Result<Self, MonteCarloError<T>> {
        Self::with_options(integrand, bounds, error_goal, Options::default())
    }

    /// Creates an integrator.
    ///
    /// Construction performs one integrand evaluation per worker thread to
    /// prime the accumulators, so a misbehaving integrand fails here rather
    /// than deep inside a run.
    ///
    /// # Errors
    ///
    /// Returns [`MonteCarloError::InvalidBounds`] if any axis is empty or
    /// inverted, [`MonteCarloError::InvalidErrorGoal`] if the goal is not
    /// positive and finite, [`MonteCarloError::DimensionMismatch`] if the
    /// integrand expects a different number of coordinates than there are
    /// bounds, and [`MonteCarloError::NonFiniteValue`] if a priming
    /// evaluation produces `inf` or `nan`.
    pub fn with_options(
        integrand: F,
        bounds: &[(T, T)],
        error_goal: T,
        options: Options,
    ) -> Result<Self, MonteCarloError<T>> {
        if !(error_goal > T::zero()) || !error_goal.is_finite() {
            return Err(MonteCarloError::InvalidErrorGoal(error_goal));
        }
        if bounds.len() != integrand.dim() {
            return Err(MonteCarloError::DimensionMismatch {
                bounds: bounds.len(),
                integrand: integrand.dim(),
            });
        }

        let domain = Domain::new(bounds, options.singular)?;
        let threads = options
            .threads
            .unwrap_or_else(|| {
                thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
            })
            .max(1);

        let mut master = R::seed_from_u64(effective_seed(options.seed));
        let mut point = vec![T::zero(); domain.dim()];
        let mut slots = Vec::with_capacity(threads);
        let mut average = T::zero();

        for _ in 0..threads {
            for u in &mut point {
                *u = master.gen();
            }
            let weight = domain.map_in_place(&mut point);
            let value = weight * integrand.call(&point);
            if !value.is_finite() {
                return Err(MonteCarloError::NonFiniteValue {
                    point: point.clone(),
                    value,
                });
            }
            slots.push(ThreadSlot::new(value));
            average = average + value;
        }
        average = average / T::from_usize(threads).unwrap();

        Ok(Self {
            shared: Arc::new(Shared {
                integrand,
                domain,
                threads,
                seed: AtomicU64::new(options.seed),
                slots,
                state: SharedState::new(average, error_goal, threads as u64),
                failure: Mutex::new(None),
                started_at: Mutex::new(Instant::now()),
            }),
            engine: PhantomData,
        })
    }

    /// Starts a run that drives the estimate toward the error goal and
    /// returns a handle resolving to the final estimate.
    ///
    /// A later call restarts the integrator: the accumulated per-worker
    /// statistics are kept and the run continues toward the goal in force at
    /// that time.
    pub fn integrate(&self) -> RunHandle<T> {
        self.integrate_with(SinkCallback {})
    }

    /// Like [`integrate`], observing every aggregation pass through
    /// `callback`.
    ///
    /// [`integrate`]: Self::integrate
    pub fn integrate_with<C>(&self, callback: C) -> RunHandle<T>
    where
        C: Callback<T> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let join = thread::spawn(move || run::<T, F, R, C>(&shared, &callback));
        RunHandle { join }
    }

    /// Requests termination; the in-flight run then resolves with the best
    /// estimate to date within about one batch per worker.
    ///
    /// The stored seed is squared so that canceling a seeded run and
    /// restarting it does not replay the identical sample stream.
    pub fn cancel(&self) {
        let seed = self.shared.seed.load(Ordering::Relaxed);
        self.shared
            .seed
            .store(seed.wrapping_mul(seed), Ordering::Relaxed);
        self.shared.state.set_done();
        tracing::debug!("cancellation requested");
    }

    /// Replaces the error goal; the controller acts on it at its next poll.
    pub fn update_target_error(&self, error_goal: T) {
        self.shared.state.set_error_goal(error_goal);
    }

    /// Returns the current estimate of the integral.
    pub fn current_estimate(&self) -> T {
        self.shared.state.estimate()
    }

    /// Returns the current aggregate sample variance.
    pub fn variance(&self) -> T {
        self.shared.state.variance()
    }

    /// Returns the standard error of the current estimate.
    pub fn current_error_estimate(&self) -> T {
        self.shared.state.error_estimate()
    }

    /// Returns the total number of integrand evaluations so far.
    pub fn calls(&self) -> u64 {
        self.shared.state.total_calls()
    }

    /// Returns the fraction of the requested precision already reached, in
    /// $[0, 1]$.
    pub fn progress(&self) -> T {
        self.shared.state.progress_fraction()
    }

    /// Extrapolates how much longer the run needs to reach the error goal,
    /// from the elapsed time and the remaining error ratio.
    pub fn estimated_time_to_completion(&self) -> Duration {
        let elapsed = self.shared.started_at.lock().unwrap().elapsed();
        let ratio = (self.current_error_estimate() / self.shared.state.error_goal())
            .to_f64()
            .unwrap_or(f64::INFINITY);
        if ratio * ratio <= 1.0 {
            return Duration::ZERO;
        }

        let seconds = (ratio * ratio - 1.0) * elapsed.as_secs_f64();
        if seconds.is_finite() && seconds < Duration::MAX.as_secs_f64() {
            Duration::from_secs_f64(seconds)
        } else {
            Duration::MAX
        }
    }
}

/// State shared between the integrator front end, the controller, and the
/// workers.
struct Shared<T, F> {
    integrand: F,
    domain: Domain<T>,
    threads: usize,
    seed: AtomicU64,
    slots: Vec<ThreadSlot<T>>,
    state: SharedState<T>,
    failure: Mutex<Option<MonteCarloError<T>>>,
    started_at: Mutex<Instant>,
}

/// The controller: spawns one sampling worker per slot, aggregates them
/// every poll interval, terminates the run, and joins everyone before
/// resolving.
fn run<T, F, R, C>(shared: &Shared<T, F>, callback: &C) -> Result<T, MonteCarloError<T>>
where
    T: Real,
    F: Integrand<T>,
    R: Rng + SeedableRng,
    C: Callback<T>,
    Standard: Distribution<T>,
{
    *shared.started_at.lock().unwrap() = Instant::now();
    shared.state.clear_done();

    let master_seed = effective_seed(shared.seed.load(Ordering::Relaxed));
    let mut master = R::seed_from_u64(master_seed);
    let worker_seeds: Vec<u64> = (0..shared.threads).map(|_| master.gen::<u64>()).collect();
    tracing::debug!(
        threads = shared.threads,
        seed = master_seed,
        "integration run started"
    );

    cb::thread::scope(|s| {
        for (index, seed) in worker_seeds.into_iter().enumerate() {
            s.spawn(move |_| sample_batches::<T, F, R>(shared, index, seed));
        }

        loop {
            thread::sleep(POLL_INTERVAL);
            let snapshot = aggregate(shared);
            callback.poll(&snapshot);

            if shared.state.is_done() {
                break;
            }
            if snapshot.error_estimate <= shared.state.error_goal() {
                tracing::debug!(calls = snapshot.calls, "error goal reached");
                shared.state.set_done();
                break;
            }
        }
    })
    .unwrap();

    // The workers kept sampling between the deciding poll and their next
    // done check; fold that work into the result.
    let snapshot = aggregate(shared);

    if let Some(error) = shared.failure.lock().unwrap().take() {
        tracing::debug!(%error, "integration run failed");
        return Err(error);
    }

    tracing::debug!(calls = snapshot.calls, "integration run finished");
    Ok(snapshot.estimate)
}

/// One worker: draws batches of uniform samples, remaps them into the
/// domain, feeds the integrand values into its private accumulator, and
/// publishes to its slot after every batch until the run is done.
fn sample_batches<T, F, R>(shared: &Shared<T, F>, index: usize, seed: u64)
where
    T: Real,
    F: Integrand<T>,
    R: Rng + SeedableRng,
    Standard: Distribution<T>,
{
    let slot = &shared.slots[index];
    let mut estimators = slot.snapshot();
    let mut rng = R::seed_from_u64(seed);
    let mut point = vec![T::zero(); shared.domain.dim()];

    while !shared.state.is_done() {
        for _ in 0..BATCH_CALLS {
            for u in &mut point {
                *u = rng.gen();
            }
            let weight = shared.domain.map_in_place(&mut point);

            let value =
                match panic::catch_unwind(AssertUnwindSafe(|| shared.integrand.call(&point))) {
                    Ok(value) => weight * value,
                    Err(payload) => {
                        abort_run(
                            shared,
                            MonteCarloError::IntegrandPanic(panic_message(payload.as_ref())),
                        );
                        return;
                    }
                };

            if !value.is_finite() {
                abort_run(
                    shared,
                    MonteCarloError::NonFiniteValue {
                        point: point.clone(),
                        value,
                    },
                );
                return;
            }

            estimators.update(value);
        }

        slot.publish(&estimators);
    }
}

/// Combines the worker slots into the published aggregate: the mean weighted
/// by per-worker call counts, the summed squared deviations over the total
/// count less one.
fn aggregate<T: Real, F>(shared: &Shared<T, F>) -> ProgressSnapshot<T> {
    let total: u64 = shared.slots.iter().map(ThreadSlot::calls).sum();
    let total_t = T::from_u64(total).unwrap();

    let mut estimate = T::zero();
    let mut pooled = T::zero();
    for slot in &shared.slots {
        let stats = slot.snapshot();
        estimate = estimate + stats.mean() * (T::from_u64(stats.calls()).unwrap() / total_t);
        pooled = pooled + stats.sum_sq_dev();
    }
    let variance = if total > 1 {
        pooled / (total_t - T::one())
    } else {
        T::max_value()
    };

    shared.state.publish(estimate, variance, total);

    ProgressSnapshot {
        estimate,
        variance,
        error_estimate: shared.state.error_estimate(),
        calls: total,
        progress: shared.state.progress_fraction(),
    }
}

/// Stores the first failure of the run and signals every thread to stop.
fn abort_run<T: Real, F>(shared: &Shared<T, F>, error: MonteCarloError<T>) {
    tracing::debug!(%error, "worker aborted the run");
    let mut failure = shared.failure.lock().unwrap();
    if failure.is_none() {
        *failure = Some(error);
    }
    shared.state.set_done();
}

/// Resolves a stored seed: zero asks for a nondeterministic one.
fn effective_seed(seed: u64) -> u64 {
    if seed == 0 {
        rand::thread_rng().gen()
    } else {
        seed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload.downcast_ref::<&str>().map_or_else(
        || {
            payload
                .downcast_ref::<String>()
                .cloned()
                .unwrap_or_else(|| "opaque panic payload".to_string())
        },
        ToString::to_string,
    )
}
