#![warn(clippy::all, clippy::cargo, clippy::nursery, clippy::pedantic)]
#![warn(missing_docs)]

//! The crate `mcnaive` provides a parallel, live-monitorable *naive* [Monte
//! Carlo integration] routine for scalar functions of several real variables.
//! The integration domain is an axis-aligned box whose axes may be finite,
//! semi-infinite, or doubly infinite, and whose endpoints may be singular.
//! A run keeps sampling until a caller-specified statistical error goal is
//! reached or the caller cancels it, and the running estimate can be watched
//! from any thread while the workers are busy.
//!
//! # Features
//!
//! This library was designed with the following features as essential in mind:
//!
//! - **Generic numeric type**. The numeric type is a generic parameter, so the
//! integrator can be used with `f32`, `f64`, or any type implementing the
//! [`Real`] trait of this crate.
//! - **Generic random number generator**. Every seedable generator
//! implementing the `Rng` trait from the `rand` crate can drive the sampler;
//! `Pcg64` is the default.
//! - **Reproducibility**. For a fixed nonzero seed the sample stream of each
//! worker is completely determined, so the per-worker statistics after any
//! given number of evaluations do not depend on timing or scheduling.
//! - **Unbounded domains**. Semi-infinite and doubly infinite axes are folded
//! onto the unit hypercube with the matching Jacobian, so `(0, ∞)` or
//! `(−∞, ∞)` bounds need no preparation by the caller.
//! - **Singular endpoints**. In singular mode (the default) the sampler never
//! evaluates the integrand exactly on a domain boundary, so integrable
//! endpoint singularities are handled out of the box.
//! - **Non-finite detection**. An integrand returning `inf` or `nan` aborts
//! the run with an error naming the offending point and value rather than
//! silently destroying the estimate.
//! - **Live monitoring and cancellation**. The running estimate, variance,
//! call count, progress fraction, and estimated time to completion are
//! lock-free reads at any moment; the error goal can be moved while the run
//! is in flight, and `cancel` resolves the run with the best estimate so far.
//!
//! # What is ...?
//!
//! This section is a dictionary of terms that are used in this documentation.
//! Given
//!
//! $$ I = \int_{\Omega} f(x_1, x_2, \ldots, x_d) \mathrm{d}^d x $$
//!
//! over a box $\Omega$, we approximate $I$ after remapping $\Omega$ onto the
//! unit hypercube with
//!
//! $$ I \approx \frac{1}{N} \sum_{j=1}^N w\left(u^{(j)}\right) f\left(
//! x\left(u^{(j)}\right) \right) $$
//!
//! where the $u^{(j)}$ are uniform in $[0,1)^d$ and $w$ collects the volume of
//! the finite axes and the Jacobians of the infinite ones. We use the
//! following terms:
//!
//! - the number of *calls* is $N$, the number of integrand evaluations, which
//! we assume is the expensive operation;
//! - the *error goal* is the target for the standard error
//! $\sqrt{V / N}$ of the estimator, where $V$ is the sample variance;
//! - a *batch* is the block of 2048 evaluations a worker performs between
//! publishing its statistics and checking for termination;
//! - a *poll* is one aggregation pass of the controller, every 100 ms.
//!
//! [Monte Carlo integration]: https://en.wikipedia.org/wiki/Monte_Carlo_integration

pub mod callbacks;
pub mod core;
pub mod integrators;

pub use crate::core::*;
