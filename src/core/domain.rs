//! Classification of integration axes and the remapping of the integration
//! box onto the unit hypercube.
//!
//! The sampler always draws points from $[0,1)^d$; this module maps them into
//! the user's domain and accounts for the change of variables. Finite axes
//! contribute their width to a constant volume factor, infinite axes
//! contribute a per-sample Jacobian. The substitutions are the standard ones
//! for semi- and doubly infinite integrals, with small regularizing offsets
//! so the mapped coordinate stays finite on the closed cube.

use crate::core::error::MonteCarloError;
use crate::core::Real;

/// One axis of the integration box.
///
/// Which data an axis carries follows from the requested pair of bounds:
/// finite axes store the lower edge and the width, semi-infinite axes store
/// their one finite endpoint, doubly infinite axes need nothing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Axis<T> {
    /// Both endpoints finite.
    Finite {
        /// Lower edge, possibly nudged inward in singular mode.
        lower: T,
        /// Distance to the (possibly nudged) upper edge.
        width: T,
    },
    /// `(−∞, upper)`; the mapping reflects downward from the finite endpoint.
    LowerInfinite {
        /// The finite upper endpoint.
        upper: T,
    },
    /// `(lower, +∞)`.
    UpperInfinite {
        /// The finite lower endpoint, possibly nudged inward in singular mode.
        lower: T,
    },
    /// `(−∞, +∞)`.
    DoublyInfinite,
}

/// An axis-aligned integration box together with its unit-cube remapping.
#[derive(Clone, Debug)]
pub struct Domain<T> {
    axes: Vec<Axis<T>>,
    volume: T,
}

impl<T: Real> Domain<T> {
    /// Classifies `bounds` into axes and precomputes the finite-axes volume.
    ///
    /// With `singular` set, endpoints are perturbed one representable step
    /// into the interior so that no sample ever lands exactly on a boundary;
    /// a lower bound of exactly zero becomes machine epsilon.
    ///
    /// # Errors
    ///
    /// Returns [`MonteCarloError::InvalidBounds`] if any axis has an upper
    /// bound that is not strictly above its lower bound.
    pub fn new(bounds: &[(T, T)], singular: bool) -> Result<Self, MonteCarloError<T>> {
        let mut axes = Vec::with_capacity(bounds.len());
        let mut volume = T::one();

        for (index, &(lower, upper)) in bounds.iter().enumerate() {
            if !(lower < upper) {
                return Err(MonteCarloError::InvalidBounds {
                    axis: index,
                    lower,
                    upper,
                });
            }

            let axis = if lower == T::neg_infinity() {
                if upper == T::infinity() {
                    Axis::DoublyInfinite
                } else {
                    Axis::LowerInfinite { upper }
                }
            } else if upper == T::infinity() {
                let lower = if singular { lower.step_up() } else { lower };
                Axis::UpperInfinite { lower }
            } else {
                let (lower, width) = if singular {
                    let lower = if lower == T::zero() {
                        T::epsilon()
                    } else {
                        lower.step_up()
                    };
                    (lower, upper.step_down() - lower)
                } else {
                    (lower, upper - lower)
                };
                volume = volume * width;
                Axis::Finite { lower, width }
            };

            axes.push(axis);
        }

        Ok(Self { axes, volume })
    }

    /// Returns the number of axes.
    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    /// Returns the product of the widths of the finite axes.
    pub fn volume(&self) -> T {
        self.volume
    }

    /// Maps a point `x` from the unit hypercube into the domain, in place,
    /// and returns the sample weight: the finite-axes volume times the
    /// Jacobians of the infinite axes.
    pub fn map_in_place(&self, x: &mut [T]) -> T {
        debug_assert_eq!(x.len(), self.axes.len());

        let eps = T::epsilon();
        let two = T::one() + T::one();
        let four = two * two;
        let mut weight = self.volume;

        for (axis, u) in self.axes.iter().zip(x.iter_mut()) {
            let t = *u;
            match *axis {
                Axis::Finite { lower, width } => {
                    *u = lower + t * width;
                }
                Axis::UpperInfinite { lower } => {
                    let z = (T::one() + eps - t).recip();
                    weight = weight * z * z * (T::one() + eps);
                    *u = lower + t * z;
                }
                Axis::LowerInfinite { upper } => {
                    let z = (t + T::min_positive_value().sqrt()).recip();
                    weight = weight * z * z;
                    *u = upper + (t - T::one()) * z;
                }
                Axis::DoublyInfinite => {
                    let t1 = (T::one() + eps - t).recip();
                    let t2 = (t + eps).recip();
                    *u = (two * t - T::one()) * t1 * t2 / four;
                    weight = weight * (t1 * t1 + t2 * t2) / four;
                }
            }
        }

        weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_rejects_empty_and_inverted_bounds() {
        let err = Domain::new(&[(0.0, 1.0), (1.0, 1.0)], true).unwrap_err();
        assert_eq!(
            err,
            MonteCarloError::InvalidBounds {
                axis: 1,
                lower: 1.0,
                upper: 1.0,
            }
        );
        assert!(Domain::new(&[(2.0, -3.0)], false).is_err());
        assert!(Domain::new(&[(f64::NAN, 1.0)], false).is_err());
    }

    impl<T: Real> Domain<T> {
        fn axis(&self, index: usize) -> Axis<T> {
            self.axes[index]
        }
    }

    #[test]
    fn test_classification() {
        let inf = f64::INFINITY;
        let domain = Domain::new(
            &[(1.0, 3.0), (-inf, 2.0), (1.0, inf), (-inf, inf)],
            false,
        )
        .unwrap();

        assert_eq!(
            domain.axis(0),
            Axis::Finite {
                lower: 1.0,
                width: 2.0
            }
        );
        assert_eq!(domain.axis(1), Axis::LowerInfinite { upper: 2.0 });
        assert_eq!(domain.axis(2), Axis::UpperInfinite { lower: 1.0 });
        assert_eq!(domain.axis(3), Axis::DoublyInfinite);
        assert_eq!(domain.dim(), 4);
        assert_eq!(domain.volume(), 2.0);
    }

    #[test]
    fn test_singular_mode_nudges_endpoints() {
        let domain = Domain::<f64>::new(&[(0.0, 1.0)], true).unwrap();
        match domain.axis(0) {
            Axis::Finite { lower, width } => {
                assert_eq!(lower, f64::EPSILON);
                assert!(lower + width < 1.0);
            }
            _ => panic!("expected a finite axis"),
        }

        let mut x = [0.0];
        assert!(domain.map_in_place(&mut x) > 0.0);
        assert!(x[0] > 0.0);

        let domain = Domain::<f64>::new(&[(2.0, f64::INFINITY)], true).unwrap();
        assert_eq!(
            domain.axis(0),
            Axis::UpperInfinite {
                lower: 2.0_f64.step_up()
            }
        );
    }

    #[test]
    fn test_finite_map_spans_the_box() {
        let domain = Domain::new(&[(1.0, 3.0), (-2.0, 0.0)], false).unwrap();

        let mut x = [0.0, 0.0];
        assert_eq!(domain.map_in_place(&mut x), 4.0);
        assert_eq!(x, [1.0, -2.0]);

        let mut x = [0.5, 0.5];
        assert_eq!(domain.map_in_place(&mut x), 4.0);
        assert_eq!(x, [2.0, -1.0]);
    }

    #[test]
    fn test_doubly_infinite_map_is_odd_around_the_midpoint() {
        let domain = Domain::<f64>::new(&[(f64::NEG_INFINITY, f64::INFINITY)], false).unwrap();

        let mut x = [0.5];
        let weight = domain.map_in_place(&mut x);
        assert_approx_eq!(x[0], 0.0, 1e-14);
        assert!(weight > 0.0);

        let mut lo = [0.25];
        let mut hi = [0.75];
        domain.map_in_place(&mut lo);
        domain.map_in_place(&mut hi);
        assert_approx_eq!(lo[0], -hi[0], 1e-9);
        assert!(lo[0] < 0.0 && hi[0] > 0.0);
    }

    // Midpoint quadrature of the transformed integrand checks the Jacobians
    // against exactly known integrals.
    fn unit_grid_sum(domain: &Domain<f64>, f: impl Fn(f64) -> f64, n: usize) -> f64 {
        (0..n)
            .map(|j| {
                let mut x = [(j as f64 + 0.5) / n as f64];
                let weight = domain.map_in_place(&mut x);
                weight * f(x[0])
            })
            .sum::<f64>()
            / n as f64
    }

    #[test]
    fn test_semi_infinite_jacobian_reproduces_exp_integral() {
        let domain = Domain::new(&[(0.0, f64::INFINITY)], true).unwrap();
        let sum = unit_grid_sum(&domain, |x| (-x).exp(), 100_000);
        assert_approx_eq!(sum, 1.0, 1e-3);
    }

    #[test]
    fn test_doubly_infinite_jacobian_reproduces_gaussian_integral() {
        let domain = Domain::new(&[(f64::NEG_INFINITY, f64::INFINITY)], true).unwrap();
        let sum = unit_grid_sum(&domain, |x| (-x * x).exp(), 100_000);
        assert_approx_eq!(sum, std::f64::consts::PI.sqrt(), 1e-3);
    }

    #[test]
    fn test_lower_infinite_jacobian_reproduces_exp_integral() {
        let domain = Domain::new(&[(f64::NEG_INFINITY, 0.0)], true).unwrap();
        let sum = unit_grid_sum(&domain, |x| x.exp(), 100_000);
        assert_approx_eq!(sum, 1.0, 1e-3);
    }
}
