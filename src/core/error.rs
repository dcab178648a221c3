//! The error type shared by all integrators.

use thiserror::Error;

/// Everything that can go wrong while constructing or running an integrator.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MonteCarloError<T> {
    /// The bounds of one axis are empty or inverted.
    #[error("the upper bound {upper} of axis {axis} is not above the lower bound {lower}")]
    InvalidBounds {
        /// Zero-based index of the offending axis.
        axis: usize,
        /// The requested lower bound.
        lower: T,
        /// The requested upper bound.
        upper: T,
    },

    /// The requested error goal is not a positive finite number.
    #[error("the error goal {0} is not positive and finite")]
    InvalidErrorGoal(T),

    /// The integrand expects a different number of coordinates than there are
    /// bounds.
    #[error("the integrand expects {integrand} coordinates but {bounds} bounds were given")]
    DimensionMismatch {
        /// Number of bounds passed to the constructor.
        bounds: usize,
        /// Dimension advertised by the integrand.
        integrand: usize,
    },

    /// The integrand returned `inf` or `nan`.
    #[error("the integrand was evaluated at {point:?} and returned {value}")]
    NonFiniteValue {
        /// The transformed sample point handed to the integrand.
        point: Vec<T>,
        /// The weighted value it returned.
        value: T,
    },

    /// A panic escaped the integrand; the payload message is kept verbatim.
    #[error("the integrand panicked: {0}")]
    IntegrandPanic(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = MonteCarloError::InvalidBounds {
            axis: 2,
            lower: 1.0,
            upper: -1.0,
        };
        assert_eq!(
            err.to_string(),
            "the upper bound -1 of axis 2 is not above the lower bound 1"
        );

        let err = MonteCarloError::NonFiniteValue {
            point: vec![0.5],
            value: f64::INFINITY,
        };
        assert_eq!(
            err.to_string(),
            "the integrand was evaluated at [0.5] and returned inf"
        );
    }
}
