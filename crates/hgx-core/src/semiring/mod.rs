//! Semiring weights carried on hypergraph arcs.
//!
//! [`Weight`] is the entire interface DP algorithms may use: `zero`, `one`, `plus`,
//! `times`, the `is_zero`/`is_one` fast paths, in-place `plus_by`/`times_by`, and the
//! partial inverses `divide`/`minus`/`pow`. No algorithm inspects a weight's
//! representation. Refinements:
//!
//! * [`Idempotent`]: `plus(x, x) == x`, so `plus` selects a best operand.
//! * [`CostWeight`]: the weight exposes a scalar negative-log cost.
//! * [`FeatureCarrier`]: the weight carries a sparse feature vector.

use std::fmt::Debug;

use crate::errors::HgError;

mod boolean;
mod expectation;
mod feature;
mod log;
mod viterbi;

pub use boolean::BooleanWeight;
pub use expectation::ExpectationWeight;
pub use feature::{FeatureId, FeatureMap, FeatureWeight};
pub use log::LogWeight;
pub use viterbi::ViterbiWeight;

/// Closed semiring value.
///
/// Laws every implementation upholds: `times(zero, x) == zero`,
/// `plus(zero, x) == x`, `times(one, x) == x`. `plus` is not assumed idempotent;
/// see [`Idempotent`].
pub trait Weight: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Short name used in error messages.
    const NAME: &'static str;

    /// Additive identity, annihilator of `times`.
    fn zero() -> Self;

    /// Multiplicative identity.
    fn one() -> Self;

    /// Alternative combination.
    fn plus(&self, other: &Self) -> Self;

    /// Sequential combination. `self` is the left operand.
    fn times(&self, other: &Self) -> Self;

    /// Returns whether the value equals [`Weight::zero`].
    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Returns whether the value equals [`Weight::one`].
    fn is_one(&self) -> bool {
        *self == Self::one()
    }

    /// In-place `plus`.
    fn plus_by(&mut self, other: &Self) {
        *self = self.plus(other);
    }

    /// In-place `times`.
    fn times_by(&mut self, other: &Self) {
        *self = self.times(other);
    }

    /// Returns `x` such that `x times other == self`.
    fn divide(&self, _other: &Self) -> Result<Self, HgError> {
        Err(unsupported::<Self>("divide"))
    }

    /// Returns `x` such that `x plus other == self`.
    fn minus(&self, _other: &Self) -> Result<Self, HgError> {
        Err(unsupported::<Self>("minus"))
    }

    /// Raises the weight to a real power (`times` applied `k` times).
    fn pow(&self, _k: f64) -> Result<Self, HgError> {
        Err(unsupported::<Self>("pow"))
    }

    /// Returns whether the value holds a NaN component.
    fn is_nan(&self) -> bool {
        false
    }
}

/// Weights whose `plus` picks one of its operands.
pub trait Idempotent: Weight {
    /// Returns whether `self` would be selected by `plus` over `other`.
    fn is_better(&self, other: &Self) -> bool;
}

/// Weights with a scalar negative-log cost.
pub trait CostWeight: Weight {
    /// Negative-log cost; `+inf` for zero.
    fn cost(&self) -> f64;

    /// Returns a copy with the scalar cost replaced and side data kept.
    fn with_cost(&self, cost: f64) -> Self;
}

/// Weights that carry per-arc feature values.
pub trait FeatureCarrier: CostWeight {
    /// Returns the per-arc feature values `f_i(arc)`, independent of the arc's probability.
    fn feature_values(&self) -> FeatureMap;
}

pub(crate) fn unsupported<W: Weight>(operation: &str) -> HgError {
    HgError::unsupported(
        "unsupported-weight-operation",
        format!("{} weights do not support {operation}", W::NAME),
    )
    .with_context("weight", W::NAME)
    .with_context("operation", operation)
}

/// Parses the scalar part of a weight literal. Accepts `inf` for zero.
pub(crate) fn parse_cost(text: &str) -> Result<f64, HgError> {
    text.trim().parse::<f64>().map_err(|err| {
        HgError::file_format("invalid-weight", format!("cannot parse weight: {err}"))
            .with_context("text", text.trim())
    })
}
