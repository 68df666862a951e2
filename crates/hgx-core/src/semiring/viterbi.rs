use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{parse_cost, unsupported, CostWeight, Idempotent, Weight};
use crate::errors::HgError;

/// Tropical (min-plus) weight over negative-log costs.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ViterbiWeight(f64);

impl ViterbiWeight {
    /// Wraps a cost.
    pub const fn new(cost: f64) -> Self {
        ViterbiWeight(cost)
    }

    /// Builds the weight of a probability.
    pub fn from_probability(p: f64) -> Self {
        ViterbiWeight(-p.ln())
    }

    /// Returns the probability `exp(-cost)`.
    pub fn probability(&self) -> f64 {
        (-self.0).exp()
    }
}

impl Weight for ViterbiWeight {
    const NAME: &'static str = "viterbi";

    fn zero() -> Self {
        ViterbiWeight(f64::INFINITY)
    }

    fn one() -> Self {
        ViterbiWeight(0.0)
    }

    fn plus(&self, other: &Self) -> Self {
        if other.0 < self.0 {
            *other
        } else {
            *self
        }
    }

    fn times(&self, other: &Self) -> Self {
        ViterbiWeight(self.0 + other.0)
    }

    fn is_zero(&self) -> bool {
        self.0 == f64::INFINITY
    }

    fn is_one(&self) -> bool {
        self.0 == 0.0
    }

    fn plus_by(&mut self, other: &Self) {
        if other.0 < self.0 {
            self.0 = other.0;
        }
    }

    fn times_by(&mut self, other: &Self) {
        self.0 += other.0;
    }

    fn divide(&self, other: &Self) -> Result<Self, HgError> {
        if other.is_zero() {
            return Err(HgError::not_a_number(
                "divide-by-zero",
                "cannot divide a viterbi weight by zero",
            ));
        }
        Ok(ViterbiWeight(self.0 - other.0))
    }

    fn minus(&self, _other: &Self) -> Result<Self, HgError> {
        Err(unsupported::<Self>("minus"))
    }

    fn pow(&self, k: f64) -> Result<Self, HgError> {
        if self.is_zero() && k == 0.0 {
            return Ok(Self::one());
        }
        Ok(ViterbiWeight(self.0 * k))
    }

    fn is_nan(&self) -> bool {
        self.0.is_nan()
    }
}

impl Idempotent for ViterbiWeight {
    fn is_better(&self, other: &Self) -> bool {
        self.0 < other.0
    }
}

impl CostWeight for ViterbiWeight {
    fn cost(&self) -> f64 {
        self.0
    }

    fn with_cost(&self, cost: f64) -> Self {
        ViterbiWeight(cost)
    }
}

impl fmt::Display for ViterbiWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ViterbiWeight {
    type Err = HgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cost(s).map(ViterbiWeight)
    }
}
