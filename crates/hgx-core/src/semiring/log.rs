use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{parse_cost, CostWeight, Weight};
use crate::errors::HgError;
use crate::numeric::{log_minus, log_plus};

/// Log semiring: probabilities summed in negative-log space.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct LogWeight(f64);

impl LogWeight {
    /// Wraps a negative-log cost.
    pub const fn new(cost: f64) -> Self {
        LogWeight(cost)
    }

    /// Builds the weight of a probability.
    pub fn from_probability(p: f64) -> Self {
        LogWeight(-p.ln())
    }

    /// Returns the probability `exp(-cost)`.
    pub fn probability(&self) -> f64 {
        (-self.0).exp()
    }
}

impl Weight for LogWeight {
    const NAME: &'static str = "log";

    fn zero() -> Self {
        LogWeight(f64::INFINITY)
    }

    fn one() -> Self {
        LogWeight(0.0)
    }

    fn plus(&self, other: &Self) -> Self {
        LogWeight(log_plus(self.0, other.0))
    }

    fn times(&self, other: &Self) -> Self {
        LogWeight(self.0 + other.0)
    }

    fn is_zero(&self) -> bool {
        self.0 == f64::INFINITY
    }

    fn is_one(&self) -> bool {
        self.0 == 0.0
    }

    fn plus_by(&mut self, other: &Self) {
        self.0 = log_plus(self.0, other.0);
    }

    fn times_by(&mut self, other: &Self) {
        self.0 += other.0;
    }

    fn divide(&self, other: &Self) -> Result<Self, HgError> {
        if other.is_zero() {
            return Err(HgError::not_a_number(
                "divide-by-zero",
                "cannot divide a log weight by zero",
            ));
        }
        Ok(LogWeight(self.0 - other.0))
    }

    fn minus(&self, other: &Self) -> Result<Self, HgError> {
        log_minus(self.0, other.0).map(LogWeight).ok_or_else(|| {
            HgError::not_a_number(
                "negative-difference",
                "log weight subtraction would produce a negative probability",
            )
            .with_context("lhs", self.0)
            .with_context("rhs", other.0)
        })
    }

    fn pow(&self, k: f64) -> Result<Self, HgError> {
        if self.is_zero() && k == 0.0 {
            return Ok(Self::one());
        }
        Ok(LogWeight(self.0 * k))
    }

    fn is_nan(&self) -> bool {
        self.0.is_nan()
    }
}

impl CostWeight for LogWeight {
    fn cost(&self) -> f64 {
        self.0
    }

    fn with_cost(&self, cost: f64) -> Self {
        LogWeight(cost)
    }
}

impl fmt::Display for LogWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LogWeight {
    type Err = HgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cost(s).map(LogWeight)
    }
}
