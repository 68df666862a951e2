use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::feature::parse_cost_and_features;
use super::{CostWeight, FeatureCarrier, FeatureMap, Weight};
use crate::errors::HgError;
use crate::numeric::log_plus;

/// Expectation semiring element `(p, r)`.
///
/// `p` is stored as a negative-log cost. The joint expectations `r = p * f` are
/// kept factored: the weight holds the conditional feature values `f = r / p`,
/// so features survive costs whose probability underflows. `plus` gives
/// `(p1 + p2, r1 + r2)` and `times` gives `(p1 p2, p1 r2 + p2 r1)`. In the
/// factored form that is a probability-weighted mean of `f1` and `f2` for
/// `plus` and `f1 + f2` for `times`.
///
/// The text form is `COST[id=value,...]`, where the values are `f`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationWeight {
    cost: f64,
    features: FeatureMap,
}

impl ExpectationWeight {
    /// Builds an arc weight from its cost and its (unscaled) feature values.
    pub fn from_features(cost: f64, features: &FeatureMap) -> Self {
        Self {
            cost,
            features: features.clone(),
        }
    }

    /// Builds a weight from its cost and joint expectations `r`.
    ///
    /// A zero probability cannot carry joint expectations; the result is `zero()`.
    pub fn from_joint(cost: f64, expectations: &FeatureMap) -> Self {
        if cost == f64::INFINITY {
            return Self::zero();
        }
        Self {
            cost,
            features: expectations.scaled(cost.exp()),
        }
    }

    /// Returns the joint expectations `r = p * f`.
    ///
    /// Entries underflow to nothing once `p` does; prefer
    /// [`FeatureCarrier::feature_values`] for the normalized view.
    pub fn expectations(&self) -> FeatureMap {
        self.features.scaled(self.probability())
    }

    /// Returns the probability `exp(-cost)`.
    pub fn probability(&self) -> f64 {
        (-self.cost).exp()
    }
}

impl Weight for ExpectationWeight {
    const NAME: &'static str = "expectation";

    fn zero() -> Self {
        Self {
            cost: f64::INFINITY,
            features: FeatureMap::new(),
        }
    }

    fn one() -> Self {
        Self {
            cost: 0.0,
            features: FeatureMap::new(),
        }
    }

    fn plus(&self, other: &Self) -> Self {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let cost = log_plus(self.cost, other.cost);
        // p_i / (p1 + p2), both in [0, 1]
        let mut features = self.features.scaled((cost - self.cost).exp());
        features.add_scaled(&other.features, (cost - other.cost).exp());
        Self { cost, features }
    }

    fn times(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        let mut features = self.features.clone();
        features.add_scaled(&other.features, 1.0);
        Self {
            cost: self.cost + other.cost,
            features,
        }
    }

    fn is_zero(&self) -> bool {
        self.cost == f64::INFINITY
    }

    fn is_one(&self) -> bool {
        self.cost == 0.0 && self.features.is_empty()
    }

    fn is_nan(&self) -> bool {
        self.cost.is_nan() || self.features.has_nan()
    }
}

impl CostWeight for ExpectationWeight {
    fn cost(&self) -> f64 {
        self.cost
    }

    fn with_cost(&self, cost: f64) -> Self {
        Self {
            cost,
            features: self.features.clone(),
        }
    }
}

impl FeatureCarrier for ExpectationWeight {
    fn feature_values(&self) -> FeatureMap {
        self.features.clone()
    }
}

impl fmt::Display for ExpectationWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cost)?;
        if !self.features.is_empty() {
            write!(f, "{}", self.features)?;
        }
        Ok(())
    }
}

impl FromStr for ExpectationWeight {
    type Err = HgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cost, features) = parse_cost_and_features(s)?;
        Ok(Self::from_features(cost, &features))
    }
}
