use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{parse_cost, CostWeight, FeatureCarrier, Idempotent, Weight};
use crate::errors::HgError;

/// Identifier of a sparse feature.
pub type FeatureId = u32;

/// Sparse map from feature id to value. Absent ids are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMap(BTreeMap<FeatureId, f64>);

impl FeatureMap {
    /// Creates an empty map.
    pub const fn new() -> Self {
        FeatureMap(BTreeMap::new())
    }

    /// Returns the value of a feature, zero when absent.
    pub fn get(&self, id: FeatureId) -> f64 {
        self.0.get(&id).copied().unwrap_or(0.0)
    }

    /// Sets a feature value. Zero values are not stored.
    pub fn insert(&mut self, id: FeatureId, value: f64) {
        if value == 0.0 {
            self.0.remove(&id);
        } else {
            self.0.insert(id, value);
        }
    }

    /// Adds `scale * other` into `self`.
    pub fn add_scaled(&mut self, other: &FeatureMap, scale: f64) {
        for (&id, &value) in &other.0 {
            let sum = self.get(id) + scale * value;
            self.insert(id, sum);
        }
    }

    /// Returns a copy with every value multiplied by `scale`.
    pub fn scaled(&self, scale: f64) -> FeatureMap {
        let mut out = FeatureMap::new();
        out.add_scaled(self, scale);
        out
    }

    /// Iterates `(id, value)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, f64)> + '_ {
        self.0.iter().map(|(&id, &value)| (id, value))
    }

    /// Returns the number of non-zero features.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether all features are zero.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn has_nan(&self) -> bool {
        self.0.values().any(|value| value.is_nan())
    }
}

impl FromIterator<(FeatureId, f64)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (FeatureId, f64)>>(iter: I) -> Self {
        let mut map = FeatureMap::new();
        for (id, value) in iter {
            map.insert(id, value);
        }
        map
    }
}

impl fmt::Display for FeatureMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, (id, value)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{id}={value}")?;
        }
        f.write_str("]")
    }
}

/// Splits `COST[id=value,...]` into its cost and feature map.
pub(crate) fn parse_cost_and_features(text: &str) -> Result<(f64, FeatureMap), HgError> {
    let text = text.trim();
    let Some(open) = text.find('[') else {
        return Ok((parse_cost(text)?, FeatureMap::new()));
    };
    let cost = parse_cost(&text[..open])?;
    let body = text[open + 1..].strip_suffix(']').ok_or_else(|| {
        HgError::file_format("invalid-weight", "feature list is missing its closing ']'")
            .with_context("text", text)
    })?;
    let mut features = FeatureMap::new();
    for entry in body.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (id, value) = entry.split_once('=').ok_or_else(|| {
            HgError::file_format("invalid-weight", "feature entries are written id=value")
                .with_context("entry", entry)
        })?;
        let id: FeatureId = id.trim().parse().map_err(|_| {
            HgError::file_format("invalid-weight", "feature id is not an unsigned integer")
                .with_context("entry", entry)
        })?;
        features.insert(id, parse_cost(value)?);
    }
    Ok((cost, features))
}

/// Tropical weight with side features.
///
/// `plus` keeps the cheaper operand together with its feature map (the left one on
/// ties); `times` adds costs and sums feature maps. The features therefore follow
/// the best derivation, which is what a Viterbi-style trainer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    cost: f64,
    features: FeatureMap,
}

impl FeatureWeight {
    /// Creates a weight from a cost and its features.
    pub fn new(cost: f64, features: FeatureMap) -> Self {
        Self { cost, features }
    }

    /// Returns the side features.
    pub fn features(&self) -> &FeatureMap {
        &self.features
    }
}

impl Weight for FeatureWeight {
    const NAME: &'static str = "feature";

    fn zero() -> Self {
        Self::new(f64::INFINITY, FeatureMap::new())
    }

    fn one() -> Self {
        Self::new(0.0, FeatureMap::new())
    }

    fn plus(&self, other: &Self) -> Self {
        if other.cost < self.cost {
            other.clone()
        } else {
            self.clone()
        }
    }

    fn times(&self, other: &Self) -> Self {
        if self.is_zero() || other.is_zero() {
            return Self::zero();
        }
        let mut features = self.features.clone();
        features.add_scaled(&other.features, 1.0);
        Self::new(self.cost + other.cost, features)
    }

    fn is_zero(&self) -> bool {
        self.cost == f64::INFINITY
    }

    fn is_one(&self) -> bool {
        self.cost == 0.0 && self.features.is_empty()
    }

    fn divide(&self, other: &Self) -> Result<Self, HgError> {
        if other.is_zero() {
            return Err(HgError::not_a_number(
                "divide-by-zero",
                "cannot divide a feature weight by zero",
            ));
        }
        let mut features = self.features.clone();
        features.add_scaled(&other.features, -1.0);
        Ok(Self::new(self.cost - other.cost, features))
    }

    fn is_nan(&self) -> bool {
        self.cost.is_nan() || self.features.has_nan()
    }
}

impl Idempotent for FeatureWeight {
    fn is_better(&self, other: &Self) -> bool {
        self.cost < other.cost
    }
}

impl CostWeight for FeatureWeight {
    fn cost(&self) -> f64 {
        self.cost
    }

    fn with_cost(&self, cost: f64) -> Self {
        Self::new(cost, self.features.clone())
    }
}

impl FeatureCarrier for FeatureWeight {
    fn feature_values(&self) -> FeatureMap {
        self.features.clone()
    }
}

impl fmt::Display for FeatureWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cost)?;
        if !self.features.is_empty() {
            write!(f, "{}", self.features)?;
        }
        Ok(())
    }
}

impl FromStr for FeatureWeight {
    type Err = HgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cost, features) = parse_cost_and_features(s)?;
        Ok(Self::new(cost, features))
    }
}
