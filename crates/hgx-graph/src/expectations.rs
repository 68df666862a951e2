use std::collections::BTreeMap;

use hgx_core::{log_plus, CostWeight, FeatureCarrier, FeatureId, FeatureMap, HgError, LogWeight};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::hypergraph::Hypergraph;
use crate::inside::{inside, outside};

/// Posterior feature expectations of a hypergraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureExpectations {
    /// `-ln Z`, the negative log of the total derivation probability.
    pub partition_cost: f64,
    /// `E[f_i]` under the distribution over derivations, in linear space.
    pub expectations: FeatureMap,
}

/// Computes `E[f_i] = sum_d P(d) f_i(d) / Z` for every feature id on the arcs.
///
/// Arc costs are viewed as [`LogWeight`]s for inside and outside. Each arc then
/// contributes its posterior `outside[head] * prod(inside[tails]) * w / Z` times its
/// feature values. Positive and negative contributions are accumulated separately
/// with [`log_plus`] and exponentiated only at the end. Fails with
/// [`HgError::EmptySet`] when the final state is missing or unreachable.
pub fn feature_expectations<W: FeatureCarrier>(
    hg: &Hypergraph<W>,
) -> Result<FeatureExpectations, HgError> {
    let _span = debug_span!("feature_expectations", arcs = hg.num_arcs()).entered();
    let final_state = hg.final_state().ok_or_else(|| {
        HgError::empty_set("no-final-state", "feature expectations need a final state")
    })?;
    let view = hg.with_weights(|weight| LogWeight::new(weight.cost()));
    let ins = inside(&view)?;
    let partition_cost = ins[final_state.index()].cost();
    if partition_cost == f64::INFINITY {
        return Err(HgError::empty_set(
            "no-derivation",
            "the final state has no derivation",
        )
        .with_context("final", final_state));
    }
    let outs = outside(&view, &ins)?;

    let mut positive: BTreeMap<FeatureId, f64> = BTreeMap::new();
    let mut negative: BTreeMap<FeatureId, f64> = BTreeMap::new();
    for (_, arc) in hg.arcs() {
        let mut cost = outs[arc.head().index()].cost() + arc.weight().cost();
        for tail in arc.tails() {
            cost += ins[tail.index()].cost();
        }
        if cost == f64::INFINITY {
            continue;
        }
        for (id, value) in arc.weight().feature_values().iter() {
            if value == 0.0 {
                continue;
            }
            let (bucket, magnitude) = if value > 0.0 {
                (&mut positive, value)
            } else {
                (&mut negative, -value)
            };
            let entry = bucket.entry(id).or_insert(f64::INFINITY);
            *entry = log_plus(*entry, cost - magnitude.ln());
        }
    }

    let mut expectations = FeatureMap::new();
    let ids: Vec<FeatureId> = positive.keys().chain(negative.keys()).copied().collect();
    for id in ids {
        let pos = positive.get(&id).map_or(0.0, |c| (partition_cost - c).exp());
        let neg = negative.get(&id).map_or(0.0, |c| (partition_cost - c).exp());
        expectations.insert(id, pos - neg);
    }
    if expectations.iter().any(|(_, value)| value.is_nan()) {
        return Err(HgError::not_a_number(
            "expectation-nan",
            "feature expectations produced NaN",
        ));
    }
    debug!(partition_cost, features = expectations.len(), "feature expectations done");
    Ok(FeatureExpectations {
        partition_cost,
        expectations,
    })
}

#[cfg(test)]
mod tests {
    use hgx_core::{FeatureWeight, SymbolTable};

    use super::*;
    use crate::hypergraph::Hyperarc;

    #[test]
    fn two_paths_average_their_features() {
        let mut hg: Hypergraph<FeatureWeight> = Hypergraph::new(SymbolTable::shared());
        let s0 = hg.add_state();
        let s1 = hg.add_state();
        let half = -(0.5f64).ln();
        let f1: FeatureMap = [(1, 1.0)].into_iter().collect();
        let f2: FeatureMap = [(1, 3.0), (2, -1.0)].into_iter().collect();
        hg.add_arc(Hyperarc::new(s1, vec![s0], FeatureWeight::new(half, f1))).unwrap();
        hg.add_arc(Hyperarc::new(s1, vec![s0], FeatureWeight::new(half, f2))).unwrap();
        hg.set_final(s1).unwrap();

        let result = feature_expectations(&hg).unwrap();
        assert!(result.partition_cost.abs() < 1e-12);
        assert!((result.expectations.get(1) - 2.0).abs() < 1e-12);
        assert!((result.expectations.get(2) + 0.5).abs() < 1e-12);
    }
}
