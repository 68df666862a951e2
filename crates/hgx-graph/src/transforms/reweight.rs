use std::collections::BTreeMap;

use hgx_core::numeric::log_sum;
use hgx_core::{ArcId, CostWeight, HgError, RngHandle, StateId};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::hypergraph::Hypergraph;
use crate::properties::Properties;

/// Scalar edits of arc costs, applied in field order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReweightOptions {
    /// Replaces every cost.
    pub set: Option<f64>,
    /// Adds a uniform draw from `[0, value)` to every cost.
    pub random_add: Option<f64>,
    /// Adds a constant to every cost.
    pub plus: Option<f64>,
    /// Scales every cost.
    pub times: Option<f64>,
}

impl ReweightOptions {
    /// Returns whether no edit is requested.
    pub fn is_noop(&self) -> bool {
        self.set.is_none() && self.random_add.is_none() && self.plus.is_none() && self.times.is_none()
    }
}

/// Arc grouping used by [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalize {
    /// Arcs sharing a head sum to one.
    Head,
    /// Arcs sharing a first tail sum to one, as in a probabilistic automaton.
    Fsm,
}

/// Applies `set`, `random-add`, `plus` and `times` to every arc cost, in that order.
///
/// Returns the number of arcs touched. A NaN result fails with
/// [`HgError::NotANumber`].
pub fn reweight<W: CostWeight>(
    hg: &mut Hypergraph<W>,
    options: &ReweightOptions,
    rng: &mut RngHandle,
) -> Result<usize, HgError> {
    if options.is_noop() {
        return Ok(0);
    }
    let _span = debug_span!("reweight", ?options).entered();
    let mut updates = Vec::with_capacity(hg.num_arcs());
    for (id, arc) in hg.arcs() {
        let mut cost = arc.weight().cost();
        if let Some(value) = options.set {
            cost = value;
        }
        if let Some(range) = options.random_add {
            cost += rng.uniform_below(range);
        }
        if let Some(value) = options.plus {
            cost += value;
        }
        if let Some(value) = options.times {
            cost *= value;
        }
        updates.push((id, arc.weight().with_cost(cost)));
    }
    apply_checked(hg, updates, "reweight-nan")
}

/// Renormalizes arc costs so that each group's probabilities sum to one.
///
/// Groups whose total probability is zero are left alone. [`Normalize::Fsm`] fails
/// with [`HgError::Config`] on a hypergraph that is not an FSM.
pub fn normalize<W: CostWeight>(hg: &mut Hypergraph<W>, by: Normalize) -> Result<usize, HgError> {
    let _span = debug_span!("normalize", ?by).entered();
    if by == Normalize::Fsm && !hg.check_property(Properties::FSM) {
        return Err(HgError::config(
            "fsm-normalize-needs-fsm",
            "fsm normalization needs a finite-state hypergraph",
        )
        .with_context("properties", hg.properties()));
    }
    let mut groups: BTreeMap<StateId, Vec<ArcId>> = BTreeMap::new();
    for (id, arc) in hg.arcs() {
        let key = match by {
            Normalize::Head => Some(arc.head()),
            Normalize::Fsm => arc.first_tail(),
        };
        if let Some(key) = key {
            groups.entry(key).or_default().push(id);
        }
    }
    let mut updates = Vec::with_capacity(hg.num_arcs());
    for ids in groups.values() {
        let weights = ids
            .iter()
            .map(|id| hg.arc(*id).map(|arc| arc.weight()))
            .collect::<Result<Vec<_>, _>>()?;
        let total = log_sum(weights.iter().map(|weight| weight.cost()));
        if total == f64::INFINITY {
            continue;
        }
        for (id, weight) in ids.iter().zip(weights) {
            updates.push((*id, weight.with_cost(weight.cost() - total)));
        }
    }
    apply_checked(hg, updates, "normalize-nan")
}

fn apply_checked<W: CostWeight>(
    hg: &mut Hypergraph<W>,
    updates: Vec<(ArcId, W)>,
    code: &str,
) -> Result<usize, HgError> {
    if let Some((id, _)) = updates.iter().find(|(_, weight)| weight.is_nan()) {
        return Err(HgError::not_a_number(code, "arc cost became NaN").with_context("arc", id));
    }
    let count = updates.len();
    for (id, weight) in updates {
        hg.set_arc_weight(id, weight)?;
    }
    debug!(count, "rewrote arc costs");
    Ok(count)
}
