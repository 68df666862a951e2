use hgx_core::{ArcId, HgError, Weight};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, warn};

use crate::batch::ArcBatch;
use crate::hypergraph::Hypergraph;
use crate::inside::{inside, outside};
use crate::properties::Properties;

/// Direction weights are pushed towards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PushTo {
    /// Arcs leaving each state are normalized by the outside weights.
    #[default]
    Start,
    /// Arcs entering each state are normalized by the inside weights.
    Final,
}

/// Summary of a [`push_weights`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushReport {
    /// Arcs whose weight was rewritten.
    pub reweighted: usize,
    /// Arcs dropped because no successful derivation uses them.
    pub removed: usize,
    /// Whether the hypergraph was emptied for lack of any derivation.
    pub emptied: bool,
}

/// Redistributes arc weights without changing the weight of any derivation.
///
/// Towards the final state, `w' = (prod inside[tails] * w) / inside[head]` and the
/// arcs into the final state are scaled back by `inside[final]`. Towards the start,
/// `w' = w * outside[head] / outside[first tail]` and arcs whose first tail is an
/// axiom are scaled by that axiom's outside weight. Either way the factors telescope
/// along every derivation.
///
/// Requires an acyclic graph (fails with [`HgError::Config`]) and a final state
/// ([`HgError::EmptySet`]). The weight type must support `divide`. Arcs that lie on
/// no derivation are removed; when the final state is unreachable the hypergraph is
/// cleared.
pub fn push_weights<W: Weight>(hg: &mut Hypergraph<W>, to: PushTo) -> Result<PushReport, HgError> {
    let _span = debug_span!("push_weights", ?to).entered();
    let needed = Properties::GRAPH | Properties::ACYCLIC;
    if !hg.check_property(needed) {
        return Err(HgError::config(
            "push-needs-acyclic-graph",
            "weight pushing is defined for acyclic graphs only",
        )
        .with_context("properties", hg.properties()));
    }
    let final_state = hg.final_state().ok_or_else(|| {
        HgError::empty_set("no-final-state", "weight pushing needs a final state")
    })?;
    hg.force_in_arcs()?;

    let ins = inside(hg)?;
    let total = ins[final_state.index()].clone();
    if total.is_zero() {
        warn!(arcs = hg.num_arcs(), "no derivation reaches the final state; emptying hypergraph");
        hg.clear();
        return Ok(PushReport {
            emptied: true,
            ..PushReport::default()
        });
    }
    let outs = match to {
        PushTo::Start => Some(outside(hg, &ins)?),
        PushTo::Final => None,
    };

    let mut updates: Vec<(ArcId, W)> = Vec::new();
    let mut batch = ArcBatch::new();
    for (id, arc) in hg.arcs() {
        let mut inner = W::one();
        for tail in arc.tails() {
            inner.times_by(&ins[tail.index()]);
        }
        if inner.is_zero() {
            batch.remove(id);
            continue;
        }
        let pushed = match &outs {
            None => {
                let mut numerator = inner.times(arc.weight());
                if arc.head() == final_state {
                    numerator.times_by(&total);
                }
                let denominator = &ins[arc.head().index()];
                if numerator.is_zero() || denominator.is_zero() {
                    batch.remove(id);
                    continue;
                }
                numerator.divide(denominator)?
            }
            Some(outs) => {
                let first = arc.first_tail().ok_or_else(|| {
                    HgError::graph("empty-tails", "arcs require at least one tail")
                        .with_context("arc", id)
                })?;
                let mut numerator = arc.weight().times(&outs[arc.head().index()]);
                if hg.is_axiom(first) {
                    numerator.times_by(&outs[first.index()]);
                }
                let denominator = &outs[first.index()];
                if numerator.is_zero() || denominator.is_zero() {
                    batch.remove(id);
                    continue;
                }
                numerator.divide(denominator)?
            }
        };
        if pushed.is_nan() {
            return Err(HgError::not_a_number(
                "push-nan",
                "weight pushing produced NaN",
            )
            .with_context("arc", id));
        }
        updates.push((id, pushed));
    }

    let report = PushReport {
        reweighted: updates.len(),
        removed: batch.num_removals(),
        emptied: false,
    };
    for (id, weight) in updates {
        hg.set_arc_weight(id, weight)?;
    }
    batch.apply(hg)?;
    debug!(reweighted = report.reweighted, removed = report.removed, "pushed weights");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use hgx_core::{CostWeight, LogWeight, SymbolTable};

    use super::*;
    use crate::hypergraph::Hyperarc;

    fn diamond() -> Hypergraph<LogWeight> {
        let mut hg = Hypergraph::new(SymbolTable::shared());
        let s: Vec<_> = (0..4).map(|_| hg.add_state()).collect();
        hg.add_arc(Hyperarc::new(s[1], vec![s[0]], LogWeight::new(1.0))).unwrap();
        hg.add_arc(Hyperarc::new(s[2], vec![s[0]], LogWeight::new(2.0))).unwrap();
        hg.add_arc(Hyperarc::new(s[3], vec![s[1]], LogWeight::new(0.5))).unwrap();
        hg.add_arc(Hyperarc::new(s[3], vec![s[2]], LogWeight::new(0.25))).unwrap();
        hg.set_start(s[0]).unwrap();
        hg.set_final(s[3]).unwrap();
        hg
    }

    #[test]
    fn both_directions_keep_the_total() {
        for to in [PushTo::Start, PushTo::Final] {
            let mut hg = diamond();
            let before = inside(&hg).unwrap()[3];
            let report = push_weights(&mut hg, to).unwrap();
            assert_eq!(report.reweighted, 4);
            let after = inside(&hg).unwrap()[3];
            assert!((before.cost() - after.cost()).abs() < 1e-9, "{to:?}");
        }
    }

    #[test]
    fn pushing_to_start_normalizes_out_arcs() {
        let mut hg = diamond();
        push_weights(&mut hg, PushTo::Start).unwrap();
        let mut from_one = LogWeight::zero();
        for (_, arc) in hg.arcs() {
            if arc.tails()[0].index() == 1 {
                from_one.plus_by(arc.weight());
            }
        }
        assert!(from_one.cost().abs() < 1e-9);
    }

    #[test]
    fn unreachable_final_empties() {
        let mut hg = diamond();
        let lonely = hg.add_state();
        hg.add_arc(Hyperarc::new(lonely, vec![hgx_core::StateId::from_raw(0)], LogWeight::zero()))
            .unwrap();
        hg.set_final(lonely).unwrap();
        let report = push_weights(&mut hg, PushTo::Final).unwrap();
        assert!(report.emptied);
        assert_eq!(hg.num_states(), 0);
    }
}
