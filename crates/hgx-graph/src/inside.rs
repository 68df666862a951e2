use hgx_core::{HgError, StateId, Weight};
use tracing::{debug, debug_span};

use crate::hypergraph::Hypergraph;
use crate::properties::Properties;
use crate::traversal::{outside_topsort_states, reverse_topsort_states, topsort_states};

/// Computes inside weights with `one()` on every axiom.
///
/// See [`inside_with_axioms`].
pub fn inside<W: Weight>(hg: &Hypergraph<W>) -> Result<Vec<W>, HgError> {
    inside_with_axioms(hg, |_| W::one())
}

/// Computes `inside[s] = sum over in-arcs of (product of inside[tails]) times weight`.
///
/// Axioms (states without incoming arcs) take `axiom_weight(state)`. Tail weights are
/// multiplied left to right before the arc weight, so non-commutative weights see
/// the yield order. States are visited in id order when [`Properties::SORTED_STATES`]
/// is set and in [`topsort_states`] order otherwise; states never visited stay
/// `zero()`. A tail whose inside weight is not final yet means the input is cyclic
/// and fails with [`HgError::Cycle`].
pub fn inside_with_axioms<W: Weight>(
    hg: &Hypergraph<W>,
    mut axiom_weight: impl FnMut(StateId) -> W,
) -> Result<Vec<W>, HgError> {
    let _span = debug_span!("inside", states = hg.num_states(), arcs = hg.num_arcs()).entered();
    hg.require_in_arcs()?;
    let order: Vec<StateId> = if hg.properties().contains(Properties::SORTED_STATES) {
        hg.states().collect()
    } else {
        topsort_states(hg)?.order
    };

    let mut weights = vec![W::zero(); hg.num_states()];
    let mut done = vec![false; hg.num_states()];
    for state in order {
        if hg.is_axiom(state) {
            weights[state.index()] = axiom_weight(state);
            done[state.index()] = true;
            continue;
        }
        let mut sum = W::zero();
        for id in hg.in_arcs(state)? {
            let arc = hg.arc(*id)?;
            let mut product = W::one();
            for tail in arc.tails() {
                if !done[tail.index()] {
                    return Err(HgError::cycle(
                        "inside-back-edge",
                        "inside weights require an acyclic hypergraph",
                    )
                    .with_context("head", state)
                    .with_context("tail", tail)
                    .with_context("arc", id));
                }
                product.times_by(&weights[tail.index()]);
            }
            product.times_by(arc.weight());
            sum.plus_by(&product);
        }
        weights[state.index()] = sum;
        done[state.index()] = true;
    }
    debug!(visited = done.iter().filter(|d| **d).count(), "inside finished");
    Ok(weights)
}

/// Computes outside weights given the inside weights.
///
/// `outside[final] = one()`, and each arc passes `outside[head]` times the arc
/// weight times the inside weights of the sibling tails down to each tail. Requires
/// a final state and the incoming index.
///
/// Heads are visited before their tails. With an outgoing index the order comes
/// from [`outside_topsort_states`], and then any cycle reachable from an axiom is
/// rejected; otherwise it is [`reverse_topsort_states`], which only sees the part
/// of the hypergraph that reaches the final state.
pub fn outside<W: Weight>(hg: &Hypergraph<W>, inside: &[W]) -> Result<Vec<W>, HgError> {
    let _span = debug_span!("outside", states = hg.num_states()).entered();
    let final_state = hg.final_state().ok_or_else(|| {
        HgError::empty_set("no-final-state", "outside weights need a final state")
    })?;
    if inside.len() != hg.num_states() {
        return Err(HgError::config(
            "inside-size-mismatch",
            "inside weights do not match the hypergraph",
        )
        .with_context("expected", hg.num_states())
        .with_context("actual", inside.len()));
    }
    let sorted = if hg.stores_out_arcs() {
        let sorted = outside_topsort_states(hg)?;
        if sorted.order.len() < hg.num_states() {
            return Err(HgError::cycle(
                "outside-unreached-states",
                "some states are not reachable from any axiom",
            )
            .with_context("unreached", hg.num_states() - sorted.order.len()));
        }
        sorted
    } else {
        reverse_topsort_states(hg)?
    };
    if sorted.back_edges > 0 {
        return Err(HgError::cycle(
            "outside-back-edge",
            "outside weights require an acyclic hypergraph",
        )
        .with_context("back_edges", sorted.back_edges));
    }

    let mut weights = vec![W::zero(); hg.num_states()];
    weights[final_state.index()] = W::one();
    for head in sorted.order {
        let above = weights[head.index()].clone();
        if above.is_zero() {
            continue;
        }
        for id in hg.in_arcs(head)? {
            let arc = hg.arc(*id)?;
            let tails = arc.tails();
            for (pos, tail) in tails.iter().enumerate() {
                let mut context = above.times(arc.weight());
                for (other_pos, other) in tails.iter().enumerate() {
                    if other_pos != pos {
                        context.times_by(&inside[other.index()]);
                    }
                }
                weights[tail.index()].plus_by(&context);
            }
        }
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use hgx_core::{CostWeight, LogWeight, SymbolTable, ViterbiWeight};

    use super::*;
    use crate::hypergraph::Hyperarc;
    use crate::properties::ArcIndex;

    #[test]
    fn diamond_sums_paths() {
        let mut hg: Hypergraph<LogWeight> = Hypergraph::new(SymbolTable::shared());
        let s: Vec<_> = (0..4).map(|_| hg.add_state()).collect();
        let half = LogWeight::from_probability(0.5);
        hg.add_arc(Hyperarc::new(s[1], vec![s[0]], half)).unwrap();
        hg.add_arc(Hyperarc::new(s[2], vec![s[0]], half)).unwrap();
        hg.add_arc(Hyperarc::new(s[3], vec![s[1]], LogWeight::one())).unwrap();
        hg.add_arc(Hyperarc::new(s[3], vec![s[2]], LogWeight::one())).unwrap();
        hg.set_final(s[3]).unwrap();

        let ins = inside(&hg).unwrap();
        assert!(ins[3].cost().abs() < 1e-12);
        let outs = outside(&hg, &ins).unwrap();
        assert!((outs[0].probability() - 1.0).abs() < 1e-12);
        assert!((outs[1].probability() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn outgoing_index_gives_the_same_outside_weights() {
        let build = |index| {
            let mut hg: Hypergraph<LogWeight> =
                Hypergraph::with_index(SymbolTable::shared(), index);
            let s: Vec<_> = (0..5).map(|_| hg.add_state()).collect();
            hg.add_arc(Hyperarc::new(s[2], vec![s[0], s[1]], LogWeight::new(0.3))).unwrap();
            hg.add_arc(Hyperarc::new(s[3], vec![s[2]], LogWeight::new(1.2))).unwrap();
            hg.add_arc(Hyperarc::new(s[3], vec![s[0]], LogWeight::new(0.7))).unwrap();
            hg.add_arc(Hyperarc::new(s[4], vec![s[3], s[1]], LogWeight::new(0.1))).unwrap();
            hg.set_final(s[4]).unwrap();
            hg
        };
        let by_in = build(ArcIndex::In);
        let by_out = build(ArcIndex::InOut);
        let ins = inside(&by_in).unwrap();
        let expected = outside(&by_in, &ins).unwrap();
        let actual = outside(&by_out, &ins).unwrap();
        for (a, b) in expected.iter().zip(&actual) {
            assert!((a.cost() - b.cost()).abs() < 1e-12);
        }
        assert!(actual[1].cost().is_finite());
    }

    #[test]
    fn outgoing_index_rejects_cycles() {
        let mut hg: Hypergraph<ViterbiWeight> =
            Hypergraph::with_index(SymbolTable::shared(), ArcIndex::InOut);
        let a = hg.add_state();
        let b = hg.add_state();
        let c = hg.add_state();
        hg.add_arc(Hyperarc::new(b, vec![a], ViterbiWeight::new(1.0))).unwrap();
        hg.add_arc(Hyperarc::new(c, vec![b], ViterbiWeight::new(1.0))).unwrap();
        hg.add_arc(Hyperarc::new(b, vec![c], ViterbiWeight::new(1.0))).unwrap();
        hg.set_final(c).unwrap();
        let ins = vec![ViterbiWeight::one(); 3];
        assert!(matches!(outside(&hg, &ins), Err(HgError::Cycle(_))));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut hg: Hypergraph<ViterbiWeight> = Hypergraph::new(SymbolTable::shared());
        let a = hg.add_state();
        let b = hg.add_state();
        hg.add_arc(Hyperarc::new(b, vec![a], ViterbiWeight::new(1.0))).unwrap();
        hg.add_arc(Hyperarc::new(b, vec![b], ViterbiWeight::new(1.0))).unwrap();
        hg.set_final(b).unwrap();
        assert!(matches!(inside(&hg), Err(HgError::Cycle(_))));
    }

    #[test]
    fn axiom_weights_are_injected() {
        let mut hg: Hypergraph<ViterbiWeight> = Hypergraph::new(SymbolTable::shared());
        let a = hg.add_state();
        let b = hg.add_state();
        hg.add_arc(Hyperarc::new(b, vec![a], ViterbiWeight::new(1.0))).unwrap();
        let ins = inside_with_axioms(&hg, |_| ViterbiWeight::new(0.25)).unwrap();
        assert_eq!(ins[b.index()], ViterbiWeight::new(1.25));
    }
}
