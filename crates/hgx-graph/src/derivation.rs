//! Derivation trees: extraction from best-path pointers, yields and enumeration.

use hgx_core::{ArcId, HgError, Idempotent, StateId, Sym, Weight};
use tracing::{debug, debug_span};

use crate::best::AcyclicBest;
use crate::hypergraph::Hypergraph;
use crate::traversal::topsort_states;

/// One derivation tree, stored as its arcs in preorder.
///
/// Every non-axiom state of the tree consumes the next arc; axioms are leaves. The
/// arc order is therefore enough to rebuild the tree against its hypergraph.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation<W> {
    root: StateId,
    arcs: Vec<ArcId>,
    weight: W,
}

impl<W: Weight> Derivation<W> {
    /// Returns the root state.
    pub fn root(&self) -> StateId {
        self.root
    }

    /// Returns the arcs in preorder.
    pub fn arcs(&self) -> &[ArcId] {
        &self.arcs
    }

    /// Returns the product of the arc weights.
    pub fn weight(&self) -> &W {
        &self.weight
    }
}

/// Extracts the best derivation of the final state from best-path pointers.
///
/// Fails with [`HgError::EmptySet`] when the final state has no derivation, and with
/// [`HgError::Graph`] when the pointers do not belong to `hg`.
pub fn best_derivation<W: Idempotent>(
    hg: &Hypergraph<W>,
    best: &AcyclicBest<W>,
) -> Result<Derivation<W>, HgError> {
    let root = best.final_state();
    if best.best_weight().is_zero() {
        return Err(HgError::empty_set(
            "no-derivation",
            "the final state has no derivation",
        )
        .with_context("final", root));
    }
    let mut arcs = Vec::new();
    let mut stack = vec![root];
    while let Some(state) = stack.pop() {
        if hg.is_axiom(state) {
            continue;
        }
        let id = best.best_in_arc(state).ok_or_else(|| {
            HgError::empty_set("no-best-arc", "state on the best derivation has no best arc")
                .with_context("state", state)
        })?;
        arcs.push(id);
        // Guard against pointers taken from a different hypergraph.
        if arcs.len() > hg.arc_capacity() + hg.num_states() {
            return Err(HgError::graph(
                "derivation-loop",
                "best-path pointers do not form a tree",
            ));
        }
        stack.extend(hg.arc(id)?.tails().iter().rev());
    }
    let weight = derivation_weight(hg, &arcs)?;
    Ok(Derivation { root, arcs, weight })
}

/// Returns the product of the given arcs' weights in order.
pub fn derivation_weight<W: Weight>(hg: &Hypergraph<W>, arcs: &[ArcId]) -> Result<W, HgError> {
    let mut weight = W::one();
    for id in arcs {
        weight.times_by(hg.arc(*id)?.weight());
    }
    Ok(weight)
}

/// Returns the terminal symbols at the leaves of a derivation, left to right.
///
/// Non-lexical leaves such as `<eps>` contribute nothing.
pub fn derivation_yield<W: Weight>(
    hg: &Hypergraph<W>,
    derivation: &Derivation<W>,
) -> Result<Vec<Sym>, HgError> {
    let mut words = Vec::new();
    let mut arcs = derivation.arcs.iter();
    let mut stack = vec![derivation.root];
    while let Some(state) = stack.pop() {
        if hg.is_axiom(state) {
            if let Some(sym) = hg.labels(state)?.terminal() {
                words.push(sym);
            }
            continue;
        }
        let id = arcs.next().ok_or_else(|| {
            HgError::graph("truncated-derivation", "derivation ran out of arcs")
                .with_context("state", state)
        })?;
        let arc = hg.arc(*id)?;
        if arc.head() != state {
            return Err(HgError::graph(
                "derivation-mismatch",
                "derivation arc does not expand the expected state",
            )
            .with_context("state", state)
            .with_context("arc", id));
        }
        stack.extend(arc.tails().iter().rev());
    }
    Ok(words)
}

/// Returns the yield of a derivation as space-separated text.
pub fn derivation_string<W: Weight>(
    hg: &Hypergraph<W>,
    derivation: &Derivation<W>,
) -> Result<String, HgError> {
    let words = derivation_yield(hg, derivation)?
        .into_iter()
        .map(|sym| hg.symbol_text(sym))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(words.join(" "))
}

/// Enumerates up to `limit` derivations of the final state.
///
/// Each state keeps at most `limit` partial derivations, so the result is complete
/// only when the hypergraph has no more than `limit` derivations below any state.
/// Requires an acyclic hypergraph and fails with [`HgError::Cycle`] otherwise.
pub fn enumerate_derivations<W: Weight>(
    hg: &Hypergraph<W>,
    limit: usize,
) -> Result<Vec<Derivation<W>>, HgError> {
    let _span = debug_span!("enumerate_derivations", limit).entered();
    let root = hg.final_state().ok_or_else(|| {
        HgError::empty_set("no-final-state", "enumeration requires a final state")
    })?;
    let sorted = topsort_states(hg)?;
    if sorted.back_edges > 0 {
        return Err(HgError::cycle(
            "enumerate-back-edge",
            "cannot enumerate derivations of a cyclic hypergraph",
        )
        .with_context("back_edges", sorted.back_edges));
    }

    let mut partial: Vec<Vec<(Vec<ArcId>, W)>> = vec![Vec::new(); hg.num_states()];
    for state in sorted.order {
        if hg.is_axiom(state) {
            partial[state.index()] = vec![(Vec::new(), W::one())];
            continue;
        }
        let mut found = Vec::new();
        for id in hg.in_arcs(state)? {
            let arc = hg.arc(*id)?;
            let mut combos = vec![(vec![*id], W::one())];
            for tail in arc.tails() {
                let mut extended = Vec::new();
                for (arcs, weight) in &combos {
                    for (tail_arcs, tail_weight) in &partial[tail.index()] {
                        if extended.len() == limit {
                            break;
                        }
                        let mut joined = arcs.clone();
                        joined.extend_from_slice(tail_arcs);
                        extended.push((joined, weight.times(tail_weight)));
                    }
                }
                combos = extended;
            }
            for (arcs, mut weight) in combos {
                weight.times_by(arc.weight());
                found.push((arcs, weight));
            }
        }
        found.truncate(limit);
        partial[state.index()] = found;
    }

    let derivations: Vec<Derivation<W>> = std::mem::take(&mut partial[root.index()])
        .into_iter()
        .map(|(arcs, weight)| Derivation { root, arcs, weight })
        .collect();
    debug!(found = derivations.len(), "enumerated derivations");
    Ok(derivations)
}

#[cfg(test)]
mod tests {
    use hgx_core::{SymbolTable, ViterbiWeight};

    use super::*;
    use crate::best::BestOptions;
    use crate::hypergraph::Hyperarc;

    fn sentence() -> Hypergraph<ViterbiWeight> {
        let mut hg = Hypergraph::new(SymbolTable::shared());
        let s0 = hg.add_state();
        let the = hg.word_state("the").unwrap();
        let dog = hg.word_state("dog").unwrap();
        let s1 = hg.add_state();
        let s2 = hg.add_state();
        hg.add_arc(Hyperarc::new(s1, vec![s0, the], ViterbiWeight::new(1.0))).unwrap();
        hg.add_arc(Hyperarc::new(s2, vec![s1, dog], ViterbiWeight::new(2.0))).unwrap();
        hg.add_arc(Hyperarc::new(s2, vec![s0, dog], ViterbiWeight::new(5.0))).unwrap();
        hg.set_start(s0).unwrap();
        hg.set_final(s2).unwrap();
        hg
    }

    #[test]
    fn best_derivation_reads_the_best_string() {
        let hg = sentence();
        let best = AcyclicBest::compute(&hg, &BestOptions::default()).unwrap();
        let derivation = best_derivation(&hg, &best).unwrap();
        assert_eq!(*derivation.weight(), ViterbiWeight::new(3.0));
        assert_eq!(derivation_string(&hg, &derivation).unwrap(), "the dog");
    }

    #[test]
    fn enumeration_lists_every_path() {
        let hg = sentence();
        let all = enumerate_derivations(&hg, 10).unwrap();
        let mut strings: Vec<String> = all
            .iter()
            .map(|d| derivation_string(&hg, d).unwrap())
            .collect();
        strings.sort();
        assert_eq!(strings, vec!["dog".to_string(), "the dog".to_string()]);
        assert_eq!(enumerate_derivations(&hg, 1).unwrap().len(), 1);
    }
}
