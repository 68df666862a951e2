use std::collections::BTreeSet;

use hgx_core::{CostWeight, HgError, ViterbiWeight, Weight};
use tracing::{debug, debug_span, warn};

use crate::best::{AcyclicBest, BestOptions};
use crate::derivation::best_derivation;
use crate::hypergraph::Hypergraph;

/// Largest n-best size [`prune_to_nbest`] supports.
pub const MAX_NBEST: usize = 1;

/// Clamps an n-best request to [`MAX_NBEST`].
pub fn clamp_nbest(n: usize) -> usize {
    n.min(MAX_NBEST)
}

/// Restricts the hypergraph to its best derivation and returns whether it changed.
///
/// `n == 0` disables pruning. Values above [`MAX_NBEST`] are clamped with a warning. With
/// `skip_already_single` the work is skipped when every state has at most one
/// incoming arc, since such a hypergraph already has a single derivation. Arc costs
/// are compared as [`ViterbiWeight`]s and back edges are tolerated. When the final
/// state has no derivation at all the hypergraph is cleared.
pub fn prune_to_nbest<W: CostWeight>(
    hg: &mut Hypergraph<W>,
    n: usize,
    skip_already_single: bool,
) -> Result<bool, HgError> {
    let requested = n;
    let n = clamp_nbest(requested);
    if n != requested {
        warn!(requested, supported = MAX_NBEST, "prune-to-nbest clamped to 1-best");
    }
    if n == 0 {
        return Ok(false);
    }
    let _span = debug_span!("prune_to_nbest", n, arcs = hg.num_arcs()).entered();
    if skip_already_single && has_single_derivation(hg)? {
        debug!("already a single derivation");
        return Ok(false);
    }
    let view = hg.with_weights(|weight| ViterbiWeight::new(weight.cost()));
    let best = AcyclicBest::compute(&view, &BestOptions::with_max_back_edges(usize::MAX))?;
    if best.best_weight().is_zero() {
        warn!(arcs = hg.num_arcs(), "no derivation reaches the final state; emptying hypergraph");
        hg.clear();
        return Ok(true);
    }
    let derivation = best_derivation(&view, &best)?;
    let keep: BTreeSet<_> = derivation.arcs().iter().copied().collect();
    let before = hg.num_arcs();
    hg.restrict(&keep)?;
    debug!(before, after = hg.num_arcs(), "pruned to best derivation");
    Ok(true)
}

fn has_single_derivation<W: Weight>(hg: &Hypergraph<W>) -> Result<bool, HgError> {
    for state in hg.states() {
        if hg.in_degree(state)? > 1 {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use hgx_core::{LogWeight, StateId, SymbolTable};

    use super::*;
    use crate::hypergraph::Hyperarc;

    fn choice() -> Hypergraph<LogWeight> {
        let mut hg = Hypergraph::new(SymbolTable::shared());
        let s0 = hg.add_state();
        let yes = hg.word_state("yes").unwrap();
        let no = hg.word_state("no").unwrap();
        let s1 = hg.add_state();
        hg.add_arc(Hyperarc::new(s1, vec![s0, yes], LogWeight::new(0.5))).unwrap();
        hg.add_arc(Hyperarc::new(s1, vec![s0, no], LogWeight::new(0.7))).unwrap();
        hg.set_start(s0).unwrap();
        hg.set_final(s1).unwrap();
        hg
    }

    #[test]
    fn keeps_only_the_cheapest_path() {
        let mut hg = choice();
        assert!(prune_to_nbest(&mut hg, 1, true).unwrap());
        assert_eq!(hg.num_arcs(), 1);
        assert_eq!(hg.num_states(), 3);
        let (_, arc) = hg.arcs().next().unwrap();
        assert_eq!(*arc.weight(), LogWeight::new(0.5));
        let word = hg.labels(arc.tails()[1]).unwrap().terminal().unwrap();
        assert_eq!(hg.symbol_text(word).unwrap(), "yes");
        assert_eq!(hg.final_state(), Some(StateId::from_raw(2)));
    }

    #[test]
    fn zero_disables_and_large_values_clamp() {
        let mut hg = choice();
        assert!(!prune_to_nbest(&mut hg, 0, false).unwrap());
        assert_eq!(hg.num_arcs(), 2);
        assert_eq!(clamp_nbest(5), 1);
        assert!(prune_to_nbest(&mut hg, 5, false).unwrap());
        assert_eq!(hg.num_arcs(), 1);
    }

    #[test]
    fn single_derivation_is_skipped() {
        let mut hg = choice();
        prune_to_nbest(&mut hg, 1, false).unwrap();
        assert!(!prune_to_nbest(&mut hg, 1, true).unwrap());
    }
}
