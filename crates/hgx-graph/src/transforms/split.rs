use hgx_core::{ArcId, HgError, StateId, Sym, Weight};
use tracing::{debug, debug_span};

use crate::batch::ArcBatch;
use crate::hypergraph::{Hyperarc, Hypergraph};
use crate::properties::Properties;
use crate::traversal::topsort_states;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InLabel {
    Epsilon,
    Word(Sym),
}

/// Splits FSM states so that all arcs entering a state read the same label.
///
/// A state entered under several labels keeps the arcs of the first label; each
/// further label gets a copy of the state that takes over those arcs together with
/// copies of the state's outgoing arcs. States are visited in topological order, so
/// copied outgoing arcs are grouped correctly at their heads later on. A split final
/// state is replaced by a fresh final state reached through epsilon arcs. The
/// weighted language is unchanged. Returns the number of states added.
///
/// Requires an acyclic FSM ([`HgError::Config`] otherwise) and an arc index from
/// which incoming arcs can be derived.
pub fn split_states_by_label<W: Weight>(hg: &mut Hypergraph<W>) -> Result<usize, HgError> {
    let _span = debug_span!("split_states_by_label", states = hg.num_states()).entered();
    if !hg.check_property(Properties::FSM | Properties::ACYCLIC) {
        return Err(HgError::config(
            "split-needs-acyclic-fsm",
            "state splitting is defined for acyclic finite-state hypergraphs",
        )
        .with_context("properties", hg.properties()));
    }
    hg.force_in_arcs()?;

    let mut by_first_tail: Vec<Vec<ArcId>> = vec![Vec::new(); hg.num_states()];
    for (id, arc) in hg.arcs() {
        if let Some(first) = arc.first_tail() {
            by_first_tail[first.index()].push(id);
        }
    }

    let original_final = hg.final_state();
    let mut final_copies: Vec<StateId> = Vec::new();
    let mut added = 0;
    for state in topsort_states(hg)?.order {
        let mut groups: Vec<(InLabel, Vec<ArcId>)> = Vec::new();
        for id in hg.in_arcs(state)? {
            let label = in_label(hg, hg.arc(*id)?);
            match groups.iter_mut().find(|(seen, _)| *seen == label) {
                Some((_, ids)) => ids.push(*id),
                None => groups.push((label, vec![*id])),
            }
        }
        if groups.len() < 2 {
            continue;
        }
        let labels = *hg.labels(state)?;
        let mut batch = ArcBatch::new();
        for (_, ids) in groups.into_iter().skip(1) {
            let copy = hg.add_labeled_state(labels)?;
            added += 1;
            if Some(state) == original_final {
                final_copies.push(copy);
            }
            for id in ids {
                let arc = hg.arc(id)?;
                let moved = Hyperarc::new(copy, arc.tails().to_vec(), arc.weight().clone())
                    .with_annotations(arc.annotations().clone());
                batch.add(moved);
                batch.remove(id);
            }
            for id in &by_first_tail[state.index()] {
                let arc = hg.arc(*id)?;
                let mut tails = arc.tails().to_vec();
                tails[0] = copy;
                let duplicate = Hyperarc::new(arc.head(), tails, arc.weight().clone())
                    .with_annotations(arc.annotations().clone());
                batch.add(duplicate);
            }
        }
        batch.apply(hg)?;
    }

    if let Some(old_final) = original_final.filter(|_| !final_copies.is_empty()) {
        let new_final = hg.add_state();
        added += 1;
        for tail in std::iter::once(old_final).chain(final_copies) {
            hg.add_arc(Hyperarc::new(new_final, vec![tail], W::one()))?;
        }
        hg.set_final(new_final)?;
    }
    hg.compute_properties();
    debug!(added, "split states by incoming label");
    Ok(added)
}

fn in_label<W: Weight>(hg: &Hypergraph<W>, arc: &Hyperarc<W>) -> InLabel {
    arc.tails()
        .get(1)
        .and_then(|tail| hg.labels(*tail).ok())
        .and_then(|labels| labels.terminal())
        .map_or(InLabel::Epsilon, InLabel::Word)
}

#[cfg(test)]
mod tests {
    use hgx_core::{CostWeight, SymbolTable, ViterbiWeight};

    use super::*;
    use crate::derivation::{derivation_string, enumerate_derivations};

    /// `0 -a-> 1`, `0 -b-> 1`, `1 -c-> 2`.
    fn merged() -> Hypergraph<ViterbiWeight> {
        let mut hg = Hypergraph::new(SymbolTable::shared());
        let s0 = hg.add_state();
        let a = hg.word_state("a").unwrap();
        let b = hg.word_state("b").unwrap();
        let c = hg.word_state("c").unwrap();
        let s1 = hg.add_state();
        let s2 = hg.add_state();
        hg.add_arc(Hyperarc::new(s1, vec![s0, a], ViterbiWeight::new(1.0))).unwrap();
        hg.add_arc(Hyperarc::new(s1, vec![s0, b], ViterbiWeight::new(2.0))).unwrap();
        hg.add_arc(Hyperarc::new(s2, vec![s1, c], ViterbiWeight::new(0.5))).unwrap();
        hg.set_start(s0).unwrap();
        hg.set_final(s2).unwrap();
        hg
    }

    fn weighted_strings(hg: &Hypergraph<ViterbiWeight>) -> Vec<(String, f64)> {
        let mut all: Vec<(String, f64)> = enumerate_derivations(hg, 16)
            .unwrap()
            .iter()
            .map(|d| (derivation_string(hg, d).unwrap(), d.weight().cost()))
            .collect();
        all.sort_by(|x, y| x.0.cmp(&y.0));
        all
    }

    #[test]
    fn every_state_reads_one_label() {
        let mut hg = merged();
        let before = weighted_strings(&hg);
        assert_eq!(split_states_by_label(&mut hg).unwrap(), 1);
        for state in hg.states() {
            let labels: Vec<InLabel> = hg
                .in_arcs(state)
                .unwrap()
                .iter()
                .map(|id| in_label(&hg, hg.arc(*id).unwrap()))
                .collect();
            assert!(labels.windows(2).all(|pair| pair[0] == pair[1]));
        }
        assert_eq!(weighted_strings(&hg), before);
    }

    #[test]
    fn split_final_gets_a_fresh_final() {
        let mut hg = merged();
        let s2 = hg.final_state().unwrap();
        let d = hg.word_state("d").unwrap();
        hg.add_arc(Hyperarc::new(s2, vec![StateId::from_raw(4), d], ViterbiWeight::new(3.0)))
            .unwrap();
        let before = weighted_strings(&hg);
        split_states_by_label(&mut hg).unwrap();
        assert_ne!(hg.final_state(), Some(s2));
        assert_eq!(weighted_strings(&hg), before);
    }
}
