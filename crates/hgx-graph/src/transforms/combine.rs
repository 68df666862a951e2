use std::sync::Arc;

use hgx_core::{HgError, StateId, Weight};
use tracing::{debug, debug_span};

use crate::hypergraph::{Hyperarc, Hypergraph, LabelPair};
use crate::properties::Properties;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combine {
    Union,
    Concat,
}

/// Returns a hypergraph deriving everything either input derives.
///
/// Finite-state inputs are joined under a fresh start and final state with epsilon
/// arcs. Other inputs get a fresh final state with a unary rule from each input's
/// final state. Both inputs must share one vocabulary; their arcs are copied.
pub fn union<W: Weight>(a: &Hypergraph<W>, b: &Hypergraph<W>) -> Result<Hypergraph<W>, HgError> {
    combine(a, b, Combine::Union)
}

/// Returns a hypergraph deriving every derivation of `a` followed by one of `b`.
///
/// Finite-state inputs are chained with an epsilon arc from `a`'s final state to
/// `b`'s start state. Other inputs get a fresh final state with the binary rule
/// `final <- final(a) final(b)`.
pub fn concat<W: Weight>(a: &Hypergraph<W>, b: &Hypergraph<W>) -> Result<Hypergraph<W>, HgError> {
    combine(a, b, Combine::Concat)
}

fn combine<W: Weight>(
    a: &Hypergraph<W>,
    b: &Hypergraph<W>,
    mode: Combine,
) -> Result<Hypergraph<W>, HgError> {
    let _span = debug_span!("combine", ?mode).entered();
    if !Arc::ptr_eq(a.vocab(), b.vocab()) {
        return Err(HgError::config(
            "vocabulary-mismatch",
            "combined hypergraphs must share one vocabulary",
        ));
    }
    let fsm = a.verify_properties().contains(Properties::FSM)
        && b.verify_properties().contains(Properties::FSM);

    let mut out = Hypergraph::with_index(a.vocab().clone(), a.arc_index());
    let map_a = copy_into(&mut out, a)?;
    let map_b = copy_into(&mut out, b)?;
    let final_a = endpoint(a.final_state(), &map_a, "final")?;
    let final_b = endpoint(b.final_state(), &map_b, "final")?;

    let new_final = out.add_state();
    if fsm {
        let start_a = endpoint(a.start(), &map_a, "start")?;
        let start_b = endpoint(b.start(), &map_b, "start")?;
        let epsilon = out.vocab().epsilon();
        let new_start = out.add_labeled_state(LabelPair::input(epsilon))?;
        let bridges = match mode {
            Combine::Union => vec![
                (start_a, new_start),
                (start_b, new_start),
                (new_final, final_a),
                (new_final, final_b),
            ],
            Combine::Concat => vec![
                (start_a, new_start),
                (start_b, final_a),
                (new_final, final_b),
            ],
        };
        for (head, tail) in bridges {
            out.add_arc(Hyperarc::new(head, vec![tail], W::one()))?;
        }
        out.set_start(new_start)?;
    } else {
        match mode {
            Combine::Union => {
                out.add_arc(Hyperarc::new(new_final, vec![final_a], W::one()))?;
                out.add_arc(Hyperarc::new(new_final, vec![final_b], W::one()))?;
            }
            Combine::Concat => {
                out.add_arc(Hyperarc::new(new_final, vec![final_a, final_b], W::one()))?;
            }
        }
    }
    out.set_final(new_final)?;
    out.compute_properties();
    debug!(fsm, states = out.num_states(), arcs = out.num_arcs(), "combined hypergraphs");
    Ok(out)
}

/// Copies states and arcs of `source` into `target` and returns the state map.
///
/// Plain lexical states are merged with `target`'s lexical state for the same word.
fn copy_into<W: Weight>(
    target: &mut Hypergraph<W>,
    source: &Hypergraph<W>,
) -> Result<Vec<StateId>, HgError> {
    let mut map = Vec::with_capacity(source.num_states());
    for state in source.states() {
        let labels = *source.labels(state)?;
        let copy = match labels.terminal() {
            Some(sym) if labels.output.is_none() => target.lexical_state(sym)?,
            _ => target.add_labeled_state(labels)?,
        };
        map.push(copy);
    }
    for (_, arc) in source.arcs() {
        let tails = arc.tails().iter().map(|tail| map[tail.index()]).collect();
        let copy = Hyperarc::new(map[arc.head().index()], tails, arc.weight().clone())
            .with_annotations(arc.annotations().clone());
        target.add_arc(copy)?;
    }
    Ok(map)
}

fn endpoint(state: Option<StateId>, map: &[StateId], which: &str) -> Result<StateId, HgError> {
    state
        .map(|state| map[state.index()])
        .ok_or_else(|| {
            HgError::empty_set(
                format!("no-{which}-state"),
                format!("combining hypergraphs requires a {which} state on both inputs"),
            )
        })
}

#[cfg(test)]
mod tests {
    use hgx_core::{SharedVocabulary, SymbolTable, ViterbiWeight};

    use super::*;
    use crate::derivation::{derivation_string, enumerate_derivations};

    fn word(vocab: &SharedVocabulary, text: &str) -> Hypergraph<ViterbiWeight> {
        let mut hg = Hypergraph::new(vocab.clone());
        let s0 = hg.add_state();
        let w = hg.word_state(text).unwrap();
        let s1 = hg.add_state();
        hg.add_arc(Hyperarc::new(s1, vec![s0, w], ViterbiWeight::new(1.0))).unwrap();
        hg.set_start(s0).unwrap();
        hg.set_final(s1).unwrap();
        hg
    }

    fn strings(hg: &Hypergraph<ViterbiWeight>) -> Vec<String> {
        let mut all: Vec<String> = enumerate_derivations(hg, 16)
            .unwrap()
            .iter()
            .map(|d| derivation_string(hg, d).unwrap())
            .collect();
        all.sort();
        all
    }

    #[test]
    fn fsm_union_and_concat() {
        let vocab = SymbolTable::shared();
        let a = word(&vocab, "hello");
        let b = word(&vocab, "world");
        assert_eq!(strings(&union(&a, &b).unwrap()), vec!["hello", "world"]);
        let joined = concat(&a, &b).unwrap();
        assert_eq!(strings(&joined), vec!["hello world"]);
        assert!(joined.properties().contains(Properties::FSM));
    }

    #[test]
    fn shared_words_share_lexical_states() {
        let vocab = SymbolTable::shared();
        let a = word(&vocab, "same");
        let b = word(&vocab, "same");
        let both = union(&a, &b).unwrap();
        let lexical = both.states().filter(|s| both.is_lexical(*s)).count();
        assert_eq!(lexical, 1);
    }

    #[test]
    fn foreign_vocabularies_are_rejected() {
        let a = word(&SymbolTable::shared(), "a");
        let b = word(&SymbolTable::shared(), "b");
        assert!(matches!(union(&a, &b), Err(HgError::Config(_))));
    }
}
