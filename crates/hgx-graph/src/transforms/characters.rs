use hgx_core::{HgError, Weight};
use tracing::{debug, debug_span};

use crate::batch::ArcBatch;
use crate::hypergraph::{Hyperarc, Hypergraph};
use crate::properties::Properties;

/// Rewrites every multi-character word arc of an FSM into a chain of character arcs.
///
/// `head <- prev "word" / w` becomes `n1 <- prev "w" / w`, `n2 <- n1 "o" / 1`, ...,
/// `head <- n3 "d" / 1`. Returns the number of arcs rewritten. Fails with
/// [`HgError::Config`] unless the hypergraph is an FSM.
pub fn words_to_characters<W: Weight>(hg: &mut Hypergraph<W>) -> Result<usize, HgError> {
    let _span = debug_span!("words_to_characters", arcs = hg.num_arcs()).entered();
    if !hg.check_property(Properties::FSM) {
        return Err(HgError::config(
            "characters-need-fsm",
            "word to character rewriting needs a finite-state hypergraph",
        )
        .with_context("properties", hg.properties()));
    }
    let mut batch = ArcBatch::new();
    let mut rewritten = 0;
    for id in hg.arc_ids() {
        let arc = hg.arc(id)?;
        let [previous, word] = arc.tails() else {
            continue;
        };
        let Some(sym) = hg.labels(*word)?.terminal() else {
            continue;
        };
        let text = hg.symbol_text(sym)?;
        let chars: Vec<char> = text.chars().collect();
        if chars.len() < 2 {
            continue;
        }
        let arc = arc.clone();
        let mut from = *previous;
        let last = chars.len() - 1;
        for (pos, ch) in chars.into_iter().enumerate() {
            let lexical = hg.word_state(&ch.to_string())?;
            let head = if pos == last { arc.head() } else { hg.add_state() };
            let weight = if pos == 0 { arc.weight().clone() } else { W::one() };
            let mut piece = Hyperarc::new(head, vec![from, lexical], weight);
            if pos == 0 {
                piece = piece.with_annotations(arc.annotations().clone());
            }
            batch.add(piece);
            from = head;
        }
        batch.remove(id);
        rewritten += 1;
    }
    batch.apply(hg)?;
    hg.compute_properties();
    debug!(rewritten, "split words into characters");
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use hgx_core::{SymbolTable, ViterbiWeight};

    use super::*;
    use crate::derivation::{derivation_string, enumerate_derivations};

    #[test]
    fn words_become_character_chains() {
        let mut hg: Hypergraph<ViterbiWeight> = Hypergraph::new(SymbolTable::shared());
        let s0 = hg.add_state();
        let cat = hg.word_state("cat").unwrap();
        let s1 = hg.add_state();
        hg.add_arc(Hyperarc::new(s1, vec![s0, cat], ViterbiWeight::new(2.0))).unwrap();
        hg.set_start(s0).unwrap();
        hg.set_final(s1).unwrap();

        assert_eq!(words_to_characters(&mut hg).unwrap(), 1);
        assert_eq!(hg.num_arcs(), 3);
        let all = enumerate_derivations(&hg, 4).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(derivation_string(&hg, &all[0]).unwrap(), "c a t");
        assert_eq!(*all[0].weight(), ViterbiWeight::new(2.0));
        assert!(hg.properties().contains(Properties::FSM));
    }

    #[test]
    fn non_fsm_is_rejected() {
        let mut hg: Hypergraph<ViterbiWeight> = Hypergraph::new(SymbolTable::shared());
        let a = hg.add_state();
        let b = hg.add_state();
        let c = hg.add_state();
        hg.add_arc(Hyperarc::new(c, vec![a, b], ViterbiWeight::new(0.0))).unwrap();
        assert!(matches!(words_to_characters(&mut hg), Err(HgError::Config(_))));
    }
}
