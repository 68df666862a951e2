use hgx_core::{HgError, StateId, Weight};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use crate::batch::ArcBatch;
use crate::hypergraph::{Hyperarc, Hypergraph};

/// When arcs get binarized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinarizeWhen {
    /// Leave arcs alone.
    #[default]
    Never,
    /// Split every arc with more than two tails.
    Always,
    /// Split arcs only as far as needed for one lexical tail per arc.
    OneLexical,
}

/// Options for [`binarize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BinarizeOptions {
    /// Binarization policy.
    pub when: BinarizeWhen,
    /// Copy the original arc's annotations onto every synthesized arc, not only the first.
    pub clone_annotations: bool,
}

/// Rewrites arcs into left-branching cascades and returns how many arcs were split.
///
/// `head <- t1 t2 ... tn / w` becomes `n1 <- t1 t2 / w`, `n2 <- n1 t3 / 1`, ...,
/// `head <- n(k) tn / 1`. The original weight sits on the first synthesized arc, so
/// every derivation keeps its weight and yield. Under [`BinarizeWhen::OneLexical`]
/// the tails are cut into runs holding one lexical tail each and only those runs are
/// chained.
pub fn binarize<W: Weight>(hg: &mut Hypergraph<W>, options: &BinarizeOptions) -> Result<usize, HgError> {
    let _span = debug_span!("binarize", when = ?options.when).entered();
    if options.when == BinarizeWhen::Never {
        return Ok(0);
    }
    let mut batch = ArcBatch::new();
    let mut split = 0;
    for id in hg.arc_ids() {
        let arc = hg.arc(id)?;
        let chunks = match options.when {
            BinarizeWhen::Always => always_chunks(arc.tails()),
            _ => one_lexical_chunks(hg, arc.tails()),
        };
        if chunks.len() < 2 {
            continue;
        }
        let arc = arc.clone();
        let mut previous: Option<StateId> = None;
        let last = chunks.len() - 1;
        for (pos, chunk) in chunks.into_iter().enumerate() {
            let head = if pos == last { arc.head() } else { hg.add_state() };
            let mut tails: Vec<StateId> = previous.into_iter().collect();
            tails.extend(chunk);
            let weight = if pos == 0 { arc.weight().clone() } else { W::one() };
            let mut piece = Hyperarc::new(head, tails, weight);
            if pos == 0 || options.clone_annotations {
                piece = piece.with_annotations(arc.annotations().clone());
            }
            batch.add(piece);
            previous = Some(head);
        }
        batch.remove(id);
        split += 1;
    }
    let added = batch.num_additions();
    batch.apply(hg)?;
    hg.compute_properties();
    debug!(split, added, "binarized arcs");
    Ok(split)
}

/// `[t1 t2] [t3] ... [tn]`, or a single chunk when there are at most two tails.
fn always_chunks(tails: &[StateId]) -> Vec<Vec<StateId>> {
    if tails.len() <= 2 {
        return vec![tails.to_vec()];
    }
    let mut chunks = vec![tails[..2].to_vec()];
    chunks.extend(tails[2..].iter().map(|tail| vec![*tail]));
    chunks
}

fn one_lexical_chunks<W: Weight>(hg: &Hypergraph<W>, tails: &[StateId]) -> Vec<Vec<StateId>> {
    let mut chunks: Vec<Vec<StateId>> = Vec::new();
    let mut current = Vec::new();
    let mut has_lexical = false;
    for tail in tails {
        let lexical = hg.is_lexical(*tail);
        if lexical && has_lexical {
            chunks.push(std::mem::take(&mut current));
            has_lexical = false;
        }
        has_lexical |= lexical;
        current.push(*tail);
    }
    chunks.push(current);
    chunks
}

#[cfg(test)]
mod tests {
    use hgx_core::{SymbolTable, ViterbiWeight};

    use super::*;
    use crate::properties::Properties;

    fn flat_rule() -> Hypergraph<ViterbiWeight> {
        let mut hg = Hypergraph::new(SymbolTable::shared());
        let s = hg.add_state();
        let a = hg.word_state("a").unwrap();
        let b = hg.word_state("b").unwrap();
        let c = hg.word_state("c").unwrap();
        let head = hg.add_state();
        let arc = Hyperarc::new(head, vec![s, a, b, c], ViterbiWeight::new(4.0))
            .with_annotation("align", "0-0");
        hg.add_arc(arc).unwrap();
        hg.set_final(head).unwrap();
        hg
    }

    #[test]
    fn always_builds_a_binary_cascade() {
        let mut hg = flat_rule();
        let options = BinarizeOptions {
            when: BinarizeWhen::Always,
            clone_annotations: false,
        };
        assert_eq!(binarize(&mut hg, &options).unwrap(), 1);
        assert_eq!(hg.num_arcs(), 3);
        assert!(hg.arcs().all(|(_, arc)| arc.tails().len() <= 2));
        let annotated = hg.arcs().filter(|(_, arc)| !arc.annotations().is_empty()).count();
        assert_eq!(annotated, 1);
        assert!(hg.properties().contains(Properties::FSM));
        assert!(hg.properties().contains(Properties::ACYCLIC));
    }

    #[test]
    fn one_lexical_cuts_before_each_extra_word() {
        let mut hg = flat_rule();
        let options = BinarizeOptions {
            when: BinarizeWhen::OneLexical,
            clone_annotations: true,
        };
        binarize(&mut hg, &options).unwrap();
        assert_eq!(hg.num_arcs(), 3);
        assert!(hg.properties().contains(Properties::ONE_LEXICAL));
        assert!(hg.arcs().all(|(_, arc)| arc.annotations().contains_key("align")));
    }

    #[test]
    fn never_is_a_no_op() {
        let mut hg = flat_rule();
        assert_eq!(binarize(&mut hg, &BinarizeOptions::default()).unwrap(), 0);
        assert_eq!(hg.num_arcs(), 1);
    }
}
