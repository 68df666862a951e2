use hgx_core::numeric::log_sum;
use hgx_core::{CostWeight, LogWeight, StateId, SymbolTable, ViterbiWeight};
use hgx_graph::transforms::{binarize, BinarizeOptions, BinarizeWhen};
use hgx_graph::{
    derivation_string, enumerate_derivations, inside, AcyclicBest, BestOptions, Hyperarc,
    Hypergraph,
};
use proptest::prelude::*;
use proptest::sample::Index;

const WORDS: [&str; 4] = ["a", "b", "c", "d"];

type ArcSpec = (Index, Option<usize>, f64);

fn arc_specs() -> impl Strategy<Value = Vec<Vec<ArcSpec>>> {
    let arc = (any::<Index>(), proptest::option::of(0usize..WORDS.len()), 0.0f64..3.0);
    proptest::collection::vec(proptest::collection::vec(arc, 1..3), 1..6)
}

/// State `i + 1` gets the arcs `specs[i]`, each reading from an earlier state.
fn layered(specs: &[Vec<ArcSpec>]) -> Hypergraph<LogWeight> {
    let mut hg = Hypergraph::new(SymbolTable::shared());
    for _ in 0..=specs.len() {
        hg.add_state();
    }
    for (pos, arcs) in specs.iter().enumerate() {
        let head = StateId::from(pos + 1);
        for (tail, word, cost) in arcs {
            let mut tails = vec![StateId::from(tail.index(pos + 1))];
            if let Some(word) = word {
                tails.push(hg.word_state(WORDS[*word]).unwrap());
            }
            hg.add_arc(Hyperarc::new(head, tails, LogWeight::new(*cost))).unwrap();
        }
    }
    hg.set_start(StateId::from_raw(0)).unwrap();
    hg.set_final(StateId::from(specs.len())).unwrap();
    hg.compute_properties();
    hg
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

proptest! {
    #[test]
    fn inside_sums_enumerated_derivations(specs in arc_specs()) {
        let hg = layered(&specs);
        let final_state = hg.final_state().unwrap();
        let derivations = enumerate_derivations(&hg, 1 << 12).unwrap();
        prop_assert!(!derivations.is_empty());

        let total = log_sum(derivations.iter().map(|d| d.weight().cost()));
        let ins = inside(&hg).unwrap();
        prop_assert!(close(ins[final_state.index()].cost(), total));

        let viterbi = hg.with_weights(|w| ViterbiWeight::new(w.cost()));
        let best = AcyclicBest::compute(&viterbi, &BestOptions::default()).unwrap();
        prop_assert!(best.exact_best());
        let cheapest = derivations
            .iter()
            .map(|d| d.weight().cost())
            .fold(f64::INFINITY, f64::min);
        prop_assert!(close(best.best_weight().cost(), cheapest));
    }

    #[test]
    fn binarizing_keeps_yields_and_weights(
        alternatives in proptest::collection::vec(
            (proptest::collection::vec(0usize..WORDS.len(), 1..6), 0.0f64..3.0),
            1..5,
        )
    ) {
        let mut hg: Hypergraph<ViterbiWeight> = Hypergraph::new(SymbolTable::shared());
        let root = hg.add_state();
        for (words, cost) in &alternatives {
            let tails = words
                .iter()
                .map(|word| hg.word_state(WORDS[*word]))
                .collect::<Result<Vec<_>, _>>()
                .unwrap();
            hg.add_arc(Hyperarc::new(root, tails, ViterbiWeight::new(*cost))).unwrap();
        }
        hg.set_final(root).unwrap();

        let collect = |hg: &Hypergraph<ViterbiWeight>| {
            let mut seen: Vec<(String, u64)> = enumerate_derivations(hg, 64)
                .unwrap()
                .iter()
                .map(|d| (derivation_string(hg, d).unwrap(), d.weight().cost().to_bits()))
                .collect();
            seen.sort();
            seen
        };
        let before = collect(&hg);
        let options = BinarizeOptions { when: BinarizeWhen::Always, ..BinarizeOptions::default() };
        let split = binarize(&mut hg, &options).unwrap();
        prop_assert_eq!(split, alternatives.iter().filter(|(words, _)| words.len() > 2).count());
        for (_, arc) in hg.arcs() {
            prop_assert!(arc.tails().len() <= 2);
        }
        prop_assert_eq!(collect(&hg), before);
    }
}
