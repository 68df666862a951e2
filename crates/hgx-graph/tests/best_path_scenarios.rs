use hgx_core::{CostWeight, LogWeight, StateId, SymbolTable, ViterbiWeight, Weight};
use hgx_graph::text::{parse_text, parse_text_with_index};
use hgx_graph::{
    best_derivation, derivation_string, inside, AcyclicBest, ArcIndex, BestOptions, BestStrategy,
    Hypergraph,
};

const SENTENCE: &str = r#"
START <- 0
2 <- 0 "dog" / 2.0
1 <- 2 "barks" / 1.5
FINAL <- 1
"#;

const SELF_LOOP: &str = "
1 <- 0 / 1
1 <- 1 / 0.5
2 <- 1 / 1
START <- 0
FINAL <- 2
";

fn cyclic(index: ArcIndex) -> Hypergraph<ViterbiWeight> {
    parse_text_with_index(SELF_LOOP, SymbolTable::shared(), index).unwrap()
}

#[test]
fn sentence_inside_and_best_agree() {
    let hg: Hypergraph<LogWeight> = parse_text(SENTENCE, SymbolTable::shared()).unwrap();
    let ins = inside(&hg).unwrap();
    assert!((ins[1].cost() - 3.5).abs() < 1e-12);

    let viterbi = hg.with_weights(|w| ViterbiWeight::new(w.cost()));
    let best = AcyclicBest::compute(&viterbi, &BestOptions::default()).unwrap();
    assert!(best.exact_best());
    assert!(best.acyclic());
    assert_eq!(best.back_edges(), 0);
    assert_eq!(best.best_weight(), &ViterbiWeight::new(3.5));

    let derivation = best_derivation(&viterbi, &best).unwrap();
    assert_eq!(derivation.arcs().len(), 2);
    assert_eq!(derivation_string(&viterbi, &derivation).unwrap(), "dog barks");
}

#[test]
fn self_loop_exceeds_zero_budget() {
    for index in [ArcIndex::In, ArcIndex::Out] {
        let hg = cyclic(index);
        let best = AcyclicBest::compute(&hg, &BestOptions::default()).unwrap();
        assert!(!best.exact_best(), "{index:?}");
        assert!(best.back_edges() >= 1);
    }
}

#[test]
fn self_loop_within_budget_is_exact_but_cyclic() {
    for (index, strategy) in [
        (ArcIndex::In, BestStrategy::InArcs),
        (ArcIndex::Out, BestStrategy::OutArcs),
        (ArcIndex::InOut, BestStrategy::OutArcs),
    ] {
        let hg = cyclic(index);
        let options = BestOptions {
            max_back_edges: 1,
            strategy,
        };
        let best = AcyclicBest::compute(&hg, &options).unwrap();
        assert!(best.exact_best(), "{index:?}");
        assert!(!best.acyclic());
        assert_eq!(best.back_edges(), 1);
        assert_eq!(best.self_loops(), 1);
        assert_eq!(best.mu(StateId::from_raw(2)), &ViterbiWeight::new(2.0));
        assert_eq!(best.mu(StateId::from_raw(1)), &ViterbiWeight::new(1.0));
    }
}

#[test]
fn best_path_needs_a_derivation() {
    let hg: Hypergraph<ViterbiWeight> =
        parse_text("1 <- 0 / 1\nFINAL <- 2\n2 <- 3 / 1\n3 <- 2 / 1", SymbolTable::shared())
            .unwrap();
    let best = AcyclicBest::compute(&hg, &BestOptions::with_max_back_edges(usize::MAX)).unwrap();
    assert!(best.best_weight().is_zero());
    assert!(best_derivation(&hg, &best).is_err());
}
