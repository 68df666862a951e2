use hgx_core::{
    CostWeight, ExpectationWeight, FeatureCarrier, FeatureWeight, LogWeight, SymbolTable,
    ViterbiWeight,
};
use hgx_graph::text::parse_text;
use hgx_graph::transforms::{apply_transforms, push_weights, PushTo, TransformOptions};
use hgx_graph::{
    derivation_string, enumerate_derivations, feature_expectations, inside, Hypergraph,
};

const LATTICE: &str = r#"
START <- 0
FINAL <- 3
1 <- 0 "the" / 0.5
2 <- 1 "dog" / 1
2 <- 1 "cat" / 2
3 <- 2 "barks" / 0.25
3 <- 2 "sleeps" / 0.75
"#;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

fn total<W: CostWeight>(hg: &Hypergraph<W>) -> f64 {
    let log = hg.with_weights(|w| LogWeight::new(w.cost()));
    let final_state = log.final_state().unwrap();
    inside(&log).unwrap()[final_state.index()].cost()
}

fn derivation_costs(hg: &Hypergraph<LogWeight>) -> Vec<(String, f64)> {
    let mut costs: Vec<(String, f64)> = enumerate_derivations(hg, 16)
        .unwrap()
        .iter()
        .map(|d| (derivation_string(hg, d).unwrap(), d.weight().cost()))
        .collect();
    costs.sort_by(|a, b| a.0.cmp(&b.0));
    costs
}

#[test]
fn pushing_keeps_every_derivation_weight() {
    let original: Hypergraph<LogWeight> = parse_text(LATTICE, SymbolTable::shared()).unwrap();
    let before = derivation_costs(&original);
    for to in [PushTo::Start, PushTo::Final] {
        let mut hg = original.clone();
        let report = push_weights(&mut hg, to).unwrap();
        assert!(!report.emptied);
        assert_eq!(report.removed, 0);
        let after = derivation_costs(&hg);
        assert_eq!(after.len(), before.len());
        for ((text_a, cost_a), (text_b, cost_b)) in before.iter().zip(&after) {
            assert_eq!(text_a, text_b);
            assert!(close(*cost_a, *cost_b), "{to:?}: {cost_a} vs {cost_b}");
        }
    }
}

#[test]
fn configured_pipeline_prunes_to_the_best_path() {
    let yaml = "push-weights: true\nprune-to-nbest: 1\nreweight:\n  plus: 1.0\n";
    let options: TransformOptions = serde_yaml::from_str(yaml).unwrap();
    let mut hg: Hypergraph<ViterbiWeight> = parse_text(LATTICE, SymbolTable::shared()).unwrap();

    let report = apply_transforms(&mut hg, &options).unwrap();
    assert_eq!(report.reweighted, 5);
    assert!(report.pushed.is_some());
    assert!(report.pruned);

    let derivations = enumerate_derivations(&hg, 16).unwrap();
    assert_eq!(derivations.len(), 1);
    assert_eq!(derivation_string(&hg, &derivations[0]).unwrap(), "the dog barks");
    // Three arcs at +1 each on top of 0.5 + 1 + 0.25.
    assert!(close(derivations[0].weight().cost(), 4.75));
}

#[test]
fn expectations_match_the_expectation_semiring() {
    let input = r#"
START <- 0
FINAL <- 2
1 <- 0 "a" / 0.2[1=1]
1 <- 0 "b" / 1.1[1=3,2=-1]
2 <- 1 "c" / 0.3[2=2]
2 <- 1 "d" / 0.9
"#;
    let hg: Hypergraph<FeatureWeight> = parse_text(input, SymbolTable::shared()).unwrap();
    let result = feature_expectations(&hg).unwrap();

    let semiring = hg.with_weights(|w| ExpectationWeight::from_features(w.cost(), &w.feature_values()));
    let ins = inside(&semiring).unwrap();
    let root = &ins[2];
    assert!(close(result.partition_cost, root.cost()));
    let z = root.probability();
    for id in [1, 2] {
        let expected = root.expectations().get(id) / z;
        assert!(close(result.expectations.get(id), expected), "feature {id}");
        assert!(close(root.feature_values().get(id), expected), "feature {id}");
    }
    assert!(close(result.partition_cost, total(&hg)));
}

#[test]
fn expectations_survive_costs_past_underflow() {
    let input = "START <- 0\nFINAL <- 1\n1 <- 0 / 800[1=1]\n";
    let hg: Hypergraph<ExpectationWeight> = parse_text(input, SymbolTable::shared()).unwrap();
    let result = feature_expectations(&hg).unwrap();
    assert_eq!(result.partition_cost, 800.0);
    assert!(close(result.expectations.get(1), 1.0));

    let root = &inside(&hg).unwrap()[1];
    assert_eq!(root.cost(), 800.0);
    assert_eq!(root.feature_values().get(1), 1.0);
}
