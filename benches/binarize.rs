use hgx_core::{RngHandle, SymbolTable, ViterbiWeight};
use hgx_graph::transforms::{binarize, BinarizeOptions, BinarizeWhen};
use hgx_graph::{Hyperarc, Hypergraph};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

/// Flat rules over `arity` words each, all rewriting one root.
fn flat_rules(rules: usize, arity: usize, seed: u64) -> Hypergraph<ViterbiWeight> {
    let mut rng = RngHandle::from_seed(seed);
    let mut hg = Hypergraph::new(SymbolTable::shared());
    let root = hg.add_state();
    for rule in 0..rules {
        let tails = (0..arity)
            .map(|pos| hg.word_state(&format!("w{}", (rule + pos) % 97)))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let weight = ViterbiWeight::new(rng.uniform_below(2.0));
        hg.add_arc(Hyperarc::new(root, tails, weight)).unwrap();
    }
    hg.set_final(root).unwrap();
    hg
}

fn binarize_bench(c: &mut Criterion) {
    let hg = flat_rules(2_000, 6, 3);

    for (name, when) in [
        ("binarize_always", BinarizeWhen::Always),
        ("binarize_one_lexical", BinarizeWhen::OneLexical),
    ] {
        let options = BinarizeOptions {
            when,
            clone_annotations: false,
        };
        c.bench_function(name, |b| {
            b.iter_batched(
                || hg.clone(),
                |mut graph| black_box(binarize(&mut graph, &options).unwrap()),
                BatchSize::LargeInput,
            );
        });
    }
}

criterion_group!(benches, binarize_bench);
criterion_main!(benches);
