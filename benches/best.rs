use hgx_core::{RngHandle, StateId, SymbolTable, ViterbiWeight};
use hgx_graph::{best_derivation, AcyclicBest, ArcIndex, BestOptions, BestStrategy, Hyperarc, Hypergraph};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Lattice with skip arcs, stored with both indices so either strategy can run.
fn lattice(length: usize, width: usize, seed: u64) -> Hypergraph<ViterbiWeight> {
    let mut rng = RngHandle::from_seed(seed);
    let mut hg = Hypergraph::with_index(SymbolTable::shared(), ArcIndex::InOut);
    let positions: Vec<StateId> = (0..=length).map(|_| hg.add_state()).collect();
    for pos in 0..length {
        for alt in 0..width {
            let word = hg.word_state(&format!("w{alt}")).unwrap();
            let arc = Hyperarc::new(
                positions[pos + 1],
                vec![positions[pos], word],
                ViterbiWeight::new(rng.uniform_below(4.0)),
            );
            hg.add_arc(arc).unwrap();
        }
        if pos + 2 <= length {
            let skip = Hyperarc::new(
                positions[pos + 2],
                vec![positions[pos]],
                ViterbiWeight::new(rng.uniform_below(8.0)),
            );
            hg.add_arc(skip).unwrap();
        }
    }
    hg.set_start(positions[0]).unwrap();
    hg.set_final(positions[length]).unwrap();
    hg.compute_properties();
    hg
}

fn best_bench(c: &mut Criterion) {
    let hg = lattice(1_000, 6, 5);

    for (name, strategy) in [
        ("acyclic_best_in_arcs", BestStrategy::InArcs),
        ("acyclic_best_out_arcs", BestStrategy::OutArcs),
    ] {
        let options = BestOptions {
            max_back_edges: 0,
            strategy,
        };
        c.bench_function(name, |b| {
            b.iter(|| black_box(AcyclicBest::compute(black_box(&hg), &options).unwrap()));
        });
    }

    let best = AcyclicBest::compute(&hg, &BestOptions::default()).unwrap();
    c.bench_function("best_derivation_extract", |b| {
        b.iter(|| black_box(best_derivation(&hg, &best).unwrap()));
    });
}

criterion_group!(benches, best_bench);
criterion_main!(benches);
