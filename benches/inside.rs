use hgx_core::{CostWeight, LogWeight, RngHandle, StateId, SymbolTable};
use hgx_graph::{inside, outside, Hyperarc, Hypergraph};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Word lattice with `width` competing words between consecutive positions.
fn lattice(length: usize, width: usize, seed: u64) -> Hypergraph<LogWeight> {
    let mut rng = RngHandle::from_seed(seed);
    let mut hg = Hypergraph::new(SymbolTable::shared());
    let positions: Vec<StateId> = (0..=length).map(|_| hg.add_state()).collect();
    for pos in 0..length {
        for alt in 0..width {
            let word = hg.word_state(&format!("w{pos}_{alt}")).unwrap();
            let arc = Hyperarc::new(
                positions[pos + 1],
                vec![positions[pos], word],
                LogWeight::new(rng.uniform_below(4.0)),
            );
            hg.add_arc(arc).unwrap();
        }
    }
    hg.set_start(positions[0]).unwrap();
    hg.set_final(positions[length]).unwrap();
    hg.compute_properties();
    hg
}

fn inside_bench(c: &mut Criterion) {
    let hg = lattice(500, 8, 11);
    let final_state = hg.final_state().unwrap();

    c.bench_function("inside_log_lattice", |b| {
        b.iter(|| {
            let ins = inside(black_box(&hg)).unwrap();
            black_box(ins[final_state.index()].cost());
        });
    });

    let ins = inside(&hg).unwrap();
    c.bench_function("outside_log_lattice", |b| {
        b.iter(|| black_box(outside(black_box(&hg), &ins).unwrap()));
    });
}

criterion_group!(benches, inside_bench);
criterion_main!(benches);
