use std::error::Error;

use clap::Args;
use hgx_core::{BooleanWeight, ExpectationWeight, FeatureWeight, LogWeight, ViterbiWeight};
use hgx_graph::text::TextWeight;
use hgx_graph::{canonical_hash, topsort_states, ArcIndex};
use serde::Serialize;

use super::{read_graph, write_json, InputArgs, Semiring};

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Serialize)]
struct Stats {
    states: usize,
    arcs: usize,
    axioms: usize,
    lexical: usize,
    max_arity: usize,
    start: Option<u64>,
    #[serde(rename = "final")]
    final_state: Option<u64>,
    back_edges: usize,
    properties: Vec<&'static str>,
    hash: String,
}

pub fn run(args: &StatsArgs) -> Result<(), Box<dyn Error>> {
    match args.input.semiring {
        Semiring::Viterbi => stats::<ViterbiWeight>(args),
        Semiring::Log => stats::<LogWeight>(args),
        Semiring::Boolean => stats::<BooleanWeight>(args),
        Semiring::Feature => stats::<FeatureWeight>(args),
        Semiring::Expectation => stats::<ExpectationWeight>(args),
    }
}

fn stats<W: TextWeight>(args: &StatsArgs) -> Result<(), Box<dyn Error>> {
    let hg = read_graph::<W>(&args.input.input, ArcIndex::In)?;
    let stats = Stats {
        states: hg.num_states(),
        arcs: hg.num_arcs(),
        axioms: hg.states().filter(|state| hg.is_axiom(*state)).count(),
        lexical: hg.states().filter(|state| hg.is_lexical(*state)).count(),
        max_arity: hg.arcs().map(|(_, arc)| arc.tails().len()).max().unwrap_or(0),
        start: hg.start().map(|state| state.as_raw()),
        final_state: hg.final_state().map(|state| state.as_raw()),
        back_edges: topsort_states(&hg)?.back_edges,
        properties: hg.properties().names(),
        hash: canonical_hash(&hg)?,
    };
    write_json(&stats)
}
