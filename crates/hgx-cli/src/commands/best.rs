use std::error::Error;

use clap::{Args, ValueEnum};
use hgx_core::{CostWeight, FeatureWeight, Idempotent, ViterbiWeight, Weight};
use hgx_graph::text::TextWeight;
use hgx_graph::{best_derivation, derivation_string, AcyclicBest, ArcIndex, BestOptions, BestStrategy};
use serde::Serialize;

use super::{read_graph, unsupported, write_json, InputArgs, Semiring};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    In,
    Out,
}

#[derive(Args, Debug)]
pub struct BestArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Back edges tolerated before giving up.
    #[arg(long, default_value_t = 0)]
    pub max_back_edges: usize,
    /// Walk incoming or outgoing arcs.
    #[arg(long, value_enum, default_value_t = Strategy::In)]
    pub strategy: Strategy,
}

#[derive(Debug, Serialize)]
struct BestSummary {
    exact_best: bool,
    acyclic: bool,
    back_edges: usize,
    self_loops: usize,
    cost: Option<f64>,
    arcs: usize,
    #[serde(rename = "yield")]
    words: Option<String>,
}

pub fn run(args: &BestArgs) -> Result<(), Box<dyn Error>> {
    match args.input.semiring {
        Semiring::Viterbi => run_best::<ViterbiWeight>(args),
        Semiring::Feature => run_best::<FeatureWeight>(args),
        other => Err(unsupported("best", other)),
    }
}

fn run_best<W: TextWeight + Idempotent + CostWeight>(args: &BestArgs) -> Result<(), Box<dyn Error>> {
    let (index, strategy) = match args.strategy {
        Strategy::In => (ArcIndex::In, BestStrategy::InArcs),
        Strategy::Out => (ArcIndex::Out, BestStrategy::OutArcs),
    };
    let hg = read_graph::<W>(&args.input.input, index)?;
    let options = BestOptions {
        max_back_edges: args.max_back_edges,
        strategy,
    };
    let best = AcyclicBest::compute(&hg, &options)?;
    let mut summary = BestSummary {
        exact_best: best.exact_best(),
        acyclic: best.acyclic(),
        back_edges: best.back_edges(),
        self_loops: best.self_loops(),
        cost: None,
        arcs: 0,
        words: None,
    };
    if best.exact_best() && !best.best_weight().is_zero() {
        let derivation = best_derivation(&hg, &best)?;
        summary.cost = Some(derivation.weight().cost());
        summary.arcs = derivation.arcs().len();
        summary.words = Some(derivation_string(&hg, &derivation)?);
    }
    write_json(&summary)
}
