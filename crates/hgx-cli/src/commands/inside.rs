use std::error::Error;
use std::io::Write;

use clap::Args;
use hgx_core::{BooleanWeight, ExpectationWeight, FeatureWeight, LogWeight, ViterbiWeight};
use hgx_graph::text::TextWeight;
use hgx_graph::{inside, ArcIndex};

use super::{read_graph, InputArgs, Semiring};

#[derive(Args, Debug)]
pub struct InsideArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Print only the inside weight of the final state.
    #[arg(long)]
    pub final_only: bool,
}

pub fn run(args: &InsideArgs) -> Result<(), Box<dyn Error>> {
    match args.input.semiring {
        Semiring::Viterbi => print_inside::<ViterbiWeight>(args),
        Semiring::Log => print_inside::<LogWeight>(args),
        Semiring::Boolean => print_inside::<BooleanWeight>(args),
        Semiring::Feature => print_inside::<FeatureWeight>(args),
        Semiring::Expectation => print_inside::<ExpectationWeight>(args),
    }
}

fn print_inside<W: TextWeight>(args: &InsideArgs) -> Result<(), Box<dyn Error>> {
    let hg = read_graph::<W>(&args.input.input, ArcIndex::In)?;
    let weights = inside(&hg)?;
    let mut stdout = std::io::stdout().lock();
    if args.final_only {
        let final_state = hg.final_state().ok_or("the hypergraph has no final state")?;
        writeln!(stdout, "{}", weights[final_state.index()])?;
        return Ok(());
    }
    for (state, weight) in hg.states().zip(&weights) {
        writeln!(stdout, "{state}\t{weight}")?;
    }
    Ok(())
}
