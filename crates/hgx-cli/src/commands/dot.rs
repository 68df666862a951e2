use std::error::Error;

use clap::Args;
use hgx_core::{LogWeight, ViterbiWeight};
use hgx_graph::text::TextWeight;
use hgx_graph::{write_dot, ArcIndex};

use super::{read_graph, unsupported, InputArgs, Semiring};

#[derive(Args, Debug)]
pub struct DotArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn run(args: &DotArgs) -> Result<(), Box<dyn Error>> {
    match args.input.semiring {
        Semiring::Viterbi => draw::<ViterbiWeight>(args),
        Semiring::Log => draw::<LogWeight>(args),
        other => Err(unsupported("dot", other)),
    }
}

fn draw<W: TextWeight>(args: &DotArgs) -> Result<(), Box<dyn Error>> {
    let hg = read_graph::<W>(&args.input.input, ArcIndex::In)?;
    let mut out = String::new();
    write_dot(&hg, &mut out)?;
    print!("{out}");
    Ok(())
}
