use std::error::Error;

use clap::Args;
use hgx_core::{ExpectationWeight, FeatureWeight};
use hgx_graph::{feature_expectations, ArcIndex};

use super::{read_graph, unsupported, write_json, InputArgs, Semiring};

#[derive(Args, Debug)]
pub struct ExpectArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn run(args: &ExpectArgs) -> Result<(), Box<dyn Error>> {
    let result = match args.input.semiring {
        Semiring::Feature => {
            feature_expectations(&read_graph::<FeatureWeight>(&args.input.input, ArcIndex::In)?)?
        }
        Semiring::Expectation => feature_expectations(&read_graph::<ExpectationWeight>(
            &args.input.input,
            ArcIndex::In,
        )?)?,
        other => return Err(unsupported("expect", other)),
    };
    write_json(&result)
}
