use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use hgx_core::{CostWeight, FeatureWeight, LogWeight, ViterbiWeight};
use hgx_graph::text::{write_text, TextWeight};
use hgx_graph::transforms::{apply_transforms, TransformOptions};
use hgx_graph::ArcIndex;
use tracing::debug;

use super::{read_graph, unsupported, InputArgs, Semiring};

#[derive(Args, Debug)]
pub struct TransformArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// YAML file with transform options; defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Write the transformed hypergraph here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Write a JSON summary of what the transforms did.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

pub fn run(args: &TransformArgs) -> Result<(), Box<dyn Error>> {
    let options = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
            serde_yaml::from_str::<TransformOptions>(&text)
                .map_err(|err| format!("{}: {err}", path.display()))?
        }
        None => TransformOptions::default(),
    };
    options.validate()?;
    debug!(?options, "transform options");
    match args.input.semiring {
        Semiring::Viterbi => transform::<ViterbiWeight>(args, &options),
        Semiring::Log => transform::<LogWeight>(args, &options),
        Semiring::Feature => transform::<FeatureWeight>(args, &options),
        other => Err(unsupported("transform", other)),
    }
}

fn transform<W: TextWeight + CostWeight>(
    args: &TransformArgs,
    options: &TransformOptions,
) -> Result<(), Box<dyn Error>> {
    let mut hg = read_graph::<W>(&args.input.input, ArcIndex::In)?;
    let report = apply_transforms(&mut hg, options)?;
    let text = write_text(&hg)?;
    match &args.out {
        Some(path) => fs::write(path, text)?,
        None => print!("{text}"),
    }
    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }
    Ok(())
}
