pub mod best;
pub mod dot;
pub mod expect;
pub mod inside;
pub mod stats;
pub mod transform;

use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use hgx_core::SymbolTable;
use hgx_graph::text::{parse_text_with_index, TextWeight};
use hgx_graph::{ArcIndex, Hypergraph};
use serde::Serialize;

/// Weight interpretation of the numbers after `/` in the input.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semiring {
    Viterbi,
    Log,
    Boolean,
    Feature,
    Expectation,
}

/// Input shared by every subcommand.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Hypergraph in the text arc format.
    pub input: PathBuf,
    /// Semiring the arc weights are read in.
    #[arg(long, value_enum, default_value_t = Semiring::Viterbi)]
    pub semiring: Semiring,
}

pub fn read_graph<W: TextWeight>(path: &Path, index: ArcIndex) -> Result<Hypergraph<W>, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    let hg = parse_text_with_index(&text, SymbolTable::shared(), index)
        .map_err(|err| format!("{}: {err}", path.display()))?;
    Ok(hg)
}

pub fn unsupported(command: &str, semiring: Semiring) -> Box<dyn Error> {
    format!("`{command}` does not support the {semiring:?} semiring").into()
}

pub fn write_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
