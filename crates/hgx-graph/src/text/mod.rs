//! Line-oriented text format: `HEAD <- TAIL... / WEIGHT`.

use std::fmt::Display;
use std::str::FromStr;

use hgx_core::{HgError, Weight};

mod lexer;
mod parser;
mod writer;

pub use parser::{parse_text, parse_text_with_index, MAX_STATE_ID};
pub use writer::{write_text, write_text_to};

/// Weights that can be read from and written to the text format.
pub trait TextWeight: Weight + Display + FromStr<Err = HgError> {}

impl<W> TextWeight for W where W: Weight + Display + FromStr<Err = HgError> {}
