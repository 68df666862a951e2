use std::fmt::Write;

use hgx_core::{ArcId, HgError, StateId, Sym, SymbolType};

use super::lexer::quote;
use super::TextWeight;
use crate::hypergraph::{Hyperarc, Hypergraph};

/// Renders a hypergraph in the text format read by [`parse_text`](super::parse_text).
///
/// States keep their ids and are written with their labels wherever they occur.
/// States no arc mentions come first as declarations. Arcs follow, grouped by head
/// when incoming arcs are stored and by first tail otherwise; `START` and `FINAL`
/// lines close the output. Weights equal to `one()` are omitted. Annotations are
/// not part of the format.
pub fn write_text<W: TextWeight>(hg: &Hypergraph<W>) -> Result<String, HgError> {
    let mut out = String::new();
    write_text_to(hg, &mut out)?;
    Ok(out)
}

/// [`write_text`] into any [`std::fmt::Write`] sink.
pub fn write_text_to<W: TextWeight, Out: Write>(hg: &Hypergraph<W>, out: &mut Out) -> Result<(), HgError> {
    let mut mentioned = vec![false; hg.num_states()];
    for (_, arc) in hg.arcs() {
        mentioned[arc.head().index()] = true;
        for tail in arc.tails() {
            mentioned[tail.index()] = true;
        }
    }
    for state in hg.states() {
        if !mentioned[state.index()] {
            writeln!(out, "{}", state_text(hg, state)?).map_err(sink_error)?;
        }
    }

    for id in arc_order(hg)? {
        write_arc(hg, hg.arc(id)?, out)?;
    }

    if let Some(start) = hg.start() {
        writeln!(out, "START <- {start}").map_err(sink_error)?;
    }
    if let Some(final_state) = hg.final_state() {
        writeln!(out, "FINAL <- {final_state}").map_err(sink_error)?;
    }
    Ok(())
}

fn arc_order<W: TextWeight>(hg: &Hypergraph<W>) -> Result<Vec<ArcId>, HgError> {
    let mut order = Vec::with_capacity(hg.num_arcs());
    if hg.stores_in_arcs() {
        for state in hg.states() {
            order.extend_from_slice(hg.in_arcs(state)?);
        }
    } else if hg.stores_any_out_arcs() {
        for state in hg.states() {
            for id in hg.out_arcs(state)? {
                if hg.arc(*id)?.first_tail() == Some(state) {
                    order.push(*id);
                }
            }
        }
    } else {
        return Err(HgError::config(
            "write-needs-arc-index",
            "writing text needs an incoming or outgoing arc index",
        )
        .with_context("properties", hg.properties()));
    }
    Ok(order)
}

fn write_arc<W: TextWeight, Out: Write>(
    hg: &Hypergraph<W>,
    arc: &Hyperarc<W>,
    out: &mut Out,
) -> Result<(), HgError> {
    let mut line = format!("{} <-", state_text(hg, arc.head())?);
    for tail in arc.tails() {
        line.push(' ');
        line.push_str(&state_text(hg, *tail)?);
    }
    if !arc.weight().is_one() {
        line.push_str(&format!(" / {}", arc.weight()));
    }
    writeln!(out, "{line}").map_err(sink_error)
}

fn state_text<W: TextWeight>(hg: &Hypergraph<W>, state: StateId) -> Result<String, HgError> {
    let labels = hg.labels(state)?;
    let Some(input) = labels.input else {
        return Ok(state.to_string());
    };
    let mut text = format!("{state}({}", symbol_text(hg, input)?);
    if let Some(output) = labels.output {
        text.push(' ');
        text.push_str(&symbol_text(hg, output)?);
    }
    text.push(')');
    Ok(text)
}

fn symbol_text<W: TextWeight>(hg: &Hypergraph<W>, sym: Sym) -> Result<String, HgError> {
    let text = hg.symbol_text(sym)?;
    Ok(match sym.kind() {
        SymbolType::Terminal => quote(&text),
        SymbolType::Nonterminal | SymbolType::Special => text,
    })
}

fn sink_error(err: std::fmt::Error) -> HgError {
    HgError::serde("write-text", format!("text sink failed: {err}"))
}

#[cfg(test)]
mod tests {
    use hgx_core::{SymbolTable, ViterbiWeight};

    use super::*;
    use crate::text::parse_text;

    #[test]
    fn writes_labels_weights_and_endpoints() {
        let input = "0(<s>)\n2 <- 0 \"dog\" / 2\n1 <- 2 \"barks\"\nSTART <- 0\nFINAL <- 1\n";
        let hg: Hypergraph<ViterbiWeight> = parse_text(input, SymbolTable::shared()).unwrap();
        let text = write_text(&hg).unwrap();
        assert_eq!(
            text,
            "1 <- 2 4(\"barks\")\n2 <- 0(<s>) 3(\"dog\") / 2\nSTART <- 0\nFINAL <- 1\n"
        );
    }
}
