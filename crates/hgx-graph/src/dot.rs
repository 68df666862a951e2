use std::fmt::{self, Display, Write};

use hgx_core::{SymbolType, Weight};

use crate::hypergraph::Hypergraph;

/// Renders the hypergraph for Graphviz.
///
/// Single-tail arcs become plain edges. An arc with several tails gets a point node
/// fed by numbered edges from its tails in order. Start and final states are drawn
/// as double circles and boxes respectively. States whose labels are not in the
/// vocabulary are drawn by id only.
pub fn write_dot<W: Weight + Display>(hg: &Hypergraph<W>, out: &mut impl Write) -> fmt::Result {
    writeln!(out, "digraph hypergraph {{")?;
    writeln!(out, "  rankdir=LR;")?;
    for state in hg.states() {
        let mut label = state.to_string();
        if let Ok(labels) = hg.labels(state) {
            for sym in labels.input.iter().chain(labels.output.iter()) {
                if let Ok(text) = hg.symbol_text(*sym) {
                    let shown = match sym.kind() {
                        SymbolType::Terminal => format!("\"{text}\""),
                        _ => text,
                    };
                    label.push(' ');
                    label.push_str(&shown);
                }
            }
        }
        let shape = if hg.final_state() == Some(state) {
            "box"
        } else if hg.start() == Some(state) {
            "doublecircle"
        } else {
            "circle"
        };
        writeln!(out, "  s{state} [label={}, shape={shape}];", escape(&label))?;
    }
    for (id, arc) in hg.arcs() {
        let weight = if arc.weight().is_one() {
            String::new()
        } else {
            arc.weight().to_string()
        };
        match arc.tails() {
            [tail] => writeln!(out, "  s{tail} -> s{} [label={}];", arc.head(), escape(&weight))?,
            tails => {
                writeln!(out, "  a{id} [shape=point];")?;
                for (pos, tail) in tails.iter().enumerate() {
                    writeln!(out, "  s{tail} -> a{id} [label=\"{pos}\", arrowhead=none];")?;
                }
                writeln!(out, "  a{id} -> s{} [label={}];", arc.head(), escape(&weight))?;
            }
        }
    }
    writeln!(out, "}}")
}

fn escape(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}
