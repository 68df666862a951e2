use std::fmt::Display;

use hgx_core::{HgError, StateId, Sym, SymbolType, Weight};
use sha2::{Digest, Sha256};

use crate::hypergraph::Hypergraph;

/// Computes a structural hash of the hypergraph.
///
/// The hash covers state labels by text, the start and final states, and the
/// multiset of arcs as `(head, tails, weight text)`. Arc ids, tombstones, arc order
/// and the stored indices do not contribute, so a graph and its text round trip
/// hash the same.
pub fn canonical_hash<W: Weight + Display>(hg: &Hypergraph<W>) -> Result<String, HgError> {
    let mut hasher = Sha256::new();
    hasher.update((hg.num_states() as u64).to_le_bytes());
    for state in hg.states() {
        let labels = hg.labels(state)?;
        encode_symbol(hg, labels.input, &mut hasher)?;
        encode_symbol(hg, labels.output, &mut hasher)?;
    }
    encode_state("start", hg.start(), &mut hasher);
    encode_state("final", hg.final_state(), &mut hasher);

    let mut signatures: Vec<(Vec<u64>, String)> = hg
        .arcs()
        .map(|(_, arc)| {
            let mut ids = Vec::with_capacity(arc.tails().len() + 1);
            ids.push(arc.head().as_raw());
            ids.extend(arc.tails().iter().map(|tail| tail.as_raw()));
            (ids, arc.weight().to_string())
        })
        .collect();
    signatures.sort();
    hasher.update((signatures.len() as u64).to_le_bytes());
    for (ids, weight) in signatures {
        update_slice(&ids, &mut hasher);
        update_bytes(weight.as_bytes(), &mut hasher);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn encode_symbol<W: Weight>(
    hg: &Hypergraph<W>,
    sym: Option<Sym>,
    hasher: &mut Sha256,
) -> Result<(), HgError> {
    match sym {
        None => hasher.update(b"sym:none"),
        Some(sym) => {
            let kind: &[u8] = match sym.kind() {
                SymbolType::Terminal => b"sym:terminal",
                SymbolType::Nonterminal => b"sym:nonterminal",
                SymbolType::Special => b"sym:special",
            };
            hasher.update(kind);
            update_bytes(hg.symbol_text(sym)?.as_bytes(), hasher);
        }
    }
    Ok(())
}

fn encode_state(label: &str, value: Option<StateId>, hasher: &mut Sha256) {
    hasher.update(label.as_bytes());
    match value {
        Some(state) => {
            hasher.update(b":some");
            hasher.update(state.as_raw().to_le_bytes());
        }
        None => hasher.update(b":none"),
    }
}

fn update_bytes(bytes: &[u8], hasher: &mut Sha256) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn update_slice(values: &[u64], hasher: &mut Sha256) {
    hasher.update((values.len() as u64).to_le_bytes());
    for value in values {
        hasher.update(value.to_le_bytes());
    }
}
