use std::collections::BTreeMap;

use hgx_core::{ErrorInfo, HgError, SharedVocabulary, StateId, Sym, SymbolType, Weight};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::hypergraph::{Hyperarc, Hypergraph, LabelPair};
use crate::properties::{ArcIndex, Properties};

/// Serializes the hypergraph to a compact binary representation using `bincode`.
pub fn graph_to_bytes<W>(graph: &Hypergraph<W>) -> Result<Vec<u8>, HgError>
where
    W: Weight + Serialize,
{
    let serializable = SerializableGraph::from_graph(graph)?;
    bincode::serialize(&serializable)
        .map_err(|err| HgError::Serde(ErrorInfo::new("serialize-bytes", err.to_string())))
}

/// Restores a hypergraph from its binary representation, interning labels in `vocab`.
pub fn graph_from_bytes<W>(bytes: &[u8], vocab: SharedVocabulary) -> Result<Hypergraph<W>, HgError>
where
    W: Weight + DeserializeOwned,
{
    let serializable: SerializableGraph<W> = bincode::deserialize(bytes)
        .map_err(|err| HgError::Serde(ErrorInfo::new("deserialize-bytes", err.to_string())))?;
    serializable.into_graph(vocab)
}

/// Serializes the hypergraph to a JSON string.
///
/// JSON has no infinity, so arcs weighing `zero()` under a cost semiring do not
/// survive this encoding; use [`graph_to_bytes`] for those.
pub fn graph_to_json<W>(graph: &Hypergraph<W>) -> Result<String, HgError>
where
    W: Weight + Serialize,
{
    let serializable = SerializableGraph::from_graph(graph)?;
    serde_json::to_string_pretty(&serializable)
        .map_err(|err| HgError::Serde(ErrorInfo::new("serialize-json", err.to_string())))
}

/// Restores a hypergraph from a JSON string, interning labels in `vocab`.
pub fn graph_from_json<W>(json: &str, vocab: SharedVocabulary) -> Result<Hypergraph<W>, HgError>
where
    W: Weight + DeserializeOwned,
{
    let serializable: SerializableGraph<W> = serde_json::from_str(json)
        .map_err(|err| HgError::Serde(ErrorInfo::new("deserialize-json", err.to_string())))?;
    serializable.into_graph(vocab)
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializableGraph<W> {
    index: ArcIndex,
    properties: u32,
    states: Vec<SerializableLabels>,
    arcs: Vec<Option<SerializableArc<W>>>,
    start: Option<u64>,
    final_state: Option<u64>,
}

impl<W: Weight> SerializableGraph<W> {
    fn from_graph(graph: &Hypergraph<W>) -> Result<Self, HgError> {
        let states = graph
            .states()
            .map(|state| {
                let labels = graph.labels(state)?;
                Ok(SerializableLabels {
                    input: labels.input.map(|sym| symbol(graph, sym)).transpose()?,
                    output: labels.output.map(|sym| symbol(graph, sym)).transpose()?,
                })
            })
            .collect::<Result<Vec<_>, HgError>>()?;
        let mut arcs: Vec<Option<SerializableArc<W>>> = Vec::with_capacity(graph.arc_capacity());
        for (id, arc) in graph.arcs() {
            arcs.resize_with(id.index(), || None);
            arcs.push(Some(SerializableArc {
                head: arc.head().as_raw(),
                tails: arc.tails().iter().map(|id| id.as_raw()).collect(),
                weight: arc.weight().clone(),
                annotations: arc.annotations().clone(),
            }));
        }
        arcs.resize_with(graph.arc_capacity(), || None);
        Ok(Self {
            index: graph.arc_index(),
            properties: graph.properties().bits(),
            states,
            arcs,
            start: graph.start().map(|id| id.as_raw()),
            final_state: graph.final_state().map(|id| id.as_raw()),
        })
    }

    fn into_graph(self, vocab: SharedVocabulary) -> Result<Hypergraph<W>, HgError> {
        let mut graph = Hypergraph::with_index(vocab, self.index);
        for labels in self.states {
            let pair = LabelPair {
                input: labels.input.map(|sym| graph.vocab().add(&sym.text, sym.kind)),
                output: labels.output.map(|sym| graph.vocab().add(&sym.text, sym.kind)),
            };
            graph.add_labeled_state(pair)?;
        }
        for arc in self.arcs {
            match arc {
                Some(arc) => {
                    let tails: Vec<StateId> = arc.tails.into_iter().map(StateId::from_raw).collect();
                    let rebuilt = Hyperarc::new(StateId::from_raw(arc.head), tails, arc.weight)
                        .with_annotations(arc.annotations);
                    graph.add_arc(rebuilt)?;
                }
                None => graph.push_tombstone(),
            }
        }
        if let Some(start) = self.start {
            graph.set_start(StateId::from_raw(start))?;
        }
        if let Some(final_state) = self.final_state {
            graph.set_final(StateId::from_raw(final_state))?;
        }
        graph.replace_properties(Properties::from_bits_truncate(self.properties));
        Ok(graph)
    }
}

fn symbol<W: Weight>(graph: &Hypergraph<W>, sym: Sym) -> Result<SerializableSymbol, HgError> {
    Ok(SerializableSymbol {
        kind: sym.kind(),
        text: graph.symbol_text(sym)?,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializableLabels {
    input: Option<SerializableSymbol>,
    output: Option<SerializableSymbol>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializableSymbol {
    kind: SymbolType,
    text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializableArc<W> {
    head: u64,
    tails: Vec<u64>,
    weight: W,
    annotations: BTreeMap<String, String>,
}
