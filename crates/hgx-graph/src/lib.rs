#![deny(missing_docs)]
#![doc = "Weighted hypergraph container with dynamic programs, in-place transforms and a line-oriented text codec.\n\nA [`Hypergraph`] owns dense states and an arena of [`Hyperarc`]s whose weights live in any [`hgx_core::Weight`] semiring. The inside/outside passes, [`AcyclicBest`] and [`feature_expectations`] read the graph; the [`transforms`] rewrite it in place through an [`ArcBatch`]."]

mod batch;
mod best;
mod derivation;
mod dot;
mod expectations;
mod hash;
mod hypergraph;
mod inside;
mod properties;
mod serialization;
pub mod text;
pub mod transforms;
mod traversal;

pub use batch::ArcBatch;
pub use best::{AcyclicBest, BestOptions, BestStrategy};
pub use derivation::{
    best_derivation, derivation_string, derivation_weight, derivation_yield,
    enumerate_derivations, Derivation,
};
pub use dot::write_dot;
pub use expectations::{feature_expectations, FeatureExpectations};
pub use hash::canonical_hash;
pub use hypergraph::{Hyperarc, Hypergraph, LabelPair, CONSTRAINT_END_KEY, CONSTRAINT_START_KEY};
pub use inside::{inside, inside_with_axioms, outside};
pub use properties::{ArcIndex, Properties};
pub use traversal::{
    outside_topsort_states, reverse_topsort_states, topsort_states, visit_in_arcs,
    visit_out_arcs_once, StateOrder, Visit,
};

/// Re-export serialization helpers for downstream crates.
pub use serialization::{graph_from_bytes, graph_from_json, graph_to_bytes, graph_to_json};
