#![deny(missing_docs)]
#![doc = "Core identifiers, error taxonomy, semiring algebra and vocabulary contracts for the hgx weighted hypergraph engine."]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod numeric;
pub mod rng;
pub mod semiring;
pub mod vocab;

pub use errors::{ErrorInfo, HgError};
pub use numeric::{log_minus, log_plus};
pub use rng::{derive_substream_seed, RngHandle};
pub use semiring::{
    BooleanWeight, CostWeight, ExpectationWeight, FeatureCarrier, FeatureId, FeatureMap,
    FeatureWeight, Idempotent, LogWeight, ViterbiWeight, Weight,
};
pub use vocab::{SharedVocabulary, Sym, SymbolTable, SymbolType, Vocabulary, EPSILON_TEXT};

/// Identifier for a state within a hypergraph. States are dense and 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateId(u64);

impl StateId {
    /// Creates a new identifier from its raw integer representation.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Returns the identifier as a position in dense per-state tables.
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for StateId {
    fn from(index: usize) -> Self {
        Self(index as u64)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for an arc owned by a hypergraph.
///
/// Arc identifiers are handles into the owning hypergraph's arc arena. They stay
/// valid until the arc is removed or the hypergraph is rebuilt by a restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArcId(u64);

impl ArcId {
    /// Creates a new identifier from its raw integer representation.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Returns the identifier as a position in the arc arena.
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for ArcId {
    fn from(index: usize) -> Self {
        Self(index as u64)
    }
}

impl fmt::Display for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
