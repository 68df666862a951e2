use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Advisory capability bitset describing what is known about a hypergraph.
///
/// A set bit is a verified guarantee. A cleared bit only means the property has not
/// been established; callers that need it must check or force it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Properties(u32);

impl Properties {
    /// Every arc has a first tail and only lexical trailing tails.
    pub const GRAPH: Properties = Properties(1 << 0);
    /// Every arc is a graph arc with at most one trailing (lexical) tail.
    pub const FSM: Properties = Properties(1 << 1);
    /// The last check found no back edges.
    pub const ACYCLIC: Properties = Properties(1 << 2);
    /// Incoming arcs are indexed per state.
    pub const STORE_IN_ARCS: Properties = Properties(1 << 3);
    /// Outgoing arcs are indexed under every tail.
    pub const STORE_OUT_ARCS: Properties = Properties(1 << 4);
    /// Outgoing arcs are indexed under their first tail only.
    pub const STORE_FIRST_TAIL_OUT_ARCS: Properties = Properties(1 << 5);
    /// Each out-arc list is sorted by arc id.
    pub const SORTED_OUT_ARCS: Properties = Properties(1 << 6);
    /// Each out-arc list is sorted by ascending cost.
    pub const OUT_ARCS_SORTED_BEST_FIRST: Properties = Properties(1 << 7);
    /// Every tail id is smaller than its head id, so id order is topological.
    pub const SORTED_STATES: Properties = Properties(1 << 8);
    /// Each terminal symbol labels at most one state.
    pub const CANONICAL_LEX: Properties = Properties(1 << 9);
    /// No arc has more than one lexical tail.
    pub const ONE_LEXICAL: Properties = Properties(1 << 10);
    /// Some arc carries annotations.
    pub const ANNOTATIONS: Properties = Properties(1 << 11);
    /// Some arc carries a `constraint-start` annotation.
    pub const CONSTRAINT_STARTS: Properties = Properties(1 << 12);
    /// Some arc carries a `constraint-end` annotation.
    pub const CONSTRAINT_ENDS: Properties = Properties(1 << 13);

    /// Bits that hold vacuously for a hypergraph without arcs.
    pub const VACUOUS: Properties = Properties(
        Self::GRAPH.0
            | Self::FSM.0
            | Self::ACYCLIC.0
            | Self::SORTED_OUT_ARCS.0
            | Self::SORTED_STATES.0
            | Self::CANONICAL_LEX.0
            | Self::ONE_LEXICAL.0,
    );

    /// Bits describing which arc indices are stored.
    pub const STORAGE: Properties = Properties(
        Self::STORE_IN_ARCS.0 | Self::STORE_OUT_ARCS.0 | Self::STORE_FIRST_TAIL_OUT_ARCS.0,
    );

    /// Returns the empty set.
    pub const fn empty() -> Self {
        Properties(0)
    }

    /// Creates a set from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Properties(bits & ((1 << 14) - 1))
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns whether every bit of `other` is set.
    pub const fn contains(&self, other: Properties) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the bits of `other`.
    pub fn insert(&mut self, other: Properties) {
        self.0 |= other.0;
    }

    /// Clears the bits of `other`.
    pub fn remove(&mut self, other: Properties) {
        self.0 &= !other.0;
    }

    /// Sets or clears the bits of `other`.
    pub fn set(&mut self, other: Properties, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    /// Returns the bits shared with `other`.
    pub const fn intersection(&self, other: Properties) -> Properties {
        Properties(self.0 & other.0)
    }
}

impl BitOr for Properties {
    type Output = Properties;

    fn bitor(self, rhs: Self) -> Self::Output {
        Properties(self.0 | rhs.0)
    }
}

impl BitOrAssign for Properties {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

const NAMES: [(Properties, &str); 14] = [
    (Properties::GRAPH, "graph"),
    (Properties::FSM, "fsm"),
    (Properties::ACYCLIC, "acyclic"),
    (Properties::STORE_IN_ARCS, "store-in-arcs"),
    (Properties::STORE_OUT_ARCS, "store-out-arcs"),
    (Properties::STORE_FIRST_TAIL_OUT_ARCS, "store-first-tail-out-arcs"),
    (Properties::SORTED_OUT_ARCS, "sorted-out-arcs"),
    (Properties::OUT_ARCS_SORTED_BEST_FIRST, "out-arcs-sorted-best-first"),
    (Properties::SORTED_STATES, "sorted-states"),
    (Properties::CANONICAL_LEX, "canonical-lex"),
    (Properties::ONE_LEXICAL, "one-lexical"),
    (Properties::ANNOTATIONS, "annotations"),
    (Properties::CONSTRAINT_STARTS, "constraint-starts"),
    (Properties::CONSTRAINT_ENDS, "constraint-ends"),
];

impl Properties {
    /// Returns the names of the set bits in bit order.
    pub fn names(&self) -> Vec<&'static str> {
        NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join("|"))
    }
}

/// Which per-state arc indices a hypergraph maintains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArcIndex {
    /// No index; only whole-arena scans are possible.
    None,
    /// Incoming arcs per head.
    #[default]
    In,
    /// Outgoing arcs under every tail.
    Out,
    /// Outgoing arcs under the first tail only.
    FirstTailOut,
    /// Incoming and outgoing (every tail).
    InOut,
    /// Incoming and outgoing (first tail only).
    InFirstTailOut,
}

impl ArcIndex {
    /// Returns the storage bits for this mode.
    pub fn properties(self) -> Properties {
        match self {
            ArcIndex::None => Properties::empty(),
            ArcIndex::In => Properties::STORE_IN_ARCS,
            ArcIndex::Out => Properties::STORE_OUT_ARCS,
            ArcIndex::FirstTailOut => Properties::STORE_FIRST_TAIL_OUT_ARCS,
            ArcIndex::InOut => Properties::STORE_IN_ARCS | Properties::STORE_OUT_ARCS,
            ArcIndex::InFirstTailOut => {
                Properties::STORE_IN_ARCS | Properties::STORE_FIRST_TAIL_OUT_ARCS
            }
        }
    }

    /// Recovers the mode from storage bits.
    pub fn from_properties(properties: Properties) -> Self {
        let stores_in = properties.contains(Properties::STORE_IN_ARCS);
        let stores_out = properties.contains(Properties::STORE_OUT_ARCS);
        let stores_first = properties.contains(Properties::STORE_FIRST_TAIL_OUT_ARCS);
        match (stores_in, stores_out, stores_first) {
            (false, false, false) => ArcIndex::None,
            (true, false, false) => ArcIndex::In,
            (false, true, _) => ArcIndex::Out,
            (false, false, true) => ArcIndex::FirstTailOut,
            (true, true, _) => ArcIndex::InOut,
            (true, false, true) => ArcIndex::InFirstTailOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_modes_round_trip_through_bits() {
        for mode in [
            ArcIndex::None,
            ArcIndex::In,
            ArcIndex::Out,
            ArcIndex::FirstTailOut,
            ArcIndex::InOut,
            ArcIndex::InFirstTailOut,
        ] {
            assert_eq!(ArcIndex::from_properties(mode.properties()), mode);
        }
    }

    #[test]
    fn display_lists_names() {
        let props = Properties::GRAPH | Properties::ACYCLIC;
        assert_eq!(props.to_string(), "graph|acyclic");
    }
}
