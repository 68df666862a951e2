use std::collections::BTreeSet;

use hgx_core::{ArcId, HgError, Weight};

use crate::hypergraph::{Hyperarc, Hypergraph};

/// Deferred structural edits collected while iterating a snapshot of arcs.
///
/// In-place transforms never insert or remove arcs while walking an index. They
/// record additions and removals here and apply them once iteration is over.
/// Removals are applied before additions.
#[derive(Debug, Clone)]
pub struct ArcBatch<W> {
    additions: Vec<Hyperarc<W>>,
    removals: BTreeSet<ArcId>,
}

impl<W: Weight> ArcBatch<W> {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self {
            additions: Vec::new(),
            removals: BTreeSet::new(),
        }
    }

    /// Schedules an arc for insertion.
    pub fn add(&mut self, arc: Hyperarc<W>) {
        self.additions.push(arc);
    }

    /// Schedules an arc for removal. Scheduling the same arc twice is harmless.
    pub fn remove(&mut self, id: ArcId) {
        self.removals.insert(id);
    }

    /// Returns whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    /// Returns the number of scheduled additions.
    pub fn num_additions(&self) -> usize {
        self.additions.len()
    }

    /// Returns the number of scheduled removals.
    pub fn num_removals(&self) -> usize {
        self.removals.len()
    }

    /// Applies the batch and returns the ids of the added arcs in insertion order.
    pub fn apply(self, hg: &mut Hypergraph<W>) -> Result<Vec<ArcId>, HgError> {
        for id in &self.removals {
            hg.remove_arc(*id)?;
        }
        self.additions
            .into_iter()
            .map(|arc| hg.add_arc(arc))
            .collect()
    }
}

impl<W: Weight> Default for ArcBatch<W> {
    fn default() -> Self {
        Self::new()
    }
}
