use std::collections::VecDeque;

use hgx_core::{ArcId, HgError, Idempotent, StateId};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, warn};

use crate::hypergraph::Hypergraph;
use crate::properties::Properties;

/// Which arc index [`AcyclicBest`] walks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BestStrategy {
    /// Incoming arcs when stored, outgoing arcs otherwise.
    #[default]
    Auto,
    /// Depth-first from the final state over incoming arcs.
    InArcs,
    /// Bottom-up from the axioms over outgoing arcs.
    OutArcs,
}

/// Options for [`AcyclicBest::compute`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BestOptions {
    /// Back edges (self-loops included) tolerated before the computation aborts.
    pub max_back_edges: usize,
    /// Traversal to use.
    pub strategy: BestStrategy,
}

impl BestOptions {
    /// Returns options tolerating up to `max_back_edges` back edges.
    pub fn with_max_back_edges(max_back_edges: usize) -> Self {
        Self {
            max_back_edges,
            ..Self::default()
        }
    }
}

/// Best-path weights that tolerate a bounded number of back edges.
///
/// `mu[s]` is the best weight of a derivation of `s` and `pi[s]` the incoming arc
/// achieving it. An arc with a tail that is not final yet when the arc is relaxed
/// is a back edge: it is counted and skipped. Once the count exceeds
/// [`BestOptions::max_back_edges`] the computation stops and keeps its partial
/// results, so callers check [`AcyclicBest::exact_best`] before trusting them.
#[derive(Debug, Clone)]
pub struct AcyclicBest<W> {
    final_state: StateId,
    mu: Vec<W>,
    pi: Vec<Option<ArcId>>,
    back_edges: usize,
    self_loops: usize,
    aborted: bool,
}

impl<W: Idempotent> AcyclicBest<W> {
    /// Runs the best-path computation.
    ///
    /// Fails with [`HgError::EmptySet`] without a final state and with
    /// [`HgError::Config`] when the requested arc index is missing.
    pub fn compute(hg: &Hypergraph<W>, options: &BestOptions) -> Result<Self, HgError> {
        let final_state = hg.final_state().ok_or_else(|| {
            HgError::empty_set("no-final-state", "best path requires a final state")
        })?;
        let strategy = match options.strategy {
            BestStrategy::Auto if hg.stores_in_arcs() => BestStrategy::InArcs,
            BestStrategy::Auto => BestStrategy::OutArcs,
            other => other,
        };
        let _span = debug_span!("acyclic_best", ?strategy, max_back_edges = options.max_back_edges)
            .entered();
        let mut best = Self {
            final_state,
            mu: vec![W::zero(); hg.num_states()],
            pi: vec![None; hg.num_states()],
            back_edges: 0,
            self_loops: 0,
            aborted: false,
        };
        match strategy {
            BestStrategy::InArcs => best.run_in_arcs(hg, options.max_back_edges)?,
            _ => best.run_out_arcs(hg, options.max_back_edges)?,
        }
        if best.aborted {
            warn!(
                back_edges = best.back_edges,
                max_back_edges = options.max_back_edges,
                "acyclic best aborted: back-edge budget exceeded"
            );
        } else {
            debug!(back_edges = best.back_edges, self_loops = best.self_loops, "acyclic best done");
        }
        Ok(best)
    }

    /// Relaxes every in-arc of `state` whose tails are final.
    fn relax_in_arcs(
        &mut self,
        hg: &Hypergraph<W>,
        state: StateId,
        done: &[bool],
        max_back_edges: usize,
    ) -> Result<(), HgError> {
        let mut best = W::zero();
        let mut best_arc = None;
        for id in hg.in_arcs(state)? {
            let arc = hg.arc(*id)?;
            if arc.tails().contains(&state) {
                self.self_loops += 1;
            }
            if arc.tails().iter().any(|tail| !done[tail.index()]) {
                if self.count_back_edges(1, max_back_edges) {
                    return Ok(());
                }
                continue;
            }
            let candidate = self.derive(arc.tails(), arc.weight());
            if best_arc.is_none() || candidate.is_better(&best) {
                best = candidate;
                best_arc = Some(*id);
            }
        }
        self.mu[state.index()] = best;
        self.pi[state.index()] = best_arc;
        Ok(())
    }

    fn run_in_arcs(&mut self, hg: &Hypergraph<W>, max_back_edges: usize) -> Result<(), HgError> {
        hg.require_in_arcs()?;
        let mut open = vec![false; hg.num_states()];
        let mut done = vec![false; hg.num_states()];
        let mut stack: Vec<(StateId, Vec<StateId>, usize)> = Vec::new();

        open[self.final_state.index()] = true;
        stack.push((self.final_state, tails_of(hg, self.final_state)?, 0));
        while let Some((state, children, next)) = stack.last_mut() {
            if let Some(&child) = children.get(*next) {
                *next += 1;
                if !open[child.index()] {
                    open[child.index()] = true;
                    let grandchildren = tails_of(hg, child)?;
                    stack.push((child, grandchildren, 0));
                }
                continue;
            }
            let state = *state;
            stack.pop();
            if hg.is_axiom(state) {
                self.mu[state.index()] = W::one();
            } else {
                self.relax_in_arcs(hg, state, &done, max_back_edges)?;
                if self.aborted {
                    return Ok(());
                }
            }
            done[state.index()] = true;
        }
        Ok(())
    }

    fn run_out_arcs(&mut self, hg: &Hypergraph<W>, max_back_edges: usize) -> Result<(), HgError> {
        hg.require_out_arcs()?;
        let first_tail_only = !hg.stores_out_arcs();
        if first_tail_only && !hg.properties().contains(Properties::GRAPH) {
            return Err(HgError::config(
                "first-tail-needs-graph",
                "a first-tail out index only supports graph hypergraphs",
            )
            .with_context("properties", hg.properties()));
        }

        let mut pending: Vec<usize> = vec![0; hg.arc_capacity()];
        for (id, arc) in hg.arcs() {
            pending[id.index()] = if first_tail_only { 1 } else { arc.tails().len() };
            if arc.tails().contains(&arc.head()) {
                self.self_loops += 1;
            }
        }
        let mut waiting: Vec<usize> = hg
            .states()
            .map(|state| hg.in_degree(state))
            .collect::<Result<_, _>>()?;
        let mut done = vec![false; hg.num_states()];
        let mut queue: VecDeque<StateId> = VecDeque::new();
        for state in hg.states() {
            if hg.is_axiom(state) {
                self.mu[state.index()] = W::one();
                queue.push_back(state);
            }
        }

        loop {
            while let Some(state) = queue.pop_front() {
                if done[state.index()] {
                    continue;
                }
                done[state.index()] = true;
                for id in hg.out_arcs(state)? {
                    let arc = hg.arc(*id)?;
                    let uses = if first_tail_only {
                        1
                    } else {
                        arc.tails().iter().filter(|tail| **tail == state).count()
                    };
                    pending[id.index()] -= uses;
                    if pending[id.index()] > 0 {
                        continue;
                    }
                    let head = arc.head();
                    if done[head.index()] {
                        continue;
                    }
                    let candidate = self.derive(arc.tails(), arc.weight());
                    if self.pi[head.index()].is_none() || candidate.is_better(&self.mu[head.index()]) {
                        self.mu[head.index()] = candidate;
                        self.pi[head.index()] = Some(*id);
                    }
                    waiting[head.index()] -= 1;
                    if waiting[head.index()] == 0 {
                        queue.push_back(head);
                    }
                }
            }
            // Stalled: finalize the best reached state and count its open in-arcs.
            let stalled = hg
                .states()
                .filter(|state| !done[state.index()] && self.pi[state.index()].is_some())
                .reduce(|best, state| {
                    if self.mu[state.index()].is_better(&self.mu[best.index()]) {
                        state
                    } else {
                        best
                    }
                });
            let Some(state) = stalled else {
                break;
            };
            if self.count_back_edges(waiting[state.index()], max_back_edges) {
                return Ok(());
            }
            waiting[state.index()] = 0;
            queue.push_back(state);
        }
        Ok(())
    }

    fn derive(&self, tails: &[StateId], weight: &W) -> W {
        let mut product = W::one();
        for tail in tails {
            product.times_by(&self.mu[tail.index()]);
        }
        product.times_by(weight);
        product
    }

    /// Adds back edges and returns whether the budget is exhausted.
    fn count_back_edges(&mut self, count: usize, max_back_edges: usize) -> bool {
        self.back_edges += count;
        if self.back_edges > max_back_edges {
            self.aborted = true;
        }
        self.aborted
    }

    /// Returns whether the computation ran to completion within its budget.
    pub fn exact_best(&self) -> bool {
        !self.aborted
    }

    /// Returns whether no back edge was seen.
    pub fn acyclic(&self) -> bool {
        self.back_edges == 0
    }

    /// Returns the number of back edges seen, self-loops included.
    pub fn back_edges(&self) -> usize {
        self.back_edges
    }

    /// Returns the number of self-loop arcs seen.
    pub fn self_loops(&self) -> usize {
        self.self_loops
    }

    /// Returns the final state the computation ran towards.
    pub fn final_state(&self) -> StateId {
        self.final_state
    }

    /// Returns the best weight of a state.
    pub fn mu(&self, state: StateId) -> &W {
        &self.mu[state.index()]
    }

    /// Returns all best weights indexed by state.
    pub fn mu_table(&self) -> &[W] {
        &self.mu
    }

    /// Returns the best incoming arc of a state.
    pub fn best_in_arc(&self, state: StateId) -> Option<ArcId> {
        self.pi.get(state.index()).copied().flatten()
    }

    /// Returns the best weight of the final state.
    pub fn best_weight(&self) -> &W {
        &self.mu[self.final_state.index()]
    }
}

fn tails_of<W: Idempotent>(hg: &Hypergraph<W>, state: StateId) -> Result<Vec<StateId>, HgError> {
    let mut tails = Vec::new();
    for id in hg.in_arcs(state)? {
        tails.extend_from_slice(hg.arc(*id)?.tails());
    }
    Ok(tails)
}
