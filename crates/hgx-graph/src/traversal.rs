//! State orderings and arc visitors.
//!
//! All depth-first searches here run on an explicit stack, so their memory use is
//! bounded by the number of states rather than by the call stack.

use hgx_core::{ArcId, HgError, StateId, Weight};

use crate::hypergraph::{Hyperarc, Hypergraph};

/// Visitor verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep going.
    Continue,
    /// Stop the traversal.
    Stop,
}

/// A state order plus the number of back edges the search latched over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateOrder {
    /// Visited states in order.
    pub order: Vec<StateId>,
    /// Edges into a state still on the search stack. Such edges are skipped.
    pub back_edges: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Open,
    Done,
}

struct Frame {
    state: StateId,
    children: Vec<StateId>,
    next: usize,
}

/// Iterative depth-first postorder over a successor function.
fn postorder(
    num_states: usize,
    roots: impl IntoIterator<Item = StateId>,
    mut successors: impl FnMut(StateId) -> Result<Vec<StateId>, HgError>,
) -> Result<StateOrder, HgError> {
    let mut marks = vec![Mark::New; num_states];
    let mut order = Vec::new();
    let mut back_edges = 0;
    let mut stack: Vec<Frame> = Vec::new();

    for root in roots {
        if marks[root.index()] != Mark::New {
            continue;
        }
        marks[root.index()] = Mark::Open;
        stack.push(Frame {
            state: root,
            children: successors(root)?,
            next: 0,
        });
        while let Some(frame) = stack.last_mut() {
            if let Some(&child) = frame.children.get(frame.next) {
                frame.next += 1;
                match marks[child.index()] {
                    Mark::New => {
                        marks[child.index()] = Mark::Open;
                        let children = successors(child)?;
                        stack.push(Frame {
                            state: child,
                            children,
                            next: 0,
                        });
                    }
                    Mark::Open => back_edges += 1,
                    Mark::Done => {}
                }
            } else {
                marks[frame.state.index()] = Mark::Done;
                order.push(frame.state);
                stack.pop();
            }
        }
    }
    Ok(StateOrder { order, back_edges })
}

/// Orders states so that every tail precedes the heads it feeds.
///
/// The search starts at the final state and follows the tails of incoming arcs. A
/// hypergraph without a final state is searched from every state in id order.
/// Cycles are broken at the first revisit and counted in
/// [`StateOrder::back_edges`]. Requires the incoming index.
pub fn topsort_states<W: Weight>(hg: &Hypergraph<W>) -> Result<StateOrder, HgError> {
    hg.require_in_arcs()?;
    let roots: Vec<StateId> = match hg.final_state() {
        Some(final_state) => vec![final_state],
        None => hg.states().collect(),
    };
    postorder(hg.num_states(), roots, |state| {
        let mut tails = Vec::new();
        for id in hg.in_arcs(state)? {
            tails.extend_from_slice(hg.arc(*id)?.tails());
        }
        Ok(tails)
    })
}

/// Orders states so that every head precedes its tails, using outgoing arcs.
///
/// The search starts at the start state and then at every remaining axiom. Its
/// postorder is the order the outside pass consumes. Requires an outgoing index.
pub fn outside_topsort_states<W: Weight>(hg: &Hypergraph<W>) -> Result<StateOrder, HgError> {
    hg.require_out_arcs()?;
    let roots: Vec<StateId> = hg
        .start()
        .into_iter()
        .chain(hg.states().filter(|state| hg.is_axiom(*state)))
        .collect();
    postorder(hg.num_states(), roots, |state| {
        let mut heads = Vec::new();
        for id in hg.out_arcs(state)? {
            heads.push(hg.arc(*id)?.head());
        }
        Ok(heads)
    })
}

/// Returns [`topsort_states`] reversed: heads before tails.
pub fn reverse_topsort_states<W: Weight>(hg: &Hypergraph<W>) -> Result<StateOrder, HgError> {
    let mut sorted = topsort_states(hg)?;
    sorted.order.reverse();
    Ok(sorted)
}

/// Visits the incoming arcs of every state in topological order.
pub fn visit_in_arcs<W: Weight>(
    hg: &Hypergraph<W>,
    mut visitor: impl FnMut(ArcId, &Hyperarc<W>) -> Visit,
) -> Result<Visit, HgError> {
    let sorted = topsort_states(hg)?;
    for state in sorted.order {
        for id in hg.in_arcs(state)? {
            if visitor(*id, hg.arc(*id)?) == Visit::Stop {
                return Ok(Visit::Stop);
            }
        }
    }
    Ok(Visit::Continue)
}

/// Visits every arc exactly once through the outgoing index.
///
/// An arc listed under several tails is reported the first time it is met.
pub fn visit_out_arcs_once<W: Weight>(
    hg: &Hypergraph<W>,
    mut visitor: impl FnMut(ArcId, &Hyperarc<W>) -> Visit,
) -> Result<Visit, HgError> {
    let mut seen = vec![false; hg.arc_capacity()];
    for state in hg.states() {
        for id in hg.out_arcs(state)? {
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            if visitor(*id, hg.arc(*id)?) == Visit::Stop {
                return Ok(Visit::Stop);
            }
        }
    }
    Ok(Visit::Continue)
}

#[cfg(test)]
mod tests {
    use hgx_core::{SymbolTable, ViterbiWeight};

    use super::*;
    use crate::properties::ArcIndex;

    fn chain(index: ArcIndex) -> Hypergraph<ViterbiWeight> {
        let mut hg = Hypergraph::with_index(SymbolTable::shared(), index);
        let states: Vec<_> = (0..4).map(|_| hg.add_state()).collect();
        for pair in states.windows(2) {
            hg.add_arc(Hyperarc::new(pair[1], vec![pair[0]], ViterbiWeight::new(1.0)))
                .unwrap();
        }
        hg.set_start(states[0]).unwrap();
        hg.set_final(states[3]).unwrap();
        hg
    }

    #[test]
    fn topsort_puts_tails_first() {
        let hg = chain(ArcIndex::In);
        let sorted = topsort_states(&hg).unwrap();
        let raw: Vec<u64> = sorted.order.iter().map(|s| s.as_raw()).collect();
        assert_eq!(raw, vec![0, 1, 2, 3]);
        assert_eq!(sorted.back_edges, 0);
    }

    #[test]
    fn outside_order_puts_heads_first() {
        let hg = chain(ArcIndex::Out);
        let sorted = outside_topsort_states(&hg).unwrap();
        let raw: Vec<u64> = sorted.order.iter().map(|s| s.as_raw()).collect();
        assert_eq!(raw, vec![3, 2, 1, 0]);
    }

    #[test]
    fn cycles_are_latched_and_counted() {
        let mut hg = chain(ArcIndex::InOut);
        hg.add_arc(Hyperarc::new(
            StateId::from_raw(1),
            vec![StateId::from_raw(2)],
            ViterbiWeight::new(0.0),
        ))
        .unwrap();
        let sorted = topsort_states(&hg).unwrap();
        assert_eq!(sorted.order.len(), 4);
        assert_eq!(sorted.back_edges, 1);
    }

    #[test]
    fn visitors_stop_early_and_dedupe() {
        let mut hg = chain(ArcIndex::InOut);
        let a = hg.add_state();
        hg.add_arc(Hyperarc::new(a, vec![StateId::from_raw(0), StateId::from_raw(1)], ViterbiWeight::new(0.0)))
            .unwrap();
        let mut count = 0;
        visit_out_arcs_once(&hg, |_, _| {
            count += 1;
            Visit::Continue
        })
        .unwrap();
        assert_eq!(count, 4);

        let mut count = 0;
        let verdict = visit_in_arcs(&hg, |_, _| {
            count += 1;
            Visit::Stop
        })
        .unwrap();
        assert_eq!((verdict, count), (Visit::Stop, 1));
    }

    #[test]
    fn missing_index_is_reported() {
        let hg = chain(ArcIndex::Out);
        assert!(matches!(topsort_states(&hg), Err(HgError::Config(_))));
    }
}
