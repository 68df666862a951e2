use std::collections::{BTreeMap, BTreeSet, VecDeque};

use hgx_core::{ArcId, CostWeight, HgError, SharedVocabulary, StateId, Sym, SymbolType, Weight};

use crate::properties::{ArcIndex, Properties};

/// Annotation key that marks the start of a constrained span.
pub const CONSTRAINT_START_KEY: &str = "constraint-start";
/// Annotation key that marks the end of a constrained span.
pub const CONSTRAINT_END_KEY: &str = "constraint-end";

/// Input and optional output label of a state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelPair {
    /// Input label. Terminal input labels make the state lexical.
    pub input: Option<Sym>,
    /// Output label. Only meaningful when an input label is present.
    pub output: Option<Sym>,
}

impl LabelPair {
    /// Returns the label pair of an internal state.
    pub const fn none() -> Self {
        Self {
            input: None,
            output: None,
        }
    }

    /// Returns a label pair with only an input label.
    pub const fn input(sym: Sym) -> Self {
        Self {
            input: Some(sym),
            output: None,
        }
    }

    /// Returns a label pair with both labels.
    pub const fn pair(input: Sym, output: Sym) -> Self {
        Self {
            input: Some(input),
            output: Some(output),
        }
    }

    /// Returns whether neither label is set.
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }

    /// Returns the terminal input label, if any.
    pub fn terminal(&self) -> Option<Sym> {
        self.input.filter(|sym| sym.is_terminal())
    }
}

/// Weighted hyperarc `head <- tails / weight`.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperarc<W> {
    head: StateId,
    tails: Vec<StateId>,
    weight: W,
    annotations: BTreeMap<String, String>,
}

impl<W: Weight> Hyperarc<W> {
    /// Creates an arc without annotations.
    pub fn new(head: StateId, tails: Vec<StateId>, weight: W) -> Self {
        Self {
            head,
            tails,
            weight,
            annotations: BTreeMap::new(),
        }
    }

    /// Adds an annotation.
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Replaces all annotations.
    pub fn with_annotations(mut self, annotations: BTreeMap<String, String>) -> Self {
        self.annotations = annotations;
        self
    }

    /// Returns the head state.
    pub fn head(&self) -> StateId {
        self.head
    }

    /// Returns the tail states in order.
    pub fn tails(&self) -> &[StateId] {
        &self.tails
    }

    /// Returns the first tail. Every arc stored in a hypergraph has one.
    pub fn first_tail(&self) -> Option<StateId> {
        self.tails.first().copied()
    }

    /// Returns the arc weight.
    pub fn weight(&self) -> &W {
        &self.weight
    }

    /// Returns the annotations.
    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }
}

/// Mutable weighted hypergraph owning its arcs.
///
/// States are dense ids. Arcs live in an arena addressed by [`ArcId`]; removed arcs
/// leave a tombstone so that outstanding ids never alias a different arc. The
/// per-state indices selected by [`ArcIndex`] are maintained on every mutation;
/// asking for an index that is not stored fails with [`HgError::Config`].
#[derive(Debug, Clone)]
pub struct Hypergraph<W> {
    vocab: SharedVocabulary,
    labels: Vec<LabelPair>,
    arcs: Vec<Option<Hyperarc<W>>>,
    in_arcs: Vec<Vec<ArcId>>,
    out_arcs: Vec<Vec<ArcId>>,
    in_degree: Vec<usize>,
    start: Option<StateId>,
    final_state: Option<StateId>,
    properties: Properties,
    lexical: BTreeMap<Sym, StateId>,
    live_arcs: usize,
}

impl<W: Weight> Hypergraph<W> {
    /// Creates an empty hypergraph that stores incoming arcs.
    pub fn new(vocab: SharedVocabulary) -> Self {
        Self::with_index(vocab, ArcIndex::In)
    }

    /// Creates an empty hypergraph with the given arc index.
    pub fn with_index(vocab: SharedVocabulary, index: ArcIndex) -> Self {
        Self {
            vocab,
            labels: Vec::new(),
            arcs: Vec::new(),
            in_arcs: Vec::new(),
            out_arcs: Vec::new(),
            in_degree: Vec::new(),
            start: None,
            final_state: None,
            properties: Properties::VACUOUS | index.properties(),
            lexical: BTreeMap::new(),
            live_arcs: 0,
        }
    }

    /// Returns the vocabulary labels are interned in.
    pub fn vocab(&self) -> &SharedVocabulary {
        &self.vocab
    }

    /// Returns the number of states.
    pub fn num_states(&self) -> usize {
        self.labels.len()
    }

    /// Returns the number of live arcs.
    pub fn num_arcs(&self) -> usize {
        self.live_arcs
    }

    /// Returns the size of the arc arena, tombstones included.
    pub fn arc_capacity(&self) -> usize {
        self.arcs.len()
    }

    /// Iterates over all state ids.
    pub fn states(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.labels.len()).map(StateId::from)
    }

    /// Returns a snapshot of the live arc ids in arena order.
    pub fn arc_ids(&self) -> Vec<ArcId> {
        self.arcs().map(|(id, _)| id).collect()
    }

    /// Iterates over live arcs in arena order.
    pub fn arcs(&self) -> impl Iterator<Item = (ArcId, &Hyperarc<W>)> + '_ {
        self.arcs
            .iter()
            .enumerate()
            .filter_map(|(idx, arc)| arc.as_ref().map(|arc| (ArcId::from(idx), arc)))
    }

    /// Returns the properties bitset.
    pub fn properties(&self) -> Properties {
        self.properties
    }

    /// Returns the arc index mode.
    pub fn arc_index(&self) -> ArcIndex {
        ArcIndex::from_properties(self.properties)
    }

    /// Returns whether incoming arcs are indexed.
    pub fn stores_in_arcs(&self) -> bool {
        self.properties.contains(Properties::STORE_IN_ARCS)
    }

    /// Returns whether outgoing arcs are indexed under every tail.
    pub fn stores_out_arcs(&self) -> bool {
        self.properties.contains(Properties::STORE_OUT_ARCS)
    }

    /// Returns whether outgoing arcs are indexed under their first tail only.
    pub fn stores_first_tail_out_arcs(&self) -> bool {
        self.properties
            .contains(Properties::STORE_FIRST_TAIL_OUT_ARCS)
    }

    /// Returns whether any outgoing index is stored.
    pub fn stores_any_out_arcs(&self) -> bool {
        self.stores_out_arcs() || self.stores_first_tail_out_arcs()
    }

    /// Returns the start state.
    pub fn start(&self) -> Option<StateId> {
        self.start
    }

    /// Returns the final state.
    pub fn final_state(&self) -> Option<StateId> {
        self.final_state
    }

    /// Marks a state as the start state.
    pub fn set_start(&mut self, state: StateId) -> Result<(), HgError> {
        self.check_state(state)?;
        self.start = Some(state);
        Ok(())
    }

    /// Marks a state as the final state.
    pub fn set_final(&mut self, state: StateId) -> Result<(), HgError> {
        self.check_state(state)?;
        self.final_state = Some(state);
        Ok(())
    }

    /// Adds an unlabeled state.
    pub fn add_state(&mut self) -> StateId {
        let id = StateId::from(self.labels.len());
        self.labels.push(LabelPair::none());
        self.in_arcs.push(Vec::new());
        self.out_arcs.push(Vec::new());
        self.in_degree.push(0);
        id
    }

    /// Adds a labeled state.
    pub fn add_labeled_state(&mut self, labels: LabelPair) -> Result<StateId, HgError> {
        self.check_labels(&labels)?;
        let id = self.add_state();
        self.assign_labels(id, labels);
        Ok(id)
    }

    /// Returns the labels of a state.
    pub fn labels(&self, state: StateId) -> Result<&LabelPair, HgError> {
        self.labels.get(state.index()).ok_or_else(|| unknown_state(state))
    }

    /// Replaces the labels of a state.
    ///
    /// When the state gains or loses a terminal label, the arcs using it as a
    /// tail are re-checked and the shape bits they no longer satisfy are cleared.
    pub fn set_labels(&mut self, state: StateId, labels: LabelPair) -> Result<(), HgError> {
        self.check_state(state)?;
        self.check_labels(&labels)?;
        let was_lexical = self.is_lexical(state);
        let previous = self.labels[state.index()];
        if let Some(sym) = previous.terminal() {
            if self.lexical.get(&sym) == Some(&state) {
                self.lexical.remove(&sym);
            }
        }
        self.assign_labels(state, labels);
        if self.is_lexical(state) != was_lexical {
            self.recheck_tail_shapes(state);
        }
        Ok(())
    }

    /// Returns the canonical lexical state for a terminal symbol, adding it if needed.
    pub fn lexical_state(&mut self, sym: Sym) -> Result<StateId, HgError> {
        if !sym.is_terminal() {
            return Err(HgError::config(
                "not-a-terminal",
                "lexical states are labeled with terminal symbols",
            )
            .with_context("symbol", sym));
        }
        if let Some(&state) = self.lexical.get(&sym) {
            return Ok(state);
        }
        self.add_labeled_state(LabelPair::input(sym))
    }

    /// Interns `word` as a terminal and returns its lexical state.
    pub fn word_state(&mut self, word: &str) -> Result<StateId, HgError> {
        let sym = self.vocab.add(word, SymbolType::Terminal);
        self.lexical_state(sym)
    }

    /// Returns the text of a symbol in this hypergraph's vocabulary.
    pub fn symbol_text(&self, sym: Sym) -> Result<String, HgError> {
        self.vocab.str(sym).ok_or_else(|| foreign_symbol(sym))
    }

    /// Returns whether the state carries a terminal input label.
    pub fn is_lexical(&self, state: StateId) -> bool {
        self.labels
            .get(state.index())
            .and_then(LabelPair::terminal)
            .is_some()
    }

    /// Returns whether the state has no incoming arcs.
    pub fn is_axiom(&self, state: StateId) -> bool {
        self.in_degree.get(state.index()).copied().unwrap_or(0) == 0
    }

    /// Returns the number of arcs whose head is `state`.
    pub fn in_degree(&self, state: StateId) -> Result<usize, HgError> {
        self.in_degree
            .get(state.index())
            .copied()
            .ok_or_else(|| unknown_state(state))
    }

    /// Returns a live arc.
    pub fn arc(&self, id: ArcId) -> Result<&Hyperarc<W>, HgError> {
        self.arcs
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| unknown_arc(id))
    }

    /// Returns the incoming arcs of a state.
    pub fn in_arcs(&self, state: StateId) -> Result<&[ArcId], HgError> {
        self.require_in_arcs()?;
        self.in_arcs
            .get(state.index())
            .map(Vec::as_slice)
            .ok_or_else(|| unknown_state(state))
    }

    /// Returns the outgoing arcs of a state under the stored out index.
    ///
    /// With a first-tail index only arcs whose first tail is `state` are listed.
    pub fn out_arcs(&self, state: StateId) -> Result<&[ArcId], HgError> {
        self.require_out_arcs()?;
        self.out_arcs
            .get(state.index())
            .map(Vec::as_slice)
            .ok_or_else(|| unknown_state(state))
    }

    /// Fails with [`HgError::Config`] unless incoming arcs are indexed.
    pub fn require_in_arcs(&self) -> Result<(), HgError> {
        if self.stores_in_arcs() {
            return Ok(());
        }
        Err(HgError::config("missing-in-arcs", "incoming arcs are not indexed")
            .with_context("properties", self.properties)
            .with_hint("call force_in_arcs() first"))
    }

    /// Fails with [`HgError::Config`] unless some outgoing index is stored.
    pub fn require_out_arcs(&self) -> Result<(), HgError> {
        if self.stores_any_out_arcs() {
            return Ok(());
        }
        Err(HgError::config("missing-out-arcs", "outgoing arcs are not indexed")
            .with_context("properties", self.properties)
            .with_hint("call force_out_arcs() first"))
    }

    /// Adds an arc and returns its id.
    pub fn add_arc(&mut self, arc: Hyperarc<W>) -> Result<ArcId, HgError> {
        self.check_state(arc.head)?;
        if arc.tails.is_empty() {
            return Err(HgError::graph("empty-tails", "arcs require at least one tail")
                .with_context("head", arc.head));
        }
        for tail in &arc.tails {
            self.check_state(*tail)?;
        }
        self.note_arc_shape(&arc);
        let id = ArcId::from(self.arcs.len());
        self.index_arc(id, &arc);
        self.arcs.push(Some(arc));
        self.live_arcs += 1;
        Ok(id)
    }

    /// Removes an arc and returns it. Its id is never reused.
    pub fn remove_arc(&mut self, id: ArcId) -> Result<Hyperarc<W>, HgError> {
        let arc = self
            .arcs
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or_else(|| unknown_arc(id))?;
        self.live_arcs -= 1;
        self.in_degree[arc.head.index()] -= 1;
        self.in_arcs[arc.head.index()].retain(|other| *other != id);
        for tail in &arc.tails {
            self.out_arcs[tail.index()].retain(|other| *other != id);
        }
        Ok(arc)
    }

    /// Replaces the weight of an arc.
    pub fn set_arc_weight(&mut self, id: ArcId, weight: W) -> Result<(), HgError> {
        let arc = self
            .arcs
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| unknown_arc(id))?;
        arc.weight = weight;
        self.properties
            .remove(Properties::OUT_ARCS_SORTED_BEST_FIRST);
        Ok(())
    }

    /// Builds the incoming index from the stored outgoing index.
    pub fn force_in_arcs(&mut self) -> Result<(), HgError> {
        if self.stores_in_arcs() {
            return Ok(());
        }
        if !self.stores_any_out_arcs() {
            return Err(HgError::config(
                "no-arc-index",
                "cannot derive incoming arcs without a stored arc index",
            ));
        }
        for list in &mut self.in_arcs {
            list.clear();
        }
        for (idx, arc) in self.arcs.iter().enumerate() {
            if let Some(arc) = arc {
                self.in_arcs[arc.head.index()].push(ArcId::from(idx));
            }
        }
        self.properties.insert(Properties::STORE_IN_ARCS);
        Ok(())
    }

    /// Builds the every-tail outgoing index from the stored incoming index.
    pub fn force_out_arcs(&mut self) -> Result<(), HgError> {
        if self.stores_out_arcs() {
            return Ok(());
        }
        if !self.stores_in_arcs() && !self.stores_first_tail_out_arcs() {
            return Err(HgError::config(
                "no-arc-index",
                "cannot derive outgoing arcs without a stored arc index",
            ));
        }
        for list in &mut self.out_arcs {
            list.clear();
        }
        for (idx, arc) in self.arcs.iter().enumerate() {
            if let Some(arc) = arc {
                for tail in distinct_tails(&arc.tails) {
                    self.out_arcs[tail.index()].push(ArcId::from(idx));
                }
            }
        }
        self.properties
            .remove(Properties::STORE_FIRST_TAIL_OUT_ARCS | Properties::OUT_ARCS_SORTED_BEST_FIRST);
        self.properties
            .insert(Properties::STORE_OUT_ARCS | Properties::SORTED_OUT_ARCS);
        Ok(())
    }

    /// Verifies the structural bits from scratch and stores the result.
    pub fn compute_properties(&mut self) -> Properties {
        self.properties = self.verify_properties();
        self.properties
    }

    /// Verifies the structural bits from scratch without storing them.
    ///
    /// Storage bits and the best-first ordering bit are carried over unchanged.
    pub fn verify_properties(&self) -> Properties {
        let mut verified = Properties::VACUOUS;
        let mut has_annotations = false;
        let mut constraint_starts = false;
        let mut constraint_ends = false;
        for arc in self.arcs.iter().flatten() {
            let shape = self.arc_shape(arc);
            if !shape.graph {
                verified.remove(Properties::GRAPH | Properties::FSM);
            } else if arc.tails.len() > 2 {
                verified.remove(Properties::FSM);
            }
            if shape.lexical_tails > 1 {
                verified.remove(Properties::ONE_LEXICAL);
            }
            if arc.tails.iter().any(|tail| *tail >= arc.head) {
                verified.remove(Properties::SORTED_STATES);
            }
            has_annotations |= !arc.annotations.is_empty();
            constraint_starts |= arc.annotations.contains_key(CONSTRAINT_START_KEY);
            constraint_ends |= arc.annotations.contains_key(CONSTRAINT_END_KEY);
        }
        verified.set(Properties::ANNOTATIONS, has_annotations);
        verified.set(Properties::CONSTRAINT_STARTS, constraint_starts);
        verified.set(Properties::CONSTRAINT_ENDS, constraint_ends);

        let mut seen = BTreeSet::new();
        for labels in &self.labels {
            if let Some(sym) = labels.terminal() {
                if !seen.insert(sym) {
                    verified.remove(Properties::CANONICAL_LEX);
                }
            }
        }
        verified.set(Properties::ACYCLIC, self.is_acyclic_by_kahn());
        let sorted_out = self
            .out_arcs
            .iter()
            .all(|list| list.windows(2).all(|pair| pair[0] < pair[1]));
        verified.set(Properties::SORTED_OUT_ARCS, sorted_out);

        let keep = self
            .properties
            .intersection(Properties::STORAGE | Properties::OUT_ARCS_SORTED_BEST_FIRST);
        verified | keep
    }

    /// Returns whether a property holds, verifying it if the bit is not set.
    pub fn check_property(&mut self, property: Properties) -> bool {
        if self.properties.contains(property) {
            return true;
        }
        self.compute_properties().contains(property)
    }

    /// Rewrites graph arcs with several lexical tails into chains of FSM arcs.
    ///
    /// Fails with [`HgError::Config`] when the hypergraph is not a graph.
    pub fn ensure_fsm(&mut self) -> Result<(), HgError> {
        if self.check_property(Properties::FSM) {
            return Ok(());
        }
        if !self.properties.contains(Properties::GRAPH) {
            return Err(HgError::config(
                "not-a-graph",
                "only graph hypergraphs can be made finite-state",
            ));
        }
        let mut batch = crate::batch::ArcBatch::new();
        for id in self.arc_ids() {
            let arc = self.arc(id)?;
            if arc.tails.len() <= 2 {
                continue;
            }
            let arc = arc.clone();
            let mut previous = arc.tails[0];
            let last = arc.tails.len() - 1;
            for (pos, lexical) in arc.tails.iter().enumerate().skip(1) {
                let head = if pos == last { arc.head } else { self.add_state() };
                let weight = if pos == 1 { arc.weight.clone() } else { W::one() };
                let mut piece = Hyperarc::new(head, vec![previous, *lexical], weight);
                if pos == 1 {
                    piece.annotations = arc.annotations.clone();
                }
                batch.add(piece);
                previous = head;
            }
            batch.remove(id);
        }
        batch.apply(self)?;
        self.compute_properties();
        Ok(())
    }

    /// Returns a structurally identical hypergraph with converted weights.
    ///
    /// Arc ids, state ids and tombstones are preserved.
    pub fn with_weights<V: Weight>(&self, mut convert: impl FnMut(&W) -> V) -> Hypergraph<V> {
        Hypergraph {
            vocab: self.vocab.clone(),
            labels: self.labels.clone(),
            arcs: self
                .arcs
                .iter()
                .map(|arc| {
                    arc.as_ref().map(|arc| Hyperarc {
                        head: arc.head,
                        tails: arc.tails.clone(),
                        weight: convert(&arc.weight),
                        annotations: arc.annotations.clone(),
                    })
                })
                .collect(),
            in_arcs: self.in_arcs.clone(),
            out_arcs: self.out_arcs.clone(),
            in_degree: self.in_degree.clone(),
            start: self.start,
            final_state: self.final_state,
            properties: self.properties,
            lexical: self.lexical.clone(),
            live_arcs: self.live_arcs,
        }
    }

    /// Keeps only the given arcs, the states they touch, and start/final.
    ///
    /// States and arcs are renumbered densely in their previous order. Returns the
    /// old-to-new state map.
    pub fn restrict(&mut self, keep: &BTreeSet<ArcId>) -> Result<Vec<Option<StateId>>, HgError> {
        let mut used = vec![false; self.labels.len()];
        for id in keep {
            let arc = self.arc(*id)?;
            used[arc.head.index()] = true;
            for tail in &arc.tails {
                used[tail.index()] = true;
            }
        }
        for state in self.start.iter().chain(self.final_state.iter()) {
            used[state.index()] = true;
        }

        let mut rebuilt = Hypergraph::with_index(self.vocab.clone(), self.arc_index());
        let mut map = vec![None; self.labels.len()];
        for (idx, keep_state) in used.iter().enumerate() {
            if *keep_state {
                map[idx] = Some(rebuilt.add_labeled_state(self.labels[idx])?);
            }
        }
        let remap = |state: StateId| map[state.index()].ok_or_else(|| unknown_state(state));
        for id in keep {
            let arc = self.arc(*id)?;
            let tails = arc
                .tails
                .iter()
                .map(|tail| remap(*tail))
                .collect::<Result<Vec<_>, _>>()?;
            let copy = Hyperarc::new(remap(arc.head)?, tails, arc.weight.clone())
                .with_annotations(arc.annotations.clone());
            rebuilt.add_arc(copy)?;
        }
        if let Some(start) = self.start {
            rebuilt.set_start(remap(start)?)?;
        }
        if let Some(final_state) = self.final_state {
            rebuilt.set_final(remap(final_state)?)?;
        }
        // The subgraph of an acyclic hypergraph stays acyclic.
        if self.properties.contains(Properties::ACYCLIC) {
            rebuilt.properties.insert(Properties::ACYCLIC);
        }
        *self = rebuilt;
        Ok(map)
    }

    /// Removes every state and arc. The arc index mode is kept.
    pub fn clear(&mut self) {
        let index = self.arc_index();
        *self = Hypergraph::with_index(self.vocab.clone(), index);
    }

    pub(crate) fn push_tombstone(&mut self) {
        self.arcs.push(None);
    }

    pub(crate) fn replace_properties(&mut self, properties: Properties) {
        let storage = self.properties.intersection(Properties::STORAGE);
        let mut properties = properties;
        properties.remove(Properties::STORAGE);
        self.properties = properties | storage;
    }

    fn check_state(&self, state: StateId) -> Result<(), HgError> {
        if state.index() < self.labels.len() {
            Ok(())
        } else {
            Err(unknown_state(state))
        }
    }

    fn check_labels(&self, labels: &LabelPair) -> Result<(), HgError> {
        if labels.input.is_none() && labels.output.is_some() {
            return Err(HgError::graph(
                "output-without-input",
                "an output label requires an input label",
            ));
        }
        for sym in labels.input.iter().chain(labels.output.iter()) {
            if !self.vocab.contains_sym(*sym) {
                return Err(foreign_symbol(*sym));
            }
        }
        Ok(())
    }

    fn assign_labels(&mut self, state: StateId, labels: LabelPair) {
        self.labels[state.index()] = labels;
        if let Some(sym) = labels.terminal() {
            if self.lexical.contains_key(&sym) {
                self.properties.remove(Properties::CANONICAL_LEX);
            } else {
                self.lexical.insert(sym, state);
            }
        }
    }

    fn arc_shape(&self, arc: &Hyperarc<W>) -> ArcShape {
        let lexical_tails = arc
            .tails
            .iter()
            .filter(|tail| self.is_lexical(**tail))
            .count();
        let graph = arc.tails[1..].iter().all(|tail| self.is_lexical(*tail));
        ArcShape {
            graph,
            lexical_tails,
        }
    }

    fn recheck_tail_shapes(&mut self, state: StateId) {
        let mut lost = Properties::empty();
        for arc in self.arcs.iter().flatten() {
            if !arc.tails.contains(&state) {
                continue;
            }
            let shape = self.arc_shape(arc);
            if !shape.graph {
                lost |= Properties::GRAPH | Properties::FSM;
            }
            if shape.lexical_tails > 1 {
                lost |= Properties::ONE_LEXICAL;
            }
        }
        self.properties.remove(lost);
    }

    fn note_arc_shape(&mut self, arc: &Hyperarc<W>) {
        let shape = self.arc_shape(arc);
        if !shape.graph {
            self.properties.remove(Properties::GRAPH | Properties::FSM);
        } else if arc.tails.len() > 2 {
            self.properties.remove(Properties::FSM);
        }
        if shape.lexical_tails > 1 {
            self.properties.remove(Properties::ONE_LEXICAL);
        }
        let sorted = arc.tails.iter().all(|tail| *tail < arc.head);
        if !(sorted && self.properties.contains(Properties::SORTED_STATES)) {
            self.properties
                .remove(Properties::SORTED_STATES | Properties::ACYCLIC);
        }
        self.properties
            .remove(Properties::OUT_ARCS_SORTED_BEST_FIRST);
        if !arc.annotations.is_empty() {
            self.properties.insert(Properties::ANNOTATIONS);
        }
        if arc.annotations.contains_key(CONSTRAINT_START_KEY) {
            self.properties.insert(Properties::CONSTRAINT_STARTS);
        }
        if arc.annotations.contains_key(CONSTRAINT_END_KEY) {
            self.properties.insert(Properties::CONSTRAINT_ENDS);
        }
    }

    fn index_arc(&mut self, id: ArcId, arc: &Hyperarc<W>) {
        self.in_degree[arc.head.index()] += 1;
        if self.stores_in_arcs() {
            self.in_arcs[arc.head.index()].push(id);
        }
        if self.stores_out_arcs() {
            for tail in distinct_tails(&arc.tails) {
                self.out_arcs[tail.index()].push(id);
            }
        } else if self.stores_first_tail_out_arcs() {
            self.out_arcs[arc.tails[0].index()].push(id);
        }
    }

    fn is_acyclic_by_kahn(&self) -> bool {
        let mut pending: Vec<usize> = self
            .arcs
            .iter()
            .map(|arc| arc.as_ref().map_or(0, |arc| arc.tails.len()))
            .collect();
        let mut waiting = self.in_degree.clone();
        let mut by_tail: Vec<Vec<usize>> = vec![Vec::new(); self.labels.len()];
        for (idx, arc) in self.arcs.iter().enumerate() {
            if let Some(arc) = arc {
                for tail in &arc.tails {
                    by_tail[tail.index()].push(idx);
                }
            }
        }
        let mut queue: VecDeque<usize> = (0..self.labels.len())
            .filter(|idx| waiting[*idx] == 0)
            .collect();
        let mut finished = 0;
        while let Some(state) = queue.pop_front() {
            finished += 1;
            for &arc_idx in &by_tail[state] {
                pending[arc_idx] -= 1;
                if pending[arc_idx] == 0 {
                    if let Some(arc) = &self.arcs[arc_idx] {
                        let head = arc.head.index();
                        waiting[head] -= 1;
                        if waiting[head] == 0 {
                            queue.push_back(head);
                        }
                    }
                }
            }
        }
        finished == self.labels.len()
    }
}

impl<W: CostWeight> Hypergraph<W> {
    /// Orders every out-arc list by ascending cost, ties by arc id.
    pub fn sort_out_arcs_best_first(&mut self) -> Result<(), HgError> {
        self.require_out_arcs()?;
        let arcs = &self.arcs;
        let cost = |id: &ArcId| {
            arcs[id.index()]
                .as_ref()
                .map_or(f64::INFINITY, |arc| arc.weight.cost())
        };
        for list in &mut self.out_arcs {
            list.sort_by(|a, b| cost(a).total_cmp(&cost(b)).then(a.cmp(b)));
        }
        self.properties.remove(Properties::SORTED_OUT_ARCS);
        self.properties
            .insert(Properties::OUT_ARCS_SORTED_BEST_FIRST);
        Ok(())
    }
}

struct ArcShape {
    graph: bool,
    lexical_tails: usize,
}

fn distinct_tails(tails: &[StateId]) -> impl Iterator<Item = StateId> + '_ {
    tails
        .iter()
        .enumerate()
        .filter(move |(pos, tail)| !tails[..*pos].contains(tail))
        .map(|(_, tail)| *tail)
}

pub(crate) fn unknown_state(state: StateId) -> HgError {
    HgError::graph("unknown-state", "state does not exist").with_context("state", state)
}

pub(crate) fn unknown_arc(id: ArcId) -> HgError {
    HgError::graph("unknown-arc", "arc does not exist").with_context("arc", id)
}

fn foreign_symbol(sym: Sym) -> HgError {
    HgError::graph(
        "foreign-symbol",
        "symbol does not belong to the hypergraph vocabulary",
    )
    .with_context("symbol", sym)
}

#[cfg(test)]
mod tests {
    use hgx_core::{SymbolTable, ViterbiWeight};

    use super::*;

    fn fsm() -> Hypergraph<ViterbiWeight> {
        let mut hg = Hypergraph::with_index(SymbolTable::shared(), ArcIndex::InOut);
        let s0 = hg.add_state();
        let dog = hg.word_state("dog").unwrap();
        let s1 = hg.add_state();
        hg.add_arc(Hyperarc::new(s1, vec![s0, dog], ViterbiWeight::new(1.0)))
            .unwrap();
        hg.set_start(s0).unwrap();
        hg.set_final(s1).unwrap();
        hg
    }

    #[test]
    fn lexical_states_are_shared() {
        let mut hg = fsm();
        let first = hg.word_state("dog").unwrap();
        assert_eq!(hg.word_state("dog").unwrap(), first);
        assert!(hg.is_lexical(first));
        assert!(hg.is_axiom(first));
        assert!(hg.properties().contains(Properties::CANONICAL_LEX));
    }

    #[test]
    fn relabeling_a_tail_clears_shape_bits() {
        let mut hg: Hypergraph<ViterbiWeight> = Hypergraph::new(SymbolTable::shared());
        let s0 = hg.add_state();
        let a = hg.word_state("a").unwrap();
        let s2 = hg.add_state();
        hg.add_arc(Hyperarc::new(s2, vec![s0, a], ViterbiWeight::one())).unwrap();
        assert!(hg.properties().contains(Properties::GRAPH | Properties::FSM));

        let x = hg.vocab().add("X", SymbolType::Nonterminal);
        hg.set_labels(a, LabelPair { input: Some(x), output: None })
            .unwrap();
        assert!(!hg.is_lexical(a));
        assert!(!hg.properties().contains(Properties::GRAPH));
        assert!(!hg.properties().contains(Properties::FSM));
        assert!(!hg.verify_properties().contains(Properties::GRAPH));

        let b = hg.word_state("b").unwrap();
        let c = hg.add_state();
        let s5 = hg.add_state();
        hg.add_arc(Hyperarc::new(s5, vec![s0, b, c], ViterbiWeight::one())).unwrap();
        assert!(hg.properties().contains(Properties::ONE_LEXICAL));
        let d = hg.vocab().add("d", SymbolType::Terminal);
        hg.set_labels(c, LabelPair { input: Some(d), output: None })
            .unwrap();
        assert!(!hg.properties().contains(Properties::ONE_LEXICAL));
        assert!(!hg.verify_properties().contains(Properties::ONE_LEXICAL));
    }

    #[test]
    fn removal_leaves_tombstone() {
        let mut hg = fsm();
        let id = hg.arc_ids()[0];
        hg.remove_arc(id).unwrap();
        assert_eq!(hg.num_arcs(), 0);
        assert_eq!(hg.arc_capacity(), 1);
        assert!(matches!(hg.arc(id), Err(HgError::Graph(_))));
        assert!(hg.in_arcs(StateId::from_raw(2)).unwrap().is_empty());
    }

    #[test]
    fn missing_index_fails_loudly() {
        let mut hg: Hypergraph<ViterbiWeight> =
            Hypergraph::with_index(SymbolTable::shared(), ArcIndex::None);
        let s = hg.add_state();
        assert!(matches!(hg.in_arcs(s), Err(HgError::Config(_))));
        assert!(matches!(hg.force_in_arcs(), Err(HgError::Config(_))));
    }

    #[test]
    fn unsorted_arc_clears_acyclic() {
        let mut hg = fsm();
        assert!(hg.properties().contains(Properties::ACYCLIC));
        let back = Hyperarc::new(StateId::from_raw(0), vec![StateId::from_raw(2)], ViterbiWeight::new(0.0));
        hg.add_arc(back).unwrap();
        assert!(!hg.properties().contains(Properties::ACYCLIC));
        assert!(!hg.compute_properties().contains(Properties::ACYCLIC));
    }
}
