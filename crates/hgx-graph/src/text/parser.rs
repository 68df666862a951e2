use std::collections::HashMap;
use std::ops::Range;

use hgx_core::{HgError, SharedVocabulary, StateId, Sym, SymbolType};
use tracing::{debug, debug_span};

use super::lexer::{split_weight, tokenize, unquote, Token};
use super::TextWeight;
use crate::hypergraph::{Hyperarc, Hypergraph, LabelPair};
use crate::properties::ArcIndex;

/// Largest state id the text format accepts.
pub const MAX_STATE_ID: u64 = 1 << 26;

/// Parses the line-oriented text format into a hypergraph storing incoming arcs.
///
/// ```text
/// # comment
/// 0(<s>)
/// 2 <- 0 "dog" / 2.0
/// 1 <- 2 'barks' / 1.5
/// START <- 0
/// FINAL <- 1
/// ```
///
/// A state is written `ID`, `ID(in out?)`, `(in out?)`, a quoted terminal, or a
/// special symbol such as `<eps>`. Numbered states are created on first use;
/// anonymous label pairs map to one state per distinct pair; quoted terminals map
/// to the hypergraph's lexical state for that word. Inside labels, quoted symbols
/// are terminals, bare identifiers nonterminals, and `<...>` special symbols. An arc
/// without `/ weight` weighs `one()`. Errors are [`HgError::FileFormat`] carrying
/// the line number.
pub fn parse_text<W: TextWeight>(input: &str, vocab: SharedVocabulary) -> Result<Hypergraph<W>, HgError> {
    parse_text_with_index(input, vocab, ArcIndex::In)
}

/// [`parse_text`] with an explicit arc index.
pub fn parse_text_with_index<W: TextWeight>(
    input: &str,
    vocab: SharedVocabulary,
    index: ArcIndex,
) -> Result<Hypergraph<W>, HgError> {
    let _span = debug_span!("parse_text", bytes = input.len()).entered();
    let mut builder = Builder {
        hg: Hypergraph::with_index(vocab, index),
        anonymous: HashMap::new(),
        saw_start: false,
        saw_final: false,
    };
    for (idx, line) in input.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        builder
            .line(trimmed)
            .map_err(|err| err.with_context("line", idx + 1))?;
    }
    let mut hg = builder.hg;
    hg.compute_properties();
    debug!(states = hg.num_states(), arcs = hg.num_arcs(), "parsed text hypergraph");
    Ok(hg)
}

struct Builder<W> {
    hg: Hypergraph<W>,
    anonymous: HashMap<LabelPair, StateId>,
    saw_start: bool,
    saw_final: bool,
}

struct Line<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
}

impl<'src> Line<'src> {
    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<Token<'src>> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn column(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(0, |(_, span)| span.start + 1)
    }

    fn unexpected(&self, expected: &str) -> HgError {
        let found = self
            .peek()
            .map_or_else(|| "end of line".to_string(), |token| format!("{token:?}"));
        HgError::file_format("syntax", format!("expected {expected}, found {found}"))
            .with_context("column", self.column())
    }
}

impl<W: TextWeight> Builder<W> {
    fn line(&mut self, text: &str) -> Result<(), HgError> {
        let (structure, weight_text) = split_weight(text);
        let mut line = Line {
            tokens: tokenize(structure)?,
            pos: 0,
        };
        match line.peek() {
            Some(Token::Start) | Some(Token::Final) => {
                if weight_text.is_some() {
                    return Err(HgError::file_format(
                        "weighted-endpoint",
                        "START and FINAL lines take no weight",
                    ));
                }
                return self.endpoint(&mut line);
            }
            _ => {}
        }

        let head = self.state(&mut line)?;
        if line.at_end() {
            if weight_text.is_some() {
                return Err(line.unexpected("`<-` before the weight"));
            }
            return Ok(());
        }
        if line.advance() != Some(Token::Arrow) {
            line.pos -= 1;
            return Err(line.unexpected("`<-`"));
        }
        let mut tails = Vec::new();
        while !line.at_end() {
            tails.push(self.state(&mut line)?);
        }
        if tails.is_empty() {
            return Err(HgError::file_format("missing-tails", "an arc needs at least one tail"));
        }
        let weight = match weight_text {
            Some(text) => text.trim().parse::<W>()?,
            None => W::one(),
        };
        self.hg.add_arc(Hyperarc::new(head, tails, weight))?;
        Ok(())
    }

    fn endpoint(&mut self, line: &mut Line<'_>) -> Result<(), HgError> {
        let is_start = line.advance() == Some(Token::Start);
        if line.advance() != Some(Token::Arrow) {
            line.pos = line.pos.saturating_sub(1);
            return Err(line.unexpected("`<-`"));
        }
        let state = self.state(line)?;
        if !line.at_end() {
            return Err(line.unexpected("end of line"));
        }
        let (seen, which) = if is_start {
            (&mut self.saw_start, "start")
        } else {
            (&mut self.saw_final, "final")
        };
        if std::mem::replace(seen, true) {
            return Err(HgError::file_format(
                format!("duplicate-{which}"),
                format!("the {which} state is declared twice"),
            ));
        }
        if is_start {
            self.hg.set_start(state)
        } else {
            self.hg.set_final(state)
        }
    }

    fn state(&mut self, line: &mut Line<'_>) -> Result<StateId, HgError> {
        match line.advance() {
            Some(Token::Int(digits)) => {
                let state = self.numbered(digits)?;
                if line.peek() == Some(&Token::LParen) {
                    line.advance();
                    let labels = self.labels(line)?;
                    self.relabel(state, labels)?;
                }
                Ok(state)
            }
            Some(Token::LParen) => {
                let labels = self.labels(line)?;
                self.anonymous(labels)
            }
            Some(Token::Quoted(quoted)) => {
                let sym = self.hg.vocab().add(&unquote(quoted), SymbolType::Terminal);
                self.hg.lexical_state(sym)
            }
            Some(Token::Special(text)) => {
                let sym = self.hg.vocab().add(text, SymbolType::Special);
                self.anonymous(LabelPair::input(sym))
            }
            Some(Token::Ident(text)) => {
                let sym = self.hg.vocab().add(text, SymbolType::Nonterminal);
                self.anonymous(LabelPair::input(sym))
            }
            _ => {
                line.pos = line.pos.saturating_sub(1);
                Err(line.unexpected("a state"))
            }
        }
    }

    /// Parses `in out?)` after an opening parenthesis.
    fn labels(&mut self, line: &mut Line<'_>) -> Result<LabelPair, HgError> {
        let mut syms: Vec<Sym> = Vec::with_capacity(2);
        loop {
            let sym = match line.advance() {
                Some(Token::RParen) => break,
                Some(Token::Quoted(quoted)) => {
                    self.hg.vocab().add(&unquote(quoted), SymbolType::Terminal)
                }
                Some(Token::Ident(text)) => self.hg.vocab().add(text, SymbolType::Nonterminal),
                Some(Token::Special(text)) => self.hg.vocab().add(text, SymbolType::Special),
                _ => {
                    line.pos = line.pos.saturating_sub(1);
                    return Err(line.unexpected("a label or `)`"));
                }
            };
            if syms.len() == 2 {
                return Err(HgError::file_format(
                    "too-many-labels",
                    "a state takes at most an input and an output label",
                ));
            }
            syms.push(sym);
        }
        match syms.as_slice() {
            [input] => Ok(LabelPair::input(*input)),
            [input, output] => Ok(LabelPair::pair(*input, *output)),
            _ => Err(HgError::file_format("empty-labels", "`()` needs at least one label")),
        }
    }

    fn numbered(&mut self, digits: &str) -> Result<StateId, HgError> {
        let raw: u64 = digits
            .parse()
            .ok()
            .filter(|raw| *raw < MAX_STATE_ID)
            .ok_or_else(|| {
                HgError::file_format("state-id-too-large", "state id is out of range")
                    .with_context("id", digits)
                    .with_context("max", MAX_STATE_ID)
            })?;
        let state = StateId::from_raw(raw);
        while self.hg.num_states() <= state.index() {
            self.hg.add_state();
        }
        Ok(state)
    }

    fn relabel(&mut self, state: StateId, labels: LabelPair) -> Result<(), HgError> {
        let existing = *self.hg.labels(state)?;
        if existing == labels {
            return Ok(());
        }
        if !existing.is_empty() {
            return Err(HgError::file_format(
                "label-conflict",
                "state is redefined with different labels",
            )
            .with_context("state", state));
        }
        self.hg.set_labels(state, labels)
    }

    fn anonymous(&mut self, labels: LabelPair) -> Result<StateId, HgError> {
        if let (Some(sym), None) = (labels.terminal(), labels.output) {
            return self.hg.lexical_state(sym);
        }
        if let Some(&state) = self.anonymous.get(&labels) {
            return Ok(state);
        }
        let state = self.hg.add_labeled_state(labels)?;
        self.anonymous.insert(labels, state);
        Ok(state)
    }
}
