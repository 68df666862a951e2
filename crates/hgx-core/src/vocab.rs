//! Symbol interning shared by hypergraphs.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Text of the epsilon symbol, pre-registered in every [`SymbolTable`].
pub const EPSILON_TEXT: &str = "<eps>";

/// Category of an interned symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SymbolType {
    /// Output word. Terminal-labelled states are lexical.
    Terminal,
    /// Grammar category.
    Nonterminal,
    /// Reserved markers such as `<eps>` or `<s>`.
    Special,
}

/// Interned symbol: a dense id plus its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sym {
    id: u32,
    kind: SymbolType,
}

impl Sym {
    /// Creates a symbol handle. Only vocabularies should mint these.
    pub const fn new(id: u32, kind: SymbolType) -> Self {
        Self { id, kind }
    }

    /// Returns the dense id within the owning vocabulary.
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Returns the symbol category.
    pub const fn kind(&self) -> SymbolType {
        self.kind
    }

    /// Returns whether this is a terminal symbol.
    pub fn is_terminal(&self) -> bool {
        self.kind == SymbolType::Terminal
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            SymbolType::Terminal => 'T',
            SymbolType::Nonterminal => 'N',
            SymbolType::Special => 'S',
        };
        write!(f, "{tag}{}", self.id)
    }
}

/// String/symbol mapping shared by every hypergraph built from one input.
///
/// Implementations use interior mutability so that a single `Arc<dyn Vocabulary>`
/// can be handed to many hypergraphs that intern new symbols while being built.
pub trait Vocabulary: Send + Sync + Debug {
    /// Interns `text` with the given category and returns its symbol.
    /// Interning the same text and category twice returns the same symbol.
    fn add(&self, text: &str, kind: SymbolType) -> Sym;

    /// Returns the symbol for `text` in the given category, if present.
    fn find(&self, text: &str, kind: SymbolType) -> Option<Sym>;

    /// Returns the text of a symbol, if it belongs to this vocabulary.
    fn str(&self, sym: Sym) -> Option<String>;

    /// Returns whether the symbol belongs to this vocabulary.
    fn contains_sym(&self, sym: Sym) -> bool {
        self.str(sym).is_some()
    }

    /// Returns the number of interned symbols.
    fn len(&self) -> usize;

    /// Returns whether no symbol is interned.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the epsilon symbol.
    fn epsilon(&self) -> Sym {
        self.add(EPSILON_TEXT, SymbolType::Special)
    }
}

/// Shared handle to a vocabulary.
pub type SharedVocabulary = Arc<dyn Vocabulary>;

#[derive(Debug, Default)]
struct TableInner {
    by_text: HashMap<(SymbolType, String), u32>,
    texts: Vec<(SymbolType, String)>,
}

/// In-memory [`Vocabulary`] backed by a hash map and a dense text table.
#[derive(Debug)]
pub struct SymbolTable {
    inner: RwLock<TableInner>,
}

impl SymbolTable {
    /// Creates a table holding only the epsilon symbol.
    pub fn new() -> Self {
        let table = Self {
            inner: RwLock::new(TableInner::default()),
        };
        table.add(EPSILON_TEXT, SymbolType::Special);
        table
    }

    /// Creates a table wrapped in a shared handle.
    pub fn shared() -> SharedVocabulary {
        Arc::new(Self::new())
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary for SymbolTable {
    fn add(&self, text: &str, kind: SymbolType) -> Sym {
        if let Some(sym) = self.find(text, kind) {
            return sym;
        }
        let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());
        // Raced with another writer between the read and the write lock.
        if let Some(&id) = inner.by_text.get(&(kind, text.to_owned())) {
            return Sym::new(id, kind);
        }
        let id = inner.texts.len() as u32;
        inner.texts.push((kind, text.to_owned()));
        inner.by_text.insert((kind, text.to_owned()), id);
        Sym::new(id, kind)
    }

    fn find(&self, text: &str, kind: SymbolType) -> Option<Sym> {
        let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());
        inner
            .by_text
            .get(&(kind, text.to_owned()))
            .map(|&id| Sym::new(id, kind))
    }

    fn str(&self, sym: Sym) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());
        inner
            .texts
            .get(sym.id as usize)
            .filter(|(kind, _)| *kind == sym.kind)
            .map(|(_, text)| text.clone())
    }

    fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .texts
            .len()
    }
}
