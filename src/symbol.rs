use indexmap::IndexSet;
use std::fmt;
use std::num::NonZeroU32;

/// An interned identifier for one canonical text value.
///
/// Symbols are assigned densely in first-seen order starting at 1; 0 is never
/// a valid symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(NonZeroU32);

impl Symbol {
    /// Numeric value of the symbol, as written in fact dumps.
    #[must_use]
    pub fn id(self) -> u32 {
        self.0.get()
    }

    fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index + 1).ok().and_then(NonZeroU32::new).map(Self)
    }

    fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strips surrounding whitespace, then one layer of single quotes, then one
/// layer of double quotes.
#[must_use]
pub fn canonicalize(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix('\'').unwrap_or(text);
    let text = text.strip_suffix('\'').unwrap_or(text);
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}

/// Bidirectional mapping between canonical text and [`Symbol`]s.
///
/// Backed by an [`IndexSet`], so a symbol is its text's insertion position
/// plus one and resolving is a plain index.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    texts: IndexSet<String>,
}

impl SymbolTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text` after canonicalization.
    ///
    /// Returns `None` when the canonical text is empty; nothing is inserted
    /// in that case.
    pub fn intern(&mut self, text: &str) -> Option<Symbol> {
        let text = canonicalize(text);
        if text.is_empty() {
            return None;
        }
        if let Some(index) = self.texts.get_index_of(text) {
            return Symbol::from_index(index);
        }
        let (index, _) = self.texts.insert_full(text.to_owned());
        Symbol::from_index(index)
    }

    /// Finds the symbol for `text` without interning it.
    #[must_use]
    pub fn lookup(&self, text: &str) -> Option<Symbol> {
        self.texts
            .get_index_of(canonicalize(text))
            .and_then(Symbol::from_index)
    }

    /// Text for `symbol`, or `None` if it was not produced by this table.
    #[must_use]
    pub fn resolve(&self, symbol: Symbol) -> Option<&str> {
        self.texts.get_index(symbol.index()).map(String::as_str)
    }

    /// Number of interned texts
    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Whether nothing has been interned yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// All `(symbol, text)` pairs in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> + '_ {
        self.texts
            .iter()
            .enumerate()
            .filter_map(|(index, text)| Symbol::from_index(index).map(|s| (s, text.as_str())))
    }
}
