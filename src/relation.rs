use crate::error::{Error, Result};
use crate::symbol::Symbol;
use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

/// One row of a relation. Binary tuples stay inline.
pub type Tuple = SmallVec<[Symbol; 2]>;

/// A fixed-arity set of tuples with one value index per argument position.
///
/// For `has_symptom(a,x), has_symptom(a,y), has_symptom(b,y)`:
/// - position 0: `{a -> [0, 1], b -> [2]}`
/// - position 1: `{x -> [0], y -> [1, 2]}`
///
/// Index entries are offsets into the tuple set, which only ever grows, so
/// they stay valid.
#[derive(Debug, Clone)]
pub struct Relation {
    arity: usize,
    tuples: IndexSet<Tuple>,
    by_position: Vec<IndexMap<Symbol, Vec<usize>>>,
}

impl Relation {
    /// Create an empty relation of the given arity
    #[must_use]
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            tuples: IndexSet::new(),
            by_position: (0..arity).map(|_| IndexMap::new()).collect(),
        }
    }

    /// Number of argument positions
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Number of distinct tuples
    #[must_use]
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    /// Whether the relation holds no tuples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Whether `tuple` is present
    #[must_use]
    pub fn contains(&self, tuple: &[Symbol]) -> bool {
        self.tuples.contains(tuple)
    }

    /// Tuples in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.tuples.iter()
    }

    /// Inserts `tuple`; returns whether it was new.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArityMismatch`] if the tuple's length differs from
    /// the relation's arity. `name` is only used for the error.
    pub fn insert(&mut self, name: &str, tuple: Tuple) -> Result<bool> {
        if tuple.len() != self.arity {
            return Err(Error::ArityMismatch {
                relation: name.to_owned(),
                expected: self.arity,
                found: tuple.len(),
            });
        }
        let (offset, inserted) = self.tuples.insert_full(tuple);
        if inserted {
            let tuple = &self.tuples[offset];
            for (index, value) in self.by_position.iter_mut().zip(tuple.iter()) {
                index.entry(*value).or_default().push(offset);
            }
        }
        Ok(inserted)
    }

    /// Number of tuples whose `position` holds `value`.
    #[must_use]
    pub fn count_matching(&self, position: usize, value: Symbol) -> usize {
        self.by_position
            .get(position)
            .and_then(|index| index.get(&value))
            .map_or(0, Vec::len)
    }

    /// Tuples whose `position` holds `value`, via the position index.
    pub fn matching(&self, position: usize, value: Symbol) -> impl Iterator<Item = &Tuple> + '_ {
        self.by_position
            .get(position)
            .and_then(|index| index.get(&value))
            .into_iter()
            .flatten()
            .filter_map(|&offset| self.tuples.get_index(offset))
    }
}

/// Named relations, created on first use.
#[derive(Debug, Clone, Default)]
pub struct RelationStore {
    relations: IndexMap<String, Relation>,
}

impl RelationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `name` exists with `arity`, so it reads as empty rather than
    /// absent before any fact arrives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArityMismatch`] if `name` already exists with another
    /// arity.
    pub fn declare(&mut self, name: &str, arity: usize) -> Result<()> {
        let relation = self
            .relations
            .entry(name.to_owned())
            .or_insert_with(|| Relation::new(arity));
        if relation.arity() == arity {
            Ok(())
        } else {
            Err(Error::ArityMismatch {
                relation: name.to_owned(),
                expected: relation.arity(),
                found: arity,
            })
        }
    }

    /// Inserts a tuple into `name`; returns whether it was new.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArityMismatch`] if `name` already holds tuples of a
    /// different arity.
    pub fn add_tuple(&mut self, name: &str, tuple: Tuple) -> Result<bool> {
        if let Some(relation) = self.relations.get_mut(name) {
            return relation.insert(name, tuple);
        }
        let mut relation = Relation::new(tuple.len());
        relation.insert(name, tuple)?;
        self.relations.insert(name.to_owned(), relation);
        Ok(true)
    }

    /// Inserts the binary fact `name(first, second)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArityMismatch`] if `name` is not binary.
    pub fn add_fact(&mut self, name: &str, first: Symbol, second: Symbol) -> Result<bool> {
        self.add_tuple(name, smallvec::smallvec![first, second])
    }

    /// The relation called `name`, if any
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// Tuples of `name`; empty for an unknown relation.
    pub fn tuples(&self, name: &str) -> impl Iterator<Item = &Tuple> + '_ {
        self.relations.get(name).into_iter().flat_map(Relation::iter)
    }

    /// Binary tuples of `name` as pairs. Tuples of other arities are skipped.
    pub fn pairs(&self, name: &str) -> impl Iterator<Item = (Symbol, Symbol)> + '_ {
        self.tuples(name).filter_map(|tuple| match tuple.as_slice() {
            [first, second] => Some((*first, *second)),
            _ => None,
        })
    }

    /// Relation names in creation order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.relations.keys().map(String::as_str)
    }

    /// Total number of tuples across all relations
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.relations.values().map(Relation::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolTable;
    use smallvec::smallvec;

    fn symbols(names: &[&str]) -> (SymbolTable, Vec<Symbol>) {
        let mut table = SymbolTable::new();
        let syms = names.iter().map(|n| table.intern(n).unwrap()).collect();
        (table, syms)
    }

    #[test]
    fn test_duplicate_fact_is_a_no_op() {
        let (_, s) = symbols(&["Husk spot", "Fungal"]);
        let mut store = RelationStore::new();
        assert!(store.add_fact("is_type", s[0], s[1]).unwrap());
        assert!(!store.add_fact("is_type", s[0], s[1]).unwrap());
        assert_eq!(store.relation("is_type").unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_relation_reads_as_empty() {
        let store = RelationStore::new();
        assert_eq!(store.tuples("nonexistent").count(), 0);
        assert!(store.relation("nonexistent").is_none());
    }

    #[test]
    fn test_declared_relation_exists_but_is_empty() {
        let mut store = RelationStore::new();
        store.declare("caused_by", 2).unwrap();
        assert!(store.relation("caused_by").unwrap().is_empty());
        assert!(store.declare("caused_by", 3).is_err());
    }

    #[test]
    fn test_arity_mismatch_is_rejected() {
        let (_, s) = symbols(&["a", "b", "c"]);
        let mut store = RelationStore::new();
        store.add_fact("test", s[0], s[1]).unwrap();
        let err = store.add_tuple("test", smallvec![s[0], s[1], s[2]]).unwrap_err();
        assert!(matches!(
            err,
            Error::ArityMismatch { expected: 2, found: 3, .. }
        ));
        assert_eq!(store.fact_count(), 1);
    }

    #[test]
    fn test_position_index_finds_matching_tuples() {
        let (_, s) = symbols(&["alice", "pizza", "bob", "burger", "pasta"]);
        let mut store = RelationStore::new();
        store.add_fact("likes", s[0], s[1]).unwrap();
        store.add_fact("likes", s[2], s[3]).unwrap();
        store.add_fact("likes", s[0], s[4]).unwrap();

        let likes = store.relation("likes").unwrap();
        assert_eq!(likes.count_matching(0, s[0]), 2);
        assert_eq!(likes.count_matching(1, s[1]), 1);
        assert_eq!(likes.count_matching(1, s[0]), 0);
        assert_eq!(likes.count_matching(5, s[0]), 0);

        let foods: Vec<Symbol> = likes.matching(0, s[0]).map(|t| t[1]).collect();
        assert_eq!(foods, vec![s[1], s[4]]);
    }

    #[test]
    fn test_index_ignores_duplicates() {
        let (_, s) = symbols(&["a", "b"]);
        let mut store = RelationStore::new();
        for _ in 0..3 {
            store.add_fact("edge", s[0], s[1]).unwrap();
        }
        assert_eq!(store.relation("edge").unwrap().count_matching(0, s[0]), 1);
    }

    #[test]
    fn test_pairs_and_names_keep_insertion_order() {
        let (_, s) = symbols(&["a", "b", "c"]);
        let mut store = RelationStore::new();
        store.add_fact("second", s[1], s[2]).unwrap();
        store.add_fact("first", s[0], s[1]).unwrap();
        store.add_fact("second", s[0], s[2]).unwrap();
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["second", "first"]);
        assert_eq!(
            store.pairs("second").collect::<Vec<_>>(),
            vec![(s[1], s[2]), (s[0], s[2])]
        );
        assert_eq!(store.fact_count(), 3);
    }
}
