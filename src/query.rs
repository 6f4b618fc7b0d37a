use crate::relation::RelationStore;
use crate::symbol::Symbol;
use indexmap::IndexSet;

/// Argument position of a binary relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// The subject (e.g. the treatment in `cures_symptom`)
    First,
    /// The object (e.g. the symptom in `cures_symptom`)
    Second,
}

impl Position {
    /// Tuple offset of this position
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// The other position
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Every symbol in the free position of a `relation` tuple whose `bound`
/// position holds `value`.
///
/// No match, or no such relation, yields an empty set. Order is insertion
/// order of the matching tuples; callers that present results sort them.
#[must_use]
pub fn query(store: &RelationStore, relation: &str, bound: Position, value: Symbol) -> IndexSet<Symbol> {
    let Some(relation) = store.relation(relation) else {
        return IndexSet::new();
    };
    let free = bound.other().index();
    relation
        .matching(bound.index(), value)
        .filter_map(|tuple| tuple.get(free).copied())
        .collect()
}
