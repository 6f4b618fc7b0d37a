use crate::error::{Error, Result};
use crate::relation::{Relation, RelationStore, Tuple};
use crate::symbol::Symbol;
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use std::fmt;

/// An argument of an atom
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A variable shared between atoms of one rule (e.g. `D`)
    Variable(String),
    /// A fixed symbol
    Constant(Symbol),
}

impl Term {
    /// Shorthand for [`Term::Variable`]
    #[must_use]
    pub fn var(name: &str) -> Self {
        Self::Variable(name.to_owned())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(name) => f.write_str(name),
            Self::Constant(symbol) => write!(f, "#{symbol}"),
        }
    }
}

/// A predicate applied to terms, e.g. `treated_with(T, D)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    /// Relation name
    pub predicate: String,
    /// One term per argument position
    pub terms: Vec<Term>,
}

impl Atom {
    /// Create an atom
    #[must_use]
    pub fn new(predicate: &str, terms: Vec<Term>) -> Self {
        Self {
            predicate: predicate.to_owned(),
            terms,
        }
    }

    fn variables(&self) -> impl Iterator<Item = &str> + '_ {
        self.terms.iter().filter_map(|term| match term {
            Term::Variable(name) => Some(name.as_str()),
            Term::Constant(_) => None,
        })
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{term}")?;
        }
        f.write_str(")")
    }
}

/// A Horn clause `head :- body[0], body[1], ...`
#[derive(Debug, Clone)]
pub struct Rule {
    head: Atom,
    body: Vec<Atom>,
}

impl Rule {
    /// Create a rule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnboundHeadVariable`] if a head variable does not
    /// occur in any body atom.
    pub fn new(head: Atom, body: Vec<Atom>) -> Result<Self> {
        let body_vars: IndexSet<&str> = body.iter().flat_map(Atom::variables).collect();
        if let Some(unbound) = head.variables().find(|var| !body_vars.contains(var)) {
            return Err(Error::UnboundHeadVariable {
                rule: head.predicate.clone(),
                variable: unbound.to_owned(),
            });
        }
        Ok(Self { head, body })
    }

    /// The derived atom
    #[must_use]
    pub fn head(&self) -> &Atom {
        &self.head
    }

    /// Conditions, joined left to right
    #[must_use]
    pub fn body(&self) -> &[Atom] {
        &self.body
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :- ", self.head)?;
        for (i, atom) in self.body.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{atom}")?;
        }
        Ok(())
    }
}

/// Variable assignments accumulated while joining a rule body.
type Binding<'r> = IndexMap<&'r str, Symbol>;

/// Derives every head tuple of `rule` from the current contents of `store`.
///
/// Body atoms are joined left to right. Each partial binding is extended by
/// the tuples of the next atom that agree with it; candidates come from the
/// most selective position index available, so a join on a shared variable
/// is a lookup rather than a scan. The result is a set: a head tuple
/// supported by several derivations appears once.
#[must_use]
pub fn evaluate_rule(rule: &Rule, store: &RelationStore) -> IndexSet<Tuple> {
    let mut bindings: Vec<Binding<'_>> = vec![IndexMap::new()];

    for atom in &rule.body {
        let Some(relation) = store.relation(&atom.predicate) else {
            return IndexSet::new();
        };
        bindings = bindings
            .iter()
            .flat_map(|binding| {
                candidates(relation, atom, binding)
                    .filter_map(move |tuple| match_atom(atom, tuple, binding))
            })
            .collect();
        trace!("{}: {} partial bindings", atom.predicate, bindings.len());
        if bindings.is_empty() {
            return IndexSet::new();
        }
    }

    bindings
        .iter()
        .filter_map(|binding| {
            rule.head
                .terms
                .iter()
                .map(|term| match term {
                    Term::Constant(symbol) => Some(*symbol),
                    Term::Variable(var) => binding.get(var.as_str()).copied(),
                })
                .collect::<Option<Tuple>>()
        })
        .collect()
}

/// Runs `rules` until none of them derives a new tuple.
///
/// Returns the number of tuples added to head relations.
///
/// # Errors
///
/// Returns [`Error::ArityMismatch`] if a rule head disagrees with the arity
/// of an existing relation of the same name.
pub fn evaluate(rules: &[Rule], store: &mut RelationStore) -> Result<usize> {
    for rule in rules {
        store.declare(&rule.head.predicate, rule.head.terms.len())?;
    }

    let mut added = 0;
    let mut iteration = 0;
    loop {
        iteration += 1;
        let mut changed = false;
        for rule in rules {
            let derived = evaluate_rule(rule, store);
            debug!("iteration {iteration}: {rule} derived {} tuples", derived.len());
            for tuple in derived {
                if store.add_tuple(&rule.head.predicate, tuple)? {
                    added += 1;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    debug!("fixpoint reached after {iteration} iterations, {added} new tuples");
    Ok(added)
}

/// Tuples of `relation` that could match `atom` under `binding`.
///
/// Picks the bound position with the fewest indexed tuples; with nothing
/// bound, every tuple is a candidate.
fn candidates<'s>(
    relation: &'s Relation,
    atom: &Atom,
    binding: &Binding<'_>,
) -> Box<dyn Iterator<Item = &'s Tuple> + 's> {
    let most_selective = atom
        .terms
        .iter()
        .enumerate()
        .filter_map(|(position, term)| {
            let value = match term {
                Term::Constant(symbol) => Some(*symbol),
                Term::Variable(var) => binding.get(var.as_str()).copied(),
            };
            value.map(|v| (relation.count_matching(position, v), position, v))
        })
        .min_by_key(|(count, _, _)| *count);

    match most_selective {
        Some((_, position, value)) => Box::new(relation.matching(position, value)),
        None => Box::new(relation.iter()),
    }
}

/// Extends `binding` with `tuple` if they agree on every term of `atom`.
fn match_atom<'r>(atom: &'r Atom, tuple: &[Symbol], binding: &Binding<'r>) -> Option<Binding<'r>> {
    if atom.terms.len() != tuple.len() {
        return None;
    }

    let mut extended = binding.clone();
    for (term, value) in atom.terms.iter().zip(tuple) {
        match term {
            Term::Constant(symbol) => {
                if symbol != value {
                    return None;
                }
            }
            Term::Variable(var) => match extended.get(var.as_str()) {
                Some(bound) if bound != value => return None,
                Some(_) => {}
                None => {
                    extended.insert(var.as_str(), *value);
                }
            },
        }
    }
    Some(extended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolTable;
    use proptest::prelude::*;
    use smallvec::smallvec;

    fn cures_symptom() -> Rule {
        Rule::new(
            Atom::new("cures_symptom", vec![Term::var("T"), Term::var("S")]),
            vec![
                Atom::new("treated_with", vec![Term::var("T"), Term::var("D")]),
                Atom::new("has_symptom", vec![Term::var("D"), Term::var("S")]),
            ],
        )
        .unwrap()
    }

    fn sorted(set: IndexSet<Tuple>) -> Vec<Tuple> {
        let mut tuples: Vec<Tuple> = set.into_iter().collect();
        tuples.sort();
        tuples
    }

    #[test]
    fn test_join_produces_exact_cross_product() {
        let mut table = SymbolTable::new();
        let [t1, t2, d1, s1, s2] =
            ["T1", "T2", "D1", "S1", "S2"].map(|n| table.intern(n).unwrap());
        let mut store = RelationStore::new();
        store.add_fact("treated_with", t1, d1).unwrap();
        store.add_fact("has_symptom", d1, s1).unwrap();
        store.add_fact("has_symptom", d1, s2).unwrap();
        store.add_fact("treated_with", t2, d1).unwrap();

        let derived = evaluate_rule(&cures_symptom(), &store);
        let expected: Vec<Tuple> = vec![
            smallvec![t1, s1],
            smallvec![t1, s2],
            smallvec![t2, s1],
            smallvec![t2, s2],
        ];
        assert_eq!(sorted(derived), expected);
    }

    #[test]
    fn test_shared_derivations_are_deduplicated() {
        let mut table = SymbolTable::new();
        let [t, d1, d2, s] = ["T", "D1", "D2", "S"].map(|n| table.intern(n).unwrap());
        let mut store = RelationStore::new();
        store.add_fact("treated_with", t, d1).unwrap();
        store.add_fact("treated_with", t, d2).unwrap();
        store.add_fact("has_symptom", d1, s).unwrap();
        store.add_fact("has_symptom", d2, s).unwrap();

        let derived = evaluate_rule(&cures_symptom(), &store);
        assert_eq!(derived.len(), 1);
        assert!(derived.contains(&Tuple::from_slice(&[t, s])));
    }

    #[test]
    fn test_unrelated_symptom_is_not_derived() {
        let mut table = SymbolTable::new();
        let [t, d1, d2, s1, s2] = ["T", "D1", "D2", "S1", "S2"].map(|n| table.intern(n).unwrap());
        let mut store = RelationStore::new();
        store.add_fact("treated_with", t, d1).unwrap();
        store.add_fact("has_symptom", d1, s1).unwrap();
        store.add_fact("has_symptom", d2, s2).unwrap();

        let derived = evaluate_rule(&cures_symptom(), &store);
        assert!(!derived.contains(&Tuple::from_slice(&[t, s2])));
        assert_eq!(derived.len(), 1);
    }

    #[test]
    fn test_missing_body_relation_derives_nothing() {
        let mut table = SymbolTable::new();
        let [t, d] = ["T", "D"].map(|n| table.intern(n).unwrap());
        let mut store = RelationStore::new();
        store.add_fact("treated_with", t, d).unwrap();
        assert!(evaluate_rule(&cures_symptom(), &store).is_empty());
    }

    #[test]
    fn test_constants_and_repeated_variables_filter_tuples() {
        let mut table = SymbolTable::new();
        let [a, b, c] = ["a", "b", "c"].map(|n| table.intern(n).unwrap());
        let mut store = RelationStore::new();
        store.add_fact("likes", a, b).unwrap();
        store.add_fact("likes", c, c).unwrap();
        store.add_fact("likes", b, c).unwrap();

        let narcissist = Rule::new(
            Atom::new("narcissist", vec![Term::var("x")]),
            vec![Atom::new("likes", vec![Term::var("x"), Term::var("x")])],
        )
        .unwrap();
        assert_eq!(sorted(evaluate_rule(&narcissist, &store)), vec![Tuple::from_slice(&[c])]);

        let likes_c = Rule::new(
            Atom::new("likes_c", vec![Term::var("x")]),
            vec![Atom::new("likes", vec![Term::var("x"), Term::Constant(c)])],
        )
        .unwrap();
        assert_eq!(
            sorted(evaluate_rule(&likes_c, &store)),
            vec![Tuple::from_slice(&[b]), Tuple::from_slice(&[c])]
        );
    }

    #[test]
    fn test_unbound_head_variable_is_rejected() {
        let err = Rule::new(
            Atom::new("bad", vec![Term::var("x"), Term::var("y")]),
            vec![Atom::new("edge", vec![Term::var("x"), Term::var("z")])],
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnboundHeadVariable { ref variable, .. } if variable == "y"));
    }

    #[test]
    fn test_fixpoint_adds_derived_relation_once() {
        let mut table = SymbolTable::new();
        let [t, d, s] = ["T", "D", "S"].map(|n| table.intern(n).unwrap());
        let mut store = RelationStore::new();
        store.add_fact("treated_with", t, d).unwrap();
        store.add_fact("has_symptom", d, s).unwrap();

        let rules = [cures_symptom()];
        assert_eq!(evaluate(&rules, &mut store).unwrap(), 1);
        assert_eq!(store.pairs("cures_symptom").collect::<Vec<_>>(), vec![(t, s)]);
        assert_eq!(evaluate(&rules, &mut store).unwrap(), 0);
    }

    #[test]
    fn test_fixpoint_declares_empty_head_relation() {
        let mut store = RelationStore::new();
        assert_eq!(evaluate(&[cures_symptom()], &mut store).unwrap(), 0);
        assert!(store.relation("cures_symptom").unwrap().is_empty());
    }

    #[test]
    fn test_fixpoint_chains_derived_relations() {
        let mut table = SymbolTable::new();
        let [t, d, s, x] = ["T", "D", "S", "X"].map(|n| table.intern(n).unwrap());
        let mut store = RelationStore::new();
        store.add_fact("treated_with", t, d).unwrap();
        store.add_fact("has_symptom", d, s).unwrap();
        store.add_fact("sold_as", t, x).unwrap();

        // Listed before the rule it depends on, so it needs a second pass.
        let buy_for = Rule::new(
            Atom::new("buy_for", vec![Term::var("P"), Term::var("S")]),
            vec![
                Atom::new("cures_symptom", vec![Term::var("T"), Term::var("S")]),
                Atom::new("sold_as", vec![Term::var("T"), Term::var("P")]),
            ],
        )
        .unwrap();
        evaluate(&[buy_for, cures_symptom()], &mut store).unwrap();
        assert_eq!(store.pairs("buy_for").collect::<Vec<_>>(), vec![(x, s)]);
    }

    #[test]
    fn test_rule_display() {
        assert_eq!(
            cures_symptom().to_string(),
            "cures_symptom(T, S) :- treated_with(T, D), has_symptom(D, S)"
        );
    }

    proptest! {
        #[test]
        fn prop_join_matches_nested_loop(
            treated in prop::collection::vec((0u8..6, 0u8..6), 0..20),
            symptoms in prop::collection::vec((0u8..6, 0u8..6), 0..20),
        ) {
            let mut table = SymbolTable::new();
            let mut sym = |kind: &str, n: u8| table.intern(&format!("{kind}{n}")).unwrap();
            let treated: Vec<(Symbol, Symbol)> =
                treated.into_iter().map(|(t, d)| (sym("t", t), sym("d", d))).collect();
            let symptoms: Vec<(Symbol, Symbol)> =
                symptoms.into_iter().map(|(d, s)| (sym("d", d), sym("s", s))).collect();

            let mut store = RelationStore::new();
            for &(t, d) in &treated {
                store.add_fact("treated_with", t, d).unwrap();
            }
            for &(d, s) in &symptoms {
                store.add_fact("has_symptom", d, s).unwrap();
            }

            let mut expected: IndexSet<Tuple> = IndexSet::new();
            for &(t, d) in &treated {
                for &(d2, s) in &symptoms {
                    if d == d2 {
                        expected.insert(smallvec![t, s]);
                    }
                }
            }

            let derived = evaluate_rule(&cures_symptom(), &store);
            prop_assert_eq!(sorted(derived), sorted(expected));
        }
    }
}
