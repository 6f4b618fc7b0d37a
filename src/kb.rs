//! The knowledge base and its two lifecycle states.
//!
//! [`KnowledgeBaseBuilder`] accepts facts. [`KnowledgeBaseBuilder::finish`]
//! freezes them, derives `cures_symptom`, and returns a [`KnowledgeBase`],
//! which only answers queries. Reloading means building a new one.

use crate::error::{Error, Result};
use crate::query::{self, Position};
use crate::relation::{RelationStore, Tuple};
use crate::rule::{self, Atom, Rule, Term};
use crate::source::{self, parse_list, Record, RecordSet};
use crate::symbol::{Symbol, SymbolTable};
use indexmap::IndexSet;
use log::{debug, info, warn};
use std::path::Path;

/// `is_type(entity, category)`
pub const IS_TYPE: &str = "is_type";
/// `caused_by(entity, agent)`
pub const CAUSED_BY: &str = "caused_by";
/// `has_symptom(entity, symptom)`
pub const HAS_SYMPTOM: &str = "has_symptom";
/// `treated_with(treatment, entity)`. Unlike the other base relations the
/// subject comes second.
pub const TREATED_WITH: &str = "treated_with";
/// `cures_symptom(treatment, symptom)`, derived only.
pub const CURES_SYMPTOM: &str = "cures_symptom";

/// Base relations in the order they are written to fact dumps.
pub const BASE_RELATIONS: [&str; 4] = [IS_TYPE, CAUSED_BY, HAS_SYMPTOM, TREATED_WITH];

/// `cures_symptom(T, S) :- treated_with(T, D), has_symptom(D, S)`
///
/// # Errors
///
/// Never fails in practice; the head variables all occur in the body.
pub fn cures_symptom_rule() -> Result<Rule> {
    Rule::new(
        Atom::new(CURES_SYMPTOM, vec![Term::var("T"), Term::var("S")]),
        vec![
            Atom::new(TREATED_WITH, vec![Term::var("T"), Term::var("D")]),
            Atom::new(HAS_SYMPTOM, vec![Term::var("D"), Term::var("S")]),
        ],
    )
}

/// Counts collected while loading records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LoadReport {
    /// Records whose facts were loaded
    pub records: usize,
    /// Rows dropped for not being valid CSV or for lacking a subject name
    pub skipped_records: usize,
    /// List fields dropped because they did not parse
    pub malformed_fields: usize,
    /// Distinct base facts
    pub facts: usize,
    /// Distinct derived facts
    pub derived: usize,
}

/// A knowledge base that is still accepting facts.
#[derive(Debug, Default)]
pub struct KnowledgeBaseBuilder {
    symbols: SymbolTable,
    store: RelationStore,
    rules: Vec<Rule>,
    report: LoadReport,
}

impl KnowledgeBaseBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule evaluated alongside `cures_symptom` when loading finishes.
    ///
    /// # Errors
    ///
    /// [`Error::BaseRelationHead`] if the head names a base relation, and
    /// [`Error::DerivedRelation`] if facts were already asserted into it.
    pub fn with_rule(mut self, rule: Rule) -> Result<Self> {
        let head = rule.head().predicate.as_str();
        if BASE_RELATIONS.contains(&head) {
            return Err(Error::BaseRelationHead(head.to_owned()));
        }
        if self.store.relation(head).is_some() {
            return Err(Error::DerivedRelation(head.to_owned()));
        }
        self.rules.push(rule);
        Ok(self)
    }

    /// Interns `text`; `None` for empty input.
    pub fn intern(&mut self, text: &str) -> Option<Symbol> {
        self.symbols.intern(text)
    }

    /// Asserts the binary fact `relation(first, second)`.
    ///
    /// # Errors
    ///
    /// [`Error::DerivedRelation`] if `relation` is `cures_symptom` or the
    /// head of a rule added with [`with_rule`](Self::with_rule), and
    /// [`Error::ArityMismatch`] if `relation` is not binary.
    pub fn add_fact(&mut self, relation: &str, first: Symbol, second: Symbol) -> Result<bool> {
        if self.is_derived(relation) {
            return Err(Error::DerivedRelation(relation.to_owned()));
        }
        self.store.add_fact(relation, first, second)
    }

    fn is_derived(&self, relation: &str) -> bool {
        relation == CURES_SYMPTOM || self.rules.iter().any(|rule| rule.head().predicate == relation)
    }

    /// Turns one source record into facts.
    ///
    /// A record without a name is skipped. A list field that does not parse
    /// is dropped on its own; the record's other fields still load.
    ///
    /// # Errors
    ///
    /// Only if a base relation was previously given a non-binary arity.
    pub fn load_record(&mut self, record: &Record) -> Result<()> {
        let Some(subject) = self.intern(&record.name) else {
            warn!("skipping record without a name");
            self.report.skipped_records += 1;
            return Ok(());
        };
        self.report.records += 1;

        if let Some(kind) = record.kind.as_deref().and_then(|k| self.intern(k)) {
            self.add_fact(IS_TYPE, subject, kind)?;
        }
        if let Some(agent) = record.causal_agent.as_deref().and_then(|a| self.intern(a)) {
            self.add_fact(CAUSED_BY, subject, agent)?;
        }
        for symptom in self.list_field(&record.name, "symptoms", record.symptoms.as_deref()) {
            if let Some(symptom) = self.intern(&symptom) {
                self.add_fact(HAS_SYMPTOM, subject, symptom)?;
            }
        }
        for treatment in self.list_field(&record.name, "treatments", record.treatments.as_deref()) {
            if let Some(treatment) = self.intern(&treatment) {
                self.add_fact(TREATED_WITH, treatment, subject)?;
            }
        }
        Ok(())
    }

    /// Loads every record in order.
    ///
    /// # Errors
    ///
    /// See [`load_record`](Self::load_record).
    pub fn load_records<'a>(&mut self, records: impl IntoIterator<Item = &'a Record>) -> Result<()> {
        records.into_iter().try_for_each(|record| self.load_record(record))
    }

    /// Loads parsed source records and counts the rows the parser skipped.
    ///
    /// # Errors
    ///
    /// See [`load_record`](Self::load_record).
    pub fn load_source(&mut self, source: &RecordSet) -> Result<()> {
        self.report.skipped_records += source.skipped_rows;
        self.load_records(&source.records)
    }

    fn list_field(&mut self, subject: &str, field: &'static str, text: Option<&str>) -> Vec<String> {
        let Some(text) = text else {
            return Vec::new();
        };
        parse_list(field, text).unwrap_or_else(|err| {
            warn!("{subject}: dropping {err}");
            self.report.malformed_fields += 1;
            Vec::new()
        })
    }

    /// Freezes the base facts and derives `cures_symptom` (plus any rules
    /// added with [`with_rule`](Self::with_rule)) to a fixpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule head conflicts with a relation's arity.
    pub fn finish(mut self) -> Result<KnowledgeBase> {
        for name in BASE_RELATIONS {
            self.store.declare(name, 2)?;
        }
        self.report.facts = self.store.fact_count();

        let mut rules = vec![cures_symptom_rule()?];
        rules.append(&mut self.rules);
        self.report.derived = rule::evaluate(&rules, &mut self.store)?;

        info!(
            "knowledge base ready: {} records ({} skipped), {} symbols, {} facts, {} derived, {} malformed fields",
            self.report.records,
            self.report.skipped_records,
            self.symbols.len(),
            self.report.facts,
            self.report.derived,
            self.report.malformed_fields,
        );

        Ok(KnowledgeBase {
            symbols: self.symbols,
            store: self.store,
            report: self.report,
        })
    }
}

/// A loaded, read-only knowledge base.
///
/// Immutable once built, so it can be shared across threads behind an `Arc`.
#[derive(Debug)]
pub struct KnowledgeBase {
    symbols: SymbolTable,
    store: RelationStore,
    report: LoadReport,
}

impl KnowledgeBase {
    /// Builds a knowledge base from records.
    ///
    /// # Errors
    ///
    /// See [`KnowledgeBaseBuilder::finish`].
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Result<Self> {
        let mut builder = KnowledgeBaseBuilder::new();
        builder.load_records(records)?;
        builder.finish()
    }

    /// Reads the CSV source at `path` and builds a knowledge base from it.
    ///
    /// # Errors
    ///
    /// [`Error::SourceUnavailable`](crate::Error::SourceUnavailable) if the
    /// file cannot be read; no knowledge base exists in that case.
    pub fn load(path: &Path) -> Result<Self> {
        info!("loading facts from {}", path.display());
        let source = source::read_records(path)?;
        let mut builder = KnowledgeBaseBuilder::new();
        builder.load_source(&source)?;
        builder.finish()
    }

    /// Counts gathered while loading
    #[must_use]
    pub fn report(&self) -> LoadReport {
        self.report
    }

    /// The symbol table
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Text of `symbol`, if it belongs to this knowledge base
    #[must_use]
    pub fn resolve(&self, symbol: Symbol) -> Option<&str> {
        self.symbols.resolve(symbol)
    }

    /// Symbol for `text`, without interning
    #[must_use]
    pub fn lookup(&self, text: &str) -> Option<Symbol> {
        self.symbols.lookup(text)
    }

    /// Tuples of `relation`; empty for an unknown name.
    pub fn tuples(&self, relation: &str) -> impl Iterator<Item = &Tuple> + '_ {
        self.store.tuples(relation)
    }

    /// Binary tuples of `relation` as pairs
    pub fn pairs(&self, relation: &str) -> impl Iterator<Item = (Symbol, Symbol)> + '_ {
        self.store.pairs(relation)
    }

    /// Symbols in the free position of `relation` tuples whose `bound`
    /// position holds `value`.
    #[must_use]
    pub fn query(&self, relation: &str, bound: Position, value: Symbol) -> IndexSet<Symbol> {
        query::query(&self.store, relation, bound, value)
    }

    /// Names of the treatments that cure `symptom`.
    ///
    /// An unknown symptom and a symptom with no known treatment both give an
    /// empty list. Order is unspecified.
    #[must_use]
    pub fn treatments_for(&self, symptom: &str) -> Vec<&str> {
        let Some(symptom_sym) = self.lookup(symptom) else {
            debug!("unknown symptom {symptom:?}");
            return Vec::new();
        };
        self.query(CURES_SYMPTOM, Position::Second, symptom_sym)
            .into_iter()
            .filter_map(|treatment| self.resolve_or_warn(treatment))
            .collect()
    }

    /// Every symptom named in `has_symptom`, sorted.
    #[must_use]
    pub fn symptoms(&self) -> Vec<&str> {
        let distinct: IndexSet<Symbol> = self.pairs(HAS_SYMPTOM).map(|(_, symptom)| symptom).collect();
        let mut names: Vec<&str> = distinct
            .into_iter()
            .filter_map(|symptom| self.resolve_or_warn(symptom))
            .collect();
        names.sort_unstable();
        names
    }

    fn resolve_or_warn(&self, symbol: Symbol) -> Option<&str> {
        let text = self.resolve(symbol);
        if text.is_none() {
            warn!("symbol {symbol} has no text");
        }
        text
    }
}
