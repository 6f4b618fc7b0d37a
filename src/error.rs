use std::io;
use std::path::PathBuf;

/// Errors raised while building or configuring a knowledge base.
///
/// Per-field faults in source records are not errors: they are counted in
/// [`LoadReport`](crate::LoadReport) and the load continues.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The fact source could not be read at all.
    #[error("fact source {} is unavailable: {source}", path.display())]
    SourceUnavailable {
        /// Path that was attempted
        path: PathBuf,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// The source's header row lacks a required column.
    #[error("fact source has no `{0}` column")]
    MissingColumn(&'static str),

    /// A source row is not well-formed CSV.
    ///
    /// Fatal only for the header row; a bad data row is skipped.
    #[error("malformed CSV near line {line}: {message}")]
    Csv {
        /// 1-based line where the row starts
        line: usize,
        /// Human-readable reason
        message: String,
    },

    /// A tuple's arity differs from the arity the relation was created with.
    #[error("relation `{relation}` has arity {expected}, got a tuple of arity {found}")]
    ArityMismatch {
        /// Relation name
        relation: String,
        /// Arity fixed by the first tuple
        expected: usize,
        /// Arity of the rejected tuple
        found: usize,
    },

    /// A fact was asserted directly into a relation that rules derive.
    #[error("relation `{0}` is derived and cannot be asserted")]
    DerivedRelation(String),

    /// A rule's head names a base relation, which is frozen once loaded.
    #[error("rule head `{0}` names a base relation")]
    BaseRelationHead(String),

    /// A rule head mentions a variable that no body atom binds.
    #[error("rule for `{rule}`: variable `{variable}` appears in head but not in body")]
    UnboundHeadVariable {
        /// Head predicate of the offending rule
        rule: String,
        /// The unbound variable
        variable: String,
    },

    /// The configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// A list-valued record field that is not a list literal.
///
/// Never fatal: the loader drops the field and keeps the rest of the record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{field}` is not a list literal: {text:?}")]
pub struct MalformedField {
    /// Column name
    pub field: &'static str,
    /// Raw cell text
    pub text: String,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
