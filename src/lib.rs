//! # Macalog
//!
//! A micro Datalog knowledge base that answers "what treats this symptom?"
//! for macadamia afflictions.
//!
//! ## Features
//!
//! - Symbol interning with quote/whitespace canonicalization
//! - Indexed binary relations with set semantics
//! - Join-based rule evaluation to a fixpoint
//! - Point queries binding one argument position
//!
//! ## Example
//!
//! ```rust
//! use macalog::{KnowledgeBaseBuilder, HAS_SYMPTOM, TREATED_WITH};
//!
//! let mut builder = KnowledgeBaseBuilder::new();
//! let blight = builder.intern("Walnut_Blight").unwrap();
//! let holes = builder.intern("Holes_in_nuts").unwrap();
//! let copper = builder.intern("Copper_Spray").unwrap();
//! builder.add_fact(HAS_SYMPTOM, blight, holes)?;
//! builder.add_fact(TREATED_WITH, copper, blight)?;
//!
//! let kb = builder.finish()?;
//! assert_eq!(kb.treatments_for("Holes_in_nuts"), vec!["Copper_Spray"]);
//! assert!(kb.treatments_for("Leaf_Spots").is_empty());
//! # Ok::<(), macalog::Error>(())
//! ```

/// Runtime configuration.
pub mod config;
/// Error types.
pub mod error;
/// Fact dumps.
pub mod export;
/// The knowledge base and its lifecycle.
pub mod kb;
/// Point queries over binary relations.
pub mod query;
/// Named, indexed tuple sets.
pub mod relation;
/// Rules and their evaluation.
pub mod rule;
/// CSV source records.
pub mod source;
/// Symbol interning.
pub mod symbol;

pub use config::Config;
pub use error::{Error, MalformedField, Result};
pub use kb::{
    KnowledgeBase, KnowledgeBaseBuilder, LoadReport, CAUSED_BY, CURES_SYMPTOM, HAS_SYMPTOM,
    IS_TYPE, TREATED_WITH,
};
pub use query::Position;
pub use relation::{Relation, RelationStore, Tuple};
pub use rule::{Atom, Rule, Term};
pub use source::{Record, RecordSet};
pub use symbol::{Symbol, SymbolTable};
