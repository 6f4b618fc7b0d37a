//! Human-readable fact dumps in Z3 fixedpoint syntax.
//!
//! ```text
//! ; Macadamia Knowledge Base - Z3 Facts
//! ; --- ID MAPPING ---
//! ; 1 = Husk spot
//! ; 2 = Fungal
//!
//! ; --- FACTS ---
//! (rule (is_type 1 2))
//! ```

use crate::kb::{KnowledgeBase, BASE_RELATIONS};
use std::io::{self, Write};

/// Writes the symbol mapping and every base fact of `kb` to `out`.
///
/// Derived relations are left out; they follow from the base facts.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_facts<W: Write>(kb: &KnowledgeBase, mut out: W) -> io::Result<()> {
    writeln!(out, "; Macadamia Knowledge Base - Z3 Facts")?;
    writeln!(out, "; --- ID MAPPING ---")?;
    for (symbol, text) in kb.symbols().iter() {
        writeln!(out, "; {} = {text}", symbol.id())?;
    }

    writeln!(out)?;
    writeln!(out, "; --- FACTS ---")?;
    for relation in BASE_RELATIONS {
        for (first, second) in kb.pairs(relation) {
            writeln!(out, "(rule ({relation} {} {}))", first.id(), second.id())?;
        }
    }
    out.flush()
}
