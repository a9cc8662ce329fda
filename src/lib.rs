//! A canonical LR(1) parser generator built for inspection.
//!
//! The pipeline runs grammar loading, FIRST computation, the LR(1) item NFA,
//! its subset-construction DFA, ACTION/GOTO synthesis and a table-driven
//! shift/reduce interpreter, and exposes every intermediate stage. [`analyze`]
//! drives the whole chain and bundles the results into a JSON-serialisable
//! [`Analysis`] document.

pub mod artifact;
pub mod dfa;
pub mod first_sets;
pub mod grammar;
pub mod nfa;
pub mod parse_table;
pub mod parser;
pub mod types;

mod util;

pub use crate::artifact::Analysis;
pub use crate::dfa::Dfa;
pub use crate::first_sets::FirstSets;
pub use crate::grammar::{Grammar, GrammarError};
pub use crate::nfa::Nfa;
pub use crate::parse_table::{ConflictError, ParseTable};
pub use crate::parser::{ParseOutcome, Parser};

/// Default cap on NFA/DFA state counts, bounding runtime on adversarial
/// grammars.
pub const DEFAULT_STATE_BUDGET: usize = 10_000;

#[derive(Debug, thiserror::Error)]
#[error("{stage} construction exceeded its state budget of {limit}")]
pub struct OversizeError {
    pub stage: &'static str,
    pub limit: usize,
}

/// A fatal construction error; parse-time failures are reported inside
/// [`ParseOutcome`] instead.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("invalid grammar")]
    Grammar(
        #[from]
        #[source]
        GrammarError,
    ),

    #[error("grammar is too large")]
    Oversize(
        #[from]
        #[source]
        OversizeError,
    ),

    #[error("grammar is not LR(1)")]
    Conflict(
        #[from]
        #[source]
        ConflictError,
    ),
}

/// Run the full pipeline over a grammar source and an input token string.
pub fn analyze(grammar_source: &str, input: &str) -> Result<Analysis, AnalyzeError> {
    let span = tracing::debug_span!("analyze");
    let _entered = span.enter();

    let grammar = Grammar::load(grammar_source)?;
    for id in grammar.unreferenced_nonterminals() {
        tracing::warn!(
            "nonterminal `{}` is not referenced by any production body",
            grammar.symbol_name(id)
        );
    }

    let first_sets = FirstSets::new(&grammar);
    let nfa = Nfa::build(&grammar, &first_sets)?;
    let dfa = Dfa::build(&grammar, &nfa)?;
    let table = ParseTable::generate(&grammar, &dfa)?;
    let parse_result = Parser::new(&grammar, &table).parse(input);

    Ok(Analysis::new(
        &grammar,
        &first_sets,
        &dfa,
        &table,
        parse_result,
    ))
}
