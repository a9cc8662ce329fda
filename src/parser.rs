//! The table-driven shift/reduce interpreter.
//!
//! Drives the ACTION/GOTO table against a tokenised input and records every
//! configuration on the way, so a rejection can be pinned to the exact step
//! it happened at. Runtime failures are embedded in the outcome instead of
//! aborting; the trace always comes back.

use crate::dfa::DfaStateID;
use crate::grammar::{Grammar, SymbolID};
use crate::parse_table::{Action, ParseTable};
use serde::Serialize;

/// Whitespace-split the input and append the end marker.
///
/// The single lexical courtesy: `,` is padded with spaces first, so comma
/// grammars do not force the user to pre-space their input.
pub fn tokenize(input: &str) -> Vec<String> {
    let spaced = input.replace(',', " , ");
    let mut tokens: Vec<String> = spaced.split_whitespace().map(str::to_owned).collect();
    tokens.push("$".to_owned());
    tokens
}

/// One parse-stack slot; states interleave with grammar symbols and a state
/// sits at both ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StackEntry {
    State(u64),
    Symbol(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseStep {
    pub step: usize,
    pub stack: Vec<StackEntry>,
    pub input: Vec<String>,
    /// The ACTION cell applied at this configuration (`s<id>`, `r<num>`,
    /// `acc`), or the empty cell on the failing step.
    pub action: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    #[error("no action in state {state} on `{symbol}`")]
    NoAction { state: DfaStateID, symbol: String },

    #[error("no goto in state {state} on `{symbol}`")]
    BadGoto { state: DfaStateID, symbol: String },
}

/// The verdict plus the full configuration trace.
#[derive(Debug, Serialize)]
pub struct ParseOutcome {
    pub accepted: bool,
    pub steps: Vec<ParseStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Copy, Clone)]
enum Slot {
    State(DfaStateID),
    Symbol(SymbolID),
}

#[derive(Debug)]
pub struct Parser<'g> {
    grammar: &'g Grammar,
    table: &'g ParseTable,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar, table: &'g ParseTable) -> Self {
        Self { grammar, table }
    }

    pub fn parse(&self, input: &str) -> ParseOutcome {
        self.parse_tokens(tokenize(input))
    }

    /// Run the interpreter over a `$`-terminated token list.
    pub fn parse_tokens(&self, tokens: Vec<String>) -> ParseOutcome {
        let mut slots: Vec<Slot> = vec![Slot::State(DfaStateID::START)];
        let mut steps: Vec<ParseStep> = Vec::new();
        let mut cursor = 0;

        loop {
            let state = top_state(&slots);
            let token = tokens.get(cursor).map(String::as_str).unwrap_or("$");

            let action = self
                .grammar
                .symbol_by_name(token)
                .and_then(|symbol| self.table.action(state, symbol));
            let action = match action {
                Some(action) => action,
                None => {
                    // show the failing configuration with its empty cell
                    steps.push(self.record(&steps, &slots, &tokens, cursor, String::new()));
                    let failure = ParseFailure::NoAction {
                        state,
                        symbol: token.to_owned(),
                    };
                    tracing::debug!(%failure, "input rejected");
                    return ParseOutcome {
                        accepted: false,
                        steps,
                        error: Some(failure.to_string()),
                    };
                }
            };

            steps.push(self.record(&steps, &slots, &tokens, cursor, action.cell()));

            match action {
                Action::Shift(next) => {
                    let symbol = self
                        .grammar
                        .symbol_by_name(token)
                        .expect("shift exists only for known terminals");
                    slots.push(Slot::Symbol(symbol));
                    slots.push(Slot::State(next));
                    cursor += 1;
                }

                Action::Reduce(num) => {
                    let prod = self.grammar.prod(self.table.rules()[num]);
                    // an ε-production pops nothing
                    slots.truncate(slots.len() - 2 * prod.right().len());

                    let uncovered = top_state(&slots);
                    let target = match self.table.goto(uncovered, prod.left()) {
                        Some(target) => target,
                        None => {
                            let failure = ParseFailure::BadGoto {
                                state: uncovered,
                                symbol: self.grammar.symbol_name(prod.left()).to_owned(),
                            };
                            tracing::debug!(%failure, "input rejected");
                            return ParseOutcome {
                                accepted: false,
                                steps,
                                error: Some(failure.to_string()),
                            };
                        }
                    };
                    slots.push(Slot::Symbol(prod.left()));
                    slots.push(Slot::State(target));
                }

                Action::Accept => {
                    return ParseOutcome {
                        accepted: true,
                        steps,
                        error: None,
                    };
                }
            }
        }
    }

    fn record(
        &self,
        steps: &[ParseStep],
        slots: &[Slot],
        tokens: &[String],
        cursor: usize,
        action: String,
    ) -> ParseStep {
        let stack = slots
            .iter()
            .map(|slot| match slot {
                Slot::State(id) => StackEntry::State(id.raw()),
                Slot::Symbol(id) => StackEntry::Symbol(self.grammar.symbol_name(*id).to_owned()),
            })
            .collect();
        ParseStep {
            step: steps.len(),
            stack,
            input: tokens[cursor.min(tokens.len())..].to_vec(),
            action,
        }
    }
}

fn top_state(slots: &[Slot]) -> DfaStateID {
    match slots.last() {
        Some(Slot::State(id)) => *id,
        _ => unreachable!("a state id sits on top of the stack"),
    }
}
