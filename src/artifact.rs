//! The JSON artifact bundle.
//!
//! Everything the pipeline computes, flattened into the document the
//! surrounding layer serialises for visualisation. Lists are sorted and maps
//! iterate deterministically, so re-analysing the same input yields a
//! byte-identical document.

use crate::dfa::Dfa;
use crate::first_sets::FirstSets;
use crate::grammar::{Grammar, ProdID, Production};
use crate::parse_table::ParseTable;
use crate::parser::ParseOutcome;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct Analysis {
    pub grammar: GrammarArtifact,
    pub dfa: Vec<DfaStateArtifact>,
    pub parsing_table: TableArtifact,
    pub parse_result: ParseOutcome,
}

impl Analysis {
    pub fn new(
        grammar: &Grammar,
        first_sets: &FirstSets,
        dfa: &Dfa,
        table: &ParseTable,
        parse_result: ParseOutcome,
    ) -> Self {
        Self {
            grammar: GrammarArtifact::new(grammar, first_sets),
            dfa: dfa_artifact(grammar, dfa),
            parsing_table: TableArtifact::new(grammar, table),
            parse_result,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GrammarArtifact {
    pub start_symbol: String,
    pub non_terminals: Vec<String>,
    pub terminals: Vec<String>,
    /// Bodies per head, heads in first-seen order with the augmented start
    /// last, each body as a space-joined string.
    pub productions: IndexMap<String, Vec<String>>,
    pub first: BTreeMap<String, Vec<String>>,
}

impl GrammarArtifact {
    fn new(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        let mut non_terminals: Vec<String> = grammar
            .nonterminals()
            .map(|(_, sym)| sym.name().to_owned())
            .collect();
        non_terminals.sort();

        let mut terminals: Vec<String> = grammar
            .terminals()
            .map(|(_, sym)| sym.name().to_owned())
            .collect();
        if grammar.has_epsilon_prods() {
            terminals.push("ε".to_owned());
        }
        terminals.sort();

        // heads in rule declaration order, the augmented start appended last
        let mut productions: IndexMap<String, Vec<String>> = IndexMap::new();
        for (id, prod) in grammar.prods() {
            if id == ProdID::AUGMENTED {
                continue;
            }
            productions
                .entry(grammar.symbol_name(prod.left()).to_owned())
                .or_default()
                .push(body_names(grammar, prod).join(" "));
        }
        productions.insert(
            grammar.symbol_name(grammar.start_symbol()).to_owned(),
            vec![grammar.symbol_name(grammar.original_start()).to_owned()],
        );

        let mut first: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (id, sym) in grammar.nonterminals() {
            let mut set: Vec<String> = first_sets
                .first(id)
                .into_iter()
                .map(|id| grammar.symbol_name(id).to_owned())
                .collect();
            set.sort();
            first.insert(sym.name().to_owned(), set);
        }

        Self {
            start_symbol: grammar.symbol_name(grammar.start_symbol()).to_owned(),
            non_terminals,
            terminals,
            productions,
            first,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemArtifact {
    pub head: String,
    pub body: Vec<String>,
    pub dot_pos: usize,
    pub search_symbol: String,
}

#[derive(Debug, Serialize)]
pub struct ReductionArtifact {
    pub head: String,
    pub body: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DfaStateArtifact {
    pub id: u64,
    pub items: Vec<ItemArtifact>,
    pub transitions: IndexMap<String, u64>,
    pub reductions: IndexMap<String, ReductionArtifact>,
}

fn dfa_artifact(grammar: &Grammar, dfa: &Dfa) -> Vec<DfaStateArtifact> {
    dfa.states()
        .map(|(id, state)| DfaStateArtifact {
            id: id.raw(),
            items: state
                .items()
                .map(|item| {
                    let prod = grammar.prod(item.prod);
                    ItemArtifact {
                        head: grammar.symbol_name(prod.left()).to_owned(),
                        body: body_names(grammar, prod),
                        dot_pos: item.dot,
                        search_symbol: grammar.symbol_name(item.lookahead).to_owned(),
                    }
                })
                .collect(),
            transitions: state
                .transitions()
                .map(|(symbol, target)| {
                    (grammar.symbol_name(symbol).to_owned(), target.raw())
                })
                .collect(),
            reductions: state
                .reductions()
                .map(|(lookahead, items)| {
                    let prod = grammar.prod(items[0].prod);
                    (
                        grammar.symbol_name(lookahead).to_owned(),
                        ReductionArtifact {
                            head: grammar.symbol_name(prod.left()).to_owned(),
                            body: body_names(grammar, prod),
                        },
                    )
                })
                .collect(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct RuleArtifact {
    pub num: usize,
    pub head: String,
    pub body: Vec<String>,
}

#[derive(Debug)]
pub enum GotoCell {
    State(u64),
    Empty,
}

impl Serialize for GotoCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GotoCell::State(id) => serializer.serialize_u64(*id),
            GotoCell::Empty => serializer.serialize_str(""),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TableArtifact {
    /// Dense rows: every state × every terminal (`ε` excluded, `$` included),
    /// empty cells as `""`.
    pub action: BTreeMap<u64, BTreeMap<String, String>>,
    pub goto: BTreeMap<u64, BTreeMap<String, GotoCell>>,
    pub rules: Vec<RuleArtifact>,
}

impl TableArtifact {
    fn new(grammar: &Grammar, table: &ParseTable) -> Self {
        let mut action: BTreeMap<u64, BTreeMap<String, String>> = BTreeMap::new();
        for (id, row) in table.action_rows() {
            let mut cells = BTreeMap::new();
            for (terminal, _) in grammar.terminals() {
                let cell = row.get(&terminal).map(|a| a.cell()).unwrap_or_default();
                cells.insert(grammar.symbol_name(terminal).to_owned(), cell);
            }
            action.insert(id.raw(), cells);
        }

        let mut goto: BTreeMap<u64, BTreeMap<String, GotoCell>> = BTreeMap::new();
        for (id, row) in table.goto_rows() {
            let mut cells = BTreeMap::new();
            for (nonterminal, _) in grammar.nonterminals() {
                if nonterminal == grammar.start_symbol() {
                    continue;
                }
                let cell = row
                    .get(&nonterminal)
                    .map(|target| GotoCell::State(target.raw()))
                    .unwrap_or(GotoCell::Empty);
                cells.insert(grammar.symbol_name(nonterminal).to_owned(), cell);
            }
            goto.insert(id.raw(), cells);
        }

        let rules = table
            .rules()
            .iter()
            .enumerate()
            .map(|(num, &id)| {
                let prod = grammar.prod(id);
                RuleArtifact {
                    num,
                    head: grammar.symbol_name(prod.left()).to_owned(),
                    body: body_names(grammar, prod),
                }
            })
            .collect();

        Self {
            action,
            goto,
            rules,
        }
    }
}

/// Body symbol names, an ε-production rendered as `["ε"]`.
fn body_names(grammar: &Grammar, prod: &Production) -> Vec<String> {
    if prod.right().is_empty() {
        vec!["ε".to_owned()]
    } else {
        prod.right()
            .iter()
            .map(|&id| grammar.symbol_name(id).to_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goto_cells_render_as_int_or_empty_string() {
        assert_eq!(serde_json::to_string(&GotoCell::State(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&GotoCell::Empty).unwrap(), "\"\"");
    }
}
