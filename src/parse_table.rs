//! ACTION/GOTO table synthesis.
//!
//! Projects the canonical collection onto the two parse tables and fixes the
//! rule numbering reduce entries refer to: rule 0 is the augmented-start
//! production, the rest follow non-terminal heads in sorted name order with
//! bodies in declaration order. Populating an occupied ACTION cell with a
//! different action is fatal; the grammar is not LR(1).

use crate::dfa::{Dfa, DfaStateID};
use crate::grammar::{Grammar, ProdID, SymbolID};
use crate::nfa::LRItem;
use crate::types::Map;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    Shift(DfaStateID),
    Reduce(usize),
    Accept,
}

impl Action {
    /// The cell string of the artifact bundle: `s<id>`, `r<num>` or `acc`.
    pub fn cell(&self) -> String {
        match self {
            Action::Shift(target) => format!("s{}", target),
            Action::Reduce(num) => format!("r{}", num),
            Action::Accept => "acc".to_owned(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConflictError {
    #[error(
        "shift/reduce conflict in state {state} on `{symbol}`: \
         shift {target} vs reduce by rule {rule} ({prod})"
    )]
    ShiftReduce {
        state: DfaStateID,
        symbol: String,
        target: DfaStateID,
        rule: usize,
        prod: String,
    },

    #[error(
        "reduce/reduce conflict in state {state} on `{symbol}`: \
         rule {first} ({first_prod}) vs rule {second} ({second_prod})"
    )]
    ReduceReduce {
        state: DfaStateID,
        symbol: String,
        first: usize,
        first_prod: String,
        second: usize,
        second_prod: String,
    },
}

/// The ACTION/GOTO tables plus the rule list their entries refer to.
#[derive(Debug)]
pub struct ParseTable {
    action: Map<DfaStateID, Map<SymbolID, Action>>,
    goto: Map<DfaStateID, Map<SymbolID, DfaStateID>>,
    rules: Vec<ProdID>,
}

impl ParseTable {
    pub fn generate(grammar: &Grammar, dfa: &Dfa) -> Result<Self, ConflictError> {
        let rules = number_rules(grammar);
        let rule_nums: Map<ProdID, usize> =
            rules.iter().enumerate().map(|(num, &id)| (id, num)).collect();

        let render = |num: usize| grammar.prod(rules[num]).display(grammar).to_string();
        let accept_item = LRItem {
            prod: ProdID::AUGMENTED,
            dot: 1,
            lookahead: SymbolID::EOI,
        };

        let mut action: Map<DfaStateID, Map<SymbolID, Action>> = Map::default();
        let mut goto: Map<DfaStateID, Map<SymbolID, DfaStateID>> = Map::default();

        for (id, state) in dfa.states() {
            let mut action_row: Map<SymbolID, Action> = Map::default();
            let mut goto_row: Map<SymbolID, DfaStateID> = Map::default();

            for (symbol, target) in state.transitions() {
                if grammar.symbol(symbol).is_terminal() {
                    // a fresh row cannot conflict on shifts: one edge per symbol
                    action_row.insert(symbol, Action::Shift(target));
                } else {
                    goto_row.insert(symbol, target);
                }
            }

            for (lookahead, items) in state.reductions() {
                if let [first, second, ..] = items {
                    let first = rule_nums[&first.prod];
                    let second = rule_nums[&second.prod];
                    return Err(ConflictError::ReduceReduce {
                        state: id,
                        symbol: grammar.symbol_name(lookahead).to_owned(),
                        first,
                        first_prod: render(first),
                        second,
                        second_prod: render(second),
                    });
                }
                let rule = rule_nums[&items[0].prod];
                write_cell(grammar, &render, &mut action_row, id, lookahead, Action::Reduce(rule))?;
            }

            if state.contains(&accept_item) {
                write_cell(grammar, &render, &mut action_row, id, SymbolID::EOI, Action::Accept)?;
            }

            action.insert(id, action_row);
            goto.insert(id, goto_row);
        }

        tracing::debug!(states = dfa.len(), rules = rules.len(), "parse table generated");

        Ok(Self {
            action,
            goto,
            rules,
        })
    }

    pub fn action(&self, state: DfaStateID, terminal: SymbolID) -> Option<Action> {
        self.action.get(&state)?.get(&terminal).copied()
    }

    pub fn goto(&self, state: DfaStateID, nonterminal: SymbolID) -> Option<DfaStateID> {
        self.goto.get(&state)?.get(&nonterminal).copied()
    }

    /// Rule list by number; `rules()[0]` is the augmented-start production.
    pub fn rules(&self) -> &[ProdID] {
        &self.rules
    }

    pub fn action_rows(
        &self,
    ) -> impl Iterator<Item = (DfaStateID, &Map<SymbolID, Action>)> + '_ {
        self.action.iter().map(|(id, row)| (*id, row))
    }

    pub fn goto_rows(
        &self,
    ) -> impl Iterator<Item = (DfaStateID, &Map<SymbolID, DfaStateID>)> + '_ {
        self.goto.iter().map(|(id, row)| (*id, row))
    }
}

/// Rule 0 is `S' → S`; the rest iterate heads in sorted name order, bodies in
/// declaration order. Observable through every `r<num>` cell.
fn number_rules(grammar: &Grammar) -> Vec<ProdID> {
    let mut heads: Vec<SymbolID> = grammar
        .nonterminals()
        .map(|(id, _)| id)
        .filter(|&id| id != grammar.start_symbol())
        .collect();
    heads.sort_by(|&a, &b| grammar.symbol_name(a).cmp(grammar.symbol_name(b)));

    let mut rules = vec![ProdID::AUGMENTED];
    for head in heads {
        rules.extend(grammar.prods_of(head).map(|(id, _)| id));
    }
    rules
}

fn write_cell(
    grammar: &Grammar,
    render: &impl Fn(usize) -> String,
    row: &mut Map<SymbolID, Action>,
    state: DfaStateID,
    symbol: SymbolID,
    incoming: Action,
) -> Result<(), ConflictError> {
    let existing = match row.get(&symbol) {
        None => {
            row.insert(symbol, incoming);
            return Ok(());
        }
        Some(&existing) if existing == incoming => return Ok(()),
        Some(&existing) => existing,
    };

    let symbol = grammar.symbol_name(symbol).to_owned();
    // accept is the reduction of rule 0
    let rule_of = |action: Action| match action {
        Action::Reduce(num) => num,
        Action::Accept => 0,
        Action::Shift(..) => unreachable!("two shifts never collide"),
    };

    Err(match (existing, incoming) {
        (Action::Shift(target), other) | (other, Action::Shift(target)) => {
            let rule = rule_of(other);
            ConflictError::ShiftReduce {
                state,
                symbol,
                target,
                rule,
                prod: render(rule),
            }
        }
        (first, second) => {
            let (first, second) = (rule_of(first), rule_of(second));
            ConflictError::ReduceReduce {
                state,
                symbol,
                first,
                first_prod: render(first),
                second,
                second_prod: render(second),
            }
        }
    })
}
