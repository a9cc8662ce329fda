//! The LR(1) item NFA.
//!
//! Each state wraps exactly one LR(1) item. A state carries at most one
//! labelled edge (the shift over the symbol right of the dot) and a set of
//! ε-edges (the closure expansion of a dot-before-nonterminal item). The
//! graph is cyclic, so edges are stored as arena indices and traversal is
//! worklist-driven.

use crate::first_sets::FirstSets;
use crate::grammar::{Grammar, ProdID, SymbolID};
use crate::types::{Map, Queue, Set};
use crate::OversizeError;
use std::fmt;

/// An LR(1) item `[A → α • β, a]`.
///
/// Value identity is the full triple; head and body are recovered through
/// the grammar.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItem {
    pub prod: ProdID,
    pub dot: usize,
    pub lookahead: SymbolID,
}

impl LRItem {
    pub fn initial(grammar: &Grammar) -> Self {
        Self {
            prod: ProdID::AUGMENTED,
            dot: 0,
            lookahead: SymbolID::EOI,
        }
        .assert_valid(grammar)
    }

    fn assert_valid(self, grammar: &Grammar) -> Self {
        debug_assert!(self.dot <= grammar.prod(self.prod).right().len());
        self
    }

    /// The symbol right of the dot, if the dot is not at the end.
    pub fn symbol_after_dot(self, grammar: &Grammar) -> Option<SymbolID> {
        grammar.prod(self.prod).right().get(self.dot).copied()
    }

    pub fn is_at_end(self, grammar: &Grammar) -> bool {
        self.dot >= grammar.prod(self.prod).right().len()
    }

    pub fn display<'g>(self, grammar: &'g Grammar) -> impl fmt::Display + 'g {
        crate::util::display_fn(move |f| {
            let prod = grammar.prod(self.prod);
            write!(f, "[{} ->", grammar.symbol_name(prod.left()))?;
            for (i, &symbol) in prod.right().iter().enumerate() {
                if i == self.dot {
                    f.write_str(" •")?;
                }
                write!(f, " {}", grammar.symbol_name(symbol))?;
            }
            if self.dot == prod.right().len() {
                f.write_str(" •")?;
            }
            write!(f, ", {}]", grammar.symbol_name(self.lookahead))
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NfaStateID {
    raw: u64,
}

impl NfaStateID {
    const fn new(raw: u64) -> Self {
        Self { raw }
    }

    fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for NfaStateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

#[derive(Debug)]
pub struct NfaState {
    pub item: LRItem,
    /// The shift edge over the symbol right of the dot, if any.
    pub shift: Option<(SymbolID, NfaStateID)>,
    /// ε-edges to the closure items.
    pub closures: Set<NfaStateID>,
}

#[derive(Debug)]
pub struct Nfa {
    states: Vec<NfaState>,
    start: NfaStateID,
}

impl Nfa {
    /// Build the item NFA for `grammar`, starting from `[S' → • S, $]`.
    pub fn build(grammar: &Grammar, first_sets: &FirstSets) -> Result<Self, OversizeError> {
        Self::build_with_budget(grammar, first_sets, crate::DEFAULT_STATE_BUDGET)
    }

    pub fn build_with_budget(
        grammar: &Grammar,
        first_sets: &FirstSets,
        budget: usize,
    ) -> Result<Self, OversizeError> {
        NfaBuilder {
            grammar,
            first_sets,
            states: Vec::new(),
            index: Map::default(),
            budget,
        }
        .build()
    }

    pub fn start(&self) -> NfaStateID {
        self.start
    }

    pub fn state(&self, id: NfaStateID) -> &NfaState {
        &self.states[id.index()]
    }

    /// All states, in discovery order.
    pub fn states(&self) -> impl Iterator<Item = (NfaStateID, &NfaState)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (NfaStateID::new(i as u64), state))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

struct NfaBuilder<'g> {
    grammar: &'g Grammar,
    first_sets: &'g FirstSets,
    states: Vec<NfaState>,
    index: Map<LRItem, NfaStateID>,
    budget: usize,
}

impl NfaBuilder<'_> {
    fn build(mut self) -> Result<Nfa, OversizeError> {
        let grammar = self.grammar;

        // every state is enqueued exactly once, on creation; processing a
        // state only reads its own item, so one visit suffices
        let mut pending: Queue<NfaStateID> = Queue::default();
        let (start, _) = self.get_or_create(LRItem::initial(grammar))?;
        pending.push(start);

        while let Some(id) = pending.pop() {
            let item = self.states[id.index()].item;

            let symbol = match item.symbol_after_dot(grammar) {
                Some(symbol) => symbol,
                None => continue,
            };

            // shift edge over the symbol right of the dot
            let shifted = LRItem {
                dot: item.dot + 1,
                ..item
            };
            let (target, created) = self.get_or_create(shifted)?;
            self.states[id.index()].shift = Some((symbol, target));
            if created {
                pending.push(target);
            }

            // closure edges when that symbol is a nonterminal
            if self.grammar.symbol(symbol).is_terminal() {
                continue;
            }
            let beta = &grammar.prod(item.prod).right()[item.dot + 1..];
            let lookaheads = self.first_sets.first_of_sequence(beta, item.lookahead);
            for (prod_id, _) in grammar.prods_of(symbol) {
                for &lookahead in &lookaheads {
                    let closure_item = LRItem {
                        prod: prod_id,
                        dot: 0,
                        lookahead,
                    };
                    let (target, created) = self.get_or_create(closure_item)?;
                    self.states[id.index()].closures.insert(target);
                    if created {
                        pending.push(target);
                    }
                }
            }
        }

        tracing::debug!(states = self.states.len(), "item NFA constructed");

        Ok(Nfa {
            states: self.states,
            start,
        })
    }

    fn get_or_create(&mut self, item: LRItem) -> Result<(NfaStateID, bool), OversizeError> {
        if let Some(&id) = self.index.get(&item) {
            return Ok((id, false));
        }
        if self.states.len() >= self.budget {
            return Err(OversizeError {
                stage: "item NFA",
                limit: self.budget,
            });
        }
        let id = NfaStateID::new(self.states.len() as u64);
        self.states.push(NfaState {
            item,
            shift: None,
            closures: Set::default(),
        });
        self.index.insert(item, id);
        Ok((id, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(source: &str) -> (Grammar, FirstSets, Nfa) {
        let grammar = Grammar::load(source).unwrap();
        let first_sets = FirstSets::new(&grammar);
        let nfa = Nfa::build(&grammar, &first_sets).unwrap();
        (grammar, first_sets, nfa)
    }

    #[test]
    fn single_terminal_grammar() {
        let (grammar, _, nfa) = build("S -> a");

        // [S' -> • S, $], [S' -> S •, $], [S -> • a, $], [S -> a •, $]
        assert_eq!(nfa.len(), 4);

        let start = nfa.state(nfa.start());
        assert_eq!(start.item, LRItem::initial(&grammar));
        let (label, _) = start.shift.expect("shift over S");
        assert_eq!(grammar.symbol_name(label), "S");
        assert_eq!(start.closures.len(), 1);

        let closure = *start.closures.iter().next().unwrap();
        let closure = nfa.state(closure);
        assert_eq!(closure.item.dot, 0);
        assert_eq!(closure.item.lookahead, SymbolID::EOI);
        assert!(closure.closures.is_empty());
    }

    #[test]
    fn closure_lookaheads_from_first_of_beta_a() {
        // after [S -> • C C, $], the first C expands with lookaheads First(C $) = {c, d}
        let (grammar, _, nfa) = build("S -> C C\nC -> c C | d");

        let start = nfa.state(nfa.start());
        let s_item = *start.closures.iter().next().unwrap();
        let s_state = nfa.state(s_item);

        let mut lookaheads: Vec<String> = s_state
            .closures
            .iter()
            .map(|&id| grammar.symbol_name(nfa.state(id).item.lookahead).to_owned())
            .collect();
        lookaheads.sort();
        lookaheads.dedup();
        assert_eq!(lookaheads, ["c", "d"]);

        // two productions of C × two lookaheads
        assert_eq!(s_state.closures.len(), 4);
    }

    #[test]
    fn items_are_memoised() {
        let (_, _, nfa) = build("E -> E + T | T\nT -> id");
        let mut seen = std::collections::HashSet::new();
        for (_, state) in nfa.states() {
            assert!(seen.insert(state.item), "duplicate item state");
        }
    }

    #[test]
    fn rebuild_is_deterministic() {
        let grammar = Grammar::load("E -> E + T | T\nT -> id").unwrap();
        let first_sets = FirstSets::new(&grammar);
        let a = Nfa::build(&grammar, &first_sets).unwrap();
        let b = Nfa::build(&grammar, &first_sets).unwrap();
        let items_a: Vec<_> = a.states().map(|(_, s)| s.item).collect();
        let items_b: Vec<_> = b.states().map(|(_, s)| s.item).collect();
        assert_eq!(items_a, items_b);
    }

    #[test]
    fn budget_is_enforced() {
        let grammar = Grammar::load("E -> E + T | T\nT -> id").unwrap();
        let first_sets = FirstSets::new(&grammar);
        let err = Nfa::build_with_budget(&grammar, &first_sets, 3).unwrap_err();
        assert_eq!(err.limit, 3);
    }
}
