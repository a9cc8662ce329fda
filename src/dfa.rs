//! Subset construction of the canonical LR(1) collection.
//!
//! DFA states are ε-closed sets of NFA states. Identity is the frozen set of
//! contained items, so two states that differ only in lookaheads stay
//! distinct (no LALR merging). Ids are assigned in discovery order.

use crate::grammar::{Grammar, SymbolID};
use crate::nfa::{LRItem, Nfa, NfaStateID};
use crate::types::{Map, Queue, Set};
use crate::OversizeError;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DfaStateID {
    raw: u64,
}

impl DfaStateID {
    pub(crate) const START: Self = Self::new(0);

    const fn new(raw: u64) -> Self {
        Self { raw }
    }

    fn index(self) -> usize {
        self.raw as usize
    }

    pub fn raw(self) -> u64 {
        self.raw
    }
}

impl fmt::Display for DfaStateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

#[derive(Debug)]
pub struct DfaState {
    nfa_states: Set<NfaStateID>,
    items: BTreeSet<LRItem>,
    transitions: Map<SymbolID, DfaStateID>,
    reductions: Map<SymbolID, Vec<LRItem>>,
}

impl DfaState {
    /// The frozen item set that is this state's identity.
    pub fn items(&self) -> impl Iterator<Item = &LRItem> + '_ {
        self.items.iter()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (SymbolID, DfaStateID)> + '_ {
        self.transitions.iter().map(|(sym, id)| (*sym, *id))
    }

    /// Reduce bindings `lookahead ↦ items at dot-end`, the augmented
    /// production excluded. More than one item under a lookahead is a
    /// reduce-reduce conflict; the table builder rejects it.
    pub fn reductions(&self) -> impl Iterator<Item = (SymbolID, &[LRItem])> + '_ {
        self.reductions
            .iter()
            .map(|(sym, items)| (*sym, &items[..]))
    }

    pub fn contains(&self, item: &LRItem) -> bool {
        self.items.contains(item)
    }
}

#[derive(Debug)]
pub struct Dfa {
    states: Vec<DfaState>,
}

impl Dfa {
    pub fn build(grammar: &Grammar, nfa: &Nfa) -> Result<Self, OversizeError> {
        Self::build_with_budget(grammar, nfa, crate::DEFAULT_STATE_BUDGET)
    }

    pub fn build_with_budget(
        grammar: &Grammar,
        nfa: &Nfa,
        budget: usize,
    ) -> Result<Self, OversizeError> {
        DfaBuilder {
            grammar,
            nfa,
            states: Vec::new(),
            index: Map::default(),
            budget,
        }
        .build()
    }

    pub fn start(&self) -> DfaStateID {
        DfaStateID::START
    }

    pub fn state(&self, id: DfaStateID) -> &DfaState {
        &self.states[id.index()]
    }

    /// All states, in discovery order (ids are a contiguous prefix of ℕ).
    pub fn states(&self) -> impl Iterator<Item = (DfaStateID, &DfaState)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (DfaStateID::new(i as u64), state))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn display<'g>(&'g self, grammar: &'g Grammar) -> impl fmt::Display + 'g {
        crate::util::display_fn(move |f| {
            for (id, state) in self.states() {
                writeln!(f, "- id: {:02}", id)?;
                writeln!(f, "  items:")?;
                for item in state.items() {
                    writeln!(f, "  - {}", item.display(grammar))?;
                }
                writeln!(f, "  transitions:")?;
                for (symbol, target) in state.transitions() {
                    writeln!(f, "  - {} -> {:02}", grammar.symbol_name(symbol), target)?;
                }
                if !state.reductions.is_empty() {
                    writeln!(f, "  reductions:")?;
                    for (lookahead, items) in state.reductions() {
                        for item in items {
                            writeln!(
                                f,
                                "  - {} => {}",
                                grammar.symbol_name(lookahead),
                                grammar.prod(item.prod).display(grammar)
                            )?;
                        }
                    }
                }
            }
            Ok(())
        })
    }
}

struct DfaBuilder<'g> {
    grammar: &'g Grammar,
    nfa: &'g Nfa,
    states: Vec<DfaState>,
    index: Map<BTreeSet<LRItem>, DfaStateID>,
    budget: usize,
}

impl DfaBuilder<'_> {
    fn build(mut self) -> Result<Dfa, OversizeError> {
        let initial = self.epsilon_closure(Some(self.nfa.start()).into_iter().collect());
        let (start, _) = self.get_or_create(initial)?;
        debug_assert_eq!(start, DfaStateID::START);

        let mut pending: Queue<DfaStateID> = Some(start).into_iter().collect();
        while let Some(id) = pending.pop() {
            let members: Vec<NfaStateID> =
                self.states[id.index()].nfa_states.iter().copied().collect();

            // the symbols labelling any shift edge out of this state,
            // in member order
            let mut symbols: Set<SymbolID> = Set::default();
            for &member in &members {
                if let Some((label, _)) = self.nfa.state(member).shift {
                    symbols.insert(label);
                }
            }

            for &symbol in &symbols {
                let mut move_set: Set<NfaStateID> = Set::default();
                for &member in &members {
                    match self.nfa.state(member).shift {
                        Some((label, target)) if label == symbol => {
                            move_set.insert(target);
                        }
                        _ => {}
                    }
                }

                let closure = self.epsilon_closure(move_set);
                let (target, created) = self.get_or_create(closure)?;
                self.states[id.index()].transitions.insert(symbol, target);
                if created {
                    pending.push(target);
                }
            }
        }

        tracing::debug!(states = self.states.len(), "canonical collection constructed");

        Ok(Dfa {
            states: self.states,
        })
    }

    /// The least superset of `seed` closed under ε-edges.
    fn epsilon_closure(&self, seed: Set<NfaStateID>) -> Set<NfaStateID> {
        let mut closure = seed;
        let mut cursor = 0;
        while cursor < closure.len() {
            let state = *closure.get_index(cursor).expect("cursor is in range");
            cursor += 1;
            for &target in &self.nfa.state(state).closures {
                closure.insert(target);
            }
        }
        closure
    }

    fn get_or_create(
        &mut self,
        nfa_states: Set<NfaStateID>,
    ) -> Result<(DfaStateID, bool), OversizeError> {
        let items: BTreeSet<LRItem> = nfa_states
            .iter()
            .map(|&id| self.nfa.state(id).item)
            .collect();

        if let Some(&id) = self.index.get(&items) {
            return Ok((id, false));
        }
        if self.states.len() >= self.budget {
            return Err(OversizeError {
                stage: "DFA",
                limit: self.budget,
            });
        }

        let mut reductions: Map<SymbolID, Vec<LRItem>> = Map::default();
        for &item in &items {
            if item.is_at_end(self.grammar)
                && self.grammar.prod(item.prod).left() != self.grammar.start_symbol()
            {
                reductions.entry(item.lookahead).or_default().push(item);
            }
        }

        let id = DfaStateID::new(self.states.len() as u64);
        self.states.push(DfaState {
            nfa_states,
            items: items.clone(),
            transitions: Map::default(),
            reductions,
        });
        self.index.insert(items, id);
        Ok((id, true))
    }
}
