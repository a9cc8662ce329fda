//! Calculation of the FIRST set function.

use crate::grammar::{Grammar, SymbolID};
use crate::types::{Map, Set};

/// FIRST sets of every grammar symbol, computed once per grammar.
///
/// Nullability is tracked separately from the terminal sets, so the map
/// values never contain `ε`; [`FirstSets::first`] folds the two back
/// together for callers that want the textbook definition.
#[derive(Debug)]
pub struct FirstSets {
    nulls: Set<SymbolID>,
    map: Map<SymbolID, Set<SymbolID>>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let nulls = nulls_set(grammar);

        let mut map: Map<SymbolID, Set<SymbolID>> = Map::default();
        for (id, _) in grammar.terminals() {
            map.insert(id, Some(id).into_iter().collect());
        }
        for (id, _) in grammar.nonterminals() {
            map.insert(id, Set::default());
        }

        // For X -> Y1 Y2 ... Yn, each Yi up to and including the first
        // non-nullable one yields the constraint First(X) ⊇ First(Yi).
        struct Constraint {
            sup: SymbolID,
            sub: SymbolID,
        }
        let mut constraints = vec![];
        for (_, prod) in grammar.prods() {
            for &symbol in prod.right() {
                if prod.left() != symbol {
                    constraints.push(Constraint {
                        sup: prod.left(),
                        sub: symbol,
                    });
                }
                if !nulls.contains(&symbol) {
                    break;
                }
            }
        }

        // Keep propagating until no constraint adds anything.
        let mut changed = true;
        while changed {
            changed = false;
            for Constraint { sup, sub } in &constraints {
                let mut superset = map.swap_remove(sup).expect("every symbol is mapped");
                let subset = map.get(sub).expect("every symbol is mapped");
                for &tok in subset {
                    if !superset.contains(&tok) {
                        superset.insert(tok);
                        changed = true;
                    }
                }
                map.insert(*sup, superset);
            }
        }

        Self { nulls, map }
    }

    /// `First(X)` as in the textbook definition: `ε` included when `X` can
    /// derive the empty string.
    pub fn first(&self, symbol: SymbolID) -> Set<SymbolID> {
        if symbol == SymbolID::EPSILON {
            return Some(SymbolID::EPSILON).into_iter().collect();
        }
        let mut res = self.map.get(&symbol).cloned().unwrap_or_default();
        if self.nulls.contains(&symbol) {
            res.insert(SymbolID::EPSILON);
        }
        res
    }

    /// `First(prefix x)` with `ε` removed.
    ///
    /// The closure step of the item-NFA builder wants the lookahead set
    /// `First(β a) \ {ε}`, and since `a` is always a terminal the sequence
    /// never vanishes entirely.
    pub fn first_of_sequence(&self, prefix: &[SymbolID], x: SymbolID) -> Set<SymbolID> {
        let mut res = Set::default();
        for token in prefix.iter().chain(Some(&x)) {
            if let Some(added) = self.map.get(token) {
                res.extend(added.iter().copied());
            }
            if !self.nulls.contains(token) {
                break;
            }
        }
        res
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        self.nulls.contains(&symbol)
    }
}

/// The set of nullable non-terminals, by fixed-point iteration.
fn nulls_set(grammar: &Grammar) -> Set<SymbolID> {
    let mut nulls: Set<SymbolID> = grammar
        .prods()
        .filter_map(|(_, prod)| prod.right().is_empty().then_some(prod.left()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for (_, prod) in grammar.prods() {
            if nulls.contains(&prod.left()) {
                continue;
            }
            if prod.right().iter().all(|sym| nulls.contains(sym)) {
                changed = true;
                nulls.insert(prod.left());
            }
        }
    }

    nulls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_names(grammar: &Grammar, sets: &FirstSets, name: &str) -> Vec<String> {
        let id = grammar
            .symbols()
            .find(|(_, sym)| sym.name() == name)
            .map(|(id, _)| id)
            .unwrap();
        let mut names: Vec<String> = sets
            .first(id)
            .into_iter()
            .map(|id| grammar.symbol_name(id).to_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn base_cases() {
        let grammar = Grammar::load("S -> a S b | ''").unwrap();
        let sets = FirstSets::new(&grammar);

        // First(t) = {t} for terminals, First(ε) = {ε}
        assert_eq!(first_names(&grammar, &sets, "a"), ["a"]);
        assert_eq!(first_names(&grammar, &sets, "$"), ["$"]);
        assert_eq!(
            sets.first(SymbolID::EPSILON).into_iter().collect::<Vec<_>>(),
            [SymbolID::EPSILON]
        );
    }

    #[test]
    fn nullable_nonterminal_admits_epsilon() {
        let grammar = Grammar::load("S -> a S b | ''").unwrap();
        let sets = FirstSets::new(&grammar);
        assert_eq!(first_names(&grammar, &sets, "S"), ["a", "ε"]);
        assert!(sets.is_nullable(grammar.original_start()));
    }

    #[test]
    fn left_recursion_terminates() {
        let grammar = Grammar::load(
            "\
E -> E + T | T
T -> T * F | F
F -> ( E ) | id
",
        )
        .unwrap();
        let sets = FirstSets::new(&grammar);
        assert_eq!(first_names(&grammar, &sets, "E"), ["(", "id"]);
        assert_eq!(first_names(&grammar, &sets, "T"), ["(", "id"]);
        assert_eq!(first_names(&grammar, &sets, "F"), ["(", "id"]);
    }

    #[test]
    fn nullable_chain_reaches_later_symbols() {
        let grammar = Grammar::load(
            "\
S -> A B c
A -> a | ''
B -> b | ''
",
        )
        .unwrap();
        let sets = FirstSets::new(&grammar);
        assert_eq!(first_names(&grammar, &sets, "S"), ["a", "b", "c"]);

        // sequence form, with the trailing lookahead
        let a = grammar
            .symbols()
            .find(|(_, sym)| sym.name() == "A")
            .map(|(id, _)| id)
            .unwrap();
        let b = grammar
            .symbols()
            .find(|(_, sym)| sym.name() == "B")
            .map(|(id, _)| id)
            .unwrap();
        let seq = sets.first_of_sequence(&[a, b], SymbolID::EOI);
        let mut names: Vec<_> = seq
            .into_iter()
            .map(|id| grammar.symbol_name(id).to_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["$", "a", "b"]);
    }
}
