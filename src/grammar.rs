//! Grammar types.
//!
//! A grammar is loaded from rule lines of the form `HEAD -> ALT ( | ALT )*`,
//! augmented with a fresh start symbol, and interned so that the later
//! pipeline stages work with cheap copyable ids instead of strings.

use crate::types::Map;
use std::{borrow::Cow, fmt};

const SYMBOL_ID_OFFSET: u64 = 0x2;
const PROD_ID_OFFSET: u64 = 0x1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SymbolID {
    raw: u64,
}

impl SymbolID {
    /// Reserved terminal symbol marking the end of input (`$`).
    pub const EOI: Self = Self::new(0);
    /// Reserved terminal symbol for the empty string (`ε`).
    ///
    /// It never occurs inside a stored production body; it only surfaces in
    /// FIRST sets and in rendered artifacts.
    pub const EPSILON: Self = Self::new(1);

    #[inline]
    const fn new(raw: u64) -> Self {
        assert!(raw < u64::MAX / 2, "too large SymbolID");
        Self { raw }
    }
}

impl fmt::Display for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::EOI => f.write_str("$"),
            &Self::EPSILON => f.write_str("ε"),
            Self { raw } => write!(f, "SymbolID({})", raw),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    name: Cow<'static, str>,
    kind: SymbolKind,
}

impl Symbol {
    const EOI: Self = Self {
        name: Cow::Borrowed("$"),
        kind: SymbolKind::Terminal,
    };
    const EPSILON: Self = Self {
        name: Cow::Borrowed("ε"),
        kind: SymbolKind::Terminal,
    };

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, SymbolKind::Terminal)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProdID {
    raw: u64,
}

impl ProdID {
    /// Reserved id of the augmented-start production `S' → S`.
    pub const AUGMENTED: Self = Self::new(0);

    #[inline]
    const fn new(raw: u64) -> Self {
        assert!(raw < u64::MAX / 2, "too large ProdID");
        Self { raw }
    }
}

impl fmt::Display for ProdID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::AUGMENTED => f.write_str("augmented"),
            Self { raw } => fmt::Display::fmt(raw, f),
        }
    }
}

/// A single production `head → body`.
///
/// An ε-production is stored with an empty body; `ε` itself never appears
/// inside `right`.
#[derive(Debug, Clone)]
pub struct Production {
    left: SymbolID,
    right: Vec<SymbolID>,
}

impl Production {
    pub fn left(&self) -> SymbolID {
        self.left
    }

    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    pub fn display<'g>(&'g self, grammar: &'g Grammar) -> impl fmt::Display + 'g {
        crate::util::display_fn(move |f| {
            write!(f, "{} ->", grammar.symbol_name(self.left))?;
            if self.right.is_empty() {
                f.write_str(" ε")?;
            }
            for symbol in &self.right {
                write!(f, " {}", grammar.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("grammar contains no rule lines")]
    NoRules,

    #[error("rule line {line} has an empty head")]
    EmptyHead { line: usize },
}

/// The grammar definition driving the rest of the pipeline.
///
/// Built once by [`Grammar::load`] and read-only afterwards.
#[derive(Debug)]
pub struct Grammar {
    symbols: Map<SymbolID, Symbol>,
    prods: Map<ProdID, Production>,
    augmented: Production,
    start_symbol: SymbolID,
}

impl Grammar {
    /// Load a grammar from its source text.
    ///
    /// Blank lines and lines without `->` are skipped. The head of the first
    /// rule line becomes the original start symbol; a fresh augmented start
    /// is synthesised by appending `'` to its name (repeatedly, until the
    /// name is unused).
    pub fn load(source: &str) -> Result<Self, GrammarError> {
        // (head, body alternatives), flattened over lines in declaration order
        let mut raw_rules: Vec<(String, Vec<Vec<String>>)> = Vec::new();
        for (lineno, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || !line.contains("->") {
                continue;
            }

            let (head, rest) = line.split_once("->").expect("checked above");
            let head = head.trim();
            if head.is_empty() {
                return Err(GrammarError::EmptyHead { line: lineno + 1 });
            }

            let mut bodies = Vec::new();
            for alt in rest.split('|') {
                let mut tokens: Vec<String> =
                    alt.split_whitespace().map(str::to_owned).collect();
                if tokens.is_empty() || tokens == ["''"] || tokens == ["ε"] {
                    bodies.push(Vec::new());
                } else {
                    // an inline empty-string marker contributes nothing to
                    // the body; only a whole alternative of it means ε
                    if tokens.iter().any(|t| t == "''" || t == "ε") {
                        tracing::warn!(
                            line = lineno + 1,
                            "empty-string marker inside a longer alternative is dropped"
                        );
                        tokens.retain(|t| t != "''" && t != "ε");
                    }
                    bodies.push(tokens);
                }
            }
            raw_rules.push((head.to_owned(), bodies));
        }

        if raw_rules.is_empty() {
            return Err(GrammarError::NoRules);
        }

        let heads: Vec<&str> = raw_rules.iter().map(|(head, _)| head.as_str()).collect();

        let mut symbols: Map<SymbolID, Symbol> = Map::default();
        let mut next_symbol_id = SYMBOL_ID_OFFSET;
        let mut intern = |symbols: &mut Map<SymbolID, Symbol>, name: &str, kind: SymbolKind| {
            if name == "$" {
                return SymbolID::EOI;
            }
            match symbols.iter().find(|(_, sym)| sym.name == name) {
                Some((id, _)) => *id,
                None => {
                    let id = SymbolID::new(next_symbol_id);
                    next_symbol_id += 1;
                    symbols.insert(
                        id,
                        Symbol {
                            name: Cow::Owned(name.to_owned()),
                            kind,
                        },
                    );
                    id
                }
            }
        };

        // Interning in declaration order keeps the symbol table (and with it
        // every downstream artifact) independent of hash iteration order.
        let mut prods: Map<ProdID, Production> = Map::default();
        let mut next_prod_id = PROD_ID_OFFSET;
        for (head, bodies) in &raw_rules {
            let left = intern(&mut symbols, head, SymbolKind::Nonterminal);
            for body in bodies {
                let right: Vec<SymbolID> = body
                    .iter()
                    .map(|token| {
                        let kind = if heads.contains(&token.as_str()) {
                            SymbolKind::Nonterminal
                        } else {
                            SymbolKind::Terminal
                        };
                        intern(&mut symbols, token, kind)
                    })
                    .collect();
                let id = ProdID::new(next_prod_id);
                next_prod_id += 1;
                prods.insert(id, Production { left, right });
            }
        }

        let original_start = intern(&mut symbols, &raw_rules[0].0, SymbolKind::Nonterminal);

        let mut start_name = format!("{}'", raw_rules[0].0);
        while symbols.values().any(|sym| sym.name == start_name) {
            start_name.push('\'');
        }
        let start_symbol = intern(&mut symbols, &start_name, SymbolKind::Nonterminal);

        Ok(Self {
            symbols,
            prods,
            augmented: Production {
                left: start_symbol,
                right: vec![original_start],
            },
            start_symbol,
        })
    }

    /// All symbols of the grammar, `$` included.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolID, &Symbol)> + '_ {
        Some((SymbolID::EOI, &Symbol::EOI))
            .into_iter()
            .chain(self.symbols.iter().map(|(id, sym)| (*id, sym)))
    }

    pub fn terminals(&self) -> impl Iterator<Item = (SymbolID, &Symbol)> + '_ {
        self.symbols().filter(|(_id, sym)| sym.is_terminal())
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = (SymbolID, &Symbol)> + '_ {
        self.symbols().filter(|(_id, sym)| !sym.is_terminal())
    }

    pub fn symbol(&self, id: SymbolID) -> &Symbol {
        match id {
            SymbolID::EOI => &Symbol::EOI,
            SymbolID::EPSILON => &Symbol::EPSILON,
            id => &self.symbols[&id],
        }
    }

    pub fn symbol_name(&self, id: SymbolID) -> &str {
        self.symbol(id).name()
    }

    pub fn symbol_by_name(&self, name: &str) -> Option<SymbolID> {
        self.symbols()
            .find(|(_, sym)| sym.name() == name)
            .map(|(id, _)| id)
    }

    /// The augmented start symbol `S'`.
    pub fn start_symbol(&self) -> SymbolID {
        self.start_symbol
    }

    /// The original start symbol `S`.
    pub fn original_start(&self) -> SymbolID {
        self.augmented.right[0]
    }

    /// All productions, the augmented one first, the rest in declaration order.
    pub fn prods(&self) -> impl Iterator<Item = (ProdID, &Production)> + '_ {
        Some((ProdID::AUGMENTED, &self.augmented))
            .into_iter()
            .chain(self.prods.iter().map(|(id, prod)| (*id, prod)))
    }

    pub fn prod(&self, id: ProdID) -> &Production {
        match id {
            ProdID::AUGMENTED => &self.augmented,
            id => &self.prods[&id],
        }
    }

    /// The productions of `head`, in declaration order.
    pub fn prods_of(&self, head: SymbolID) -> impl Iterator<Item = (ProdID, &Production)> + '_ {
        self.prods().filter(move |(_, prod)| prod.left == head)
    }

    pub fn has_epsilon_prods(&self) -> bool {
        self.prods.values().any(|prod| prod.right.is_empty())
    }

    /// Non-terminals no production body ever mentions (dead rules), the
    /// original start excluded. Reported, never fatal.
    pub fn unreferenced_nonterminals(&self) -> Vec<SymbolID> {
        self.nonterminals()
            .map(|(id, _)| id)
            .filter(|&id| id != self.start_symbol && id != self.original_start())
            .filter(|&id| {
                !self
                    .prods
                    .values()
                    .any(|prod| prod.right.contains(&id))
            })
            .collect()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "terminals:")?;
        for (_, sym) in self.terminals() {
            write!(f, " {}", sym.name())?;
        }
        write!(f, "\nnonterminals:")?;
        for (_, sym) in self.nonterminals() {
            write!(f, " {}", sym.name())?;
        }
        writeln!(f, "\nstart: {}", self.symbol_name(self.start_symbol))?;
        writeln!(f, "productions:")?;
        for (id, prod) in self.prods() {
            writeln!(f, "  [{}] {}", id, prod.display(self))?;
        }
        Ok(())
    }
}
