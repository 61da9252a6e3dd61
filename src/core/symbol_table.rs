// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Symbol table with forward references.
//!
//! Symbols are unique by name. A reference to a not-yet-defined name
//! creates an undefined stub holding only a back-fill list: the core
//! addresses whose operand field must be overwritten once the name
//! resolves. Aliases resolve in exactly one hop; defining an alias whose
//! target is itself an alias is rejected.
//!
//! Entries keep insertion order so the back-fill pass and the symbol dump
//! are deterministic.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("{0}: already defined")]
    Redefined(String),
    #[error("{new}: alias target {target} is itself an alias")]
    AliasChain { new: String, target: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    /// A resolved location in core.
    Address(i64),
    /// A resolved integer value.
    Constant(i64),
    /// Another name; never chains to a second alias.
    Alias(String),
    /// Referenced but not yet defined.
    Undefined,
}

impl SymbolKind {
    pub fn describe(&self) -> &'static str {
        match self {
            SymbolKind::Address(_) => "address",
            SymbolKind::Constant(_) => "constant",
            SymbolKind::Alias(_) => "alias",
            SymbolKind::Undefined => "undefined",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    /// Source line of the definition; 0 while undefined.
    pub line: u32,
    pub kind: SymbolKind,
    /// Core addresses whose primary value is patched when this resolves.
    pub backfill: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    index: HashMap<String, usize>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_constant(
        &mut self,
        name: &str,
        line: u32,
        value: i64,
    ) -> Result<(), SymbolError> {
        self.define(name, line, SymbolKind::Constant(value))
    }

    pub fn define_address(&mut self, name: &str, line: u32, addr: i64) -> Result<(), SymbolError> {
        self.define(name, line, SymbolKind::Address(addr))
    }

    pub fn define_alias(&mut self, name: &str, line: u32, target: &str) -> Result<(), SymbolError> {
        if let Some(sym) = self.get(target) {
            if matches!(sym.kind, SymbolKind::Alias(_)) {
                return Err(SymbolError::AliasChain {
                    new: name.to_string(),
                    target: target.to_string(),
                });
            }
        }
        self.define(name, line, SymbolKind::Alias(target.to_string()))
    }

    /// Insert or upgrade an undefined stub; any other existing kind is a
    /// redefinition.
    fn define(&mut self, name: &str, line: u32, kind: SymbolKind) -> Result<(), SymbolError> {
        match self.index.get(name) {
            Some(&idx) => {
                let sym = &mut self.symbols[idx];
                if sym.kind != SymbolKind::Undefined {
                    return Err(SymbolError::Redefined(name.to_string()));
                }
                sym.kind = kind;
                sym.line = line;
                Ok(())
            }
            None => {
                self.insert(Symbol {
                    name: name.to_string(),
                    line,
                    kind,
                    backfill: Vec::new(),
                });
                Ok(())
            }
        }
    }

    /// Record a core address to patch once `name` resolves.
    pub fn add_reference(&mut self, name: &str, addr: usize) {
        match self.index.get(name) {
            Some(&idx) => self.symbols[idx].backfill.push(addr),
            None => self.insert(Symbol {
                name: name.to_string(),
                line: 0,
                kind: SymbolKind::Undefined,
                backfill: vec![addr],
            }),
        }
    }

    /// One-hop dereference through aliases. Undefined names (and aliases of
    /// undefined names) resolve to `None`.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let sym = self.get(name)?;
        let sym = match &sym.kind {
            SymbolKind::Alias(target) => self.get(target)?,
            _ => sym,
        };
        match sym.kind {
            SymbolKind::Undefined => None,
            _ => Some(sym),
        }
    }

    /// The numeric payload a back-fill write would use.
    pub fn resolved_value(&self, name: &str) -> Option<i64> {
        match self.lookup(name)?.kind {
            SymbolKind::Address(addr) => Some(addr),
            SymbolKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Snapshot of the constant subset, for the `OF` evaluator.
    pub fn environment(&self) -> HashMap<String, i64> {
        self.symbols
            .iter()
            .filter_map(|sym| match sym.kind {
                SymbolKind::Constant(value) => Some((sym.name.clone(), value)),
                _ => None,
            })
            .collect()
    }

    /// All symbols in insertion order.
    pub fn entries(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Names that are still undefined after emission (aliases of undefined
    /// targets included), in insertion order.
    pub fn undefined(&self) -> Vec<&Symbol> {
        self.symbols
            .iter()
            .filter(|sym| match &sym.kind {
                SymbolKind::Undefined => true,
                SymbolKind::Alias(target) => self.lookup(target).is_none(),
                _ => false,
            })
            .collect()
    }

    fn get(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&idx| &self.symbols[idx])
    }

    fn insert(&mut self, sym: Symbol) {
        self.index.insert(sym.name.clone(), self.symbols.len());
        self.symbols.push(sym);
    }
}

#[cfg(test)]
mod tests {
    use super::{SymbolError, SymbolKind, SymbolTable};

    #[test]
    fn define_and_lookup() {
        let mut st = SymbolTable::new();
        st.define_constant("LCH", 0, 1).expect("define");
        st.define_address("BEGIN", 4, 10).expect("define");
        assert_eq!(st.lookup("LCH").map(|s| &s.kind), Some(&SymbolKind::Constant(1)));
        assert_eq!(st.resolved_value("BEGIN"), Some(10));
    }

    #[test]
    fn redefinition_is_rejected() {
        let mut st = SymbolTable::new();
        st.define_constant("N", 1, 1).expect("define");
        assert_eq!(
            st.define_constant("N", 2, 2),
            Err(SymbolError::Redefined("N".to_string()))
        );
        assert_eq!(
            st.define_address("N", 2, 5),
            Err(SymbolError::Redefined("N".to_string()))
        );
    }

    #[test]
    fn reference_creates_stub_and_definition_upgrades_it() {
        let mut st = SymbolTable::new();
        st.add_reference("L1", 3);
        st.add_reference("L1", 9);
        assert!(st.lookup("L1").is_none());
        st.define_address("L1", 7, 42).expect("upgrade");
        let sym = st.lookup("L1").expect("resolved");
        assert_eq!(sym.kind, SymbolKind::Address(42));
        assert_eq!(sym.backfill, vec![3, 9]);
    }

    #[test]
    fn alias_resolves_in_one_hop() {
        let mut st = SymbolTable::new();
        st.define_address("V", 1, 5).expect("define");
        st.define_alias("W", 2, "V").expect("alias");
        assert_eq!(st.resolved_value("W"), Some(5));
    }

    #[test]
    fn alias_of_alias_is_rejected() {
        let mut st = SymbolTable::new();
        st.define_address("V", 1, 5).expect("define");
        st.define_alias("W", 2, "V").expect("alias");
        assert_eq!(
            st.define_alias("U", 3, "W"),
            Err(SymbolError::AliasChain {
                new: "U".to_string(),
                target: "W".to_string(),
            })
        );
    }

    #[test]
    fn environment_contains_only_constants() {
        let mut st = SymbolTable::new();
        st.define_constant("LCH", 0, 1).expect("define");
        st.define_address("BEGIN", 1, 9).expect("define");
        let env = st.environment();
        assert_eq!(env.get("LCH"), Some(&1));
        assert!(!env.contains_key("BEGIN"));
    }

    #[test]
    fn undefined_reports_unresolved_stubs_and_dangling_aliases() {
        let mut st = SymbolTable::new();
        st.add_reference("MISSING", 1);
        st.define_alias("DANGLE", 2, "NOWHERE").expect("alias");
        st.define_address("OK", 3, 1).expect("define");
        let names: Vec<&str> = st.undefined().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["MISSING", "DANGLE"]);
    }
}
