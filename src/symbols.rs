use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolKind {
    /// `name:` bound to the program counter.
    Label,
    /// `name = expr` or `name .equ expr`.
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub value: i64,
    pub kind: SymbolKind,
    pub line: usize,
}

/// Labels and constants as populated so far by the parser.
///
/// Lookups here only see names defined earlier in the source; expressions
/// evaluated during parsing go through [`SymbolTable::resolve_partial`].
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`. A second definition of the same name is an error.
    pub fn define(
        &mut self,
        name: &str,
        value: i64,
        kind: SymbolKind,
        line: usize,
    ) -> Result<(), ErrorKind> {
        if self.entries.contains_key(name) {
            return Err(ErrorKind::SymbolRedefined(name.to_string()));
        }
        self.entries
            .insert(name.to_string(), Symbol { value, kind, line });
        Ok(())
    }

    /// Moves every label bound at `from` to `to`. Used when the origin
    /// changes before anything has been emitted.
    pub fn rebase_labels(&mut self, from: i64, to: i64) {
        for sym in self.entries.values_mut() {
            if sym.kind == SymbolKind::Label && sym.value == from {
                sym.value = to;
            }
        }
    }

    pub fn resolve_partial(&self, name: &str) -> Option<i64> {
        self.entries.get(name).map(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closes the table once parsing is complete.
    pub fn freeze(self) -> FinalSymbols {
        FinalSymbols {
            entries: self.entries,
        }
    }
}

/// The complete table handed to the assembler pass. Forward references
/// resolve here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinalSymbols {
    entries: BTreeMap<String, Symbol>,
}

impl FinalSymbols {
    pub fn resolve_final(&self, name: &str) -> Option<i64> {
        self.entries.get(name).map(|s| s.value)
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    /// Symbols in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redefinition_is_rejected() {
        let mut t = SymbolTable::new();
        t.define("start", 0, SymbolKind::Label, 1).unwrap();
        let err = t.define("start", 4, SymbolKind::Label, 3).unwrap_err();
        assert_eq!(err, ErrorKind::SymbolRedefined("start".into()));
        assert_eq!(t.resolve_partial("start"), Some(0));
    }

    #[test]
    fn frozen_table_keeps_entries() {
        let mut t = SymbolTable::new();
        t.define("SIZE", 16, SymbolKind::Constant, 1).unwrap();
        t.define("loop", 0x400, SymbolKind::Label, 2).unwrap();
        let f = t.freeze();
        assert_eq!(f.resolve_final("SIZE"), Some(16));
        assert_eq!(f.resolve_final("loop"), Some(0x400));
        assert_eq!(f.resolve_final("Loop"), None);
        let names: Vec<&str> = f.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["SIZE", "loop"]);
    }

    #[test]
    fn rebase_moves_labels_only() {
        let mut t = SymbolTable::new();
        t.define("start", 0, SymbolKind::Label, 1).unwrap();
        t.define("ZERO", 0, SymbolKind::Constant, 2).unwrap();
        t.rebase_labels(0, 0x400);
        assert_eq!(t.resolve_partial("start"), Some(0x400));
        assert_eq!(t.resolve_partial("ZERO"), Some(0));
    }
}
