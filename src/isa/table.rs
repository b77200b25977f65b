//! The mnemonic registry.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::defs::InstrDef;
use super::{arith, bits, control, data, logic};

/// Mnemonic to definition. Built once; cloning gives an independent copy
/// that callers may extend.
#[derive(Debug, Clone, Default)]
pub struct InstrTable {
    defs: HashMap<&'static str, InstrDef>,
}

impl InstrTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `def`. Two definitions of one mnemonic are a bug in the
    /// table itself.
    pub fn insert(&mut self, def: InstrDef) {
        let prev = self.defs.insert(def.mnemonic, def);
        assert!(
            prev.is_none(),
            "duplicate mnemonic {}",
            prev.map(|d| d.mnemonic).unwrap_or_default()
        );
    }

    /// Case-insensitive lookup of a mnemonic without its size suffix.
    pub fn lookup(&self, mnemonic: &str) -> Option<&InstrDef> {
        self.defs.get(mnemonic.to_ascii_uppercase().as_str())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

pub fn build() -> InstrTable {
    let mut t = InstrTable::new();
    arith::register(&mut t);
    logic::register(&mut t);
    bits::register(&mut t);
    data::register(&mut t);
    control::register(&mut t);
    tracing::debug!(mnemonics = t.len(), "instruction table built");
    t
}

/// The shared table, built on first use.
pub fn table() -> &'static InstrTable {
    static TABLE: OnceLock<InstrTable> = OnceLock::new();
    TABLE.get_or_init(build)
}
