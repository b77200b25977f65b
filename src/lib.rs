pub mod error;
pub mod lexer;
pub mod symbols;
pub mod expr;
pub mod macros;
pub mod ea;
pub mod operand;
pub mod parser;
pub mod assembler;

pub mod isa {
    pub mod defs;
    pub mod table;
    pub mod validate;
    // mnemonic families
    mod arith;
    mod bits;
    mod control;
    mod data;
    mod logic;
}

pub use assembler::{AsmConfig, Assembler, Assembly, ListingEntry, MAX_PROGRAM_SIZE};
pub use error::{AsmError, ErrorKind};
pub use isa::table::{table, InstrTable};
pub use parser::{Item, Program};
pub use symbols::FinalSymbols;

/// Assembles `source` with the default configuration.
pub fn assemble(source: &str) -> Result<Assembly, AsmError> {
    Assembler::new().assemble(source)
}
