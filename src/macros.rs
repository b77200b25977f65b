//! `.macro` definitions and textual expansion.

use std::collections::HashMap;

use crate::error::ErrorKind;
use crate::lexer::{Token, TokenKind};

/// Nesting limit for macro invocations inside macro bodies.
pub const MAX_EXPANSION_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    /// Body tokens as written, newlines included, without the closing
    /// `.endmacro`.
    pub body: Vec<Token>,
}

impl MacroDef {
    /// Substitutes `args` for the parameters positionally. Every produced
    /// token is stamped with `line` so diagnostics point at the invocation.
    pub fn expand(&self, args: &[Vec<Token>], line: usize) -> Result<Vec<Token>, ErrorKind> {
        if args.len() != self.params.len() {
            return Err(ErrorKind::MacroArity {
                name: self.name.clone(),
                expected: self.params.len(),
                got: args.len(),
            });
        }
        let mut out = Vec::with_capacity(self.body.len());
        for tok in &self.body {
            let param = (tok.kind == TokenKind::Ident)
                .then(|| self.params.iter().position(|p| *p == tok.text))
                .flatten();
            match param {
                Some(i) => out.extend(args[i].iter().map(|a| restamp(a, line))),
                None => out.push(restamp(tok, line)),
            }
        }
        Ok(out)
    }
}

fn restamp(tok: &Token, line: usize) -> Token {
    let mut t = tok.clone();
    t.line = line;
    t
}

/// Macros defined so far, looked up case-insensitively like mnemonics.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    defs: HashMap<String, MacroDef>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, def: MacroDef) -> Result<(), ErrorKind> {
        let key = def.name.to_ascii_uppercase();
        if self.defs.contains_key(&key) {
            return Err(ErrorKind::MacroRedefined(def.name));
        }
        self.defs.insert(key, def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.defs.get(&name.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
