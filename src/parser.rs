//! First pass: statements to program items with assigned addresses.
//!
//! The parser reads one statement at a time (`[label:] body`), expands
//! macro invocations by splicing their tokens in front of the remaining
//! input, evaluates directive expressions against the symbols defined so
//! far, and selects an instruction form from operand syntax alone. The
//! byte length of every item is known here, so addresses never move
//! after this pass.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::assembler::AsmConfig;
use crate::ea::EaExpr;
use crate::error::{AsmError, ErrorKind};
use crate::expr::{describe, evaluate_tokens, EvalContext, TokenSource};
use crate::isa::defs::{Args, FormDef, InstrDef, OperandKind, Size, Sizes};
use crate::isa::table::InstrTable;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::macros::{MacroDef, MacroTable, MAX_EXPANSION_DEPTH};
use crate::operand::{parse_operand, split_operands, Operand, Reg, RegMask};
use crate::symbols::{FinalSymbols, SymbolKind, SymbolTable};

#[derive(Debug, Clone)]
pub enum Item<'t> {
    Instruction {
        def: &'t InstrDef,
        form: &'t FormDef,
        args: Args,
        pc: u32,
        line: usize,
    },
    Data {
        bytes: Vec<u8>,
        pc: u32,
        line: usize,
    },
}

impl Item<'_> {
    pub fn pc(&self) -> u32 {
        match self {
            Item::Instruction { pc, .. } | Item::Data { pc, .. } => *pc,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Item::Instruction { line, .. } | Item::Data { line, .. } => *line,
        }
    }
}

/// Output of the first pass, consumed by [`crate::assembler::Assembler::encode`].
#[derive(Debug, Clone)]
pub struct Program<'t> {
    pub items: Vec<Item<'t>>,
    pub labels: FinalSymbols,
    pub origin: u32,
}

/// Tokens from the lexer, preceded by any spliced macro expansion. Each
/// token carries the macro nesting depth it was produced at.
struct TokenStream {
    lexer: Lexer,
    pending: VecDeque<(Token, usize)>,
}

impl TokenStream {
    fn next_with_depth(&mut self) -> (Token, usize) {
        match self.pending.pop_front() {
            Some(entry) => entry,
            None => (self.lexer.next(), 0),
        }
    }

    fn splice(&mut self, toks: Vec<Token>, depth: usize) {
        for tok in toks.into_iter().rev() {
            self.pending.push_front((tok, depth));
        }
    }
}

impl TokenSource for TokenStream {
    fn peek(&mut self) -> &Token {
        match self.pending.front() {
            Some((tok, _)) => tok,
            None => self.lexer.peek(),
        }
    }

    fn next(&mut self) -> Token {
        self.next_with_depth().0
    }
}

pub struct Parser<'src, 't> {
    source: &'src str,
    table: &'t InstrTable,
    config: AsmConfig,
    stream: TokenStream,
    symbols: SymbolTable,
    macros: MacroTable,
    items: Vec<Item<'t>>,
    pc: u32,
    origin: u32,
}

impl<'src, 't> Parser<'src, 't> {
    pub fn new(source: &'src str, table: &'t InstrTable, config: AsmConfig) -> Self {
        Self {
            source,
            table,
            config,
            stream: TokenStream {
                lexer: Lexer::new(source),
                pending: VecDeque::new(),
            },
            symbols: SymbolTable::new(),
            macros: MacroTable::new(),
            items: Vec::new(),
            pc: config.origin,
            origin: config.origin,
        }
    }

    pub fn parse(mut self) -> Result<Program<'t>, AsmError> {
        match self.run() {
            Ok(()) => {
                debug!(
                    items = self.items.len(),
                    symbols = self.symbols.len(),
                    macros = self.macros.len(),
                    origin = self.origin,
                    end = self.pc,
                    "first pass complete"
                );
                Ok(Program {
                    items: self.items,
                    labels: self.symbols.freeze(),
                    origin: self.origin,
                })
            }
            Err(err) => Err(err.with_source(self.source)),
        }
    }

    fn run(&mut self) -> Result<(), AsmError> {
        loop {
            let (first, depth) = self.stream.next_with_depth();
            match first.kind {
                TokenKind::Eof => return Ok(()),
                TokenKind::Newline => continue,
                _ => {}
            }
            let mut stmt = vec![first];
            while !self.stream.peek().ends_statement() {
                stmt.push(self.stream.next());
            }
            if self.stream.peek().is(TokenKind::Newline) {
                self.stream.next();
            }
            if let Some(bad) = stmt.iter().find(|t| t.is(TokenKind::Error)) {
                return Err(at(bad, ErrorKind::Lexical(bad.text.clone())));
            }
            self.statement(&stmt, depth)?;
        }
    }

    fn statement(&mut self, mut toks: &[Token], depth: usize) -> Result<(), AsmError> {
        while let [name, colon, rest @ ..] = toks {
            if !(name.is(TokenKind::Ident) && colon.is(TokenKind::Colon)) {
                break;
            }
            trace!(label = %name.text, pc = self.pc, "label");
            self.symbols
                .define(&name.text, self.pc as i64, SymbolKind::Label, name.line)
                .map_err(|k| at(name, k))?;
            toks = rest;
        }
        let Some(head) = toks.first() else {
            return Ok(());
        };
        if !head.is(TokenKind::Ident) {
            return Err(at(head, ErrorKind::syntax(format!("expected statement, found {}", describe(head)))));
        }

        if let Some(second) = toks.get(1) {
            if second.is(TokenKind::Assign) || second.is_ident(".equ") {
                return self.constant(head, second, &toks[2..]);
            }
        }

        let rest = &toks[1..];
        if head.text.starts_with('.') {
            return self.directive(head, rest);
        }
        if let Some(def) = self.macros.get(&head.text).cloned() {
            return self.invoke(def, head, rest, depth);
        }
        self.instruction(head, rest)
    }

    fn constant(&mut self, name: &Token, op: &Token, expr: &[Token]) -> Result<(), AsmError> {
        if expr.is_empty() {
            return Err(at(op, ErrorKind::syntax(format!("expected expression after {}", describe(op)))));
        }
        let value = self.eval_all(expr)?;
        trace!(name = %name.text, value, "constant");
        self.symbols
            .define(&name.text, value, SymbolKind::Constant, name.line)
            .map_err(|k| at(name, k))
    }

    fn directive(&mut self, head: &Token, rest: &[Token]) -> Result<(), AsmError> {
        match head.text.to_ascii_lowercase().as_str() {
            ".org" => {
                let target = self.eval_all_or(head, rest)?;
                self.org(head, target)
            }
            ".byte" => self.data(head, rest, 1),
            ".word" => self.data(head, rest, 2),
            ".long" => self.data(head, rest, 4),
            ".align" => {
                let parts = split_operands(rest);
                let (n_toks, fill) = match parts.as_slice() {
                    [n] => (*n, 0),
                    [n, fill] => (*n, self.eval_part(fill, head)?),
                    _ => return Err(at(head, ErrorKind::syntax(".align takes a boundary and an optional fill byte"))),
                };
                let n = self.eval_part(n_toks, head)?;
                if n <= 0 {
                    return Err(at(head, ErrorKind::range("alignment", n, 1, self.config.max_program_size as i64)));
                }
                let fill = ErrorKind::check_range("fill byte", fill, -128, 255).map_err(|k| at(head, k))?;
                let gap = (n - self.pc as i64 % n) % n;
                self.pad(head, gap, fill as u8)
            }
            ".even" => {
                if let Some(t) = rest.first() {
                    return Err(at(t, ErrorKind::syntax(".even takes no operands")));
                }
                self.pad(head, (self.pc % 2) as i64, 0)
            }
            ".macro" => self.define_macro(head, rest),
            ".endmacro" | ".endm" => Err(at(head, ErrorKind::syntax(".endmacro without .macro"))),
            _ => Err(at(head, ErrorKind::syntax(format!("unknown directive `{}`", head.text)))),
        }
    }

    fn org(&mut self, head: &Token, target: i64) -> Result<(), AsmError> {
        if target < 0 {
            return Err(at(head, ErrorKind::BackwardOrigin { target: target as u64, pc: self.pc }));
        }
        self.check_end(head, target as u64)?;
        if self.items.is_empty() {
            // Nothing emitted yet: the image simply starts here.
            debug!(origin = target, "origin set");
            self.symbols.rebase_labels(self.origin as i64, target);
            self.origin = target as u32;
            self.pc = target as u32;
            return Ok(());
        }
        if (target as u64) < self.pc as u64 {
            return Err(at(head, ErrorKind::BackwardOrigin { target: target as u64, pc: self.pc }));
        }
        self.pad(head, target - self.pc as i64, 0)
    }

    fn pad(&mut self, head: &Token, count: i64, fill: u8) -> Result<(), AsmError> {
        if count <= 0 {
            return Ok(());
        }
        self.check_end(head, self.pc as u64 + count as u64)?;
        self.push_data(head.line, vec![fill; count as usize]);
        Ok(())
    }

    fn data(&mut self, head: &Token, rest: &[Token], width: usize) -> Result<(), AsmError> {
        let parts = split_operands(rest);
        if parts.is_empty() {
            return Err(at(head, ErrorKind::syntax(format!("{} needs at least one value", head.text))));
        }
        let mut bytes = Vec::new();
        for part in parts {
            if let [s] = part {
                if s.is(TokenKind::Str) {
                    if width != 1 {
                        return Err(at(s, ErrorKind::syntax("strings are only allowed in .byte")));
                    }
                    for c in s.text.chars() {
                        let code = u8::try_from(c as u32)
                            .map_err(|_| at(s, ErrorKind::range("string character", c as i64, 0, 255)))?;
                        bytes.push(code);
                    }
                    continue;
                }
            }
            let v = self.eval_part(part, head)?;
            let anchor = part.first().unwrap_or(head);
            let (what, min, max) = match width {
                1 => ("byte value", -128, 255),
                2 => ("word value", -32768, 65535),
                _ => ("long value", i32::MIN as i64, u32::MAX as i64),
            };
            let v = ErrorKind::check_range(what, v, min, max).map_err(|k| at(anchor, k))?;
            bytes.extend_from_slice(&(v as u32).to_be_bytes()[4 - width..]);
        }
        self.check_end(head, self.pc as u64 + bytes.len() as u64)?;
        self.push_data(head.line, bytes);
        Ok(())
    }

    fn push_data(&mut self, line: usize, bytes: Vec<u8>) {
        let pc = self.pc;
        self.pc += bytes.len() as u32;
        trace!(line, pc, len = bytes.len(), "data");
        self.items.push(Item::Data { bytes, pc, line });
    }

    /// Rejects any item that would end beyond the configured maximum.
    fn check_end(&self, anchor: &Token, end: u64) -> Result<(), AsmError> {
        if end > self.config.max_program_size as u64 {
            return Err(at(
                anchor,
                ErrorKind::ProgramSizeExceeded {
                    addr: end,
                    max: self.config.max_program_size,
                },
            ));
        }
        Ok(())
    }

    fn define_macro(&mut self, head: &Token, rest: &[Token]) -> Result<(), AsmError> {
        let Some((name, params)) = rest.split_first() else {
            return Err(at(head, ErrorKind::syntax(".macro needs a name")));
        };
        if !name.is(TokenKind::Ident) {
            return Err(at(name, ErrorKind::syntax(format!("expected macro name, found {}", describe(name)))));
        }
        let mut names = Vec::new();
        for part in split_operands(params) {
            match part {
                [p] if p.is(TokenKind::Ident) => names.push(p.text.clone()),
                [p, ..] => return Err(at(p, ErrorKind::syntax("macro parameters must be plain names"))),
                [] => return Err(at(name, ErrorKind::syntax("empty macro parameter"))),
            }
        }

        let mut body = Vec::new();
        let mut line_start = true;
        loop {
            let tok = self.stream.next();
            if tok.is(TokenKind::Eof) {
                return Err(at(head, ErrorKind::syntax(format!("missing .endmacro for `{}`", name.text))));
            }
            if line_start && (tok.is_ident(".endmacro") || tok.is_ident(".endm")) {
                if !self.stream.peek().ends_statement() {
                    let extra = self.stream.next();
                    return Err(at(&extra, ErrorKind::syntax(".endmacro takes no operands")));
                }
                break;
            }
            if line_start && tok.is_ident(".macro") {
                return Err(at(&tok, ErrorKind::syntax("macro definitions cannot nest")));
            }
            line_start = tok.is(TokenKind::Newline);
            body.push(tok);
        }

        debug!(name = %name.text, params = names.len(), tokens = body.len(), "macro defined");
        self.macros
            .define(MacroDef {
                name: name.text.clone(),
                params: names,
                body,
            })
            .map_err(|k| at(name, k))
    }

    fn invoke(&mut self, def: MacroDef, head: &Token, rest: &[Token], depth: usize) -> Result<(), AsmError> {
        if depth >= MAX_EXPANSION_DEPTH {
            return Err(at(head, ErrorKind::MacroDepth(MAX_EXPANSION_DEPTH)));
        }
        let args: Vec<Vec<Token>> = split_operands(rest).into_iter().map(<[Token]>::to_vec).collect();
        let mut expanded = def.expand(&args, head.line).map_err(|k| at(head, k))?;
        if !expanded.last().is_some_and(|t| t.is(TokenKind::Newline)) {
            expanded.push(Token::new(TokenKind::Newline, "\n", head.line, head.col));
        }
        trace!(name = %def.name, depth = depth + 1, tokens = expanded.len(), "macro expanded");
        self.stream.splice(expanded, depth + 1);
        Ok(())
    }

    fn instruction(&mut self, head: &Token, rest: &[Token]) -> Result<(), AsmError> {
        let (base, suffix) = split_size(&head.text);
        let table: &'t InstrTable = self.table;
        let def = table
            .lookup(base)
            .ok_or_else(|| at(head, ErrorKind::UnknownMnemonic(head.text.clone())))?;

        let ctx = EvalContext {
            symbols: &self.symbols,
            pc: self.pc,
        };
        let operands = split_operands(rest)
            .into_iter()
            .map(|part| parse_operand(part, head, &ctx))
            .collect::<Result<Vec<_>, _>>()?;

        let form = def.select(&operands).map(|(_, f)| f).ok_or_else(|| {
            at(
                head,
                ErrorKind::Validation {
                    mnemonic: def.mnemonic.to_string(),
                    reason: format!("no form accepts ({})", operand_list(&operands)),
                },
            )
        })?;

        let size = match suffix {
            None => form.default_size,
            Some(_) if form.sizes.is_empty() => {
                return Err(at(head, invalid(def, "takes no size suffix".into())));
            }
            Some(s) if form.sizes.allows(s) => {
                if s == Size::Byte && form.sizes.contains(Sizes::SHORT) {
                    Size::Short
                } else {
                    s
                }
            }
            Some(s) => {
                return Err(at(head, invalid(def, format!("size .{} is not allowed here", s.suffix()))));
            }
        };

        let args = build_args(form, operands, size, suffix.is_some());
        form.validate_args(&args).map_err(|v| at(head, v.into_error(def.mnemonic)))?;

        let len = form.byte_len(&args);
        self.check_end(head, self.pc as u64 + len as u64)?;
        let pc = self.pc;
        trace!(line = head.line, pc, mnemonic = def.mnemonic, len, "instruction");
        self.items.push(Item::Instruction {
            def,
            form,
            args,
            pc,
            line: head.line,
        });
        self.pc += len;
        Ok(())
    }

    fn eval_all(&self, toks: &[Token]) -> Result<i64, AsmError> {
        let ctx = EvalContext {
            symbols: &self.symbols,
            pc: self.pc,
        };
        evaluate_tokens(toks, &ctx)
    }

    fn eval_all_or(&self, head: &Token, toks: &[Token]) -> Result<i64, AsmError> {
        if toks.is_empty() {
            return Err(at(head, ErrorKind::syntax(format!("{} needs a value", head.text))));
        }
        self.eval_all(toks)
    }

    fn eval_part(&self, toks: &[Token], head: &Token) -> Result<i64, AsmError> {
        if toks.is_empty() {
            return Err(at(head, ErrorKind::syntax("empty expression")));
        }
        self.eval_all(toks)
    }
}

/// `MOVE.L` to (`MOVE`, Some(Long)). An unknown suffix stays part of the
/// name so the lookup reports the whole spelling.
fn split_size(text: &str) -> (&str, Option<Size>) {
    match text.rsplit_once('.') {
        Some((base, sfx)) if !base.is_empty() => match Size::from_suffix(sfx) {
            Some(size) => (base, Some(size)),
            None => (text, None),
        },
        _ => (text, None),
    }
}

/// Places operands into source, destination, register-list and branch
/// target slots. A lone operand is the destination unless it is an
/// immediate.
fn build_args(form: &FormDef, operands: Vec<Operand>, size: Size, explicit: bool) -> Args {
    let mut args = Args::empty(size);
    args.explicit_size = explicit;
    let single = operands.len() == 1;
    for (i, (kind, op)) in form.signature.iter().zip(operands).enumerate() {
        let to_src = if single { *kind == OperandKind::Imm } else { i == 0 };
        match (kind, op) {
            (OperandKind::RegList, Operand::RegList(mask)) => args.reglist = Some(mask),
            (OperandKind::RegList, Operand::Ea(EaExpr::DataReg(n))) => args.reglist = Some(RegMask::of(Reg::Data(n))),
            (OperandKind::RegList, Operand::Ea(EaExpr::AddrReg(n))) => args.reglist = Some(RegMask::of(Reg::Addr(n))),
            (OperandKind::Target, Operand::Ea(EaExpr::AbsShort(v) | EaExpr::AbsLong(v))) => args.target = Some(v),
            (_, Operand::Ea(ea)) if to_src => args.src = ea,
            (_, Operand::Ea(ea)) => args.dst = ea,
            (_, Operand::RegList(mask)) => args.reglist = Some(mask),
        }
    }
    args
}

fn operand_list(ops: &[Operand]) -> String {
    ops.iter()
        .map(|op| match op {
            Operand::Ea(ea) => ea.describe(),
            Operand::RegList(_) => "register list",
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn invalid(def: &InstrDef, reason: String) -> ErrorKind {
    ErrorKind::Validation {
        mnemonic: def.mnemonic.to_string(),
        reason,
    }
}

fn at(tok: &Token, kind: ErrorKind) -> AsmError {
    AsmError::new(kind, tok.line, Some(tok.col))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ea::Value;
    use crate::isa::table::table;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> Result<Program<'static>, AsmError> {
        Parser::new(src, table(), AsmConfig::default()).parse()
    }

    fn pcs(p: &Program<'_>) -> Vec<u32> {
        p.items.iter().map(Item::pc).collect()
    }

    #[test]
    fn addresses_follow_encoded_lengths() {
        let p = parse(
            "start: moveq #1,d0\n\
             move.l #$12345678,d1\n\
             move.w 4(a0),$1000\n\
             bra.s start\n\
             bra start\n\
             rts\n",
        )
        .unwrap();
        assert_eq!(pcs(&p), vec![0, 2, 8, 14, 16, 20]);
        assert_eq!(p.labels.resolve_final("start"), Some(0));
    }

    #[test]
    fn forward_label_stays_symbolic() {
        let p = parse("jmp done\ndone: nop\n").unwrap();
        match &p.items[0] {
            Item::Instruction { args, .. } => {
                assert_eq!(args.dst, EaExpr::AbsLong(Value::Label("done".into())));
            }
            other => panic!("{other:?}"),
        }
        assert_eq!(p.labels.resolve_final("done"), Some(6));
    }

    #[test]
    fn constants_and_partial_resolution() {
        let p = parse("COUNT = 3\nSIZE .equ COUNT*4\n.word SIZE\n").unwrap();
        assert_eq!(p.labels.resolve_final("SIZE"), Some(12));
        let err = parse(".word LATER\nLATER = 1\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedSymbol("LATER".into()));
        assert_eq!(err.line, 1);
        assert_eq!(err.line_text.as_deref(), Some(".word LATER"));
    }

    #[test]
    fn first_org_moves_the_origin() {
        let p = parse(".org $400\nnop\n").unwrap();
        assert_eq!(p.origin, 0x400);
        assert_eq!(pcs(&p), vec![0x400]);
    }

    #[test]
    fn labels_before_first_org_follow_the_origin() {
        let p = parse("start:\n.org $400\nbra start\n").unwrap();
        assert_eq!(p.origin, 0x400);
        assert_eq!(p.labels.resolve_final("start"), Some(0x400));
    }

    #[test]
    fn org_align_and_even_pad() {
        let p = parse(".byte 1\n.org 4\n.byte 2\n.align 4,$FF\n.byte 3\n.even\n.word 4\n").unwrap();
        let bytes: Vec<u8> = p
            .items
            .iter()
            .flat_map(|i| match i {
                Item::Data { bytes, .. } => bytes.clone(),
                _ => Vec::new(),
            })
            .collect();
        assert_eq!(bytes, vec![1, 0, 0, 0, 2, 0xFF, 0xFF, 0xFF, 3, 0, 0, 4]);
    }

    #[test]
    fn backward_org_fails() {
        let err = parse("nop\nnop\n.org 1\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::BackwardOrigin { target: 1, pc: 4 });
        assert_eq!(err.line, 3);
    }

    #[test]
    fn alignment_must_be_positive() {
        assert!(matches!(parse(".align 0\n").unwrap_err().kind, ErrorKind::Range { .. }));
    }

    #[test]
    fn macro_definition_and_nested_expansion() {
        let p = parse(
            ".macro PUSH r\n\
             move.l r,-(sp)\n\
             .endmacro\n\
             .macro SAVE2 a, b\n\
             PUSH a\n\
             PUSH b\n\
             .endmacro\n\
             SAVE2 d0, a1\n",
        )
        .unwrap();
        assert_eq!(p.items.len(), 2);
        assert!(p.items.iter().all(|i| i.line() == 8));
        assert_eq!(pcs(&p), vec![0, 2]);
    }

    #[test]
    fn recursive_macro_hits_depth_limit() {
        let err = parse(".macro LOOP\nLOOP\n.endmacro\nLOOP\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MacroDepth(MAX_EXPANSION_DEPTH));
    }

    #[test]
    fn unterminated_macro() {
        let err = parse(".macro M\nnop\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Syntax(ref m) if m.contains(".endmacro")));
    }

    #[test]
    fn size_suffix_handling() {
        assert!(parse("nop.w\n").is_err());
        assert!(parse("ext.b d0\n").is_err());
        let err = parse("move.x d0,d1\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownMnemonic("move.x".into()));
        let p = parse("l: bra.b l\n").unwrap();
        match &p.items[0] {
            Item::Instruction { args, .. } => assert_eq!(args.size, Size::Short),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn validation_errors_name_the_instruction() {
        let err = parse("  addq #9,d0\n").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Range {
                what: "quick immediate",
                value: 9,
                min: 1,
                max: 8
            }
        );
        let err = parse("lea d0,a0\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Validation { ref mnemonic, .. } if mnemonic == "LEA"));
        assert_eq!(err.to_string(), format!("line 1, col 1: {}\n    lea d0,a0", err.kind));
    }

    #[test]
    fn lexical_errors_carry_position() {
        let err = parse("nop\n.byte \"abc\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Lexical(_)));
        assert_eq!((err.line, err.col), (2, Some(7)));
    }
}
