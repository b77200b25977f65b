//! Operand grammar: addressing modes and `MOVEM` register lists.

use bitflags::bitflags;
use serde::Serialize;

use crate::ea::{EaExpr, IndexReg, Value};
use crate::error::{AsmError, ErrorKind};
use crate::expr::{describe, evaluate_tokens, EvalContext};
use crate::lexer::{Token, TokenKind};

bitflags! {
    /// Register set in the normal `MOVEM` order: D0 is bit 0, A7 bit 15.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct RegMask: u16 {
        const D0 = 1 << 0;
        const D1 = 1 << 1;
        const D2 = 1 << 2;
        const D3 = 1 << 3;
        const D4 = 1 << 4;
        const D5 = 1 << 5;
        const D6 = 1 << 6;
        const D7 = 1 << 7;
        const A0 = 1 << 8;
        const A1 = 1 << 9;
        const A2 = 1 << 10;
        const A3 = 1 << 11;
        const A4 = 1 << 12;
        const A5 = 1 << 13;
        const A6 = 1 << 14;
        const A7 = 1 << 15;
    }
}

impl RegMask {
    pub fn of(reg: Reg) -> Self {
        let bit = match reg {
            Reg::Data(n) => n,
            Reg::Addr(n) => n + 8,
        };
        RegMask::from_bits_retain(1 << bit)
    }

    /// Mask layout for the predecrement store form (D0 is bit 15).
    pub fn reversed(self) -> u16 {
        self.bits().reverse_bits()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Data(u8),
    Addr(u8),
}

/// Names that are never symbols in operand position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Special {
    Gpr(Reg),
    Pc,
    Sr,
    Ccr,
    Usp,
}

fn special(name: &str) -> Option<Special> {
    let upper = name.to_ascii_uppercase();
    let b = upper.as_bytes();
    match upper.as_str() {
        "SP" => return Some(Special::Gpr(Reg::Addr(7))),
        "PC" => return Some(Special::Pc),
        "SR" => return Some(Special::Sr),
        "CCR" => return Some(Special::Ccr),
        "USP" => return Some(Special::Usp),
        _ => {}
    }
    if b.len() == 2 && (b'0'..=b'7').contains(&b[1]) {
        let n = b[1] - b'0';
        match b[0] {
            b'D' => return Some(Special::Gpr(Reg::Data(n))),
            b'A' => return Some(Special::Gpr(Reg::Addr(n))),
            _ => {}
        }
    }
    None
}

/// `D0`..`D7`, `A0`..`A7` or `SP`, case-insensitively.
pub fn parse_register(name: &str) -> Option<Reg> {
    match special(name)? {
        Special::Gpr(r) => Some(r),
        _ => None,
    }
}

fn is_reserved(tok: &Token) -> bool {
    tok.is(TokenKind::Ident) && special(&tok.text).is_some()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Ea(EaExpr),
    RegList(RegMask),
}

/// Splits an operand field at top-level commas. Empty pieces are kept so
/// the caller can report them.
pub fn split_operands(toks: &[Token]) -> Vec<&[Token]> {
    if toks.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, tok) in toks.iter().enumerate() {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                out.push(&toks[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&toks[start..]);
    out
}

/// Parses one operand. `anchor` positions diagnostics for empty operands.
pub fn parse_operand(toks: &[Token], anchor: &Token, ctx: &EvalContext<'_>) -> Result<Operand, AsmError> {
    let Some(first) = toks.first() else {
        return Err(err_at(anchor, ErrorKind::syntax("missing operand")));
    };

    if first.is(TokenKind::Hash) {
        let rest = &toks[1..];
        if rest.is_empty() {
            return Err(err_at(first, ErrorKind::syntax("expected value after `#`")));
        }
        return Ok(Operand::Ea(EaExpr::Immediate(value(rest, ctx)?)));
    }

    if toks.len() == 1 && first.is(TokenKind::Ident) {
        match special(&first.text) {
            Some(Special::Gpr(Reg::Data(n))) => return Ok(Operand::Ea(EaExpr::DataReg(n))),
            Some(Special::Gpr(Reg::Addr(n))) => return Ok(Operand::Ea(EaExpr::AddrReg(n))),
            Some(Special::Sr) => return Ok(Operand::Ea(EaExpr::Sr)),
            Some(Special::Ccr) => return Ok(Operand::Ea(EaExpr::Ccr)),
            Some(Special::Usp) => return Ok(Operand::Ea(EaExpr::Usp)),
            Some(Special::Pc) => {
                return Err(err_at(first, ErrorKind::UnsupportedAddressingMode("PC".into())))
            }
            None => {}
        }
    }

    if parse_register(&first.text).is_some()
        && first.is(TokenKind::Ident)
        && matches!(toks.get(1).map(|t| t.kind), Some(TokenKind::Slash | TokenKind::Minus))
    {
        return parse_reglist(toks).map(Operand::RegList);
    }

    // -(An)
    if first.is(TokenKind::Minus) && toks.len() == 4 && toks[1].is(TokenKind::LParen) && toks[3].is(TokenKind::RParen) {
        if let Some(Reg::Addr(n)) = parse_register(&toks[2].text) {
            return Ok(Operand::Ea(EaExpr::PreDec(n)));
        }
    }

    if first.is(TokenKind::LParen) {
        if let Some(close) = matching_paren(toks, 0) {
            let inner = &toks[1..close];
            let after = &toks[close + 1..];
            if inner.first().is_some_and(is_reserved) || inner.iter().any(|t| t.is(TokenKind::Comma)) {
                return parse_indirect(first, inner, after, None, ctx).map(Operand::Ea);
            }
        }
    }

    // d(An...), d(PC...)
    if let Some(last) = toks.last() {
        if last.is(TokenKind::RParen) {
            if let Some(open) = opening_paren(toks, toks.len() - 1) {
                let inner = &toks[open + 1..toks.len() - 1];
                if open > 0 && inner.first().is_some_and(is_reserved) {
                    return parse_indirect(&toks[open], inner, &[], Some(&toks[..open]), ctx).map(Operand::Ea);
                }
            }
        }
    }

    absolute(toks, ctx).map(Operand::Ea)
}

/// Contents of a parenthesised group that names a register. `disp` holds
/// the tokens of a displacement written before the parenthesis.
fn parse_indirect(
    open: &Token,
    inner: &[Token],
    after: &[Token],
    disp: Option<&[Token]>,
    ctx: &EvalContext<'_>,
) -> Result<EaExpr, AsmError> {
    let parts = split_operands(inner);
    let postinc = match after {
        [] => false,
        [t] if t.is(TokenKind::Plus) => true,
        [t, ..] => {
            return Err(err_at(t, ErrorKind::syntax(format!("unexpected {} after operand", describe(t)))));
        }
    };

    // (d,An...) puts the displacement inside the parentheses.
    let (disp, regs) = match (disp, parts.first().copied()) {
        (None, Some(p)) if !(p.len() == 1 && is_reserved(&p[0])) => {
            if p.is_empty() {
                return Err(err_at(open, ErrorKind::syntax("empty displacement")));
            }
            (Some(p), &parts[1..])
        }
        (d, _) => (d, &parts[..]),
    };

    let base = match regs.first().copied() {
        Some([t]) => match special(&t.text) {
            Some(Special::Gpr(Reg::Addr(n))) => Some(n),
            Some(Special::Pc) => None,
            _ => {
                return Err(err_at(
                    t,
                    ErrorKind::UnsupportedAddressingMode(format!("`{}` as base register", t.text)),
                ))
            }
        },
        Some(p) => {
            let t = p.first().unwrap_or(open);
            return Err(err_at(t, ErrorKind::syntax("expected address register or PC")));
        }
        None => return Err(err_at(open, ErrorKind::syntax("expected address register or PC"))),
    };

    let index = match regs.get(1).copied() {
        Some(p) => Some(parse_index(p, open)?),
        None => None,
    };
    if let Some(extra) = regs.get(2) {
        let t = extra.first().unwrap_or(open);
        return Err(err_at(t, ErrorKind::syntax("too many components in indirect operand")));
    }
    if postinc && (disp.is_some() || index.is_some() || base.is_none()) {
        return Err(err_at(open, ErrorKind::UnsupportedAddressingMode("postincrement requires (An)+".into())));
    }

    let written = disp.is_some();
    let disp = match disp {
        Some(t) if base.is_none() => pc_value(t, ctx)?,
        Some(t) => value(t, ctx)?,
        None => Value::Const(0),
    };
    Ok(match (base, index) {
        (Some(n), None) if postinc => EaExpr::PostInc(n),
        (Some(n), None) if !written => EaExpr::AddrInd(n),
        (Some(an), None) => EaExpr::Disp16 { an, disp },
        (Some(an), Some(idx)) => EaExpr::Index { an, idx, disp },
        (None, None) => EaExpr::PcDisp { disp },
        (None, Some(idx)) => EaExpr::PcIndex { idx, disp },
    })
}

/// `Xn[.W|.L][*scale]`
fn parse_index(toks: &[Token], anchor: &Token) -> Result<IndexReg, AsmError> {
    let Some(first) = toks.first() else {
        return Err(err_at(anchor, ErrorKind::syntax("missing index register")));
    };
    let bad = || err_at(first, ErrorKind::syntax(format!("invalid index register `{}`", first.text)));
    if !first.is(TokenKind::Ident) {
        return Err(bad());
    }
    let (name, long) = match first.text.split_once('.') {
        Some((name, sfx)) if sfx.eq_ignore_ascii_case("w") => (name, false),
        Some((name, sfx)) if sfx.eq_ignore_ascii_case("l") => (name, true),
        Some(_) => return Err(bad()),
        None => (first.text.as_str(), false),
    };
    let (addr, num) = match parse_register(name) {
        Some(Reg::Data(n)) => (false, n),
        Some(Reg::Addr(n)) => (true, n),
        None => return Err(bad()),
    };
    let scale = match &toks[1..] {
        [] => 1,
        [star, n] if star.is(TokenKind::Star) && n.is(TokenKind::Number) => match n.value {
            1 | 2 | 4 | 8 => n.value as u8,
            v => return Err(err_at(n, ErrorKind::range("index scale", v, 1, 8))),
        },
        [t, ..] => return Err(err_at(t, ErrorKind::syntax("expected `*scale` after index register"))),
    };
    Ok(IndexReg { addr, num, long, scale })
}

/// `D0-D3/A0/A5-A6`. An empty slice is the empty set.
pub fn parse_reglist(toks: &[Token]) -> Result<RegMask, AsmError> {
    let mut mask = RegMask::empty();
    if toks.is_empty() {
        return Ok(mask);
    }
    let mut i = 0;
    loop {
        let lo = reg_of(&toks[i])?;
        i += 1;
        if toks.get(i).is_some_and(|t| t.is(TokenKind::Minus)) {
            let hi_tok = toks
                .get(i + 1)
                .ok_or_else(|| err_at(&toks[i], ErrorKind::syntax("register range is missing its end")))?;
            let hi = reg_of(hi_tok)?;
            let (a, b) = match (lo, hi) {
                (Reg::Data(a), Reg::Data(b)) | (Reg::Addr(a), Reg::Addr(b)) if a <= b => (a, b),
                _ => {
                    return Err(err_at(hi_tok, ErrorKind::syntax("register range must ascend within D or A registers")));
                }
            };
            for n in a..=b {
                mask |= RegMask::of(match lo {
                    Reg::Data(_) => Reg::Data(n),
                    Reg::Addr(_) => Reg::Addr(n),
                });
            }
            i += 2;
        } else {
            mask |= RegMask::of(lo);
        }
        match toks.get(i) {
            None => return Ok(mask),
            Some(t) if t.is(TokenKind::Slash) => {
                if i + 1 == toks.len() {
                    return Err(err_at(t, ErrorKind::syntax("register list ends with `/`")));
                }
                i += 1;
            }
            Some(t) => {
                return Err(err_at(t, ErrorKind::syntax(format!("unexpected {} in register list", describe(t)))));
            }
        }
    }
}

fn reg_of(tok: &Token) -> Result<Reg, AsmError> {
    tok.is(TokenKind::Ident)
        .then(|| parse_register(&tok.text))
        .flatten()
        .ok_or_else(|| err_at(tok, ErrorKind::syntax(format!("expected register, found {}", describe(tok)))))
}

/// Absolute address with optional `.W`/`.L` width suffix.
fn absolute(toks: &[Token], ctx: &EvalContext<'_>) -> Result<EaExpr, AsmError> {
    let anchor = &toks[0];
    let mut toks = toks.to_vec();
    let mut forced = None;
    if let Some(last) = toks.last_mut() {
        if last.is(TokenKind::Ident) {
            if let Some((stem, sfx)) = last.text.rsplit_once('.') {
                let width = match sfx.to_ascii_uppercase().as_str() {
                    "W" => Some(false),
                    "L" => Some(true),
                    _ => None,
                };
                if let Some(long) = width {
                    forced = Some(long);
                    if stem.is_empty() {
                        toks.pop();
                    } else {
                        last.text = stem.to_string();
                    }
                }
            }
        }
    }
    if toks.is_empty() {
        return Err(err_at(anchor, ErrorKind::syntax("missing address before width suffix")));
    }
    let v = value(&toks, ctx)?;
    let long = forced.unwrap_or(match &v {
        Value::Const(c) | Value::Addr(c) => !(-32768..=32767).contains(c),
        Value::Label(_) => true,
    });
    Ok(if long { EaExpr::AbsLong(v) } else { EaExpr::AbsShort(v) })
}

/// A lone identifier stays symbolic so it can name a later label;
/// anything else is evaluated now.
fn value(toks: &[Token], ctx: &EvalContext<'_>) -> Result<Value, AsmError> {
    if let [tok] = toks {
        if tok.is(TokenKind::Ident) {
            if is_reserved(tok) {
                return Err(err_at(tok, ErrorKind::syntax(format!("register `{}` used as a value", tok.text))));
            }
            return Ok(Value::Label(tok.text.clone()));
        }
    }
    evaluate_tokens(toks, ctx).map(Value::Const)
}

/// A PC-relative displacement. A plain number is the displacement itself;
/// an expression naming a symbol is the target address.
fn pc_value(toks: &[Token], ctx: &EvalContext<'_>) -> Result<Value, AsmError> {
    Ok(match value(toks, ctx)? {
        Value::Const(a) if toks.iter().any(|t| t.is(TokenKind::Ident)) => Value::Addr(a),
        v => v,
    })
}

fn matching_paren(toks: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, t) in toks.iter().enumerate().skip(open) {
        match t.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn opening_paren(toks: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        match toks[i].kind {
            TokenKind::RParen => depth += 1,
            TokenKind::LParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn err_at(tok: &Token, kind: ErrorKind) -> AsmError {
    AsmError::new(kind, tok.line, Some(tok.col))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::symbols::{SymbolKind, SymbolTable};

    fn parse_with(src: &str, symbols: &SymbolTable) -> Result<Operand, AsmError> {
        let mut toks = Lexer::new(src).tokenize();
        let eof = toks.pop().unwrap();
        let ctx = EvalContext { symbols, pc: 0x400 };
        parse_operand(&toks, &eof, &ctx)
    }

    fn ea(src: &str) -> EaExpr {
        match parse_with(src, &SymbolTable::new()).unwrap() {
            Operand::Ea(ea) => ea,
            other => panic!("{src}: {other:?}"),
        }
    }

    fn c(v: i64) -> Value {
        Value::Const(v)
    }

    #[test]
    fn register_modes() {
        assert_eq!(ea("d3"), EaExpr::DataReg(3));
        assert_eq!(ea("A5"), EaExpr::AddrReg(5));
        assert_eq!(ea("sp"), EaExpr::AddrReg(7));
        assert_eq!(ea("(a0)"), EaExpr::AddrInd(0));
        assert_eq!(ea("(A1)+"), EaExpr::PostInc(1));
        assert_eq!(ea("-(SP)"), EaExpr::PreDec(7));
        assert_eq!(ea("ccr"), EaExpr::Ccr);
        assert_eq!(ea("SR"), EaExpr::Sr);
        assert_eq!(ea("usp"), EaExpr::Usp);
    }

    #[test]
    fn displacement_modes() {
        assert_eq!(ea("4(A0)"), EaExpr::Disp16 { an: 0, disp: c(4) });
        assert_eq!(ea("(-2,a6)"), EaExpr::Disp16 { an: 6, disp: c(-2) });
        assert_eq!(ea("(2*3)(a1)"), EaExpr::Disp16 { an: 1, disp: c(6) });
        assert_eq!(ea("table(pc)"), EaExpr::PcDisp { disp: Value::Label("table".into()) });
        assert_eq!(ea("(pc)"), EaExpr::PcDisp { disp: c(0) });
        assert_eq!(ea("0(a0)"), EaExpr::Disp16 { an: 0, disp: c(0) });
        assert_eq!(ea("(0,a3)"), EaExpr::Disp16 { an: 3, disp: c(0) });
        assert_eq!(ea("6(pc)"), EaExpr::PcDisp { disp: c(6) });
    }

    #[test]
    fn pc_relative_expressions_are_targets() {
        let mut t = SymbolTable::new();
        t.define("table", 0x1000, SymbolKind::Label, 1).unwrap();
        let op = parse_with("table+2(pc)", &t).unwrap();
        assert_eq!(op, Operand::Ea(EaExpr::PcDisp { disp: Value::Addr(0x1002) }));
        let op = parse_with("(table-4,pc,d1.w)", &t).unwrap();
        assert!(matches!(op, Operand::Ea(EaExpr::PcIndex { disp: Value::Addr(0x0FFC), .. })));
        let op = parse_with("table+2(a0)", &t).unwrap();
        assert_eq!(op, Operand::Ea(EaExpr::Disp16 { an: 0, disp: c(0x1002) }));
    }

    #[test]
    fn indexed_modes() {
        let idx = |addr, num, long, scale| IndexReg { addr, num, long, scale };
        assert_eq!(
            ea("8(a0,d1.l)"),
            EaExpr::Index { an: 0, idx: idx(false, 1, true, 1), disp: c(8) }
        );
        assert_eq!(
            ea("(a2,a3.w*4)"),
            EaExpr::Index { an: 2, idx: idx(true, 3, false, 4), disp: c(0) }
        );
        assert_eq!(
            ea("(-1,pc,d0*2)"),
            EaExpr::PcIndex { idx: idx(false, 0, false, 2), disp: c(-1) }
        );
    }

    #[test]
    fn absolute_width_selection() {
        assert_eq!(ea("$1000"), EaExpr::AbsShort(c(0x1000)));
        assert_eq!(ea("$12345"), EaExpr::AbsLong(c(0x12345)));
        assert_eq!(ea("$1000.l"), EaExpr::AbsLong(c(0x1000)));
        assert_eq!(ea("label"), EaExpr::AbsLong(Value::Label("label".into())));
        assert_eq!(ea("label.w"), EaExpr::AbsShort(Value::Label("label".into())));
        assert_eq!(ea("(1+2)*4"), EaExpr::AbsShort(c(12)));
    }

    #[test]
    fn immediates() {
        assert_eq!(ea("#1"), EaExpr::Immediate(c(1)));
        assert_eq!(ea("#-1"), EaExpr::Immediate(c(-1)));
        assert_eq!(ea("#'A'"), EaExpr::Immediate(c(65)));
        assert_eq!(ea("#later"), EaExpr::Immediate(Value::Label("later".into())));
    }

    #[test]
    fn compound_expressions_use_known_symbols() {
        let mut t = SymbolTable::new();
        t.define("BASE", 0x2000, SymbolKind::Constant, 1).unwrap();
        let op = parse_with("#BASE+4", &t).unwrap();
        assert_eq!(op, Operand::Ea(EaExpr::Immediate(c(0x2004))));
        let err = parse_with("#MISSING+4", &t).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedSymbol("MISSING".into()));
    }

    #[test]
    fn register_lists() {
        let list = |src| match parse_with(src, &SymbolTable::new()).unwrap() {
            Operand::RegList(m) => m,
            other => panic!("{other:?}"),
        };
        let m = list("d0-d1/a6");
        assert_eq!(m, RegMask::D0 | RegMask::D1 | RegMask::A6);
        assert_eq!(m.reversed(), 0xC002);
        assert_eq!(list("a0/d7").bits(), 0x0180);
        assert_eq!(list("d0-d7/a0-a6").bits(), 0x7FFF);
        assert!(parse_with("d3-d1", &SymbolTable::new()).is_err());
        assert!(parse_with("d0-a1", &SymbolTable::new()).is_err());
    }

    #[test]
    fn split_respects_parentheses() {
        let toks = Lexer::new("(4,a0),d1").tokenize();
        let parts = split_operands(&toks[..toks.len() - 1]);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 5);
        assert_eq!(parts[1][0].text, "d1");
    }

    #[test]
    fn bad_operands() {
        let t = SymbolTable::new();
        assert!(parse_with("(d0)", &t).is_err());
        assert!(parse_with("pc", &t).is_err());
        assert!(parse_with("(a0)-", &t).is_err());
        assert!(parse_with("#", &t).is_err());
    }
}
