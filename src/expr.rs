//! Constant expression evaluation.
//!
//! Operator precedence parsing over an explicit operator stack and value
//! stack. A `want_value` flag tells unary `-`/`+`/`~` apart from the
//! binary forms. Identifiers resolve against the symbol table as populated
//! so far, so an expression can only name symbols defined above it.

use crate::error::{AsmError, ErrorKind};
use crate::lexer::{Token, TokenKind};
use crate::symbols::SymbolTable;

/// A cursor the evaluator pulls tokens from.
pub trait TokenSource {
    fn peek(&mut self) -> &Token;
    fn next(&mut self) -> Token;
}

/// Token source over a borrowed slice; yields `Eof` past the end.
pub struct SliceSource<'a> {
    toks: &'a [Token],
    pos: usize,
    eof: Token,
}

impl<'a> SliceSource<'a> {
    pub fn new(toks: &'a [Token]) -> Self {
        let (line, col) = toks.last().map(|t| (t.line, t.col + t.text.len())).unwrap_or((1, 1));
        Self {
            toks,
            pos: 0,
            eof: Token::new(TokenKind::Eof, "", line, col),
        }
    }

    pub fn remaining(&self) -> &'a [Token] {
        &self.toks[self.pos.min(self.toks.len())..]
    }
}

impl TokenSource for SliceSource<'_> {
    fn peek(&mut self) -> &Token {
        self.toks.get(self.pos).unwrap_or(&self.eof)
    }

    fn next(&mut self) -> Token {
        let tok = self.toks.get(self.pos).cloned().unwrap_or_else(|| self.eof.clone());
        self.pos += 1;
        tok
    }
}

pub struct EvalContext<'a> {
    pub symbols: &'a SymbolTable,
    /// Value of `*`.
    pub pc: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Neg,
    Pos,
    Not,
    Mul,
    Div,
    Add,
    Sub,
    Shl,
    Shr,
    And,
    Xor,
    Or,
    Open,
}

impl Op {
    fn binary(kind: TokenKind) -> Option<Op> {
        Some(match kind {
            TokenKind::Star => Op::Mul,
            TokenKind::Slash => Op::Div,
            TokenKind::Plus => Op::Add,
            TokenKind::Minus => Op::Sub,
            TokenKind::Shl => Op::Shl,
            TokenKind::Shr => Op::Shr,
            TokenKind::Amp => Op::And,
            TokenKind::Caret => Op::Xor,
            TokenKind::Pipe => Op::Or,
            _ => return None,
        })
    }

    fn unary(kind: TokenKind) -> Option<Op> {
        Some(match kind {
            TokenKind::Minus => Op::Neg,
            TokenKind::Plus => Op::Pos,
            TokenKind::Tilde => Op::Not,
            _ => return None,
        })
    }

    fn precedence(self) -> u8 {
        match self {
            Op::Neg | Op::Pos | Op::Not => 7,
            Op::Mul | Op::Div => 6,
            Op::Add | Op::Sub => 5,
            Op::Shl | Op::Shr => 4,
            Op::And => 3,
            Op::Xor => 2,
            Op::Or => 1,
            Op::Open => 0,
        }
    }

    fn is_unary(self) -> bool {
        matches!(self, Op::Neg | Op::Pos | Op::Not)
    }
}

/// Evaluates one expression, stopping (without consuming) at a token whose
/// kind is in `stop` at paren depth zero, or at the first token that cannot
/// continue the expression.
pub fn evaluate<S: TokenSource + ?Sized>(
    src: &mut S,
    stop: &[TokenKind],
    ctx: &EvalContext<'_>,
) -> Result<i64, AsmError> {
    let start = src.peek().clone();
    let mut ops: Vec<(Op, Token)> = Vec::new();
    let mut values: Vec<i64> = Vec::new();
    let mut want_value = true;
    let mut depth = 0usize;

    loop {
        let tok = src.peek().clone();
        if depth == 0 && stop.contains(&tok.kind) {
            break;
        }
        if tok.is(TokenKind::Error) {
            return Err(at(&tok, ErrorKind::Lexical(tok.text.clone())));
        }
        if want_value {
            match tok.kind {
                TokenKind::Number => values.push(tok.value),
                TokenKind::Ident => match ctx.symbols.resolve_partial(&tok.text) {
                    Some(v) => values.push(v),
                    None => return Err(at(&tok, ErrorKind::UndefinedSymbol(tok.text.clone()))),
                },
                TokenKind::Star => values.push(ctx.pc as i64),
                TokenKind::LParen => {
                    depth += 1;
                    ops.push((Op::Open, tok.clone()));
                    src.next();
                    continue;
                }
                kind => match Op::unary(kind) {
                    Some(op) => {
                        ops.push((op, tok.clone()));
                        src.next();
                        continue;
                    }
                    None if values.is_empty() && ops.is_empty() => {
                        return Err(at(&tok, ErrorKind::syntax(format!("expected expression, found {}", describe(&tok)))));
                    }
                    None => {
                        return Err(at(&tok, ErrorKind::syntax(format!("expected value, found {}", describe(&tok)))));
                    }
                },
            }
            want_value = false;
            src.next();
            continue;
        }

        if let Some(op) = Op::binary(tok.kind) {
            while matches!(ops.last(), Some((top, _)) if *top != Op::Open && top.precedence() >= op.precedence())
            {
                if let Some((top, top_tok)) = ops.pop() {
                    apply(top, &top_tok, &mut values)?;
                }
            }
            ops.push((op, tok.clone()));
            want_value = true;
            src.next();
            continue;
        }

        if tok.is(TokenKind::RParen) && depth > 0 {
            loop {
                match ops.pop() {
                    Some((Op::Open, _)) => break,
                    Some((op, op_tok)) => apply(op, &op_tok, &mut values)?,
                    None => return Err(at(&tok, ErrorKind::syntax("unbalanced `)`"))),
                }
            }
            depth -= 1;
            src.next();
            continue;
        }

        break;
    }

    if want_value {
        let tok = src.peek().clone();
        let msg = if values.is_empty() && ops.is_empty() {
            format!("expected expression, found {}", describe(&tok))
        } else {
            format!("incomplete expression before {}", describe(&tok))
        };
        return Err(at(&tok, ErrorKind::syntax(msg)));
    }

    while let Some((op, op_tok)) = ops.pop() {
        if op == Op::Open {
            return Err(at(&op_tok, ErrorKind::syntax("missing `)`")));
        }
        apply(op, &op_tok, &mut values)?;
    }

    match values.as_slice() {
        [v] => Ok(*v),
        _ => Err(at(&start, ErrorKind::syntax("malformed expression"))),
    }
}

/// Evaluates a complete token slice; trailing tokens are a syntax error.
pub fn evaluate_tokens(toks: &[Token], ctx: &EvalContext<'_>) -> Result<i64, AsmError> {
    let mut src = SliceSource::new(toks);
    let v = evaluate(&mut src, &[TokenKind::Comma, TokenKind::Newline, TokenKind::Eof], ctx)?;
    match src.remaining().first() {
        Some(extra) if !extra.ends_statement() => Err(at(extra, ErrorKind::syntax(format!("unexpected {} after expression", describe(extra))))),
        _ => Ok(v),
    }
}

fn apply(op: Op, tok: &Token, values: &mut Vec<i64>) -> Result<(), AsmError> {
    let malformed = || at(tok, ErrorKind::syntax("malformed expression"));
    if op.is_unary() {
        let a = values.pop().ok_or_else(malformed)?;
        values.push(match op {
            Op::Neg => a.wrapping_neg(),
            Op::Not => !a,
            _ => a,
        });
        return Ok(());
    }
    let b = values.pop().ok_or_else(malformed)?;
    let a = values.pop().ok_or_else(malformed)?;
    let v = match op {
        Op::Mul => a.wrapping_mul(b),
        Op::Div => {
            if b == 0 {
                return Err(at(tok, ErrorKind::DivisionByZero));
            }
            a.wrapping_div(b)
        }
        Op::Add => a.wrapping_add(b),
        Op::Sub => a.wrapping_sub(b),
        Op::Shl => {
            if (0..64).contains(&b) {
                a << b
            } else {
                0
            }
        }
        Op::Shr => {
            if (0..64).contains(&b) {
                a >> b
            } else if a < 0 {
                -1
            } else {
                0
            }
        }
        Op::And => a & b,
        Op::Xor => a ^ b,
        Op::Or => a | b,
        Op::Neg | Op::Pos | Op::Not | Op::Open => return Err(malformed()),
    };
    values.push(v);
    Ok(())
}

fn at(tok: &Token, kind: ErrorKind) -> AsmError {
    AsmError::new(kind, tok.line, Some(tok.col))
}

pub(crate) fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::Str => format!("string \"{}\"", tok.text),
        _ => format!("`{}`", tok.text),
    }
}
