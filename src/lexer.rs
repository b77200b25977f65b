//! Source text to token stream.
//!
//! The lexer never fails outright: malformed input becomes a
//! [`TokenKind::Error`] token carrying the message and position, and the
//! parser turns it into a lexical diagnostic when it reaches it.

use std::collections::VecDeque;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Newline,
    Eof,
    Comma,
    Colon,
    Hash,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Assign,
    Lt,
    Gt,
    Shl,
    Shr,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    LtEq,
    GtEq,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Identifier spelling, decoded string contents, operator spelling, or
    /// the message of an error token.
    pub text: String,
    /// Value of number and character literals, zero otherwise.
    pub value: i64,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            value: 0,
            line,
            col,
        }
    }

    pub fn number(value: i64, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind: TokenKind::Number,
            text: text.into(),
            value,
            line,
            col,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// True for newline and end of input.
    pub fn ends_statement(&self) -> bool {
        matches!(self.kind, TokenKind::Newline | TokenKind::Eof)
    }

    /// Case-insensitive identifier comparison.
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text.eq_ignore_ascii_case(name)
    }
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    lookahead: VecDeque<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            lookahead: VecDeque::new(),
        }
    }

    /// Returns the next token and advances. Keeps returning `Eof` once the
    /// input is exhausted.
    pub fn next(&mut self) -> Token {
        if let Some(tok) = self.lookahead.pop_front() {
            return tok;
        }
        self.scan()
    }

    pub fn peek(&mut self) -> &Token {
        self.peek_n(0)
    }

    /// Looks `n` tokens ahead without consuming (`peek_n(0)` is `peek`).
    pub fn peek_n(&mut self, n: usize) -> &Token {
        while self.lookahead.len() <= n {
            let tok = self.scan();
            self.lookahead.push_back(tok);
        }
        &self.lookahead[n]
    }

    /// Lexes the whole input, including the trailing `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut out = Vec::new();
        loop {
            let tok = self.next();
            let eof = tok.is(TokenKind::Eof);
            out.push(tok);
            if eof {
                return out;
            }
        }
    }

    fn cur(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at(&self, off: usize) -> Option<char> {
        self.chars.get(self.pos + off).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.cur()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn scan(&mut self) -> Token {
        loop {
            match self.cur() {
                Some(' ' | '\t' | '\r') => {
                    self.bump();
                }
                Some(';') => {
                    while !matches!(self.cur(), None | Some('\n')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }

        let (line, col) = (self.line, self.col);
        let Some(c) = self.cur() else {
            return Token::new(TokenKind::Eof, "", line, col);
        };

        match c {
            '\n' => {
                self.bump();
                Token::new(TokenKind::Newline, "\n", line, col)
            }
            '$' => {
                self.bump();
                self.radix_number(16, "$", line, col)
            }
            '%' if matches!(self.at(1), Some('0' | '1')) => {
                self.bump();
                self.radix_number(2, "%", line, col)
            }
            '@' => {
                self.bump();
                self.radix_number(8, "@", line, col)
            }
            '0' if matches!(self.at(1), Some('x' | 'X')) => {
                self.bump();
                self.bump();
                self.radix_number(16, "0x", line, col)
            }
            '0'..='9' => self.radix_number(10, "", line, col),
            '\'' => self.char_literal(line, col),
            '"' => self.string_literal(line, col),
            c if c.is_ascii_alphabetic() || c == '_' || c == '.' => {
                let start = self.pos;
                while matches!(self.cur(), Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '.')
                {
                    self.bump();
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                Token::new(TokenKind::Ident, text, line, col)
            }
            _ => self.operator(line, col),
        }
    }

    fn operator(&mut self, line: usize, col: usize) -> Token {
        use TokenKind::*;
        let c = self.bump().unwrap_or('\0');
        let two = |next: char, lexer: &mut Lexer| {
            if lexer.cur() == Some(next) {
                lexer.bump();
                true
            } else {
                false
            }
        };
        let (kind, text) = match c {
            ',' => (Comma, ","),
            ':' => (Colon, ":"),
            '#' => (Hash, "#"),
            '(' => (LParen, "("),
            ')' => (RParen, ")"),
            '+' => (Plus, "+"),
            '-' => (Minus, "-"),
            '*' => (Star, "*"),
            '/' => (Slash, "/"),
            '%' => (Percent, "%"),
            '^' => (Caret, "^"),
            '~' => (Tilde, "~"),
            '&' if two('&', self) => (AndAnd, "&&"),
            '&' => (Amp, "&"),
            '|' if two('|', self) => (OrOr, "||"),
            '|' => (Pipe, "|"),
            '=' if two('=', self) => (EqEq, "=="),
            '=' => (Assign, "="),
            '!' if two('=', self) => (NotEq, "!="),
            '!' => (Bang, "!"),
            '<' if two('<', self) => (Shl, "<<"),
            '<' if two('=', self) => (LtEq, "<="),
            '<' => (Lt, "<"),
            '>' if two('>', self) => (Shr, ">>"),
            '>' if two('=', self) => (GtEq, ">="),
            '>' => (Gt, ">"),
            other => {
                return Token::new(Error, format!("unexpected character `{other}`"), line, col);
            }
        };
        Token::new(kind, text, line, col)
    }

    fn radix_number(&mut self, radix: u32, prefix: &str, line: usize, col: usize) -> Token {
        let start = self.pos;
        while matches!(self.cur(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        let spelled = format!("{prefix}{digits}");
        if digits.is_empty() {
            return Token::new(TokenKind::Error, format!("`{prefix}` is not followed by digits"), line, col);
        }
        match i64::from_str_radix(&digits, radix) {
            Ok(v) if v <= u32::MAX as i64 => Token::number(v, spelled, line, col),
            Ok(_) => Token::new(TokenKind::Error, format!("number `{spelled}` does not fit in 32 bits"), line, col),
            Err(_) => Token::new(TokenKind::Error, format!("malformed number `{spelled}`"), line, col),
        }
    }

    /// Reads one possibly escaped character inside a quoted literal.
    fn escaped(&mut self, allow_nul: bool) -> Result<char, String> {
        match self.bump() {
            Some('\\') => match self.bump() {
                Some('n') => Ok('\n'),
                Some('r') => Ok('\r'),
                Some('t') => Ok('\t'),
                Some('\\') => Ok('\\'),
                Some('\'') => Ok('\''),
                Some('"') => Ok('"'),
                Some('0') if allow_nul => Ok('\0'),
                Some(c) => Err(format!("unknown escape `\\{c}`")),
                None => Err("unterminated escape".into()),
            },
            Some(c) => Ok(c),
            None => Err("unexpected end of input".into()),
        }
    }

    fn char_literal(&mut self, line: usize, col: usize) -> Token {
        self.bump();
        if matches!(self.cur(), None | Some('\n')) {
            return Token::new(TokenKind::Error, "unterminated character literal", line, col);
        }
        let c = match self.escaped(false) {
            Ok(c) => c,
            Err(msg) => return Token::new(TokenKind::Error, msg, line, col),
        };
        if self.cur() != Some('\'') {
            // Skip to the closing quote on this line so lexing can resume.
            while !matches!(self.cur(), None | Some('\n') | Some('\'')) {
                self.bump();
            }
            let msg = if self.cur() == Some('\'') {
                self.bump();
                "character literal must hold exactly one character"
            } else {
                "unterminated character literal"
            };
            return Token::new(TokenKind::Error, msg, line, col);
        }
        self.bump();
        Token::number(c as i64, format!("'{c}'"), line, col)
    }

    fn string_literal(&mut self, line: usize, col: usize) -> Token {
        self.bump();
        let mut text = String::new();
        loop {
            match self.cur() {
                None | Some('\n') => {
                    return Token::new(TokenKind::Error, "unterminated string literal", line, col)
                }
                Some('"') => {
                    self.bump();
                    return Token::new(TokenKind::Str, text, line, col);
                }
                _ => match self.escaped(true) {
                    Ok(c) => text.push(c),
                    Err(msg) => return Token::new(TokenKind::Error, msg, line, col),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().into_iter().map(|t| t.kind).collect()
    }

    fn values(src: &str) -> Vec<i64> {
        Lexer::new(src)
            .tokenize()
            .into_iter()
            .filter(|t| t.is(TokenKind::Number))
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn numeric_prefixes() {
        assert_eq!(
            values("$1F %101 @17 0x10 0X20 42 'A' '\\n'"),
            vec![0x1F, 5, 0o17, 16, 32, 42, 65, 10]
        );
    }

    #[test]
    fn comment_becomes_newline() {
        use TokenKind::*;
        assert_eq!(kinds("nop ; rest is ignored\nrts"), vec![Ident, Newline, Ident, Eof]);
    }

    #[test]
    fn two_char_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("<< >> && || == != <= >= < > = !"),
            vec![Shl, Shr, AndAnd, OrOr, EqEq, NotEq, LtEq, GtEq, Lt, Gt, Assign, Bang, Eof]
        );
    }

    #[test]
    fn dotted_identifiers() {
        let toks = Lexer::new(".org MOVE.B d0.w").tokenize();
        let names: Vec<&str> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(names, vec![".org", "MOVE.B", "d0.w", ""]);
    }

    #[test]
    fn string_escapes() {
        let toks = Lexer::new(r#""a\tb\0\"""#).tokenize();
        assert_eq!(toks[0].kind, TokenKind::Str);
        assert_eq!(toks[0].text, "a\tb\0\"");
    }

    #[test]
    fn unterminated_literals_are_error_tokens() {
        let toks = Lexer::new("  \"abc\n'x").tokenize();
        assert_eq!(toks[0].kind, TokenKind::Error);
        assert_eq!((toks[0].line, toks[0].col), (1, 3));
        assert_eq!(toks[1].kind, TokenKind::Newline);
        assert_eq!(toks[2].kind, TokenKind::Error);
        assert_eq!((toks[2].line, toks[2].col), (2, 1));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lx = Lexer::new("a b c");
        assert_eq!(lx.peek_n(2).text, "c");
        assert_eq!(lx.peek().text, "a");
        assert_eq!(lx.next().text, "a");
        assert_eq!(lx.next().text, "b");
        assert_eq!(lx.next().text, "c");
        assert_eq!(lx.next().kind, TokenKind::Eof);
        assert_eq!(lx.next().kind, TokenKind::Eof);
    }

    #[test]
    fn line_and_column_tracking() {
        let toks = Lexer::new("nop\n  move.l d0,d1").tokenize();
        let d1 = toks.iter().find(|t| t.text == "d1").unwrap();
        assert_eq!((d1.line, d1.col), (2, 13));
    }
}
