use std::fmt;

/// The underlying cause of an assembly failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("lexical error: {0}")]
    Lexical(String),
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("undefined symbol `{0}`")]
    UndefinedSymbol(String),
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("{mnemonic}: {reason}")]
    Validation { mnemonic: String, reason: String },
    #[error("{what} {value} out of range {min}..={max}")]
    Range {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("branch displacement {disp} does not fit in {bits} bits")]
    DisplacementOutOfRange { disp: i64, bits: u8 },
    #[error("division by zero")]
    DivisionByZero,
    #[error("address {addr:#x} exceeds maximum program size ({max:#x} bytes)")]
    ProgramSizeExceeded { addr: u64, max: u32 },
    #[error(".org {target:#x} is behind the current program counter {pc:#x}")]
    BackwardOrigin { target: u64, pc: u32 },
    #[error("unsupported addressing mode: {0}")]
    UnsupportedAddressingMode(String),
    #[error("symbol `{0}` is already defined")]
    SymbolRedefined(String),
    #[error("macro `{0}` is already defined")]
    MacroRedefined(String),
    #[error("macro `{name}` expects {expected} argument(s), got {got}")]
    MacroArity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("macro expansion nested deeper than {0} levels")]
    MacroDepth(usize),
}

impl ErrorKind {
    pub fn syntax(msg: impl Into<String>) -> Self {
        ErrorKind::Syntax(msg.into())
    }

    pub fn range(what: &'static str, value: i64, min: i64, max: i64) -> Self {
        ErrorKind::Range {
            what,
            value,
            min,
            max,
        }
    }

    /// Checks `value` against an inclusive range, producing a `Range` error.
    pub fn check_range(what: &'static str, value: i64, min: i64, max: i64) -> Result<i64, Self> {
        if value < min || value > max {
            Err(Self::range(what, value, min, max))
        } else {
            Ok(value)
        }
    }
}

/// A failure annotated with the source position it was detected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmError {
    pub line: usize,
    pub col: Option<usize>,
    pub line_text: Option<String>,
    pub kind: ErrorKind,
}

impl AsmError {
    pub fn new(kind: ErrorKind, line: usize, col: Option<usize>) -> Self {
        Self {
            line,
            col,
            line_text: None,
            kind,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.line_text = Some(text.into());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Attaches the offending line of `source` unless text is already set.
    pub fn with_source(self, source: &str) -> Self {
        if self.line_text.is_some() || self.line == 0 {
            return self;
        }
        match source.lines().nth(self.line - 1) {
            Some(text) => self.with_text(text),
            None => self,
        }
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.line)?;
        if let Some(col) = self.col {
            write!(f, ", col {col}")?;
        }
        write!(f, ": {}", self.kind)?;
        if let Some(text) = &self.line_text {
            write!(f, "\n    {}", text.trim())?;
        }
        Ok(())
    }
}

impl std::error::Error for AsmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

pub type Result<T, E = AsmError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn renders_line_col_and_text() {
        let err = AsmError::new(ErrorKind::DivisionByZero, 3, Some(7)).with_text("  .word 1/0");
        assert_eq!(err.to_string(), "line 3, col 7: division by zero\n    .word 1/0");
    }

    #[test]
    fn renders_without_col() {
        let err = AsmError::new(ErrorKind::UndefinedLabel("x".into()), 12, None);
        assert_eq!(err.to_string(), "line 12: undefined label `x`");
    }

    #[test]
    fn source_is_the_kind() {
        let err = AsmError::new(ErrorKind::DivisionByZero, 1, None);
        let src = err.source().unwrap();
        assert_eq!(src.to_string(), "division by zero");
    }

    #[test]
    fn program_size_message() {
        let kind = ErrorKind::ProgramSizeExceeded {
            addr: 0x200_0000,
            max: 0x100_0000,
        };
        assert!(kind.to_string().contains("maximum program size"));
    }
}
