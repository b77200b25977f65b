//! Instruction forms and their encoding templates.

use bitflags::bitflags;
use serde::Serialize;

use crate::ea::{imm_len, EaExpr, Value};
use crate::error::ErrorKind;
use crate::operand::{Operand, RegMask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Size {
    Byte,
    Word,
    Long,
    /// 8-bit branch displacement.
    Short,
}

impl Size {
    pub fn from_suffix(sfx: &str) -> Option<Size> {
        match sfx.to_ascii_uppercase().as_str() {
            "B" => Some(Size::Byte),
            "W" => Some(Size::Word),
            "L" => Some(Size::Long),
            "S" => Some(Size::Short),
            _ => None,
        }
    }

    pub fn suffix(self) -> char {
        match self {
            Size::Byte => 'B',
            Size::Word => 'W',
            Size::Long => 'L',
            Size::Short => 'S',
        }
    }
}

bitflags! {
    /// Sizes a form accepts. Empty means the form takes no size suffix.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct Sizes: u8 {
        const BYTE = 1 << 0;
        const WORD = 1 << 1;
        const LONG = 1 << 2;
        const SHORT = 1 << 3;
        const WL = Self::WORD.bits() | Self::LONG.bits();
        const BWL = Self::BYTE.bits() | Self::WORD.bits() | Self::LONG.bits();
        const BRANCH = Self::BYTE.bits() | Self::WORD.bits() | Self::SHORT.bits();
    }
}

impl Sizes {
    pub fn allows(self, size: Size) -> bool {
        let bit = match size {
            Size::Byte => Sizes::BYTE,
            Size::Word => Sizes::WORD,
            Size::Long => Sizes::LONG,
            Size::Short => Sizes::SHORT,
        };
        self.contains(bit)
    }
}

/// Structural operand constraint of a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperandKind {
    Dn,
    An,
    /// Any general addressing mode.
    Ea,
    Imm,
    PredecAn,
    PostincAn,
    Disp16An,
    /// `MOVEM` register list, or a single register.
    RegList,
    /// Branch destination.
    Target,
    Sr,
    Ccr,
    Usp,
}

impl OperandKind {
    pub fn matches(self, op: &Operand) -> bool {
        let ea = match op {
            Operand::RegList(_) => return self == OperandKind::RegList,
            Operand::Ea(ea) => ea,
        };
        match self {
            OperandKind::Dn => matches!(ea, EaExpr::DataReg(_)),
            OperandKind::An => matches!(ea, EaExpr::AddrReg(_)),
            OperandKind::Ea => !matches!(ea, EaExpr::Sr | EaExpr::Ccr | EaExpr::Usp | EaExpr::None),
            OperandKind::Imm => matches!(ea, EaExpr::Immediate(_)),
            OperandKind::PredecAn => matches!(ea, EaExpr::PreDec(_)),
            OperandKind::PostincAn => matches!(ea, EaExpr::PostInc(_)),
            OperandKind::Disp16An => matches!(ea, EaExpr::Disp16 { .. }),
            OperandKind::RegList => matches!(ea, EaExpr::DataReg(_) | EaExpr::AddrReg(_)),
            OperandKind::Target => matches!(ea, EaExpr::AbsShort(_) | EaExpr::AbsLong(_)),
            OperandKind::Sr => matches!(ea, EaExpr::Sr),
            OperandKind::Ccr => matches!(ea, EaExpr::Ccr),
            OperandKind::Usp => matches!(ea, EaExpr::Usp),
        }
    }
}

/// Bit fields OR-ed into an opcode skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Bits 7-6: B=00 W=01 L=10.
    Size,
    /// Bits 13-12 of `MOVE`: B=01 W=11 L=10.
    SizeMove,
    /// Bit 8 set for long (`ADDA`, `SUBA`, `CMPA`).
    SizeA,
    /// Bit 6 set for long (`EXT`, `MOVEM`, `MOVEP`).
    Size6,
    SrcEa,
    DstEa,
    /// Bits 11-6 of `MOVE`: register then mode.
    MoveDst,
    SrcReg,
    DstReg,
    SrcRegHi,
    DstRegHi,
    /// Bits 11-9 from the source immediate, 8 encoded as 0.
    Quick3,
    /// Bits 7-0 from the source immediate.
    Quick8,
    /// Bits 3-0 from the source immediate.
    Vector,
    /// Bits 7-0: short branch displacement, 0 for the word form.
    Branch8,
}

/// Extension words emitted after an opcode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trailer {
    SrcExt,
    DstExt,
    /// Source immediate at a fixed width regardless of the operation size.
    SrcImm(Size),
    DstImm(Size),
    RegMask,
    /// 16-bit displacement, only when the short form was not chosen.
    BranchDisp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitStep {
    pub skeleton: u16,
    pub fields: &'static [Field],
    pub trailers: &'static [Trailer],
}

/// Normalised operands of one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub src: EaExpr,
    pub dst: EaExpr,
    pub size: Size,
    pub explicit_size: bool,
    pub target: Option<Value>,
    pub reglist: Option<RegMask>,
}

impl Args {
    pub fn empty(size: Size) -> Self {
        Self {
            src: EaExpr::None,
            dst: EaExpr::None,
            size,
            explicit_size: false,
            target: None,
            reglist: None,
        }
    }

    /// Source immediate, when known at this point.
    pub fn src_imm(&self) -> Option<i64> {
        match &self.src {
            EaExpr::Immediate(v) => v.as_const(),
            _ => None,
        }
    }

    pub fn is_short_branch(&self) -> bool {
        self.size == Size::Short
    }
}

/// An ISA constraint broken by concrete operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Mode(&'static str),
    Range {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

impl Violation {
    pub fn into_error(self, mnemonic: &str) -> ErrorKind {
        match self {
            Violation::Mode(reason) => ErrorKind::Validation {
                mnemonic: mnemonic.to_string(),
                reason: reason.to_string(),
            },
            Violation::Range { what, value, min, max } => ErrorKind::range(what, value, min, max),
        }
    }
}

impl From<ErrorKind> for Violation {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Range { what, value, min, max } => Violation::Range { what, value, min, max },
            _ => Violation::Mode("operand out of range"),
        }
    }
}

pub type Validator = fn(&Args) -> Result<(), Violation>;

fn accept(_: &Args) -> Result<(), Violation> {
    Ok(())
}

#[derive(Clone)]
pub struct FormDef {
    pub default_size: Size,
    pub sizes: Sizes,
    pub signature: &'static [OperandKind],
    pub validate: Validator,
    pub steps: Vec<EmitStep>,
}

impl std::fmt::Debug for FormDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormDef")
            .field("default_size", &self.default_size)
            .field("sizes", &self.sizes)
            .field("signature", &self.signature)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl FormDef {
    /// A single-word template form with no extra constraints.
    pub fn new(
        signature: &'static [OperandKind],
        sizes: Sizes,
        default_size: Size,
        skeleton: u16,
        fields: &'static [Field],
        trailers: &'static [Trailer],
    ) -> Self {
        Self {
            default_size,
            sizes,
            signature,
            validate: accept,
            steps: vec![EmitStep {
                skeleton,
                fields,
                trailers,
            }],
        }
    }

    pub fn check(mut self, validate: Validator) -> Self {
        self.validate = validate;
        self
    }

    pub fn matches(&self, operands: &[Operand]) -> bool {
        self.signature.len() == operands.len()
            && self.signature.iter().zip(operands).all(|(k, op)| k.matches(op))
    }

    pub fn is_branch(&self) -> bool {
        self.fields().any(|f| f == Field::Branch8)
            || self.trailers().any(|t| t == Trailer::BranchDisp)
    }

    fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.steps.iter().flat_map(|s| s.fields.iter().copied())
    }

    fn trailers(&self) -> impl Iterator<Item = Trailer> + '_ {
        self.steps.iter().flat_map(|s| s.trailers.iter().copied())
    }

    /// Runs the immediate-width check shared by every form, then the
    /// form's own validator. Symbolic values are skipped until resolved.
    pub fn validate_args(&self, args: &Args) -> Result<(), Violation> {
        for t in self.trailers() {
            let (ea, size) = match t {
                Trailer::SrcExt => (&args.src, args.size),
                Trailer::DstExt => (&args.dst, args.size),
                Trailer::SrcImm(s) => (&args.src, s),
                Trailer::DstImm(s) => (&args.dst, s),
                Trailer::RegMask | Trailer::BranchDisp => continue,
            };
            if let EaExpr::Immediate(Value::Const(v)) = ea {
                crate::ea::check_imm(*v, size)?;
            }
        }
        (self.validate)(args)
    }

    /// Encoded length in bytes; depends only on operand syntax and size.
    pub fn byte_len(&self, args: &Args) -> u32 {
        self.steps
            .iter()
            .map(|step| {
                2 + step
                    .trailers
                    .iter()
                    .map(|t| match t {
                        Trailer::SrcExt => args.src.ext_len(args.size),
                        Trailer::DstExt => args.dst.ext_len(args.size),
                        Trailer::SrcImm(s) | Trailer::DstImm(s) => imm_len(*s),
                        Trailer::RegMask => 2,
                        Trailer::BranchDisp if args.is_short_branch() => 0,
                        Trailer::BranchDisp => 2,
                    })
                    .sum::<u32>()
            })
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct InstrDef {
    pub mnemonic: &'static str,
    pub forms: Vec<FormDef>,
}

impl InstrDef {
    pub fn new(mnemonic: &'static str, forms: Vec<FormDef>) -> Self {
        Self { mnemonic, forms }
    }

    /// First form whose signature fits the operands.
    pub fn select(&self, operands: &[Operand]) -> Option<(usize, &FormDef)> {
        self.forms.iter().enumerate().find(|(_, f)| f.matches(operands))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperandKind::*;

    #[test]
    fn signature_matching() {
        let form = FormDef::new(&[Ea, Dn], Sizes::BWL, Size::Word, 0xD000, &[], &[]);
        let d = |n| Operand::Ea(EaExpr::DataReg(n));
        assert!(form.matches(&[Operand::Ea(EaExpr::AddrInd(0)), d(1)]));
        assert!(!form.matches(&[d(1)]));
        assert!(!form.matches(&[d(0), Operand::Ea(EaExpr::AddrReg(1))]));
        assert!(!form.matches(&[Operand::Ea(EaExpr::Sr), d(1)]));
    }

    #[test]
    fn reglist_kind_accepts_single_register() {
        assert!(RegList.matches(&Operand::Ea(EaExpr::AddrReg(3))));
        assert!(RegList.matches(&Operand::RegList(RegMask::D0 | RegMask::D1)));
        assert!(!Ea.matches(&Operand::RegList(RegMask::D0)));
    }

    #[test]
    fn byte_length_counts_trailers() {
        let form = FormDef::new(&[Ea, Ea], Sizes::BWL, Size::Word, 0, &[], &[Trailer::SrcExt, Trailer::DstExt]);
        let mut args = Args::empty(Size::Long);
        args.src = EaExpr::Immediate(Value::Const(1));
        args.dst = EaExpr::AbsLong(Value::Const(0x10000));
        assert_eq!(form.byte_len(&args), 2 + 4 + 4);
        args.size = Size::Byte;
        assert_eq!(form.byte_len(&args), 2 + 2 + 4);
    }

    #[test]
    fn shared_immediate_check() {
        let form = FormDef::new(&[Imm, Ea], Sizes::BWL, Size::Word, 0x0600, &[], &[Trailer::SrcExt, Trailer::DstExt]);
        let mut args = Args::empty(Size::Byte);
        args.src = EaExpr::Immediate(Value::Const(300));
        args.dst = EaExpr::DataReg(0);
        assert!(matches!(form.validate_args(&args), Err(Violation::Range { .. })));
        args.size = Size::Word;
        assert_eq!(form.validate_args(&args), Ok(()));
    }
}
