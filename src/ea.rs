//! Effective-address descriptors and their mode/register/extension encoding.

use serde::Serialize;

use crate::error::ErrorKind;
use crate::isa::defs::Size;
use crate::symbols::FinalSymbols;

/// An operand value: known at parse time, or a label resolved in the
/// second pass against the complete symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Value {
    Const(i64),
    Label(String),
    /// An address computed in the first pass from an expression that names
    /// a symbol. Outside PC-relative operands it behaves as a constant.
    Addr(i64),
}

impl Value {
    pub fn as_const(&self) -> Option<i64> {
        match self {
            Value::Const(v) | Value::Addr(v) => Some(*v),
            Value::Label(_) => None,
        }
    }

    pub fn resolve(&self, symbols: &FinalSymbols) -> Result<i64, ErrorKind> {
        match self {
            Value::Const(v) | Value::Addr(v) => Ok(*v),
            Value::Label(name) => symbols
                .resolve_final(name)
                .ok_or_else(|| ErrorKind::UndefinedLabel(name.clone())),
        }
    }

    fn expect_const(&self) -> Result<i64, ErrorKind> {
        match self {
            Value::Const(v) | Value::Addr(v) => Ok(*v),
            Value::Label(name) => Err(ErrorKind::UndefinedLabel(name.clone())),
        }
    }
}

/// Index register of a brief-format indexed mode, e.g. `D1.L*4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexReg {
    pub addr: bool,
    pub num: u8,
    pub long: bool,
    /// 1, 2, 4 or 8.
    pub scale: u8,
}

impl IndexReg {
    fn scale_code(self) -> Result<u16, ErrorKind> {
        Ok(match self.scale {
            1 => 0,
            2 => 1,
            4 => 2,
            8 => 3,
            other => return Err(ErrorKind::range("index scale", other as i64, 1, 8)),
        })
    }

    /// Brief extension word with the given 8-bit displacement.
    pub fn brief_word(self, disp: i64) -> Result<u16, ErrorKind> {
        let disp = ErrorKind::check_range("index displacement", disp, -128, 127)?;
        let mut w = (self.num as u16 & 7) << 12;
        if self.addr {
            w |= 0x8000;
        }
        if self.long {
            w |= 0x0800;
        }
        w |= self.scale_code()? << 9;
        Ok(w | (disp as u8) as u16)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EaExpr {
    DataReg(u8),
    AddrReg(u8),
    AddrInd(u8),
    PostInc(u8),
    PreDec(u8),
    Disp16 { an: u8, disp: Value },
    /// `d16(PC)`. A constant is the raw displacement; a label or an
    /// address is the target.
    PcDisp { disp: Value },
    Index { an: u8, idx: IndexReg, disp: Value },
    PcIndex { idx: IndexReg, disp: Value },
    AbsShort(Value),
    AbsLong(Value),
    Immediate(Value),
    Sr,
    Ccr,
    Usp,
    None,
}

/// Encoded form of an [`EaExpr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EaBits {
    pub mode: u8,
    pub reg: u8,
    pub ext: Vec<u16>,
}

impl EaBits {
    /// `mode << 3 | reg`, the layout of bits 5-0 of most opcodes.
    pub fn field(&self) -> u16 {
        ((self.mode as u16) << 3) | self.reg as u16
    }
}

impl EaExpr {
    /// The mode and register fields.
    pub fn mode_reg(&self) -> Result<(u8, u8), ErrorKind> {
        Ok(match self {
            EaExpr::DataReg(n) => (0, *n),
            EaExpr::AddrReg(n) => (1, *n),
            EaExpr::AddrInd(n) => (2, *n),
            EaExpr::PostInc(n) => (3, *n),
            EaExpr::PreDec(n) => (4, *n),
            EaExpr::Disp16 { an, .. } => (5, *an),
            EaExpr::Index { an, .. } => (6, *an),
            EaExpr::AbsShort(_) => (7, 0),
            EaExpr::AbsLong(_) => (7, 1),
            EaExpr::PcDisp { .. } => (7, 2),
            EaExpr::PcIndex { .. } => (7, 3),
            EaExpr::Immediate(_) => (7, 4),
            EaExpr::Sr | EaExpr::Ccr | EaExpr::Usp | EaExpr::None => {
                return Err(ErrorKind::UnsupportedAddressingMode(self.describe().into()))
            }
        })
    }

    /// The register number of the register-bearing modes.
    pub fn reg_num(&self) -> Option<u8> {
        match self {
            EaExpr::DataReg(n)
            | EaExpr::AddrReg(n)
            | EaExpr::AddrInd(n)
            | EaExpr::PostInc(n)
            | EaExpr::PreDec(n) => Some(*n),
            EaExpr::Disp16 { an, .. } | EaExpr::Index { an, .. } => Some(*an),
            _ => None,
        }
    }

    /// Bytes of extension words this operand adds. Only immediates depend
    /// on the operation size.
    pub fn ext_len(&self, size: Size) -> u32 {
        match self {
            EaExpr::Disp16 { .. }
            | EaExpr::PcDisp { .. }
            | EaExpr::Index { .. }
            | EaExpr::PcIndex { .. }
            | EaExpr::AbsShort(_) => 2,
            EaExpr::AbsLong(_) => 4,
            EaExpr::Immediate(_) => imm_len(size),
            _ => 0,
        }
    }

    /// Replaces labels by their final values. PC-relative targets become
    /// displacements from `ext_pc`, the address of the first extension
    /// word.
    pub fn resolve(&self, symbols: &FinalSymbols, ext_pc: u32) -> Result<EaExpr, ErrorKind> {
        let pc_rel = |v: &Value| -> Result<Value, ErrorKind> {
            Ok(match v {
                Value::Const(d) => Value::Const(*d),
                Value::Label(_) | Value::Addr(_) => Value::Const(v.resolve(symbols)? - ext_pc as i64),
            })
        };
        let abs = |v: &Value| v.resolve(symbols).map(Value::Const);
        Ok(match self {
            EaExpr::Disp16 { an, disp } => EaExpr::Disp16 {
                an: *an,
                disp: abs(disp)?,
            },
            EaExpr::Index { an, idx, disp } => EaExpr::Index {
                an: *an,
                idx: *idx,
                disp: abs(disp)?,
            },
            EaExpr::PcDisp { disp } => EaExpr::PcDisp { disp: pc_rel(disp)? },
            EaExpr::PcIndex { idx, disp } => EaExpr::PcIndex {
                idx: *idx,
                disp: pc_rel(disp)?,
            },
            EaExpr::AbsShort(v) => EaExpr::AbsShort(abs(v)?),
            EaExpr::AbsLong(v) => EaExpr::AbsLong(abs(v)?),
            EaExpr::Immediate(v) => EaExpr::Immediate(abs(v)?),
            other => other.clone(),
        })
    }

    /// Encodes a resolved operand. `size` selects the immediate width.
    pub fn encode(&self, size: Size) -> Result<EaBits, ErrorKind> {
        let (mode, reg) = self.mode_reg()?;
        let ext = match self {
            EaExpr::Disp16 { disp, .. } | EaExpr::PcDisp { disp } => {
                let d = ErrorKind::check_range("displacement", disp.expect_const()?, -32768, 32767)?;
                vec![d as u16]
            }
            EaExpr::Index { idx, disp, .. } | EaExpr::PcIndex { idx, disp } => {
                vec![idx.brief_word(disp.expect_const()?)?]
            }
            EaExpr::AbsShort(v) => {
                let a = v.expect_const()?;
                let a = if (0xFFFF_8000..=0xFFFF_FFFF).contains(&a) {
                    a - 0x1_0000_0000
                } else {
                    a
                };
                vec![ErrorKind::check_range("absolute short address", a, -32768, 32767)? as u16]
            }
            EaExpr::AbsLong(v) => {
                let a = ErrorKind::check_range("absolute address", v.expect_const()?, i32::MIN as i64, u32::MAX as i64)?;
                long_words(a)
            }
            EaExpr::Immediate(v) => imm_words(v.expect_const()?, size)?,
            _ => Vec::new(),
        };
        Ok(EaBits { mode, reg, ext })
    }

    pub fn is_data(&self) -> bool {
        !matches!(
            self,
            EaExpr::AddrReg(_) | EaExpr::Sr | EaExpr::Ccr | EaExpr::Usp | EaExpr::None
        )
    }

    pub fn is_memory(&self) -> bool {
        !matches!(
            self,
            EaExpr::DataReg(_) | EaExpr::AddrReg(_) | EaExpr::Sr | EaExpr::Ccr | EaExpr::Usp | EaExpr::None
        )
    }

    pub fn is_control(&self) -> bool {
        matches!(
            self,
            EaExpr::AddrInd(_)
                | EaExpr::Disp16 { .. }
                | EaExpr::Index { .. }
                | EaExpr::AbsShort(_)
                | EaExpr::AbsLong(_)
                | EaExpr::PcDisp { .. }
                | EaExpr::PcIndex { .. }
        )
    }

    pub fn is_alterable(&self) -> bool {
        !matches!(
            self,
            EaExpr::Immediate(_)
                | EaExpr::PcDisp { .. }
                | EaExpr::PcIndex { .. }
                | EaExpr::Sr
                | EaExpr::Ccr
                | EaExpr::Usp
                | EaExpr::None
        )
    }

    pub fn is_data_alterable(&self) -> bool {
        self.is_data() && self.is_alterable()
    }

    pub fn is_memory_alterable(&self) -> bool {
        self.is_memory() && self.is_alterable()
    }

    pub fn is_control_alterable(&self) -> bool {
        self.is_control() && self.is_alterable()
    }

    pub fn describe(&self) -> &'static str {
        match self {
            EaExpr::DataReg(_) => "data register",
            EaExpr::AddrReg(_) => "address register",
            EaExpr::AddrInd(_) => "(An)",
            EaExpr::PostInc(_) => "(An)+",
            EaExpr::PreDec(_) => "-(An)",
            EaExpr::Disp16 { .. } => "d16(An)",
            EaExpr::PcDisp { .. } => "d16(PC)",
            EaExpr::Index { .. } => "d8(An,Xn)",
            EaExpr::PcIndex { .. } => "d8(PC,Xn)",
            EaExpr::AbsShort(_) => "absolute short",
            EaExpr::AbsLong(_) => "absolute long",
            EaExpr::Immediate(_) => "immediate",
            EaExpr::Sr => "SR",
            EaExpr::Ccr => "CCR",
            EaExpr::Usp => "USP",
            EaExpr::None => "no operand",
        }
    }
}

pub fn imm_len(size: Size) -> u32 {
    match size {
        Size::Long => 4,
        _ => 2,
    }
}

/// Immediate extension words: bytes occupy the low half of one word.
pub fn imm_words(value: i64, size: Size) -> Result<Vec<u16>, ErrorKind> {
    check_imm(value, size)?;
    Ok(match size {
        Size::Byte | Size::Short => vec![value as u8 as u16],
        Size::Word => vec![value as u16],
        Size::Long => long_words(value),
    })
}

/// Accepts both the signed and unsigned spelling of a `size`-wide value.
pub fn check_imm(value: i64, size: Size) -> Result<i64, ErrorKind> {
    match size {
        Size::Byte | Size::Short => ErrorKind::check_range("immediate", value, -128, 255),
        Size::Word => ErrorKind::check_range("immediate", value, -32768, 65535),
        Size::Long => ErrorKind::check_range("immediate", value, i32::MIN as i64, u32::MAX as i64),
    }
}

fn long_words(value: i64) -> Vec<u16> {
    let v = value as u32;
    vec![(v >> 16) as u16, v as u16]
}
