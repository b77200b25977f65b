//! Per-form operand constraints.
//!
//! Ranges are only checked for values already known; the assembler pass
//! runs every validator again once labels are resolved.

use super::defs::{Args, Size, Violation};
use crate::ea::EaExpr;

fn require(ok: bool, reason: &'static str) -> Result<(), Violation> {
    if ok {
        Ok(())
    } else {
        Err(Violation::Mode(reason))
    }
}

fn in_range(what: &'static str, value: Option<i64>, min: i64, max: i64) -> Result<(), Violation> {
    match value {
        Some(v) if v < min || v > max => Err(Violation::Range {
            what,
            value: v,
            min,
            max,
        }),
        _ => Ok(()),
    }
}

pub fn data_src(a: &Args) -> Result<(), Violation> {
    require(a.src.is_data(), "source must be a data addressing mode")
}

/// `ADD`/`SUB`/`CMP` into a data register.
pub fn arith_to_dn(a: &Args) -> Result<(), Violation> {
    require(
        !(a.size == Size::Byte && matches!(a.src, EaExpr::AddrReg(_))),
        "byte size forbids an address register source",
    )
}

pub fn mem_alterable_dst(a: &Args) -> Result<(), Violation> {
    require(a.dst.is_memory_alterable(), "destination must be memory alterable")
}

pub fn data_alterable_dst(a: &Args) -> Result<(), Violation> {
    require(a.dst.is_data_alterable(), "destination must be data alterable")
}

pub fn control_src(a: &Args) -> Result<(), Violation> {
    require(a.src.is_control(), "source must be a control addressing mode")
}

pub fn control_dst(a: &Args) -> Result<(), Violation> {
    require(a.dst.is_control(), "operand must be a control addressing mode")
}

/// `ADDQ`/`SUBQ`.
pub fn quick(a: &Args) -> Result<(), Violation> {
    in_range("quick immediate", a.src_imm(), 1, 8)?;
    require(a.dst.is_alterable(), "destination must be alterable")?;
    require(
        !(a.size == Size::Byte && matches!(a.dst, EaExpr::AddrReg(_))),
        "byte size forbids an address register destination",
    )
}

pub fn moveq(a: &Args) -> Result<(), Violation> {
    in_range("MOVEQ immediate", a.src_imm(), -128, 127)
}

pub fn shift_count(a: &Args) -> Result<(), Violation> {
    in_range("shift count", a.src_imm(), 1, 8)
}

/// Memory shifts move one bit of one word.
pub fn shift_mem(a: &Args) -> Result<(), Violation> {
    require(a.size == Size::Word, "memory shifts are word sized")?;
    require(a.dst.is_memory_alterable(), "operand must be memory alterable")
}

pub fn trap(a: &Args) -> Result<(), Violation> {
    in_range("trap vector", a.src_imm(), 0, 15)
}

pub fn link(a: &Args) -> Result<(), Violation> {
    let disp = match &a.dst {
        EaExpr::Immediate(v) => v.as_const(),
        _ => None,
    };
    in_range("LINK displacement", disp, -32768, 32767)
}

pub fn movem_store(a: &Args) -> Result<(), Violation> {
    require(
        a.dst.is_control_alterable() || matches!(a.dst, EaExpr::PreDec(_)),
        "destination must be control alterable or predecrement",
    )
}

pub fn movem_load(a: &Args) -> Result<(), Violation> {
    require(
        a.src.is_control() || matches!(a.src, EaExpr::PostInc(_)),
        "source must be a control mode or postincrement",
    )
}

pub fn mov(a: &Args) -> Result<(), Violation> {
    require(a.dst.is_data_alterable(), "destination must be data alterable")?;
    require(
        !(a.size == Size::Byte && matches!(a.src, EaExpr::AddrReg(_))),
        "byte size forbids an address register source",
    )
}

/// Register destinations are 32 bits wide, memory destinations one byte.
fn bit_size(a: &Args) -> Result<(), Violation> {
    if !a.explicit_size {
        return Ok(());
    }
    match a.dst {
        EaExpr::DataReg(_) => require(a.size == Size::Long, "data register bit operations are long"),
        _ => require(a.size == Size::Byte, "memory bit operations are byte sized"),
    }
}

fn bit_number(a: &Args) -> Result<(), Violation> {
    let max = if matches!(a.dst, EaExpr::DataReg(_)) { 31 } else { 7 };
    in_range("bit number", a.src_imm(), 0, max)
}

/// `BCHG`/`BCLR`/`BSET Dn,<ea>`.
pub fn bit_dynamic(a: &Args) -> Result<(), Violation> {
    require(a.dst.is_data_alterable(), "destination must be data alterable")?;
    bit_size(a)
}

pub fn btst_dynamic(a: &Args) -> Result<(), Violation> {
    require(
        a.dst.is_data() && !matches!(a.dst, EaExpr::Immediate(_)),
        "operand must be a data addressing mode",
    )?;
    bit_size(a)
}

pub fn bit_static(a: &Args) -> Result<(), Violation> {
    bit_dynamic(a)?;
    bit_number(a)
}

pub fn btst_static(a: &Args) -> Result<(), Violation> {
    btst_dynamic(a)?;
    bit_number(a)
}
