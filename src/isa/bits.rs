//! Shifts, rotates, and single-bit operations.

use super::defs::{Field as F, FormDef, InstrDef, OperandKind::*, Size, Sizes, Trailer as T, Validator};
use super::table::InstrTable;
use super::validate as v;

/// (mnemonic, register-form skeleton, memory-form skeleton)
const SHIFTS: &[(&str, u16, u16)] = &[
    ("ASR", 0xE000, 0xE0C0),
    ("ASL", 0xE100, 0xE1C0),
    ("LSR", 0xE008, 0xE2C0),
    ("LSL", 0xE108, 0xE3C0),
    ("ROXR", 0xE010, 0xE4C0),
    ("ROXL", 0xE110, 0xE5C0),
    ("ROR", 0xE018, 0xE6C0),
    ("ROL", 0xE118, 0xE7C0),
];

/// (mnemonic, `Dn,<ea>` skeleton, `#n,<ea>` skeleton)
const BIT_OPS: &[(&str, u16, u16)] = &[
    ("BTST", 0x0100, 0x0800),
    ("BCHG", 0x0140, 0x0840),
    ("BCLR", 0x0180, 0x0880),
    ("BSET", 0x01C0, 0x08C0),
];

fn shift_forms(reg: u16, mem: u16) -> Vec<FormDef> {
    vec![
        FormDef::new(&[Imm, Dn], Sizes::BWL, Size::Word, reg, &[F::Quick3, F::Size, F::DstReg], &[])
            .check(v::shift_count),
        // Count in a register sets bit 5.
        FormDef::new(&[Dn, Dn], Sizes::BWL, Size::Word, reg | 0x0020, &[F::SrcRegHi, F::Size, F::DstReg], &[]),
        FormDef::new(&[Ea], Sizes::WORD, Size::Word, mem, &[F::DstEa], &[T::DstExt]).check(v::shift_mem),
    ]
}

fn bit_forms(mnemonic: &str, dynamic: u16, fixed: u16) -> Vec<FormDef> {
    let (dyn_check, fixed_check): (Validator, Validator) = if mnemonic == "BTST" {
        (v::btst_dynamic, v::btst_static)
    } else {
        (v::bit_dynamic, v::bit_static)
    };
    let sizes = Sizes::BYTE | Sizes::LONG;
    vec![
        FormDef::new(&[Dn, Ea], sizes, Size::Long, dynamic, &[F::SrcRegHi, F::DstEa], &[T::DstExt])
            .check(dyn_check),
        FormDef::new(&[Imm, Ea], sizes, Size::Long, fixed, &[F::DstEa], &[T::SrcImm(Size::Byte), T::DstExt])
            .check(fixed_check),
    ]
}

pub fn register(t: &mut InstrTable) {
    for &(name, reg, mem) in SHIFTS {
        t.insert(InstrDef::new(name, shift_forms(reg, mem)));
    }
    for &(name, dynamic, fixed) in BIT_OPS {
        t.insert(InstrDef::new(name, bit_forms(name, dynamic, fixed)));
    }
    t.insert(InstrDef::new(
        "TAS",
        vec![FormDef::new(&[Ea], Sizes::BYTE, Size::Byte, 0x4AC0, &[F::DstEa], &[T::DstExt]).check(v::data_alterable_dst)],
    ));
}
