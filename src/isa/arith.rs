//! Integer and BCD arithmetic, compares, and single-operand data ops.

use super::defs::{Field as F, FormDef, InstrDef, OperandKind::*, Size, Sizes, Trailer as T};
use super::table::InstrTable;
use super::validate as v;

/// `ADD`/`SUB`: data-register, address-register, immediate and memory
/// destination forms, tried in that order.
fn add_sub_forms(base: u16, a_base: u16, i_base: u16) -> Vec<FormDef> {
    vec![
        FormDef::new(&[Ea, Dn], Sizes::BWL, Size::Word, base, &[F::Size, F::DstRegHi, F::SrcEa], &[T::SrcExt])
            .check(v::arith_to_dn),
        addr_form(a_base),
        imm_form(i_base),
        FormDef::new(&[Dn, Ea], Sizes::BWL, Size::Word, base | 0x0100, &[F::Size, F::SrcRegHi, F::DstEa], &[T::DstExt])
            .check(v::mem_alterable_dst),
    ]
}

fn addr_form(a_base: u16) -> FormDef {
    FormDef::new(&[Ea, An], Sizes::WL, Size::Word, a_base, &[F::SizeA, F::DstRegHi, F::SrcEa], &[T::SrcExt])
}

fn imm_form(i_base: u16) -> FormDef {
    FormDef::new(&[Imm, Ea], Sizes::BWL, Size::Word, i_base, &[F::Size, F::DstEa], &[T::SrcExt, T::DstExt])
        .check(v::data_alterable_dst)
}

fn quick_form(q_base: u16) -> FormDef {
    FormDef::new(&[Imm, Ea], Sizes::BWL, Size::Word, q_base, &[F::Quick3, F::Size, F::DstEa], &[T::DstExt])
        .check(v::quick)
}

/// `ADDX`/`SUBX`/`ABCD`/`SBCD`: register pair or predecrement pair.
fn extended_forms(base: u16, sizes: Sizes, default: Size, sized: bool) -> Vec<FormDef> {
    let fields: &'static [F] = if sized {
        &[F::Size, F::DstRegHi, F::SrcReg]
    } else {
        &[F::DstRegHi, F::SrcReg]
    };
    vec![
        FormDef::new(&[Dn, Dn], sizes, default, base, fields, &[]),
        FormDef::new(&[PredecAn, PredecAn], sizes, default, base | 0x0008, fields, &[]),
    ]
}

fn unary(skeleton: u16) -> Vec<FormDef> {
    vec![FormDef::new(&[Ea], Sizes::BWL, Size::Word, skeleton, &[F::Size, F::DstEa], &[T::DstExt])
        .check(v::data_alterable_dst)]
}

fn mul_div(skeleton: u16) -> Vec<FormDef> {
    vec![FormDef::new(&[Ea, Dn], Sizes::WORD, Size::Word, skeleton, &[F::DstRegHi, F::SrcEa], &[T::SrcExt])
        .check(v::data_src)]
}

pub fn register(t: &mut InstrTable) {
    t.insert(InstrDef::new("ADD", add_sub_forms(0xD000, 0xD0C0, 0x0600)));
    t.insert(InstrDef::new("ADDA", vec![addr_form(0xD0C0)]));
    t.insert(InstrDef::new("ADDI", vec![imm_form(0x0600)]));
    t.insert(InstrDef::new("ADDQ", vec![quick_form(0x5000)]));
    t.insert(InstrDef::new("ADDX", extended_forms(0xD100, Sizes::BWL, Size::Word, true)));

    t.insert(InstrDef::new("SUB", add_sub_forms(0x9000, 0x90C0, 0x0400)));
    t.insert(InstrDef::new("SUBA", vec![addr_form(0x90C0)]));
    t.insert(InstrDef::new("SUBI", vec![imm_form(0x0400)]));
    t.insert(InstrDef::new("SUBQ", vec![quick_form(0x5100)]));
    t.insert(InstrDef::new("SUBX", extended_forms(0x9100, Sizes::BWL, Size::Word, true)));

    t.insert(InstrDef::new(
        "CMP",
        vec![
            FormDef::new(&[Ea, Dn], Sizes::BWL, Size::Word, 0xB000, &[F::Size, F::DstRegHi, F::SrcEa], &[T::SrcExt])
                .check(v::arith_to_dn),
            addr_form(0xB0C0),
            imm_form(0x0C00),
        ],
    ));
    t.insert(InstrDef::new("CMPA", vec![addr_form(0xB0C0)]));
    t.insert(InstrDef::new("CMPI", vec![imm_form(0x0C00)]));
    t.insert(InstrDef::new(
        "CMPM",
        vec![FormDef::new(&[PostincAn, PostincAn], Sizes::BWL, Size::Word, 0xB108, &[F::Size, F::DstRegHi, F::SrcReg], &[])],
    ));

    t.insert(InstrDef::new("ABCD", extended_forms(0xC100, Sizes::BYTE, Size::Byte, false)));
    t.insert(InstrDef::new("SBCD", extended_forms(0x8100, Sizes::BYTE, Size::Byte, false)));
    t.insert(InstrDef::new(
        "NBCD",
        vec![FormDef::new(&[Ea], Sizes::BYTE, Size::Byte, 0x4800, &[F::DstEa], &[T::DstExt]).check(v::data_alterable_dst)],
    ));

    t.insert(InstrDef::new("MULU", mul_div(0xC0C0)));
    t.insert(InstrDef::new("MULS", mul_div(0xC1C0)));
    t.insert(InstrDef::new("DIVU", mul_div(0x80C0)));
    t.insert(InstrDef::new("DIVS", mul_div(0x81C0)));
    t.insert(InstrDef::new("CHK", mul_div(0x4180)));

    t.insert(InstrDef::new("NEG", unary(0x4400)));
    t.insert(InstrDef::new("NEGX", unary(0x4000)));
    t.insert(InstrDef::new("CLR", unary(0x4200)));
    t.insert(InstrDef::new("TST", unary(0x4A00)));
    t.insert(InstrDef::new(
        "EXT",
        vec![FormDef::new(&[Dn], Sizes::WL, Size::Word, 0x4880, &[F::Size6, F::DstReg], &[])],
    ));
}
