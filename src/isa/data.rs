//! Data movement: `MOVE` and its variants, address loads, register swaps.

use super::defs::{Field as F, FormDef, InstrDef, OperandKind::*, Size, Sizes, Trailer as T};
use super::table::InstrTable;
use super::validate as v;

fn movea_form() -> FormDef {
    FormDef::new(&[Ea, An], Sizes::WL, Size::Word, 0x0040, &[F::SizeMove, F::DstRegHi, F::SrcEa], &[T::SrcExt])
}

fn move_forms() -> Vec<FormDef> {
    vec![
        FormDef::new(&[Ea, Ccr], Sizes::WORD, Size::Word, 0x44C0, &[F::SrcEa], &[T::SrcExt]).check(v::data_src),
        FormDef::new(&[Ea, Sr], Sizes::WORD, Size::Word, 0x46C0, &[F::SrcEa], &[T::SrcExt]).check(v::data_src),
        FormDef::new(&[Sr, Ea], Sizes::WORD, Size::Word, 0x40C0, &[F::DstEa], &[T::DstExt]).check(v::data_alterable_dst),
        FormDef::new(&[Usp, An], Sizes::LONG, Size::Long, 0x4E68, &[F::DstReg], &[]),
        FormDef::new(&[An, Usp], Sizes::LONG, Size::Long, 0x4E60, &[F::SrcReg], &[]),
        movea_form(),
        FormDef::new(&[Ea, Ea], Sizes::BWL, Size::Word, 0x0000, &[F::SizeMove, F::MoveDst, F::SrcEa], &[T::SrcExt, T::DstExt])
            .check(v::mov),
    ]
}

pub fn register(t: &mut InstrTable) {
    t.insert(InstrDef::new("MOVE", move_forms()));
    t.insert(InstrDef::new("MOVEA", vec![movea_form()]));
    t.insert(InstrDef::new(
        "MOVEQ",
        vec![FormDef::new(&[Imm, Dn], Sizes::LONG, Size::Long, 0x7000, &[F::Quick8, F::DstRegHi], &[]).check(v::moveq)],
    ));
    t.insert(InstrDef::new(
        "MOVEM",
        vec![
            FormDef::new(&[RegList, Ea], Sizes::WL, Size::Word, 0x4880, &[F::Size6, F::DstEa], &[T::RegMask, T::DstExt])
                .check(v::movem_store),
            FormDef::new(&[Ea, RegList], Sizes::WL, Size::Word, 0x4C80, &[F::Size6, F::SrcEa], &[T::RegMask, T::SrcExt])
                .check(v::movem_load),
        ],
    ));
    t.insert(InstrDef::new(
        "MOVEP",
        vec![
            FormDef::new(&[Dn, Disp16An], Sizes::WL, Size::Word, 0x0188, &[F::Size6, F::SrcRegHi, F::DstReg], &[T::DstExt]),
            FormDef::new(&[Disp16An, Dn], Sizes::WL, Size::Word, 0x0108, &[F::Size6, F::DstRegHi, F::SrcReg], &[T::SrcExt]),
        ],
    ));

    t.insert(InstrDef::new(
        "LEA",
        vec![FormDef::new(&[Ea, An], Sizes::LONG, Size::Long, 0x41C0, &[F::DstRegHi, F::SrcEa], &[T::SrcExt]).check(v::control_src)],
    ));
    t.insert(InstrDef::new(
        "PEA",
        vec![FormDef::new(&[Ea], Sizes::LONG, Size::Long, 0x4840, &[F::DstEa], &[T::DstExt]).check(v::control_dst)],
    ));

    t.insert(InstrDef::new(
        "EXG",
        vec![
            FormDef::new(&[Dn, Dn], Sizes::LONG, Size::Long, 0xC140, &[F::SrcRegHi, F::DstReg], &[]),
            FormDef::new(&[An, An], Sizes::LONG, Size::Long, 0xC148, &[F::SrcRegHi, F::DstReg], &[]),
            FormDef::new(&[Dn, An], Sizes::LONG, Size::Long, 0xC188, &[F::SrcRegHi, F::DstReg], &[]),
            // The data register always sits in bits 11-9.
            FormDef::new(&[An, Dn], Sizes::LONG, Size::Long, 0xC188, &[F::DstRegHi, F::SrcReg], &[]),
        ],
    ));
    t.insert(InstrDef::new(
        "SWAP",
        vec![FormDef::new(&[Dn], Sizes::WORD, Size::Word, 0x4840, &[F::DstReg], &[])],
    ));
    t.insert(InstrDef::new(
        "LINK",
        vec![FormDef::new(&[An, Imm], Sizes::WORD, Size::Word, 0x4E50, &[F::SrcReg], &[T::DstImm(Size::Word)]).check(v::link)],
    ));
    t.insert(InstrDef::new(
        "UNLK",
        vec![FormDef::new(&[An], Sizes::empty(), Size::Long, 0x4E58, &[F::DstReg], &[])],
    ));
}
