//! Bitwise logic, including the immediate forms targeting CCR and SR.

use super::defs::{Field as F, FormDef, InstrDef, OperandKind::*, Size, Sizes, Trailer as T};
use super::table::InstrTable;
use super::validate as v;

/// `#imm,CCR`, `#imm,SR` and `#imm,<ea>`. The CCR and SR skeletons are the
/// immediate opcode with the `#imm` mode bits at byte and word size.
fn immediate_forms(i_base: u16) -> Vec<FormDef> {
    vec![
        FormDef::new(&[Imm, Ccr], Sizes::BYTE, Size::Byte, i_base | 0x003C, &[], &[T::SrcImm(Size::Byte)]),
        FormDef::new(&[Imm, Sr], Sizes::WORD, Size::Word, i_base | 0x007C, &[], &[T::SrcImm(Size::Word)]),
        FormDef::new(&[Imm, Ea], Sizes::BWL, Size::Word, i_base, &[F::Size, F::DstEa], &[T::SrcExt, T::DstExt])
            .check(v::data_alterable_dst),
    ]
}

/// `AND`/`OR`: `<ea>,Dn` and `Dn,<ea>`, falling back to the immediate
/// opcode for `#imm` with a non-register destination.
fn and_or_forms(base: u16, i_base: u16) -> Vec<FormDef> {
    let mut forms = vec![
        FormDef::new(&[Ea, Dn], Sizes::BWL, Size::Word, base, &[F::Size, F::DstRegHi, F::SrcEa], &[T::SrcExt])
            .check(v::data_src),
    ];
    forms.extend(immediate_forms(i_base));
    forms.push(
        FormDef::new(&[Dn, Ea], Sizes::BWL, Size::Word, base | 0x0100, &[F::Size, F::SrcRegHi, F::DstEa], &[T::DstExt])
            .check(v::mem_alterable_dst),
    );
    forms
}

pub fn register(t: &mut InstrTable) {
    t.insert(InstrDef::new("AND", and_or_forms(0xC000, 0x0200)));
    t.insert(InstrDef::new("ANDI", immediate_forms(0x0200)));
    t.insert(InstrDef::new("OR", and_or_forms(0x8000, 0x0000)));
    t.insert(InstrDef::new("ORI", immediate_forms(0x0000)));

    let mut eor = immediate_forms(0x0A00);
    eor.push(
        FormDef::new(&[Dn, Ea], Sizes::BWL, Size::Word, 0xB100, &[F::Size, F::SrcRegHi, F::DstEa], &[T::DstExt])
            .check(v::data_alterable_dst),
    );
    t.insert(InstrDef::new("EOR", eor));
    t.insert(InstrDef::new("EORI", immediate_forms(0x0A00)));

    t.insert(InstrDef::new(
        "NOT",
        vec![FormDef::new(&[Ea], Sizes::BWL, Size::Word, 0x4600, &[F::Size, F::DstEa], &[T::DstExt])
            .check(v::data_alterable_dst)],
    ));
}
