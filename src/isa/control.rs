//! Program control: branches, conditional sets, jumps, traps, and the
//! no-operand system instructions.

use super::defs::{Field as F, FormDef, InstrDef, OperandKind::*, Size, Sizes, Trailer as T};
use super::table::InstrTable;
use super::validate as v;

/// `Bcc` mnemonics. Condition 0 and 1 are `BRA` and `BSR` rather than
/// always/never.
const BRANCHES: &[(&str, u16)] = &[
    ("BRA", 0x0),
    ("BSR", 0x1),
    ("BHI", 0x2),
    ("BLS", 0x3),
    ("BCC", 0x4),
    ("BHS", 0x4),
    ("BCS", 0x5),
    ("BLO", 0x5),
    ("BNE", 0x6),
    ("BEQ", 0x7),
    ("BVC", 0x8),
    ("BVS", 0x9),
    ("BPL", 0xA),
    ("BMI", 0xB),
    ("BGE", 0xC),
    ("BLT", 0xD),
    ("BGT", 0xE),
    ("BLE", 0xF),
];

const DBCC: &[(&str, u16)] = &[
    ("DBT", 0x0),
    ("DBF", 0x1),
    ("DBRA", 0x1),
    ("DBHI", 0x2),
    ("DBLS", 0x3),
    ("DBCC", 0x4),
    ("DBHS", 0x4),
    ("DBCS", 0x5),
    ("DBLO", 0x5),
    ("DBNE", 0x6),
    ("DBEQ", 0x7),
    ("DBVC", 0x8),
    ("DBVS", 0x9),
    ("DBPL", 0xA),
    ("DBMI", 0xB),
    ("DBGE", 0xC),
    ("DBLT", 0xD),
    ("DBGT", 0xE),
    ("DBLE", 0xF),
];

const SCC: &[(&str, u16)] = &[
    ("ST", 0x0),
    ("SF", 0x1),
    ("SHI", 0x2),
    ("SLS", 0x3),
    ("SCC", 0x4),
    ("SHS", 0x4),
    ("SCS", 0x5),
    ("SLO", 0x5),
    ("SNE", 0x6),
    ("SEQ", 0x7),
    ("SVC", 0x8),
    ("SVS", 0x9),
    ("SPL", 0xA),
    ("SMI", 0xB),
    ("SGE", 0xC),
    ("SLT", 0xD),
    ("SGT", 0xE),
    ("SLE", 0xF),
];

/// Single-word instructions without operands.
const INHERENT: &[(&str, u16)] = &[
    ("ILLEGAL", 0x4AFC),
    ("RESET", 0x4E70),
    ("NOP", 0x4E71),
    ("RTE", 0x4E73),
    ("RTS", 0x4E75),
    ("TRAPV", 0x4E76),
    ("RTR", 0x4E77),
];

pub fn register(t: &mut InstrTable) {
    for &(name, cc) in BRANCHES {
        t.insert(InstrDef::new(
            name,
            vec![FormDef::new(&[Target], Sizes::BRANCH, Size::Word, 0x6000 | cc << 8, &[F::Branch8], &[T::BranchDisp])],
        ));
    }
    for &(name, cc) in DBCC {
        t.insert(InstrDef::new(
            name,
            vec![FormDef::new(&[Dn, Target], Sizes::WORD, Size::Word, 0x50C8 | cc << 8, &[F::SrcReg], &[T::BranchDisp])],
        ));
    }
    for &(name, cc) in SCC {
        t.insert(InstrDef::new(
            name,
            vec![FormDef::new(&[Ea], Sizes::BYTE, Size::Byte, 0x50C0 | cc << 8, &[F::DstEa], &[T::DstExt])
                .check(v::data_alterable_dst)],
        ));
    }
    for &(name, word) in INHERENT {
        t.insert(InstrDef::new(name, vec![FormDef::new(&[], Sizes::empty(), Size::Word, word, &[], &[])]));
    }

    t.insert(InstrDef::new(
        "JMP",
        vec![FormDef::new(&[Ea], Sizes::empty(), Size::Long, 0x4EC0, &[F::DstEa], &[T::DstExt]).check(v::control_dst)],
    ));
    t.insert(InstrDef::new(
        "JSR",
        vec![FormDef::new(&[Ea], Sizes::empty(), Size::Long, 0x4E80, &[F::DstEa], &[T::DstExt]).check(v::control_dst)],
    ));
    t.insert(InstrDef::new(
        "TRAP",
        vec![FormDef::new(&[Imm], Sizes::empty(), Size::Word, 0x4E40, &[F::Vector], &[]).check(v::trap)],
    ));
    t.insert(InstrDef::new(
        "STOP",
        vec![FormDef::new(&[Imm], Sizes::empty(), Size::Word, 0x4E72, &[], &[T::SrcImm(Size::Word)])],
    ));
}
