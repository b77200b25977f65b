use std::error::Error as _;

use m68kasm::{assemble, ErrorKind};
use pretty_assertions::assert_eq;

fn kind(src: &str) -> ErrorKind {
    assemble(src).unwrap_err().kind
}

#[test]
fn undefined_names() {
    assert_eq!(kind("jmp nowhere\n"), ErrorKind::UndefinedLabel("nowhere".into()));
    assert_eq!(kind("bra nowhere\n"), ErrorKind::UndefinedLabel("nowhere".into()));
    assert_eq!(kind(".byte nowhere\n"), ErrorKind::UndefinedSymbol("nowhere".into()));
    assert_eq!(kind("move.w #missing+1,d0\n"), ErrorKind::UndefinedSymbol("missing".into()));
}

#[test]
fn expression_failures() {
    assert_eq!(kind(".word 1/0\n"), ErrorKind::DivisionByZero);
    assert!(matches!(kind(".word (1+2\n"), ErrorKind::Syntax(_)));
    assert!(matches!(kind(".word 1+\n"), ErrorKind::Syntax(_)));
}

#[test]
fn lexical_failures() {
    assert!(matches!(kind(".byte \"open\n"), ErrorKind::Lexical(_)));
    assert!(matches!(kind("nop\n  move.w d0,d1 `\n"), ErrorKind::Lexical(_)));
}

#[test]
fn instruction_failures() {
    assert_eq!(kind("frob d0\n"), ErrorKind::UnknownMnemonic("frob".into()));
    assert!(matches!(kind("moveq #128,d0\n"), ErrorKind::Range { value: 128, .. }));
    assert!(matches!(kind("addq #0,d0\n"), ErrorKind::Range { value: 0, .. }));
    assert!(matches!(kind("trap #16\n"), ErrorKind::Range { value: 16, .. }));
    assert!(matches!(kind("move.b #256,d0\n"), ErrorKind::Range { value: 256, .. }));
    assert!(matches!(kind("move.w d0,#1\n"), ErrorKind::Validation { ref mnemonic, .. } if mnemonic == "MOVE"));
    assert!(matches!(kind("move.b a0,d0\n"), ErrorKind::Validation { .. }));
    assert!(matches!(kind("lea (a0)+,a1\n"), ErrorKind::Validation { .. }));
    assert!(matches!(kind("nop d0\n"), ErrorKind::Validation { .. }));
    assert!(matches!(kind("moveq.w #1,d0\n"), ErrorKind::Validation { .. }));
    assert!(matches!(kind("move.w 4(a0,d1.w*3),d0\n"), ErrorKind::Syntax(_) | ErrorKind::Range { .. }));
    assert!(matches!(kind("move.w 200(a0,d1.w),d0\n"), ErrorKind::Range { value: 200, .. }));
}

#[test]
fn word_branch_range() {
    // measured from the end of the four-byte branch
    assert!(assemble("bra far\n.org $8002\nfar:\n").is_ok());
    assert_eq!(
        kind("bra far\n.org $8004\nfar:\n"),
        ErrorKind::DisplacementOutOfRange { disp: 0x8000, bits: 16 }
    );
    assert!(assemble("back: nop\n.org $7FFC\nbra back\n").is_ok());
    assert_eq!(
        kind("back: nop\n.org $7FFE\nbra back\n"),
        ErrorKind::DisplacementOutOfRange { disp: -0x8002, bits: 16 }
    );
}

#[test]
fn diagnostics_render_position_and_source() {
    let err = assemble("nop\n    moveq   #300,d3   ; too big\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.col, Some(5));
    assert_eq!(
        err.to_string(),
        "line 2, col 5: MOVEQ immediate 300 out of range -128..=127\n    moveq   #300,d3   ; too big"
    );
    let cause = err.source().map(|e| e.to_string());
    assert_eq!(cause.as_deref(), Some("MOVEQ immediate 300 out of range -128..=127"));
}

#[test]
fn second_pass_errors_carry_line_text() {
    let err = assemble("start:\n  bra.s end\n  .org $100\nend: rts\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.col, None);
    assert_eq!(err.line_text.as_deref(), Some("  bra.s end"));
    assert!(err.to_string().starts_with("line 2: branch displacement"));
}
