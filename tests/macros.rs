use m68kasm::{assemble, ErrorKind};
use pretty_assertions::assert_eq;

const DELAY: &str = "\
.macro DELAY lbl, count
        move.w #count,d0
lbl:    dbra d0,lbl
.endmacro
";

#[test]
fn distinct_label_arguments_do_not_collide() {
    let asm = assemble(&format!("{DELAY}        DELAY wait1, 10\n        DELAY wait2, 20\n")).unwrap();
    assert_eq!(
        asm.bytes,
        vec![0x30, 0x3C, 0x00, 0x0A, 0x51, 0xC8, 0xFF, 0xFC, 0x30, 0x3C, 0x00, 0x14, 0x51, 0xC8, 0xFF, 0xFC]
    );
    assert_eq!(asm.symbols.resolve_final("wait1"), Some(4));
    assert_eq!(asm.symbols.resolve_final("wait2"), Some(12));
}

#[test]
fn same_label_argument_collides() {
    let err = assemble(&format!("{DELAY}DELAY spin, 1\nDELAY spin, 2\n")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::SymbolRedefined("spin".into()));
    assert_eq!(err.line, 6);
}

#[test]
fn expansion_lines_point_at_the_invocation() {
    let asm = assemble(&format!("{DELAY}nop\nDELAY w, 3\n")).unwrap();
    let lines: Vec<usize> = asm.listing.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![5, 6, 6]);
}

#[test]
fn names_are_case_insensitive_and_shadow_mnemonics() {
    let src = ".macro NOP\n  moveq #0,d0\n.endm\nnop\nNop\n";
    assert_eq!(assemble(src).unwrap().bytes, vec![0x70, 0x00, 0x70, 0x00]);
}

#[test]
fn nested_invocations() {
    let src = "\
.macro PUSH r
        move.l r,-(sp)
.endmacro
.macro PUSH2 a, b
        PUSH a
        PUSH b
.endmacro
        PUSH2 d0, a6
";
    assert_eq!(assemble(src).unwrap().bytes, vec![0x2F, 0x00, 0x2F, 0x0E]);
}

#[test]
fn arguments_may_be_expressions() {
    let src = ".macro LOAD v, r\n moveq #v,r\n.endmacro\nLOAD 2*3, d1\nLOAD -1, d2\n";
    assert_eq!(assemble(src).unwrap().bytes, vec![0x72, 0x06, 0x74, 0xFF]);
}

#[test]
fn arity_and_definition_errors() {
    let err = assemble(&format!("{DELAY}DELAY only\n")).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::MacroArity {
            name: "DELAY".into(),
            expected: 2,
            got: 1
        }
    );
    let err = assemble(&format!("{DELAY}{DELAY}")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MacroRedefined("DELAY".into()));
    assert!(assemble(".endmacro\n").is_err());
    assert!(assemble(".macro A\n.macro B\n.endm\n.endm\n").is_err());
}

#[test]
fn runaway_recursion_is_bounded() {
    let err = assemble(".macro R x\nR x\n.endmacro\nR 1\n").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MacroDepth(_)));
    assert_eq!(err.line, 4);
}
