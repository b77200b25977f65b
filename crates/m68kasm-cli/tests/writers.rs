use m68kasm::assemble;
use m68kasm_cli::{elf::PAYLOAD_OFFSET, segments, write_output, OutputFormat};
use pretty_assertions::assert_eq;

const SOURCE: &str = "\
        .org $1000
start:  moveq #1,d0
        bra.s start
        .org $1010
        .word $CAFE
";

#[test]
fn flat_binary_is_the_image() {
    let asm = assemble(SOURCE).unwrap();
    let bin = write_output(OutputFormat::Bin, &asm, "t");
    assert_eq!(bin.len(), 0x12);
    assert_eq!(&bin[..4], &[0x70, 0x01, 0x60, 0xFC]);
    assert_eq!(&bin[0x10..], &[0xCA, 0xFE]);
}

#[test]
fn elf_wraps_the_image_at_origin() {
    let asm = assemble(SOURCE).unwrap();
    let elf = write_output(OutputFormat::Elf, &asm, "t");
    assert_eq!(&elf[24..28], &0x1000u32.to_be_bytes());
    assert_eq!(&elf[PAYLOAD_OFFSET as usize..], asm.bytes.as_slice());
}

#[test]
fn srec_covers_every_byte_once() {
    let asm = assemble(SOURCE).unwrap();
    let text = String::from_utf8(write_output(OutputFormat::Srec, &asm, "t")).unwrap();
    let mut data = Vec::new();
    for line in text.lines().filter(|l| l.starts_with("S3")) {
        let count = usize::from_str_radix(&line[2..4], 16).unwrap();
        let payload = &line[12..12 + (count - 5) * 2];
        for i in (0..payload.len()).step_by(2) {
            data.push(u8::from_str_radix(&payload[i..i + 2], 16).unwrap());
        }
    }
    assert_eq!(data, asm.bytes);
    assert!(text.lines().last().is_some_and(|l| l.starts_with("S70500001000")));
    // padding is contiguous with the code, so one segment
    assert_eq!(segments(&asm.listing).len(), 1);
}
