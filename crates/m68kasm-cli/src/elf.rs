//! Minimal ELF32 big-endian executable for the 68000: one file header, one
//! `PT_LOAD` program header, then the image. No section headers.

const EHDR_SIZE: u16 = 52;
const PHDR_SIZE: u16 = 32;

const ET_EXEC: u16 = 2;
const EM_68K: u16 = 4;
const EV_CURRENT: u32 = 1;
const PT_LOAD: u32 = 1;
const PF_X: u32 = 1;
const PF_R: u32 = 4;

/// File offset of the loadable bytes.
pub const PAYLOAD_OFFSET: u32 = EHDR_SIZE as u32 + PHDR_SIZE as u32;

pub fn write_elf(bytes: &[u8], origin: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(PAYLOAD_OFFSET as usize + bytes.len());

    // e_ident: class 32, big-endian, version 1, System V ABI
    out.extend_from_slice(&[0x7F, b'E', b'L', b'F', 1, 2, 1, 0]);
    out.extend_from_slice(&[0; 8]);
    put16(&mut out, ET_EXEC);
    put16(&mut out, EM_68K);
    put32(&mut out, EV_CURRENT);
    put32(&mut out, origin); // e_entry
    put32(&mut out, EHDR_SIZE as u32); // e_phoff
    put32(&mut out, 0); // e_shoff
    put32(&mut out, 0); // e_flags
    put16(&mut out, EHDR_SIZE);
    put16(&mut out, PHDR_SIZE);
    put16(&mut out, 1); // e_phnum
    put16(&mut out, 0); // e_shentsize
    put16(&mut out, 0); // e_shnum
    put16(&mut out, 0); // e_shstrndx
    debug_assert_eq!(out.len(), EHDR_SIZE as usize);

    put32(&mut out, PT_LOAD);
    put32(&mut out, PAYLOAD_OFFSET);
    put32(&mut out, origin); // p_vaddr
    put32(&mut out, origin); // p_paddr
    put32(&mut out, bytes.len() as u32); // p_filesz
    put32(&mut out, bytes.len() as u32); // p_memsz
    put32(&mut out, PF_R | PF_X);
    put32(&mut out, 4); // p_align

    out.extend_from_slice(bytes);
    out
}

fn put16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn put32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn be32(b: &[u8], at: usize) -> u32 {
        u32::from_be_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
    }

    fn be16(b: &[u8], at: usize) -> u16 {
        u16::from_be_bytes([b[at], b[at + 1]])
    }

    #[test]
    fn header_layout() {
        let img = write_elf(&[0x4E, 0x71, 0x4E, 0x75], 0x1000);
        assert_eq!(img.len(), 84 + 4);
        assert_eq!(&img[..6], &[0x7F, b'E', b'L', b'F', 1, 2]);
        assert_eq!(be16(&img, 16), ET_EXEC);
        assert_eq!(be16(&img, 18), EM_68K);
        assert_eq!(be32(&img, 24), 0x1000);
        assert_eq!(be32(&img, 28), 52);
        assert_eq!(be32(&img, 32), 0);
        assert_eq!(be16(&img, 40), 52);
        assert_eq!(be16(&img, 42), 32);
        assert_eq!(be16(&img, 44), 1);
        assert_eq!(be16(&img, 48), 0);
    }

    #[test]
    fn single_load_segment() {
        let img = write_elf(&[1, 2, 3], 0x400);
        let ph = 52;
        assert_eq!(be32(&img, ph), PT_LOAD);
        assert_eq!(be32(&img, ph + 4), 84);
        assert_eq!(be32(&img, ph + 8), 0x400);
        assert_eq!(be32(&img, ph + 12), 0x400);
        assert_eq!(be32(&img, ph + 16), 3);
        assert_eq!(be32(&img, ph + 20), 3);
        assert_eq!(be32(&img, ph + 24), 5);
        assert_eq!(be32(&img, ph + 28), 4);
        assert_eq!(&img[84..], &[1, 2, 3]);
    }
}
