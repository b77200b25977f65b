use m68kasm::ListingEntry;

/// A run of bytes at consecutive addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub base: u32,
    pub bytes: Vec<u8>,
}

impl Segment {
    pub fn end(&self) -> u32 {
        self.base.wrapping_add(self.bytes.len() as u32)
    }
}

/// Groups listing entries into contiguous segments; entries without
/// bytes are skipped.
pub fn segments(listing: &[ListingEntry]) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    for e in listing.iter().filter(|e| !e.bytes.is_empty()) {
        match out.last_mut() {
            Some(seg) if seg.end() == e.pc => seg.bytes.extend_from_slice(&e.bytes),
            _ => out.push(Segment {
                base: e.pc,
                bytes: e.bytes.clone(),
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(line: usize, pc: u32, bytes: &[u8]) -> ListingEntry {
        ListingEntry {
            line,
            pc,
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn merges_adjacent_entries() {
        let listing = vec![
            entry(1, 0x100, &[0x4E, 0x71]),
            entry(2, 0x102, &[]),
            entry(3, 0x102, &[0x4E, 0x75]),
            entry(4, 0x200, &[1]),
        ];
        assert_eq!(
            segments(&listing),
            vec![
                Segment {
                    base: 0x100,
                    bytes: vec![0x4E, 0x71, 0x4E, 0x75]
                },
                Segment {
                    base: 0x200,
                    bytes: vec![1]
                },
            ]
        );
    }
}
