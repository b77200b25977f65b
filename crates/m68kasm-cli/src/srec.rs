//! Motorola S-record output (`S0`/`S3`/`S7`).

use std::fmt::Write as _;

use m68kasm::ListingEntry;

use crate::image::segments;

/// Data bytes per `S3` record.
pub const RECORD_DATA: usize = 16;
/// Longest module name carried by the `S0` record; longer names are cut.
pub const HEADER_DATA: usize = 64;

pub fn write_srec(name: &str, listing: &[ListingEntry], origin: u32) -> String {
    let mut out = String::new();
    let name = name.as_bytes();
    record(&mut out, 0, &[0, 0], &name[..name.len().min(HEADER_DATA)]);
    for seg in segments(listing) {
        for (i, chunk) in seg.bytes.chunks(RECORD_DATA).enumerate() {
            let addr = seg.base.wrapping_add((i * RECORD_DATA) as u32);
            record(&mut out, 3, &addr.to_be_bytes(), chunk);
        }
    }
    record(&mut out, 7, &origin.to_be_bytes(), &[]);
    out
}

/// One record line. The count covers address, data and checksum bytes.
fn record(out: &mut String, kind: u8, addr: &[u8], data: &[u8]) {
    let count = (addr.len() + data.len() + 1) as u8;
    let sum = addr
        .iter()
        .chain(data)
        .fold(count, |acc, &b| acc.wrapping_add(b));
    let _ = write!(out, "S{kind}{count:02X}");
    for b in addr.iter().chain(data) {
        let _ = write!(out, "{b:02X}");
    }
    let _ = writeln!(out, "{:02X}", !sum);
}
