//! Human-readable and JSON listings.

use std::fmt::Write as _;

use serde::Serialize;

use m68kasm::ListingEntry;

const BYTES_PER_ROW: usize = 8;
/// Rows shown for one entry before the remainder is summarised.
const MAX_ROWS: usize = 4;

#[derive(Debug, Serialize)]
struct Row<'a> {
    line: usize,
    pc: u32,
    bytes: String,
    source: &'a str,
}

fn hex(bytes: &[u8], sep: &str) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(sep)
}

fn source_line(source: &str, line: usize) -> &str {
    line.checked_sub(1)
        .and_then(|i| source.lines().nth(i))
        .map(str::trim_end)
        .unwrap_or("")
}

/// `PC  BYTES  LINE  SOURCE`, one row per eight bytes.
pub fn render_text(source: &str, listing: &[ListingEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8}  {:<23}  {:>5}  SOURCE", "PC", "BYTES", "LINE");
    for e in listing {
        let src = source_line(source, e.line);
        let mut rows = e.bytes.chunks(BYTES_PER_ROW);
        let first = rows.next().unwrap_or(&[]);
        let _ = writeln!(out, "{:08X}  {:<23}  {:>5}  {src}", e.pc, hex(first, " "), e.line);
        for (i, row) in rows.enumerate() {
            let shown = (i + 2) * BYTES_PER_ROW;
            if i + 1 == MAX_ROWS {
                let rest = e.bytes.len() + BYTES_PER_ROW - shown;
                let _ = writeln!(out, "{:8}  ... {rest} more bytes", "");
                break;
            }
            let pc = e.pc.wrapping_add((shown - BYTES_PER_ROW) as u32);
            let _ = writeln!(out, "{pc:08X}  {}", hex(row, " "));
        }
    }
    out
}

pub fn render_json(source: &str, listing: &[ListingEntry]) -> serde_json::Result<String> {
    let rows: Vec<Row<'_>> = listing
        .iter()
        .map(|e| Row {
            line: e.line,
            pc: e.pc,
            bytes: hex(&e.bytes, ""),
            source: source_line(source, e.line).trim(),
        })
        .collect();
    serde_json::to_string_pretty(&rows)
}
