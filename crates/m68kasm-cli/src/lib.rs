pub mod elf;
pub mod image;
pub mod listing;
pub mod srec;

pub use image::{segments, Segment};
pub use listing::{render_json, render_text};

use m68kasm::Assembly;

/// Container written for the assembled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw bytes starting at the origin.
    Bin,
    /// ELF32 big-endian executable with one loadable segment.
    Elf,
    /// Motorola S-records.
    Srec,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Bin => "bin",
            OutputFormat::Elf => "elf",
            OutputFormat::Srec => "s19",
        }
    }
}

/// Serialises `asm` in the requested container. `name` labels the
/// S-record header.
pub fn write_output(format: OutputFormat, asm: &Assembly, name: &str) -> Vec<u8> {
    match format {
        OutputFormat::Bin => asm.bytes.clone(),
        OutputFormat::Elf => elf::write_elf(&asm.bytes, asm.origin),
        OutputFormat::Srec => srec::write_srec(name, &asm.listing, asm.origin).into_bytes(),
    }
}
