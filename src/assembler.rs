//! Second pass: resolve operands against the complete symbol table and
//! emit machine code with a listing.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::ea::{imm_words, EaExpr, Value};
use crate::error::{AsmError, ErrorKind};
use crate::isa::defs::{Args, Field, FormDef, InstrDef, Size, Trailer};
use crate::isa::table::{table, InstrTable};
use crate::parser::{Item, Parser, Program};
use crate::symbols::FinalSymbols;

/// Upper bound on any address the program may reach (the 68000's 24-bit
/// address space).
pub const MAX_PROGRAM_SIZE: u32 = 0x100_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsmConfig {
    /// Address of the first byte unless the source opens with `.org`.
    pub origin: u32,
    pub max_program_size: u32,
}

impl Default for AsmConfig {
    fn default() -> Self {
        Self {
            origin: 0,
            max_program_size: MAX_PROGRAM_SIZE,
        }
    }
}

/// One assembled item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub line: usize,
    pub pc: u32,
    pub bytes: Vec<u8>,
}

/// Result of assembling one source unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assembly {
    /// Contiguous image starting at `origin`.
    pub bytes: Vec<u8>,
    pub listing: Vec<ListingEntry>,
    pub origin: u32,
    pub symbols: FinalSymbols,
}

pub struct Assembler<'t> {
    table: &'t InstrTable,
    config: AsmConfig,
}

impl Default for Assembler<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler<'static> {
    pub fn new() -> Self {
        Self::with_config(AsmConfig::default())
    }

    pub fn with_config(config: AsmConfig) -> Self {
        Self::with_table(table(), config)
    }
}

impl<'t> Assembler<'t> {
    /// Assembles against a caller-provided table, e.g. an extended clone of
    /// the shared one.
    pub fn with_table(table: &'t InstrTable, config: AsmConfig) -> Self {
        Self { table, config }
    }

    pub fn assemble(&self, source: &str) -> Result<Assembly, AsmError> {
        let program = self.parse(source)?;
        self.encode(&program).map_err(|e| e.with_source(source))
    }

    /// First pass only.
    pub fn parse(&self, source: &str) -> Result<Program<'t>, AsmError> {
        Parser::new(source, self.table, self.config).parse()
    }

    /// Second pass over a parsed program.
    pub fn encode(&self, program: &Program<'_>) -> Result<Assembly, AsmError> {
        let mut bytes = Vec::new();
        let mut listing = Vec::with_capacity(program.items.len());
        for item in &program.items {
            let (pc, line, out) = match item {
                Item::Data { bytes: data, pc, line } => (*pc, *line, data.clone()),
                Item::Instruction {
                    def,
                    form,
                    args,
                    pc,
                    line,
                } => {
                    let out = encode_instruction(def, form, args, *pc, &program.labels)
                        .map_err(|k| AsmError::new(k, *line, None))?;
                    trace!(line, pc, mnemonic = def.mnemonic, bytes = ?out, "encoded");
                    (*pc, *line, out)
                }
            };
            debug_assert_eq!(pc as usize - program.origin as usize, bytes.len());
            bytes.extend_from_slice(&out);
            listing.push(ListingEntry { line, pc, bytes: out });
        }
        debug!(
            origin = program.origin,
            len = bytes.len(),
            entries = listing.len(),
            "second pass complete"
        );
        Ok(Assembly {
            bytes,
            listing,
            origin: program.origin,
            symbols: program.labels.clone(),
        })
    }
}

/// Addresses of the first extension word of the source and destination
/// operands, in emission order.
fn ext_addresses(form: &FormDef, args: &Args, pc: u32) -> (u32, u32) {
    let mut addr = pc;
    let (mut src, mut dst) = (pc + 2, pc + 2);
    for step in &form.steps {
        addr += 2;
        for t in step.trailers {
            let len = match t {
                Trailer::SrcExt => {
                    src = addr;
                    args.src.ext_len(args.size)
                }
                Trailer::DstExt => {
                    dst = addr;
                    args.dst.ext_len(args.size)
                }
                Trailer::SrcImm(s) | Trailer::DstImm(s) => crate::ea::imm_len(*s),
                Trailer::RegMask => 2,
                Trailer::BranchDisp if args.is_short_branch() => 0,
                Trailer::BranchDisp => 2,
            };
            addr += len;
        }
    }
    (src, dst)
}

fn encode_instruction(
    def: &InstrDef,
    form: &FormDef,
    args: &Args,
    pc: u32,
    labels: &FinalSymbols,
) -> Result<Vec<u8>, ErrorKind> {
    let (src_pc, dst_pc) = ext_addresses(form, args, pc);
    let mut r = args.clone();
    r.src = args.src.resolve(labels, src_pc)?;
    r.dst = args.dst.resolve(labels, dst_pc)?;
    if let Some(t) = &args.target {
        r.target = Some(Value::Const(t.resolve(labels)?));
    }
    form.validate_args(&r).map_err(|v| v.into_error(def.mnemonic))?;

    let disp = match &r.target {
        Some(Value::Const(target)) if form.is_branch() => Some(branch_displacement(*target, pc, r.is_short_branch())?),
        _ => None,
    };

    let mut words = Vec::new();
    for step in &form.steps {
        let mut word = step.skeleton;
        for f in step.fields {
            word |= field_bits(*f, &r, disp)?;
        }
        words.push(word);
        for t in step.trailers {
            trailer_words(*t, &r, disp, &mut words)?;
        }
    }
    Ok(words.iter().flat_map(|w| w.to_be_bytes()).collect())
}

/// Displacements are measured from the end of the branch instruction: two
/// bytes for the short form, four for the word form. A short displacement
/// of zero is the word form's marker and cannot be encoded.
pub fn branch_displacement(target: i64, pc: u32, short: bool) -> Result<i64, ErrorKind> {
    let (len, bits, min, max) = if short {
        (2, 8, -128, 127)
    } else {
        (4, 16, -32768, 32767)
    };
    let disp = target - (pc as i64 + len);
    if disp < min || disp > max || (short && disp == 0) {
        return Err(ErrorKind::DisplacementOutOfRange { disp, bits });
    }
    Ok(disp)
}

fn imm_value(ea: &EaExpr) -> Result<i64, ErrorKind> {
    match ea {
        EaExpr::Immediate(Value::Const(v)) => Ok(*v),
        EaExpr::Immediate(Value::Label(name)) => Err(ErrorKind::UndefinedLabel(name.clone())),
        other => Err(ErrorKind::UnsupportedAddressingMode(format!(
            "{} where an immediate is required",
            other.describe()
        ))),
    }
}

fn reg(ea: &EaExpr) -> Result<u16, ErrorKind> {
    ea.reg_num()
        .map(|n| n as u16 & 7)
        .ok_or_else(|| ErrorKind::UnsupportedAddressingMode(format!("{} has no register", ea.describe())))
}

fn field_bits(field: Field, r: &Args, disp: Option<i64>) -> Result<u16, ErrorKind> {
    Ok(match field {
        Field::Size => match r.size {
            Size::Byte | Size::Short => 0,
            Size::Word => 1 << 6,
            Size::Long => 2 << 6,
        },
        Field::SizeMove => match r.size {
            Size::Byte | Size::Short => 1 << 12,
            Size::Word => 3 << 12,
            Size::Long => 2 << 12,
        },
        Field::SizeA => u16::from(r.size == Size::Long) << 8,
        Field::Size6 => u16::from(r.size == Size::Long) << 6,
        Field::SrcEa => r.src.encode(r.size)?.field(),
        Field::DstEa => r.dst.encode(r.size)?.field(),
        Field::MoveDst => {
            let bits = r.dst.encode(r.size)?;
            (bits.reg as u16) << 9 | (bits.mode as u16) << 6
        }
        Field::SrcReg => reg(&r.src)?,
        Field::DstReg => reg(&r.dst)?,
        Field::SrcRegHi => reg(&r.src)? << 9,
        Field::DstRegHi => reg(&r.dst)? << 9,
        Field::Quick3 => (imm_value(&r.src)? as u16 & 7) << 9,
        Field::Quick8 => imm_value(&r.src)? as u8 as u16,
        Field::Vector => imm_value(&r.src)? as u16 & 0xF,
        Field::Branch8 => match disp {
            Some(d) if r.is_short_branch() => d as u8 as u16,
            _ => 0,
        },
    })
}

fn trailer_words(trailer: Trailer, r: &Args, disp: Option<i64>, out: &mut Vec<u16>) -> Result<(), ErrorKind> {
    match trailer {
        Trailer::SrcExt => out.extend(r.src.encode(r.size)?.ext),
        Trailer::DstExt => out.extend(r.dst.encode(r.size)?.ext),
        Trailer::SrcImm(s) => out.extend(imm_words(imm_value(&r.src)?, s)?),
        Trailer::DstImm(s) => out.extend(imm_words(imm_value(&r.dst)?, s)?),
        Trailer::RegMask => {
            let mask = r
                .reglist
                .ok_or_else(|| ErrorKind::syntax("missing register list"))?;
            out.push(match r.dst {
                EaExpr::PreDec(_) => mask.reversed(),
                _ => mask.bits(),
            });
        }
        Trailer::BranchDisp => {
            if let (Some(d), false) = (disp, r.is_short_branch()) {
                out.push(d as u16);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bytes(src: &str) -> Vec<u8> {
        Assembler::new().assemble(src).unwrap().bytes
    }

    #[test]
    fn displacement_from_end_of_branch() {
        assert_eq!(branch_displacement(0x10, 0, true), Ok(0x0E));
        assert_eq!(branch_displacement(0x10, 0, false), Ok(0x0C));
        assert_eq!(branch_displacement(0, 0, true), Ok(-2));
        assert_eq!(
            branch_displacement(2, 0, true),
            Err(ErrorKind::DisplacementOutOfRange { disp: 0, bits: 8 })
        );
        assert_eq!(branch_displacement(4, 0, false), Ok(0));
        assert_eq!(
            branch_displacement(0x100, 0, true),
            Err(ErrorKind::DisplacementOutOfRange { disp: 0xFE, bits: 8 })
        );
        assert!(branch_displacement(0x8004, 0, false).is_ok());
        assert!(branch_displacement(0x8005, 0, false).is_err());
    }

    #[test]
    fn forward_and_backward_branches() {
        // loop: subq.w #1,d0 ; bne.s loop ; bra done ; nop ; done: rts
        assert_eq!(
            bytes("loop: subq.w #1,d0\nbne.s loop\nbra done\nnop\ndone: rts\n"),
            vec![0x53, 0x40, 0x66, 0xFC, 0x60, 0x00, 0x00, 0x02, 0x4E, 0x71, 0x4E, 0x75]
        );
    }

    #[test]
    fn pc_relative_operand_uses_extension_address() {
        // lea table(pc),a0 at 0: extension word at 2, table at 4.
        assert_eq!(
            bytes("lea table(pc),a0\ntable: .word $1234\n"),
            vec![0x41, 0xFA, 0x00, 0x02, 0x12, 0x34]
        );
    }

    #[test]
    fn second_pass_revalidates_resolved_values() {
        let err = Assembler::new().assemble("moveq #big,d0\nbig = 200\n").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::Range {
                what: "MOVEQ immediate",
                value: 200,
                min: -128,
                max: 127
            }
        );
        assert_eq!(err.line, 1);
        assert_eq!(err.line_text.as_deref(), Some("moveq #big,d0"));
    }

    #[test]
    fn undefined_label_in_second_pass() {
        let err = Assembler::new().assemble("nop\njmp nowhere\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedLabel("nowhere".into()));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn config_origin_applies_without_org() {
        let asm = Assembler::with_config(AsmConfig {
            origin: 0x1000,
            ..AsmConfig::default()
        })
        .assemble("start: bra.s start\n")
        .unwrap();
        assert_eq!(asm.origin, 0x1000);
        assert_eq!(asm.bytes, vec![0x60, 0xFE]);
        assert_eq!(asm.symbols.resolve_final("start"), Some(0x1000));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: AsmConfig = serde_json::from_str(r#"{"origin": 4096}"#).unwrap();
        assert_eq!(cfg.origin, 4096);
        assert_eq!(cfg.max_program_size, MAX_PROGRAM_SIZE);
    }
}
