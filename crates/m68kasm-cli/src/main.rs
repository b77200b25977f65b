use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use std::path::{Path, PathBuf};

use m68kasm::{AsmConfig, Assembler};
use m68kasm_cli::{render_json, render_text, write_output, OutputFormat};

#[derive(Parser, Debug)]
#[command(author, version, about = "Motorola 68000 cross-assembler", long_about = None)]
struct Cli {
    /// Assembly source file
    #[arg(value_name = "SOURCE")]
    input: PathBuf,
    /// Output file (default: SOURCE with the format's extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Output container
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Bin)]
    format: OutputFormat,
    /// Load address of the first byte (hex with 0x or $, or decimal)
    #[arg(long, value_parser = parse_u32)]
    origin: Option<u32>,
    /// Write a listing to FILE
    #[arg(short, long, value_name = "FILE")]
    listing: Option<PathBuf>,
    /// Listing format
    #[arg(long, value_enum, default_value_t = ListingFormat::Text)]
    listing_format: ListingFormat,
    /// Assembler configuration as JSON (`origin`, `max_program_size`)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ListingFormat {
    Text,
    Json,
}

fn parse_u32(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('$'))
    {
        Ok(u32::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u32>()?)
    }
}

fn load_config(path: Option<&Path>, origin: Option<u32>) -> Result<AsmConfig> {
    let mut config = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).with_context(|| format!("reading config {}", p.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config {}", p.display()))?
        }
        None => AsmConfig::default(),
    };
    if let Some(origin) = origin {
        config.origin = origin;
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.origin)?;
    tracing::debug!(?config, "configuration");

    let source =
        std::fs::read_to_string(&cli.input).with_context(|| format!("reading {}", cli.input.display()))?;
    let asm = Assembler::with_config(config)
        .assemble(&source)
        .map_err(|e| anyhow!("{}: {e}", cli.input.display()))?;

    let out_path = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension(cli.format.extension()));
    let name = cli
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    std::fs::write(&out_path, write_output(cli.format, &asm, &name))
        .with_context(|| format!("writing {}", out_path.display()))?;
    tracing::info!(
        output = %out_path.display(),
        bytes = asm.bytes.len(),
        origin = asm.origin,
        "assembled"
    );

    if let Some(path) = &cli.listing {
        let text = match cli.listing_format {
            ListingFormat::Text => render_text(&source, &asm.listing),
            ListingFormat::Json => render_json(&source, &asm.listing)?,
        };
        std::fs::write(path, text).with_context(|| format!("writing listing {}", path.display()))?;
    }

    Ok(())
}
