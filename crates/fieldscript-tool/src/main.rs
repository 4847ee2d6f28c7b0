use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use fieldscript_rs::disasm::{fmt_instruction, listing};
use fieldscript_rs::opcodes;
use fieldscript_rs::{assemble, disassemble, AssemblerConfig, AssemblyContext};
use fieldscript_tool::{load_blob, parse_listing};

#[derive(Parser, Debug)]
#[command(author, version, about = "Field script disassembler/assembler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Disassemble one script blob into a listing
    Dis {
        /// Input file holding the script bytes
        #[arg(value_name = "BLOB")]
        input: PathBuf,
        /// Skip N bytes at start of file
        #[arg(long, default_value_t = 0usize)]
        skip: usize,
        /// Script length in bytes (default: to EOF after --skip)
        #[arg(long)]
        len: Option<usize>,
        /// Output format: text or json
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Assemble a listing into a script blob
    Asm {
        /// Input listing (one label or instruction per line)
        #[arg(short, long)]
        input: PathBuf,
        /// Output blob
        #[arg(short, long)]
        output: PathBuf,
        /// Assembler settings as JSON
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Pass limit (overrides the config file)
        #[arg(long)]
        max_passes: Option<usize>,
        /// Keep unconditional jumps in the direction they were written
        #[arg(long)]
        no_flip: bool,
    },
    /// Print the opcode catalog
    Ops,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, serde::Serialize)]
struct LineOut {
    offset: usize,
    labels: Vec<String>,
    text: String,
}

fn load_config(path: Option<&Path>) -> Result<AssemblerConfig> {
    let Some(path) = path else {
        return Ok(AssemblerConfig::default());
    };
    let txt = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&txt)?)
}

fn emit(out: Option<PathBuf>, text: String) -> Result<()> {
    if let Some(path) = out {
        std::fs::write(path, text)?;
    } else {
        print!("{text}");
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Dis { input, skip, len, format, out } => {
            let bytes = load_blob(&input, skip, len)?;
            let script = disassemble(0, &bytes)?;
            match format {
                OutputFormat::Text => emit(out, listing(&script))?,
                OutputFormat::Json => {
                    // offsets come from re-measuring the decoded instructions
                    let mut offset = 0;
                    let mut lines = Vec::with_capacity(script.len());
                    for (i, ins) in script.instructions().iter().enumerate() {
                        lines.push(LineOut {
                            offset,
                            labels: script.labels_at(i).map(|l| l.name.clone()).collect(),
                            text: fmt_instruction(ins, &script),
                        });
                        offset += ins
                            .encoded_len()
                            .ok_or_else(|| anyhow!("instruction {i} has no fixed encoding"))?;
                    }
                    let mut json = serde_json::to_string_pretty(&lines)?;
                    json.push('\n');
                    emit(out, json)?;
                }
            }
        }
        Command::Asm { input, output, config, max_passes, no_flip } => {
            let mut cfg = load_config(config.as_deref())?;
            if max_passes.is_some() {
                cfg.max_passes = max_passes;
            }
            if no_flip {
                cfg.flip_jump_direction = false;
            }
            let text = std::fs::read_to_string(&input)?;
            let script = parse_listing(0, &text)?;
            let ctx = AssemblyContext::standalone(script.id).with_config(cfg);
            match assemble(&script, &ctx) {
                Ok(asm) => {
                    std::fs::write(&output, asm.bytes.as_bytes())?;
                    eprintln!("{} bytes, {} pass(es)", asm.bytes.len(), asm.passes);
                }
                Err(diags) => {
                    for d in &diags {
                        eprintln!("line {}: {}", d.instruction_index, d.message());
                    }
                    anyhow::bail!("{} error(s) in {}", diags.len(), input.display());
                }
            }
        }
        Command::Ops => {
            let mut buf = String::new();
            let _ = writeln!(buf, "{:<4} {:<10} {:<6} operands", "id", "mnemonic", "len");
            for d in opcodes::all() {
                let len = d.fixed_len().map_or_else(|| "var".to_string(), |n| n.to_string());
                let shapes: Vec<String> = d.operands.iter().map(|s| format!("{s:?}")).collect();
                let _ = writeln!(buf, "{:#04x} {:<10} {:<6} {}", d.id, d.mnemonic, len, shapes.join(", "));
            }
            print!("{buf}");
        }
    }
    Ok(())
}
