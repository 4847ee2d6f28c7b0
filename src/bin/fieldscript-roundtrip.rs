use anyhow::{anyhow, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fieldscript_rs::{assemble, disassemble, AssemblyContext};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Disassemble a field script blob, reassemble it and compare"
)]
struct Opts {
    /// Skip N bytes at start of file
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Script length in bytes (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
    #[arg(value_name = "BLOB")]
    input: String,
}

#[derive(Debug, serde::Serialize)]
struct Report {
    original_len: usize,
    rebuilt_len: usize,
    instructions: usize,
    labels: usize,
    passes: usize,
    identical: bool,
    equivalent: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let file = std::fs::read(&opts.input)?;
    anyhow::ensure!(opts.skip <= file.len(), "--skip exceeds file size");
    let rest = &file[opts.skip..];
    let len = opts.len.unwrap_or(rest.len());
    anyhow::ensure!(len <= rest.len(), "--len exceeds remaining file size after skip");
    let bytes = &rest[..len];

    let script = disassemble(0, bytes)?;
    let asm = assemble(&script, &AssemblyContext::standalone(0)).map_err(|diags| {
        let lines: Vec<String> = diags.iter().map(|d| d.to_string()).collect();
        anyhow!("reassembly failed:\n{}", lines.join("\n"))
    })?;
    let rebuilt = disassemble(0, asm.bytes.as_bytes())?;

    let report = Report {
        original_len: bytes.len(),
        rebuilt_len: asm.bytes.len(),
        instructions: script.len(),
        labels: script.labels().len(),
        passes: asm.passes,
        identical: asm.bytes.as_bytes() == bytes,
        equivalent: script.equivalent(&rebuilt),
    };

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} -> {} bytes, {} instructions, {} labels, {} pass(es)",
            report.original_len, report.rebuilt_len, report.instructions, report.labels, report.passes
        );
        println!(
            "identical: {}, equivalent: {}",
            report.identical, report.equivalent
        );
    }
    anyhow::ensure!(report.equivalent, "rebuilt script does not match the original");
    Ok(())
}
