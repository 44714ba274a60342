use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use csv2pprof::{convert_with_config, ui::pprof, Config};

/// Convert a CSV table of weighted stack traces into a pprof profile.
///
/// The header row must contain exactly one `stack` column holding `;`-separated frames. Every
/// other column is a weight, labelled `type/unit` or just `type` (unit `count`).
#[derive(Parser, Debug)]
#[command(name = "csv2pprof", version, about)]
struct Args {
    /// CSV file to read. Reads standard input if omitted or `-`.
    input: Option<PathBuf>,

    /// Where to write the profile. Writes to standard output if omitted or `-`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Field delimiter of the input table
    #[arg(short, long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,

    /// Write the raw protobuf instead of gzipping it
    #[arg(long)]
    no_gzip: bool,
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(format!("delimiter must be a single ASCII character, got {:?}", s)),
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn open_input(maybe_path: Option<&Path>) -> Result<Box<dyn Read>> {
    match maybe_path {
        Some(path) if !is_stdio(path) => {
            let file = File::open(path)
                .context(format!("Failed to open input file {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_output(maybe_path: Option<&Path>) -> Result<Box<dyn Write>> {
    match maybe_path {
        Some(path) if !is_stdio(path) => {
            let file = File::create(path)
                .context(format!("Failed to create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        _ => Ok(Box::new(io::stdout().lock())),
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config {
        delimiter: args.delimiter,
    };

    let input = open_input(args.input.as_deref())?;
    let profile = convert_with_config(input, &config)?;
    info!(
        "converted {} samples with {} distinct frames",
        profile.samples.len(),
        profile.functions.len()
    );

    let mut output = open_output(args.output.as_deref())?;
    pprof::write(&profile, &mut output, !args.no_gzip)?;
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(x) = run(Args::parse()) {
        eprintln!("Error: {}", x);
        for c in x.chain().skip(1) {
            eprintln!("  caused by: {}", c);
        }
        std::process::exit(1);
    }
}
