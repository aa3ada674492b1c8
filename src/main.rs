use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufWriter, Write};

use pairseed::core::io::sam_output::{write_sam_header, write_sam_records};
use pairseed::{FmIndex, MapCliOptions, PairedEndMapper, ReadPair, Reference};

#[derive(Parser)]
#[command(name = "pairseed")]
#[command(about = "pairseed - paired short-read mapper (seed, chain, extend, rescue, pair)", long_about = None)]
#[command(version)]
struct Cli {
    /// Reference name written to @SQ and RNAME
    #[arg(long, value_name = "STR", default_value = "ref")]
    ref_name: String,

    /// Reference bases (A/C/G/T/N)
    #[arg(value_name = "REF")]
    reference: String,

    /// Read pairs as NAME:READ1:READ2 (qualities default to 'I')
    #[arg(value_name = "PAIR", required = true)]
    pairs: Vec<String>,

    #[command(flatten)]
    map: MapCliOptions,

    /// Verbose level: 1=error, 2=warning, 3=message, 4+=debugging
    #[arg(short = 'v', long, value_name = "INT", default_value_t = 3)]
    verbosity: i32,
}

fn parse_pair(s: &str) -> Result<ReadPair> {
    let parts: Vec<&str> = s.split(':').collect();
    let [name, seq1, seq2] = parts.as_slice() else {
        anyhow::bail!("read pair must be NAME:READ1:READ2, got {s:?}");
    };
    Ok(ReadPair {
        name: name.to_string(),
        seq1: seq1.as_bytes().to_vec(),
        qual1: vec![b'I'; seq1.len()],
        seq2: seq2.as_bytes().to_vec(),
        qual2: vec![b'I'; seq2.len()],
    })
}

fn run(cli: Cli) -> Result<()> {
    let opt = cli.map.into_map_opt().context("invalid mapping parameters")?;
    let reference =
        Reference::from_ascii(cli.ref_name.as_str(), cli.reference.as_bytes()).context("cannot load reference")?;
    let index = FmIndex::build(&reference).context("cannot index reference")?;
    log::info!("Indexed {} ({} bp)", reference.name, reference.len());

    let pairs = cli
        .pairs
        .iter()
        .map(|s| parse_pair(s))
        .collect::<Result<Vec<_>>>()?;

    let mapper = PairedEndMapper::new(&opt, &reference, &index)?;
    let command_line = std::env::args().collect::<Vec<_>>().join(" ");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_sam_header(&mut out, &mapper.sam_header(&command_line))?;

    let mut failed = 0usize;
    for result in mapper.map_batch(&pairs) {
        match result {
            Ok((rec1, rec2)) => write_sam_records(&mut out, &[rec1, rec2])?,
            Err(_) => failed += 1,
        }
    }
    out.flush().context("cannot flush SAM output")?;

    log::info!("Mapped {} pairs ({} failed)", pairs.len() - failed, failed);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbosity {
        v if v <= 1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace, // 5+ = trace
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None) // Don't show timestamps
        .format_target(false) // Don't show module names
        .init();

    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
