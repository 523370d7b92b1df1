// src/main.rs
mod logger;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use huffpack::CodeTable;
use huffpack::codec::{self, Report, RoundTrip};
use huffpack::journal::{self, JournalEntry};

#[derive(Parser)]
#[command(name = "huffpack", version)]
#[command(about = "Huffman file compressor with a separate JSON code table.", long_about = None)]
struct Cli {
    /// Increase log detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Append a JSON line describing each completed action to this file
    #[arg(long, global = true, value_name = "PATH")]
    journal: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file, writing the packed bytes and the code table
    Compress {
        input: PathBuf,
        /// Packed output [default: <INPUT>.huff]
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Code table output [default: <OUTPUT>.json]
        #[arg(short, long)]
        table: Option<PathBuf>,
    },
    /// Decompress a file using its code table
    Decompress {
        input: PathBuf,
        /// Code table [default: <INPUT>.json]
        #[arg(short, long)]
        table: Option<PathBuf>,
        /// Restored output [default: <INPUT> without .huff]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compress and decompress in memory and verify the bytes survive
    Roundtrip { input: PathBuf },
    /// Show the codes stored in a table file
    Inspect { table: PathBuf },
    /// Print the entries of a journal file
    Log { journal: PathBuf },
}

fn record(
    journal_path: Option<&Path>,
    action: &str,
    input: &Path,
    output: Option<&Path>,
    report: Report,
) -> anyhow::Result<()> {
    if let Some(path) = journal_path {
        let entry = JournalEntry::new(action, input, output, report);
        journal::append(path, &entry)
            .with_context(|| format!("failed to write journal {}", path.display()))?;
    }
    Ok(())
}

fn round_trip_file(input: &Path) -> anyhow::Result<RoundTrip> {
    let data =
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    codec::round_trip(&data).with_context(|| format!("failed to round trip {}", input.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose, cli.quiet).context("failed to set up the global logger")?;

    let span = tracing::info_span!("command_execution", command = ?std::env::args().collect::<Vec<_>>());
    let _enter = span.enter();
    let journal_path = cli.journal.as_deref();

    match cli.command {
        Commands::Compress {
            input,
            output,
            table,
        } => {
            let output = output.unwrap_or_else(|| codec::default_output_path(&input));
            let table = table.unwrap_or_else(|| codec::default_table_path(&output));
            let report = codec::compress_file(&input, &output, &table)
                .with_context(|| format!("failed to compress {}", input.display()))?;
            println!("Compressed: {}", output.display());
            println!("Code table: {}", table.display());
            println!("{report}");
            record(journal_path, "compress", &input, Some(&output), report)?;
        }
        Commands::Decompress {
            input,
            table,
            output,
        } => {
            let table = table.unwrap_or_else(|| codec::default_table_path(&input));
            let output = output.unwrap_or_else(|| codec::default_decompressed_path(&input));
            let written = codec::decompress_file(&input, &table, &output)
                .with_context(|| format!("failed to decompress {}", input.display()))?;
            let report = Report {
                original_len: written,
                compressed_len: fs::metadata(&input)?.len(),
            };
            println!("Decompressed: {}", output.display());
            println!("{report}");
            record(journal_path, "decompress", &input, Some(&output), report)?;
        }
        Commands::Roundtrip { input } => {
            let result = round_trip_file(&input)?;
            println!("original  sha256 {}", result.original_digest);
            println!("recovered sha256 {}", result.recovered_digest);
            println!("{}", result.report);
            if !result.matches() {
                bail!("round trip of {} did not restore the original bytes", input.display());
            }
            record(journal_path, "roundtrip", &input, None, result.report)?;
        }
        Commands::Inspect { table } => {
            let codes = CodeTable::load(&table)
                .with_context(|| format!("failed to load code table {}", table.display()))?;
            println!("{:>6}  {:>4}  code", "symbol", "bits");
            for (symbol, code) in codes.iter() {
                println!("{:>6}  {:>4}  {}", symbol, code.len(), code);
            }
            println!("symbols: {}", codes.len());
            println!("appended: {}", codes.appended());
            println!("prefix-free: {}", codes.is_prefix_free());
        }
        Commands::Log { journal } => {
            for entry in journal::read_entries(&journal)? {
                println!(
                    "{} {:<10} {} -> {} ({} / {} bytes)",
                    entry.timestamp,
                    entry.action,
                    entry.input,
                    entry.output.as_deref().unwrap_or("-"),
                    entry.original_len,
                    entry.compressed_len,
                );
            }
        }
    }
    Ok(())
}
