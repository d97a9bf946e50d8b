use std::path::PathBuf;

use clap::Args;

use crate::cli::{read_input, OutputFormat};
use crate::core::sequence::SequenceRecord;
use crate::parsing::fasta::parse_sequences;

#[derive(Args)]
pub struct ValidateArgs {
    /// FASTA file to check; use '-' for stdin
    #[arg(required = true)]
    pub input: PathBuf,
}

/// Execute validate subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be read or a sequence is invalid.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ValidateArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let raw = read_input(&args.input)?;
    let records = parse_sequences(&raw)?;

    if verbose {
        eprintln!("Validated {} sequence(s)", records.len());
    }

    match format {
        OutputFormat::Text => print_text(&records),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Tsv => print_tsv(&records),
    }

    Ok(())
}

fn print_text(records: &[SequenceRecord]) {
    if records.is_empty() {
        println!("No sequences found");
        return;
    }
    println!("{} valid sequence(s)", records.len());
    for (i, record) in records.iter().enumerate() {
        println!(
            "  {}. {} ({} nt)",
            i + 1,
            record.header.as_deref().unwrap_or("<no header>"),
            record.len()
        );
    }
}

fn print_tsv(records: &[SequenceRecord]) {
    println!("header\tlength");
    for record in records {
        println!("{}\t{}", record.header.as_deref().unwrap_or(""), record.len());
    }
}
