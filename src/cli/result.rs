use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use crate::cli::{runtime, OutputFormat, ServiceArgs};
use crate::core::hit::{CmScanOutcome, HitRow};
use crate::core::job::JobHandle;
use crate::dispatch::{DispatcherConfig, JobDispatcher, TracingNotifier};
use crate::parsing::correlate::correlate;

#[derive(Args)]
pub struct ResultArgs {
    /// Job id returned by `submit`
    #[arg(required = true)]
    pub job_id: String,

    #[command(flatten)]
    pub service: ServiceArgs,
}

#[derive(Args)]
pub struct ParseArgs {
    /// Narrative cmscan report (`out` artifact)
    #[arg(long)]
    pub out: PathBuf,

    /// Echo of the submitted FASTA (`sequence` artifact)
    #[arg(long)]
    pub sequence: PathBuf,

    /// Tabular report (`tblout` artifact)
    #[arg(long)]
    pub tblout: PathBuf,

    /// Job id recorded in the result
    #[arg(long, default_value = "local")]
    pub job_id: String,
}

/// Execute result subcommand
///
/// # Errors
///
/// Returns an error if the artifacts cannot be fetched or are not available yet.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ResultArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = DispatcherConfig::from(&args.service);
    let job = JobHandle::new(args.job_id.trim());

    runtime()?.block_on(async move {
        let dispatcher = JobDispatcher::new(&config, Arc::new(TracingNotifier))?;
        if verbose {
            eprintln!("Fetching results of {job} from {}", dispatcher.client().base_url());
        }
        match dispatcher.fetch_result(&job).await? {
            Some(outcome) => print_outcome(&outcome, format),
            None => anyhow::bail!(
                "Results for job {job} are not available; check `rfam-batch status {job}`"
            ),
        }
    })
}

/// Execute parse subcommand
///
/// # Errors
///
/// Returns an error if any of the three files cannot be read.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run_parse(args: ParseArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let read = |path: &PathBuf| {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    };
    let out = read(&args.out)?;
    let sequence = read(&args.sequence)?;
    let tblout = read(&args.tblout)?;

    if verbose {
        eprintln!(
            "Correlating {} ({} bytes) with {} ({} bytes)",
            args.tblout.display(),
            tblout.len(),
            args.out.display(),
            out.len()
        );
    }

    let outcome = correlate(&out, &sequence, &tblout, &args.job_id);
    print_outcome(&outcome, format)
}

/// Print a correlated result in the requested format.
pub(crate) fn print_outcome(outcome: &CmScanOutcome, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Tsv => print_tsv(outcome),
        OutputFormat::Text => print_text(outcome),
    }
    Ok(())
}

fn print_text(outcome: &CmScanOutcome) {
    print_hits_text(outcome);

    let warnings = outcome.warnings();
    if !warnings.is_empty() {
        println!();
        println!("Warnings: {} part(s) of the report could not be read", warnings.len());
        for warning in warnings {
            println!("  {warning}");
        }
    }
}

fn print_hits_text(outcome: &CmScanOutcome) {
    match outcome {
        CmScanOutcome::Single(result) => {
            println!("Job:      {}", result.job_id);
            println!("Opened:   {}", result.opened);
            println!("Closed:   {}", result.closed);
            println!("Query:    {} nt", result.search_sequence.len());
            println!("Hits:     {} reported", result.num_hits);
            for (model, hits) in &result.hits {
                println!();
                println!("{model} ({} hit(s))", hits.len());
                for hit in hits {
                    print_row_line(&hit.row);
                    if let Some(alignment) = &hit.alignment {
                        println!("      {}", alignment.ss);
                        println!("      {}", alignment.hit_seq);
                        println!("      {}", alignment.match_line);
                        println!("      {}", alignment.user_seq);
                    }
                }
            }
        }
        CmScanOutcome::Multiple(result) => {
            println!("Opened:   {}", result.opened);
            println!("Hits:     {} across all queries", result.hits.len());
            println!();
            for row in &result.hits {
                print_row_line(row);
            }
        }
    }
}

fn print_row_line(row: &HitRow) {
    println!(
        "  {:<20} {:<10} {:<16} {:>7}-{:<7} {} score={} E={:e} GC={:.2}",
        row.model_id,
        row.accession,
        row.query,
        row.start,
        row.end,
        row.strand,
        row.score,
        row.e_value,
        row.gc_content
    );
}

fn print_tsv(outcome: &CmScanOutcome) {
    println!("id\tacc\tquery\tstart\tend\tstrand\tGC\tscore\tE");
    for row in outcome.rows() {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:e}",
            row.model_id,
            row.accession,
            row.query,
            row.start,
            row.end,
            row.strand,
            row.gc_content,
            row.score,
            row.e_value
        );
    }
}
