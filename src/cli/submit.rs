use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::cli::result::print_outcome;
use crate::cli::{read_input, runtime, OutputFormat, ServiceArgs};
use crate::core::job::{JobHandle, JobStatus};
use crate::core::sequence::SubmissionQuery;
use crate::dispatch::{DispatcherConfig, JobDispatcher, PollOutcome, TracingNotifier};
use crate::parsing::fasta::parse_sequences;

#[derive(Args)]
pub struct SubmitArgs {
    /// FASTA file with up to 7,000 nt per sequence; use '-' for stdin
    #[arg(required = true)]
    pub input: PathBuf,

    /// E-mail address the job service notifies
    #[arg(short, long, env = "RFAM_BATCH_EMAIL")]
    pub email: String,

    /// Optional job title
    #[arg(short, long)]
    pub title: Option<String>,

    /// Poll until the job finishes and print its results
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub service: ServiceArgs,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Job id returned by `submit`
    #[arg(required = true)]
    pub job_id: String,

    #[command(flatten)]
    pub service: ServiceArgs,
}

/// Execute submit subcommand
///
/// # Errors
///
/// Returns an error if the input is invalid, the submission fails, or (with
/// `--wait`) the job does not finish successfully.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: SubmitArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let raw = read_input(&args.input)?;
    let sequences = parse_sequences(&raw)?;
    if verbose {
        eprintln!("Submitting {} sequence(s)", sequences.len());
    }

    let query = SubmissionQuery::new(sequences, args.email.clone()).with_title(args.title.clone());
    let config = DispatcherConfig::from(&args.service);

    runtime()?.block_on(async move {
        let dispatcher = JobDispatcher::new(&config, Arc::new(TracingNotifier))?;
        let job = dispatcher.submit(&query).await?;

        if !args.wait {
            print_job(&job, format)?;
            return Ok(());
        }

        eprintln!("Submitted job {job}, waiting for it to finish...");
        wait_and_print(&dispatcher, &job, args.email.clone(), format, verbose).await
    })
}

async fn wait_and_print(
    dispatcher: &JobDispatcher,
    job: &JobHandle,
    email: String,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = dispatcher
        .poller()
        .poll_until_terminal(job, &cancel, |event| {
            if verbose {
                eprintln!("[{}] {}", event.tick, event.status);
            }
        })
        .await?;

    if let PollOutcome::Terminal(status) = outcome {
        dispatcher.registry().notify_terminal(job, email, status).await;
    }

    match outcome {
        PollOutcome::Terminal(JobStatus::Finished) => match dispatcher.fetch_result(job).await? {
            Some(outcome) => print_outcome(&outcome, format),
            None => anyhow::bail!("Job {job} finished but its results are not available"),
        },
        PollOutcome::Terminal(status) => anyhow::bail!("Job {job} ended with status {status}"),
        PollOutcome::Cancelled => anyhow::bail!("Stopped waiting for job {job}"),
        PollOutcome::DeadlineExceeded => {
            anyhow::bail!("Job {job} did not finish within the polling time budget")
        }
    }
}

fn print_job(job: &JobHandle, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "jobId": job }))?);
        }
        OutputFormat::Text | OutputFormat::Tsv => println!("{job}"),
    }
    Ok(())
}

/// Execute status subcommand
///
/// # Errors
///
/// Returns an error if the status query fails.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run_status(args: StatusArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = DispatcherConfig::from(&args.service);
    let job = JobHandle::new(args.job_id.trim());

    runtime()?.block_on(async move {
        let dispatcher = JobDispatcher::new(&config, Arc::new(TracingNotifier))?;
        let status = dispatcher.poll(&job).await?;
        match format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "jobId": job,
                    "status": status,
                    "terminal": status.is_terminal(),
                }))?
            ),
            OutputFormat::Text => println!("{job}\t{status}"),
            OutputFormat::Tsv => {
                println!("job_id\tstatus");
                println!("{job}\t{status}");
            }
        }
        Ok(())
    })
}
