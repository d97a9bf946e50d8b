//! Command-line interface for rfam-batch.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **validate**: Check a FASTA file locally without submitting it
//! - **submit**: Submit sequences to the search service, optionally waiting for results
//! - **status**: Show the status of a submitted job
//! - **result**: Fetch and correlate the results of a finished job
//! - **parse**: Correlate result artifacts saved on disk
//! - **serve**: Start the HTTP API
//!
//! ## Usage
//!
//! ```text
//! # Check a file before submitting
//! rfam-batch validate sequences.fa
//!
//! # Submit and wait for the structured result
//! rfam-batch submit sequences.fa --email someone@example.org --wait --format json
//!
//! # Look at a job later
//! rfam-batch status infernal_cmscan-R20240403-102826-0463-19416478-p1m
//! rfam-batch result infernal_cmscan-R20240403-102826-0463-19416478-p1m
//!
//! # Start the HTTP API
//! rfam-batch serve --port 8000
//! ```

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::dispatch::{DispatcherConfig, DEFAULT_BASE_URL};

pub mod result;
pub mod submit;
pub mod validate;

#[derive(Parser)]
#[command(name = "rfam-batch")]
#[command(version)]
#[command(about = "Batch covariance-model searches against the Rfam job service")]
#[command(
    long_about = "rfam-batch submits nucleotide sequences to a remote cmscan job service, tracks the job until it finishes, and merges the tabular and narrative reports into structured hits.\n\nFor single-sequence jobs every hit carries its alignment; jobs with several query sequences return a flat hit listing."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a FASTA file without submitting it
    Validate(validate::ValidateArgs),

    /// Submit sequences to the search service
    Submit(submit::SubmitArgs),

    /// Show the status of a job
    Status(submit::StatusArgs),

    /// Fetch the correlated results of a job
    Result(result::ResultArgs),

    /// Correlate result artifacts saved on disk
    Parse(result::ParseArgs),

    /// Start the HTTP API
    Serve(ServeArgs),
}

/// Remote service settings shared by every networked command
#[derive(clap::Args, Clone, Debug)]
pub struct ServiceArgs {
    /// Base URL of the cmscan job service
    #[arg(long, env = "RFAM_BATCH_SERVICE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Timeout for job submission, in seconds
    #[arg(
        long,
        env = "RFAM_BATCH_SUBMIT_TIMEOUT",
        default_value = "5",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub submit_timeout: u64,

    /// Seconds between status queries
    #[arg(
        long,
        env = "RFAM_BATCH_POLL_INTERVAL",
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,

    /// Give up polling a job after this many seconds (unbounded if unset)
    #[arg(long, env = "RFAM_BATCH_MAX_POLL_DURATION")]
    pub max_poll_duration: Option<u64>,

    /// Maximum number of jobs polled at the same time
    #[arg(long, env = "RFAM_BATCH_MAX_POLLERS", default_value = "64")]
    pub max_pollers: usize,
}

impl From<&ServiceArgs> for DispatcherConfig {
    fn from(args: &ServiceArgs) -> Self {
        Self {
            base_url: args.base_url.clone(),
            submit_timeout: Duration::from_secs(args.submit_timeout),
            poll_interval: Duration::from_secs(args.poll_interval),
            max_poll_duration: args.max_poll_duration.map(Duration::from_secs),
            max_pollers: args.max_pollers,
        }
    }
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,

    /// Public base URL used to build result links
    #[arg(long, env = "RFAM_BATCH_PUBLIC_URL", default_value = "https://batch.rfam.org")]
    pub public_url: String,

    #[command(flatten)]
    pub service: ServiceArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Read a text input; `-` means stdin.
pub(crate) fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// Build a runtime for commands that talk to the job service.
pub(crate) fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Runtime::new()?)
}
