//! # rfam-batch
//!
//! A client library for batch covariance-model searches against a remote
//! Infernal `cmscan` job service.
//!
//! Users hand in nucleotide sequences in FASTA form. The library checks them
//! locally, submits them to the job service, tracks the job until it reaches
//! a terminal status, and merges the service's tabular and narrative reports
//! into structured hits with their alignments.
//!
//! ## Features
//!
//! - **Local validation**: length, alphabet, gap and header checks before any network call
//! - **Job tracking**: cancellable poll loops with an optional time budget
//! - **Bounded supervision**: a registry caps how many jobs are polled at once
//! - **Result correlation**: tabular rows joined to narrative alignments by coordinates and scores
//! - **Multi-query degradation**: jobs with several queries yield a flat hit listing
//!
//! ## Example
//!
//! ```rust
//! use rfam_batch::{correlate, parse_sequences, CmScanOutcome};
//!
//! let records = parse_sequences(">seq1\nacguacgu\n").unwrap();
//! assert_eq!(records[0].residues, "ACGUACGU");
//!
//! // Artifacts fetched earlier, or saved by `rfam-batch parse`
//! let tblout = "";
//! let outcome = correlate("", ">seq1\nACGUACGU\n", tblout, "job-1");
//! assert!(matches!(outcome, CmScanOutcome::Single(_)));
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Sequences, job handles, statuses and hit types
//! - [`parsing`]: FASTA validation and `cmscan` report parsers
//! - [`dispatch`]: Job service client, poller and background registry
//! - [`utils`]: Validation rules and errors
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: HTTP API over the dispatcher

pub mod cli;
pub mod core;
pub mod dispatch;
pub mod parsing;
pub mod utils;
pub mod web;

// Re-export commonly used types for convenience
pub use core::hit::{AlignmentBlock, CmScanOutcome, Hit, HitRow, MultiSequenceResult, ScanResult};
pub use core::job::{JobHandle, JobStatus};
pub use core::sequence::{SequenceRecord, SubmissionQuery};
pub use dispatch::{DispatcherConfig, JobDispatcher};
pub use parsing::correlate::correlate;
pub use parsing::fasta::parse_sequences;
