//! HTTP API for batch submissions.
//!
//! A thin axum layer over [`crate::dispatch::JobDispatcher`]. Submissions
//! are validated locally, forwarded to the job service and watched in the
//! background until they finish.
//!
//! ## Starting the Server
//!
//! ```text
//! # Start on default port 8000
//! rfam-batch serve
//!
//! # Bind to all interfaces and point result links at a public host
//! rfam-batch serve --address 0.0.0.0 --public-url https://batch.example.org
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /submit-job` - Submit a FASTA file (multipart: `email_address`, `sequence_file`, optional `id`)
//! - `GET /status/{job_id}` - Current status of a job
//! - `GET /result/{job_id}` - Correlated results, `404` until they are available

pub mod server;
