//! Submission, polling and result retrieval against the remote job service.
//!
//! [`JobDispatcher`] is the composition root: build one at startup, share it,
//! and call [`JobDispatcher::shutdown`] before exit so background poll loops
//! stop cleanly.
//!
//! ## Remote endpoints
//!
//! | Call | Endpoint | Response |
//! |------|----------|----------|
//! | submit | `POST /run` (form: email, threshold_model, sequence, title) | bare job id |
//! | status | `GET /status/{job}` | bare status token |
//! | artifact | `GET /result/{job}/{out,sequence,tblout}` | report text, non-200 when unavailable |
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rfam_batch::dispatch::{DispatcherConfig, JobDispatcher, TracingNotifier};
//! use rfam_batch::parsing::fasta::parse_sequences;
//! use rfam_batch::SubmissionQuery;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let dispatcher = JobDispatcher::new(&DispatcherConfig::default(), Arc::new(TracingNotifier))?;
//! let sequences = parse_sequences(">seq1\nAGUUACGGCCAUACCUCAGAGAAUAUACCGUAUCCCGUUCG")?;
//! let job = dispatcher
//!     .submit_and_watch(&SubmissionQuery::new(sequences, "someone@example.org"))
//!     .await?;
//! println!("submitted {job}");
//! dispatcher.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::hit::CmScanOutcome;
use crate::core::job::{ArtifactKind, JobHandle, JobStatus};
use crate::core::sequence::SubmissionQuery;
use crate::parsing::correlate::correlate;

pub mod client;
pub mod notify;
pub mod poller;
pub mod registry;

pub use client::{JobClient, SubmitError, UpstreamError};
pub use notify::{JobNotification, Notifier, TracingNotifier};
pub use poller::{JobPoller, PollEvent, PollOutcome};
pub use registry::PollerRegistry;

/// Default remote service: EMBL-EBI Job Dispatcher `infernal_cmscan`
pub const DEFAULT_BASE_URL: &str = "https://www.ebi.ac.uk/Tools/services/rest/infernal_cmscan";

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub base_url: String,
    /// Applies to submissions only; status and artifact calls have no timeout
    pub submit_timeout: Duration,
    pub poll_interval: Duration,
    /// Wall-clock budget per poll loop, unbounded when `None`
    pub max_poll_duration: Option<Duration>,
    pub max_pollers: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            submit_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(10),
            max_poll_duration: None,
            max_pollers: 64,
        }
    }
}

pub struct JobDispatcher {
    client: JobClient,
    poller: JobPoller,
    registry: PollerRegistry,
}

impl JobDispatcher {
    /// # Errors
    ///
    /// Returns `UpstreamError::ClientBuild` if the HTTP client cannot be created.
    pub fn new(config: &DispatcherConfig, notifier: Arc<dyn Notifier>) -> Result<Self, UpstreamError> {
        let client = JobClient::new(&config.base_url, config.submit_timeout)?;
        let poller = JobPoller::new(
            client.clone(),
            config.poll_interval,
            config.max_poll_duration,
        );
        let registry = PollerRegistry::new(poller.clone(), notifier, config.max_pollers);
        Ok(Self {
            client,
            poller,
            registry,
        })
    }

    #[must_use]
    pub fn client(&self) -> &JobClient {
        &self.client
    }

    #[must_use]
    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    #[must_use]
    pub fn registry(&self) -> &PollerRegistry {
        &self.registry
    }

    /// Submit without tracking the job.
    ///
    /// # Errors
    ///
    /// See [`JobClient::submit`].
    pub async fn submit(&self, query: &SubmissionQuery) -> Result<JobHandle, SubmitError> {
        self.client.submit(query).await
    }

    /// Submit and poll the job in the background; the notifier fires once it
    /// reaches a terminal status.
    ///
    /// The job is still returned when the registry refuses to watch it
    /// (already watched, or shut down); that case is logged.
    ///
    /// # Errors
    ///
    /// See [`JobClient::submit`].
    pub async fn submit_and_watch(&self, query: &SubmissionQuery) -> Result<JobHandle, SubmitError> {
        let job = self.client.submit(query).await?;
        if !self.registry.watch(job.clone(), query.email.clone()) {
            warn!("Job {job} was submitted but will not be watched; no notification will be sent");
        }
        Ok(job)
    }

    /// Current status of a job, fetched fresh.
    ///
    /// # Errors
    ///
    /// See [`JobClient::status`].
    pub async fn poll(&self, job: &JobHandle) -> Result<JobStatus, UpstreamError> {
        self.client.status(job).await
    }

    /// Fetch and correlate the artifacts of a job.
    ///
    /// Returns `None` while the tabular report or the sequence echo is not
    /// available.
    ///
    /// # Errors
    ///
    /// Returns an `UpstreamError` if any artifact request fails in transport.
    pub async fn fetch_result(&self, job: &JobHandle) -> Result<Option<CmScanOutcome>, UpstreamError> {
        let (out, sequence, tblout) = tokio::try_join!(
            self.client.fetch_artifact(job, ArtifactKind::Out),
            self.client.fetch_artifact(job, ArtifactKind::Sequence),
            self.client.fetch_artifact(job, ArtifactKind::Tblout),
        )?;

        if tblout.is_empty() || sequence.is_empty() {
            debug!("Results for job {job} are not available yet");
            return Ok(None);
        }

        Ok(Some(correlate(&out, &sequence, &tblout, job.as_str())))
    }

    /// Stop all background poll loops.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}
