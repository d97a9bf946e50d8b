use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::job::{JobHandle, JobStatus};
use crate::dispatch::client::{JobClient, UpstreamError};

/// One status observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollEvent {
    pub job: JobHandle,
    /// 1-based query count
    pub tick: u32,
    pub status: JobStatus,
}

/// How a poll loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Terminal(JobStatus),
    Cancelled,
    /// The optional wall-clock budget ran out first
    DeadlineExceeded,
}

/// Drives a job to a terminal status by repeated status queries.
#[derive(Clone, Debug)]
pub struct JobPoller {
    client: JobClient,
    interval: Duration,
    max_duration: Option<Duration>,
}

impl JobPoller {
    #[must_use]
    pub fn new(client: JobClient, interval: Duration, max_duration: Option<Duration>) -> Self {
        Self {
            client,
            interval,
            max_duration,
        }
    }

    #[must_use]
    pub fn client(&self) -> &JobClient {
        &self.client
    }

    /// Query status every `interval` until it is terminal, the token is
    /// cancelled, or the wall-clock budget (if any) is spent. `on_event` sees
    /// every observed status, terminal one included.
    ///
    /// Without a budget the loop only ends when the service reports a
    /// terminal status or the token is cancelled.
    ///
    /// # Errors
    ///
    /// A failed status query ends the loop with its `UpstreamError`; it is not retried.
    pub async fn poll_until_terminal<F>(
        &self,
        job: &JobHandle,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Result<PollOutcome, UpstreamError>
    where
        F: FnMut(&PollEvent),
    {
        let started = Instant::now();
        let mut tick = 0;

        loop {
            tick += 1;
            let status = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                status = self.client.status(job) => status?,
            };

            debug!("Job {job} poll {tick}: {status}");
            on_event(&PollEvent {
                job: job.clone(),
                tick,
                status,
            });

            if status.is_terminal() {
                return Ok(PollOutcome::Terminal(status));
            }

            if let Some(budget) = self.max_duration {
                if started.elapsed() + self.interval > budget {
                    return Ok(PollOutcome::DeadlineExceeded);
                }
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
