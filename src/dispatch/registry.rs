//! Supervisor for background poll loops.
//!
//! Each watched job gets its own task and a child of the registry's root
//! cancellation token. At most `max_pollers` loops run at once; further jobs
//! wait for a slot. [`PollerRegistry::shutdown`] cancels every loop and waits
//! for the tasks to finish.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::core::job::{ArtifactKind, JobHandle, JobStatus};
use crate::dispatch::notify::{JobNotification, Notifier};
use crate::dispatch::poller::{JobPoller, PollOutcome};

type ActiveJobs = Arc<Mutex<HashMap<JobHandle, CancellationToken>>>;

pub struct PollerRegistry {
    poller: JobPoller,
    notifier: Arc<dyn Notifier>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    root: CancellationToken,
    active: ActiveJobs,
}

impl PollerRegistry {
    #[must_use]
    pub fn new(poller: JobPoller, notifier: Arc<dyn Notifier>, max_pollers: usize) -> Self {
        Self {
            poller,
            notifier,
            permits: Arc::new(Semaphore::new(max_pollers.max(1))),
            tracker: TaskTracker::new(),
            root: CancellationToken::new(),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start polling `job` in the background and notify `email` once it
    /// reaches a terminal status.
    ///
    /// Returns `false` if the job is already being watched or the registry
    /// has been shut down. Must be called from within a tokio runtime.
    pub fn watch(&self, job: JobHandle, email: String) -> bool {
        if self.root.is_cancelled() {
            warn!("Not watching job {job}: registry is shut down");
            return false;
        }

        let token = {
            let mut active = lock(&self.active);
            if active.contains_key(&job) {
                return false;
            }
            let token = self.root.child_token();
            active.insert(job.clone(), token.clone());
            token
        };

        let poller = self.poller.clone();
        let notifier = Arc::clone(&self.notifier);
        let permits = Arc::clone(&self.permits);
        let active = Arc::clone(&self.active);

        self.tracker.spawn(async move {
            let permit = tokio::select! {
                biased;
                () = token.cancelled() => None,
                permit = permits.acquire_owned() => permit.ok(),
            };
            if let Some(_permit) = permit {
                watch_job(&poller, notifier.as_ref(), &job, email, &token).await;
            } else {
                debug!("Job {job} cancelled before polling started");
            }
            lock(&active).remove(&job);
        });

        true
    }

    /// Stop polling one job. Returns `false` if it was not being watched.
    pub fn cancel(&self, job: &JobHandle) -> bool {
        match lock(&self.active).get(job) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_watching(&self, job: &JobHandle) -> bool {
        lock(&self.active).contains_key(job)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        lock(&self.active).len()
    }

    /// Deliver the notification for a job that reached `status`.
    ///
    /// Background loops call this themselves; callers that poll a job in the
    /// foreground call it once the job is terminal.
    pub async fn notify_terminal(&self, job: &JobHandle, email: String, status: JobStatus) {
        notify_terminal(&self.poller, self.notifier.as_ref(), job, email, status).await;
    }

    /// Cancel every poll loop and wait for all of them to exit.
    pub async fn shutdown(&self) {
        info!("Stopping {} poll loop(s)", self.active_count());
        self.root.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

fn lock(active: &ActiveJobs) -> MutexGuard<'_, HashMap<JobHandle, CancellationToken>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn watch_job(
    poller: &JobPoller,
    notifier: &dyn Notifier,
    job: &JobHandle,
    email: String,
    token: &CancellationToken,
) {
    let outcome = poller
        .poll_until_terminal(job, token, |event| {
            debug!("Job {} is {} (poll {})", event.job, event.status, event.tick);
        })
        .await;

    match outcome {
        Ok(PollOutcome::Terminal(status)) => {
            notify_terminal(poller, notifier, job, email, status).await;
        }
        Ok(PollOutcome::Cancelled) => info!("Stopped polling job {job}"),
        Ok(PollOutcome::DeadlineExceeded) => {
            warn!("Gave up polling job {job}: time budget exhausted");
        }
        Err(e) => error!("Polling job {job} failed: {e}"),
    }
}

async fn notify_terminal(
    poller: &JobPoller,
    notifier: &dyn Notifier,
    job: &JobHandle,
    email: String,
    status: JobStatus,
) {
    let tblout = match status {
        JobStatus::Finished => poller
            .client()
            .fetch_artifact(job, ArtifactKind::Tblout)
            .await
            .unwrap_or_else(|e| {
                warn!("Could not fetch results for job {job}: {e}");
                String::new()
            }),
        JobStatus::NotFound => {
            warn!("Job {job} is unknown to the job service");
            String::new()
        }
        _ => String::new(),
    };
    notifier.notify(&JobNotification {
        email,
        job: job.clone(),
        status,
        tblout,
    });
}
