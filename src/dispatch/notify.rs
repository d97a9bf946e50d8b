use tracing::info;

use crate::core::job::{JobHandle, JobStatus};

/// Sent once per job when it reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNotification {
    pub email: String,
    pub job: JobHandle,
    pub status: JobStatus,
    /// Tabular report for finished jobs, empty otherwise
    pub tblout: String,
}

/// Delivery of job completion notices (e-mail or otherwise) lives outside
/// this crate; implement this to hook it up.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &JobNotification);
}

/// Logs the notification instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &JobNotification) {
        info!(
            "Job {} finished with status {}; notifying {} ({} bytes of results)",
            notification.job,
            notification.status,
            notification.email,
            notification.tblout.len()
        );
    }
}
