use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque job identifier assigned by the search service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(pub String);

impl JobHandle {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status token reported by the service's `status` endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Finished,
    Error,
    Failure,
    NotFound,
}

impl JobStatus {
    /// No further transition happens from a terminal status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Error | Self::Failure | Self::NotFound
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Error => "ERROR",
            Self::Failure => "FAILURE",
            Self::NotFound => "NOT_FOUND",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status token '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QUEUED" => Ok(Self::Queued),
            "RUNNING" => Ok(Self::Running),
            "FINISHED" => Ok(Self::Finished),
            "ERROR" => Ok(Self::Error),
            "FAILURE" => Ok(Self::Failure),
            "NOT_FOUND" => Ok(Self::NotFound),
            _ => Err(UnknownStatus(s.trim().to_string())),
        }
    }
}

/// Result artifacts the service publishes for a finished job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Narrative report with per-hit alignments
    Out,
    /// Echo of the submitted sequence(s)
    Sequence,
    /// Tabular hit summary
    Tblout,
}

impl ArtifactKind {
    #[must_use]
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Out => "out",
            Self::Sequence => "sequence",
            Self::Tblout => "tblout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tokens() {
        assert_eq!("QUEUED".parse::<JobStatus>().unwrap(), JobStatus::Queued);
        assert_eq!("running\n".parse::<JobStatus>().unwrap(), JobStatus::Running);
        assert_eq!(
            " NOT_FOUND ".parse::<JobStatus>().unwrap(),
            JobStatus::NotFound
        );
        assert_eq!(
            "PAUSED".parse::<JobStatus>(),
            Err(UnknownStatus("PAUSED".to_string()))
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Finished.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::Failure.is_terminal());
        assert!(JobStatus::NotFound.is_terminal());
    }

    #[test]
    fn test_status_display_round_trips() {
        for status in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Finished,
            JobStatus::Error,
            JobStatus::Failure,
            JobStatus::NotFound,
        ] {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
    }
}
