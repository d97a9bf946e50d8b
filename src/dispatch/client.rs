//! HTTP client for the remote job service.
//!
//! One attempt per call, no retries. Errors keep the remote status code and
//! body so callers can surface them unchanged.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::core::job::{ArtifactKind, JobHandle, JobStatus};
use crate::core::sequence::SubmissionQuery;
use crate::utils::validation::ValidationError;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Job service unreachable at {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Error {code} while requesting {url}: {body}")]
    HttpStatus { url: String, code: u16, body: String },

    #[error("Unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    #[error("Could not build HTTP client: {0}")]
    ClientBuild(String),
}

impl UpstreamError {
    fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Unreachable {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Why a submission did not produce a job
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Client for the `run`, `status` and `result` endpoints.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct JobClient {
    http: reqwest::Client,
    base_url: String,
    submit_timeout: Duration,
}

impl JobClient {
    /// # Errors
    ///
    /// Returns `UpstreamError::ClientBuild` if the TLS backend cannot be initialised.
    pub fn new(base_url: &str, submit_timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("rfam-batch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::ClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            submit_timeout,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a query; the trimmed response body is the job id.
    ///
    /// # Errors
    ///
    /// - `ValidationError::NoSequences` if the query has no sequences (no request is made)
    /// - `ValidationError::RemoteRejected` for an HTTP 400 carrying a `<description>`
    /// - `UpstreamError::Unreachable` / `Timeout` for transport failures
    /// - `UpstreamError::HttpStatus` for any other non-2xx response
    pub async fn submit(&self, query: &SubmissionQuery) -> Result<JobHandle, SubmitError> {
        if query.sequences.is_empty() {
            return Err(ValidationError::NoSequences.into());
        }

        let url = format!("{}/run", self.base_url);
        debug!("Submitting {} sequence(s) to {url}", query.sequences.len());

        let response = self
            .http
            .post(&url)
            .form(&query.form_fields())
            .timeout(self.submit_timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&url, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&url, &e))?;

        if status.is_success() {
            let job = JobHandle::new(body.trim());
            info!("Submitted job {job}");
            return Ok(job);
        }

        if status == StatusCode::BAD_REQUEST {
            if let Some(message) = extract_description(&body) {
                error!("Job service rejected submission: {message}");
                return Err(ValidationError::RemoteRejected { message }.into());
            }
        }

        Err(UpstreamError::HttpStatus {
            url,
            code: status.as_u16(),
            body,
        }
        .into())
    }

    /// Query the current status token of a job.
    ///
    /// # Errors
    ///
    /// Returns an `UpstreamError` for transport failures, non-2xx responses or
    /// an unknown status token.
    pub async fn status(&self, job: &JobHandle) -> Result<JobStatus, UpstreamError> {
        let url = format!("{}/status/{job}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&url, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&url, &e))?;

        if !status.is_success() {
            return Err(UpstreamError::HttpStatus {
                url,
                code: status.as_u16(),
                body,
            });
        }

        body.parse::<JobStatus>()
            .map_err(|e| UpstreamError::UnexpectedResponse {
                url,
                message: e.to_string(),
            })
    }

    /// Fetch one result artifact.
    ///
    /// Any non-200 response yields an empty string: artifacts only exist once
    /// the job has finished, so empty means "not available yet".
    ///
    /// # Errors
    ///
    /// Returns an `UpstreamError` only for transport failures.
    pub async fn fetch_artifact(
        &self,
        job: &JobHandle,
        kind: ArtifactKind,
    ) -> Result<String, UpstreamError> {
        let url = format!("{}/result/{job}/{}", self.base_url, kind.path_segment());
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&url, &e))?;

        if response.status() != StatusCode::OK {
            debug!("{url} returned {}; treating as unavailable", response.status());
            return Ok(String::new());
        }

        response
            .text()
            .await
            .map_err(|e| UpstreamError::from_reqwest(&url, &e))
    }
}

/// Pull the reason out of an error document such as
/// `<error><description>Please enter a valid email address</description></error>`.
#[must_use]
pub fn extract_description(body: &str) -> Option<String> {
    static DESCRIPTION: OnceLock<Regex> = OnceLock::new();
    let re = DESCRIPTION.get_or_init(|| {
        Regex::new(r"(?s)<description>(.*?)</description>").expect("static regex is valid")
    });
    re.captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_description() {
        let body = "<?xml version='1.0' encoding='UTF-8'?>\n<error>\n <description>Please enter a valid email address</description>\n</error>\n";
        assert_eq!(
            extract_description(body).as_deref(),
            Some("Please enter a valid email address")
        );
        assert_eq!(
            extract_description("<description>line one\nline two</description>").as_deref(),
            Some("line one\nline two")
        );
        assert!(extract_description("Bad Request").is_none());
    }

    #[test]
    fn test_base_url_is_normalised() {
        let client = JobClient::new("http://localhost:9000/rest/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000/rest");
    }
}
