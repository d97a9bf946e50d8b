use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::core::job::JobHandle;
use crate::core::sequence::SubmissionQuery;
use crate::dispatch::{
    DispatcherConfig, JobDispatcher, SubmitError, TracingNotifier, UpstreamError,
};
use crate::parsing::fasta::parse_sequences;
use crate::utils::validation::{validate_upload, ValidationError, MAX_UPLOAD_SIZE};

/// Security configuration constants to prevent `DoS` attacks
pub const MAX_MULTIPART_FIELDS: usize = 10;
pub const MAX_TEXT_FIELD_SIZE: usize = 4 * 1024; // 4KB, email and title only

/// Shared application state
pub struct AppState {
    pub dispatcher: JobDispatcher,
    /// Base URL used to build the `resultURL` returned on submission
    pub public_url: String,
}

/// Enhanced error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
}

#[derive(Serialize)]
struct SubmitResponse {
    #[serde(rename = "jobId")]
    job_id: String,
    #[serde(rename = "resultURL")]
    result_url: String,
}

/// Fields extracted from the submission form
#[derive(Debug, Default)]
struct SubmissionForm {
    email: Option<String>,
    sequence_text: Option<String>,
    title: Option<String>,
}

/// Create a safe error response that prevents information disclosure
/// while logging detailed errors server-side for debugging
pub fn create_safe_error_response(
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> ErrorResponse {
    if let Some(internal_msg) = internal_error {
        tracing::error!("Internal error ({}): {}", error_type, internal_msg);
    }

    ErrorResponse {
        error: user_message.to_string(),
        error_type: error_type.to_string(),
        details: None,
    }
}

/// Run the web server
///
/// # Errors
///
/// Returns an error if the tokio runtime cannot be created or the server fails to start.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args).await })
}

/// Create the application router with all routes and middleware configured.
///
/// Per-IP rate limiting needs the peer address, so it is added by the
/// listener in [`run`] rather than here.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/submit-job", post(submit_job_handler))
        .route("/status/{job_id}", get(status_handler))
        .route("/result/{job_id}", get(result_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                // Security headers for browser protection
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("strict-transport-security"),
                    HeaderValue::from_static("max-age=31536000; includeSubDomains"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("referrer-policy"),
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                ))
                // Artifact fetches have no upstream timeout, so the outer one applies
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(30),
                ))
                .layer(ConcurrencyLimitLayer::new(100))
                // Largest accepted upload plus multipart overhead
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 64 * 1024)),
        )
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let dispatcher = JobDispatcher::new(
        &DispatcherConfig::from(&args.service),
        Arc::new(TracingNotifier),
    )?;
    let state = Arc::new(AppState {
        dispatcher,
        public_url: args.public_url.trim_end_matches('/').to_string(),
    });

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10) // 10 requests per second per IP
        .burst_size(50)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?;

    let app = create_router(Arc::clone(&state)).layer(GovernorLayer {
        config: Arc::new(governor_conf),
    });

    let addr = format!("{}:{}", args.address, args.port);
    println!("Starting rfam-batch API at http://{addr}");
    info!("Forwarding jobs to {}", state.dispatcher.client().base_url());

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    state.dispatcher.shutdown().await;
    Ok(())
}

/// Accept a FASTA upload, submit it and start watching the job
async fn submit_job_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let form = match extract_submission(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let (Some(email), Some(sequence_text)) = (form.email, form.sequence_text) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(create_safe_error_response(
                "missing_input",
                "Both email_address and sequence_file are required.",
                None,
            )),
        )
            .into_response();
    };

    let sequences = match parse_sequences(&sequence_text) {
        Ok(sequences) => sequences,
        Err(e) => return validation_response(&e),
    };

    let query = SubmissionQuery::new(sequences, email).with_title(form.title);
    match state.dispatcher.submit_and_watch(&query).await {
        Ok(job) => {
            let result_url = format!("{}/result/{job}", state.public_url);
            Json(SubmitResponse {
                job_id: job.0,
                result_url,
            })
            .into_response()
        }
        Err(SubmitError::Validation(e)) => validation_response(&e),
        Err(SubmitError::Upstream(e)) => upstream_response(&e),
    }
}

async fn status_handler(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Response {
    let job = JobHandle::new(job_id);
    match state.dispatcher.poll(&job).await {
        Ok(status) => Json(serde_json::json!({
            "jobId": job,
            "status": status,
        }))
        .into_response(),
        Err(e) => upstream_response(&e),
    }
}

async fn result_handler(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Response {
    let job = JobHandle::new(job_id);
    match state.dispatcher.fetch_result(&job).await {
        Ok(Some(outcome)) => Json(outcome).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(create_safe_error_response(
                "result_unavailable",
                "Results are not available for this job yet.",
                None,
            )),
        )
            .into_response(),
        Err(e) => upstream_response(&e),
    }
}

/// Read the submission form, enforcing field count and size limits
async fn extract_submission(multipart: &mut Multipart) -> Result<SubmissionForm, Response> {
    let mut form = SubmissionForm::default();
    let mut fields_received = 0usize;

    loop {
        if fields_received >= MAX_MULTIPART_FIELDS {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Too many form fields".to_string(),
                    error_type: "field_limit_exceeded".to_string(),
                    details: None,
                }),
            )
                .into_response());
        }

        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart submission: {e}");
                return Err(bad_upload_response());
            }
        };
        fields_received += 1;

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "sequence_file" => {
                let bytes = field.bytes().await.map_err(|_| bad_upload_response())?;
                let text = validate_upload(&bytes).map_err(|e| validation_response(&e))?;
                form.sequence_text = Some(text.to_string());
            }
            "email_address" | "id" => {
                let text = field.text().await.map_err(|_| bad_upload_response())?;
                if text.len() > MAX_TEXT_FIELD_SIZE {
                    return Err((
                        StatusCode::PAYLOAD_TOO_LARGE,
                        Json(ErrorResponse {
                            error: "Text field size exceeds limit".to_string(),
                            error_type: "text_too_large".to_string(),
                            details: None,
                        }),
                    )
                        .into_response());
                }
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                if name == "id" {
                    form.title = Some(text.to_string());
                } else {
                    form.email = Some(text.to_string());
                }
            }
            _ => {} // Ignore unknown fields
        }
    }

    Ok(form)
}

fn bad_upload_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(create_safe_error_response(
            "invalid_upload",
            "Failed to parse upload. Please check the submitted form.",
            None,
        )),
    )
        .into_response()
}

/// Validation failures carry a message meant for the submitter
fn validation_response(err: &ValidationError) -> Response {
    let error_type = match err {
        ValidationError::TooLong { .. } => "sequence_too_long",
        ValidationError::InvalidChars { .. } => "invalid_characters",
        ValidationError::GapChars => "gap_characters",
        ValidationError::InvalidHeader { .. } => "invalid_header",
        ValidationError::NoSequences => "no_sequences",
        ValidationError::InvalidUpload => "invalid_upload",
        ValidationError::RemoteRejected { .. } => "rejected",
    };
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: err.to_string(),
            error_type: error_type.to_string(),
            details: None,
        }),
    )
        .into_response()
}

/// Map job service failures without leaking remote bodies to the client
fn upstream_response(err: &UpstreamError) -> Response {
    let internal = err.to_string();
    let (status, error_type, message) = match err {
        UpstreamError::Timeout { .. } => (
            StatusCode::GATEWAY_TIMEOUT,
            "upstream_timeout",
            "The job service did not answer in time.",
        ),
        UpstreamError::HttpStatus { code, .. } => (
            StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY),
            "upstream_status",
            "The job service returned an error.",
        ),
        UpstreamError::Unreachable { .. }
        | UpstreamError::UnexpectedResponse { .. }
        | UpstreamError::ClientBuild(_) => (
            StatusCode::BAD_GATEWAY,
            "upstream_unavailable",
            "The job service is unavailable.",
        ),
    };
    (
        status,
        Json(create_safe_error_response(error_type, message, Some(&internal))),
    )
        .into_response()
}
