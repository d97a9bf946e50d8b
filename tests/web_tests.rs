//! HTTP API tests
//!
//! The router is driven with `oneshot`; the job service behind it is a small
//! in-process fake.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Path,
    http::{header, Request, StatusCode},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceExt;

use rfam_batch::dispatch::{DispatcherConfig, JobDispatcher, TracingNotifier};
use rfam_batch::web::server::{create_router, AppState};

const OUT: &str = include_str!("data/out");
const SEQUENCE: &str = include_str!("data/sequence");
const TBLOUT: &str = include_str!("data/tblout");

const BOUNDARY: &str = "rfam-batch-test-boundary";

async fn spawn_job_service() -> String {
    let app = Router::new()
        .route("/run", post(|| async { "job-1" }))
        .route(
            "/status/{job}",
            get(|Path(job): Path<String>| async move {
                if job == "job-1" {
                    "RUNNING"
                } else {
                    "NOT_FOUND"
                }
            }),
        )
        .route(
            "/result/{job}/{kind}",
            get(
                |Path((job, kind)): Path<(String, String)>| async move {
                    match (job.as_str(), kind.as_str()) {
                        ("job-1", "out") => (StatusCode::OK, OUT),
                        ("job-1", "sequence") => (StatusCode::OK, SEQUENCE),
                        ("job-1", "tblout") => (StatusCode::OK, TBLOUT),
                        _ => (StatusCode::NOT_FOUND, ""),
                    }
                },
            ),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn app_state(base_url: &str) -> Arc<AppState> {
    let config = DispatcherConfig {
        base_url: base_url.to_string(),
        poll_interval: Duration::from_millis(50),
        ..DispatcherConfig::default()
    };
    Arc::new(AppState {
        dispatcher: JobDispatcher::new(&config, Arc::new(TracingNotifier)).unwrap(),
        public_url: "https://batch.example.org".to_string(),
    })
}

/// Build a multipart body; fields with a filename are sent as file parts.
fn multipart_body(fields: &[(&str, Option<&str>, &str)]) -> Body {
    let mut body = String::new();
    for (name, filename, value) in fields {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match filename {
            Some(filename) => {
                body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                ));
                body.push_str("Content-Type: text/plain\r\n\r\n");
            }
            None => {
                body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                ));
            }
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Body::from(body)
}

fn submit_request(fields: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/submit-job")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart_body(fields))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_submit_job_returns_result_url() {
    let base = spawn_job_service().await;
    let state = app_state(&base);
    let app = create_router(Arc::clone(&state));

    let response = app
        .oneshot(submit_request(&[
            ("email_address", None, "someone@example.org"),
            ("id", None, "my run"),
            ("sequence_file", Some("query.fa"), ">seq1\nACGUACGU\n"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["jobId"], "job-1");
    assert_eq!(
        json["resultURL"],
        "https://batch.example.org/result/job-1"
    );
    assert!(state
        .dispatcher
        .registry()
        .is_watching(&rfam_batch::JobHandle::new("job-1")));

    state.dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_gap_characters_rejected() {
    let state = app_state("http://127.0.0.1:9");
    let response = create_router(state)
        .oneshot(submit_request(&[
            ("email_address", None, "someone@example.org"),
            ("sequence_file", Some("query.fa"), ">seq1\nACGT.U\n"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error_type"], "gap_characters");
    assert!(json["details"].is_null());
}

#[tokio::test]
async fn test_invalid_characters_listed_in_error() {
    let state = app_state("http://127.0.0.1:9");
    let response = create_router(state)
        .oneshot(submit_request(&[
            ("email_address", None, "someone@example.org"),
            ("sequence_file", Some("query.fa"), ">seq1\nACGUXYZ\n"),
        ]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error_type"], "invalid_characters");
    assert!(json["error"].as_str().unwrap().contains("X, Z"));
}

#[tokio::test]
async fn test_missing_email_rejected() {
    let state = app_state("http://127.0.0.1:9");
    let response = create_router(state)
        .oneshot(submit_request(&[(
            "sequence_file",
            Some("query.fa"),
            ">seq1\nACGU\n",
        )]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error_type"], "missing_input");
}

#[tokio::test]
async fn test_status_is_proxied() {
    let base = spawn_job_service().await;
    let response = create_router(app_state(&base))
        .oneshot(get_request("/status/job-1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["x-content-type-options"],
        "nosniff"
    );
    let json = json_body(response).await;
    assert_eq!(json["jobId"], "job-1");
    assert_eq!(json["status"], "RUNNING");
}

#[tokio::test]
async fn test_result_is_correlated() {
    let base = spawn_job_service().await;
    let response = create_router(app_state(&base))
        .oneshot(get_request("/result/job-1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["jobId"], "job-1");
    assert_eq!(json["numHits"], 1);
    let hit = &json["hits"]["5S_rRNA"][0];
    assert_eq!(hit["acc"], "RF00001");
    assert!(hit["alignment"]["ss"].as_str().unwrap().starts_with("#SS"));
}

#[tokio::test]
async fn test_result_not_ready_is_404() {
    let base = spawn_job_service().await;
    let response = create_router(app_state(&base))
        .oneshot(get_request("/result/other"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error_type"], "result_unavailable");
}

#[tokio::test]
async fn test_unreachable_service_is_bad_gateway() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let response = create_router(app_state(&format!("http://{addr}")))
        .oneshot(get_request("/status/job-1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = json_body(response).await;
    assert_eq!(json["error_type"], "upstream_unavailable");
}
