//! Geocoding Job API Server
//!
//! HTTP surface for submitting lookups and polling their jobs.
//! Submissions return 202 with a `Location` header naming the job resource.

use crate::application::{JobError, JobService, JobView};
use crate::domain::entities::LookupRequest;
use crate::domain::services::{RequestValidator, ValidationError};
use crate::infrastructure::ShutdownController;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Client-facing text for store failures; the detail only goes to the log.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "The server has encountered an error and cannot complete the request.";

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: String,
}

/// API Server state.
#[derive(Clone)]
pub struct ApiState {
    /// Submission and polling use cases
    pub jobs: Arc<JobService>,
    /// Prefix for absolute `Location` headers; relative when unset
    pub public_url: Option<String>,
}

impl ApiState {
    pub fn new(jobs: Arc<JobService>) -> Self {
        Self {
            jobs,
            public_url: None,
        }
    }

    pub fn with_public_url(mut self, public_url: Option<String>) -> Self {
        self.public_url = public_url.map(|url| url.trim_end_matches('/').to_string());
        self
    }

    /// Location of a job resource, e.g. `/address/job/<id>`.
    pub fn job_location(&self, resource: &str, job_id: &str) -> String {
        format!(
            "{}/{}/job/{}",
            self.public_url.as_deref().unwrap_or(""),
            resource,
            job_id
        )
    }
}

/// Errors surfaced by the HTTP handlers.
///
/// Owns the mapping from use-case failures to status codes and bodies.
#[derive(Debug)]
pub enum ApiError {
    /// 422 with `{"error": {"<field>": ["<message>"]}}`
    Validation(ValidationError),
    /// 404 with `{"error": "job '<id>' does not exist."}`
    NotFound(String),
    /// 500 while queueing
    Submission,
    /// 500 while reading a job
    Retrieval,
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::Invalid(e) => Self::Validation(e),
            JobError::NotFound(job_id) => Self::NotFound(job_id),
            JobError::Submission(e) => {
                tracing::error!("error enqueueing job: {}", e);
                Self::Submission
            }
            JobError::StoreRead(e) => {
                tracing::error!("error retrieving job: {}", e);
                Self::Retrieval
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({
                    "error": { e.field(): [e.to_string()] }
                })),
            )
                .into_response(),
            Self::NotFound(job_id) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "error": JobError::NotFound(job_id).to_string()
                })),
            )
                .into_response(),
            Self::Submission => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": INTERNAL_ERROR_MESSAGE })),
            )
                .into_response(),
            Self::Retrieval => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": format!("Error retrieving job: {}", INTERNAL_ERROR_MESSAGE)
                })),
            )
                .into_response(),
        }
    }
}

/// Build the router for the job API.
pub fn router(state: ApiState) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(health_handler))
        // Coordinates in, address out
        .route("/address/request", post(address_request_handler))
        .route("/address/job/:job_id", get(job_status_handler))
        // Address in, coordinates out
        .route("/coordinates/request", post(coordinates_request_handler))
        .route("/coordinates/job/:job_id", get(job_status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP server for the job API.
pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
}

impl ApiServer {
    pub fn new(listen_addr: String, state: ApiState) -> Self {
        Self { listen_addr, state }
    }

    /// Run the API server until shutdown is initiated.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self, shutdown: ShutdownController) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("job API listening on {}", self.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait_for_shutdown().await })
            .await?;

        tracing::info!("job API stopped");
        Ok(())
    }
}

// Handler functions

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let healthy = state.jobs.store_healthy().await;
    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: if healthy { "ok" } else { "unavailable" }.to_string(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

async fn address_request_handler(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload = RequestValidator::parse_body(&body)?;
    let request = RequestValidator::validate_coordinates(&payload)?;
    submit(&state, request, "address").await
}

async fn coordinates_request_handler(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload = RequestValidator::parse_body(&body)?;
    let request = RequestValidator::validate_address(&payload)?;
    submit(&state, request, "coordinates").await
}

async fn submit(
    state: &ApiState,
    request: LookupRequest,
    resource: &str,
) -> Result<Response, ApiError> {
    let job_id = state.jobs.handle_submit(request).await?;
    let location = state.job_location(resource, &job_id);

    Ok((
        StatusCode::ACCEPTED,
        [(header::LOCATION, location)],
        Json(serde_json::json!({})),
    )
        .into_response())
}

async fn job_status_handler(
    State(state): State<ApiState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>, ApiError> {
    let view = state.jobs.handle_status(&job_id).await?;
    tracing::debug!("job {} is {}", job_id, view.status);
    Ok(Json(view))
}
