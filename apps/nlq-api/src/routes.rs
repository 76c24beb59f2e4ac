use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use nlq_service::{
	ErrorKind, NotifyRequest, NotifyResponse, QueryFailure, QueryRequest, QueryResult,
	ResyncReport,
};

use crate::state::AppState;

const INVALID_INPUT_MESSAGE: &str =
	"The request is invalid. Questions must be non-empty and within the configured length.";
const MALFORMED_MESSAGE: &str = "An upstream service returned an unusable response.";
const UPSTREAM_MESSAGE: &str = "An upstream service is unavailable. Try again later.";
const INTERNAL_MESSAGE: &str = "The request could not be completed.";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/query", post(query))
		.route("/v1/embeddings/notify", post(notify))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/embeddings/resync", post(resync)).with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
	// Any registry failure means the service cannot answer, so report it as unavailable.
	state.service.health().await.map_err(|err| {
		tracing::warn!(error = %err, "Health check failed.");

		ApiError::from_kind(ErrorKind::UpstreamUnavailable)
	})?;

	Ok(StatusCode::OK)
}

async fn query(
	State(state): State<AppState>,
	payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResult>, ApiError> {
	let Json(payload) = payload?;
	let question = payload.question.unwrap_or_default();
	let response = state.service.query(&question).await?;

	Ok(Json(response))
}

async fn notify(
	State(state): State<AppState>,
	payload: Result<Json<NotifyRequest>, JsonRejection>,
) -> Result<Json<NotifyResponse>, ApiError> {
	let Json(payload) = payload?;
	let response = state.service.notify(payload).await?;

	Ok(Json(response))
}

async fn resync(State(state): State<AppState>) -> Result<Json<ResyncReport>, ApiError> {
	let response = state.service.resync_all().await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: &'static str,
}

/// Error response with a fixed message per kind. Upstream bodies never reach the caller.
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	kind: ErrorKind,
}
impl ApiError {
	pub fn from_kind(kind: ErrorKind) -> Self {
		let status = match kind {
			ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
			ErrorKind::MalformedResponse => StatusCode::BAD_GATEWAY,
			ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
			ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
		};

		Self { status, kind }
	}

	fn message(&self) -> &'static str {
		match self.kind {
			ErrorKind::InvalidInput => INVALID_INPUT_MESSAGE,
			ErrorKind::MalformedResponse => MALFORMED_MESSAGE,
			ErrorKind::UpstreamUnavailable => UPSTREAM_MESSAGE,
			ErrorKind::Internal => INTERNAL_MESSAGE,
		}
	}
}
impl From<nlq_service::Error> for ApiError {
	fn from(err: nlq_service::Error) -> Self {
		tracing::warn!(error = %err, kind = err.kind().as_str(), "Request failed.");

		Self::from_kind(err.kind())
	}
}
impl From<QueryFailure> for ApiError {
	// Already logged by the engine.
	fn from(failure: QueryFailure) -> Self {
		Self::from_kind(failure.kind())
	}
}
impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		tracing::debug!(error = %rejection, "Rejected request body.");

		Self::from_kind(ErrorKind::InvalidInput)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.kind.as_str(), message: self.message() };

		(self.status, Json(body)).into_response()
	}
}
