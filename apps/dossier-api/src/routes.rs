use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dossier_service::{
	AskOutcome, AskRequest, DirectoryDump, Error as ServiceError, FileSpec, FilesIngested,
	IngestOutcome, SearchRequest, SearchResponse,
};

use crate::state::AppState;

const WEBHOOK_KEY_HEADER: &str = "x-webhook-key";
const ADMIN_KEY_HEADER: &str = "x-admin-key";
const DEFAULT_DUMP_LIMIT: u32 = 200;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/crm/webhook", post(webhook))
		.route("/v1/ask", post(ask))
		.route("/v1/entities/search", get(search))
		.route("/v1/entities/typeahead", get(typeahead))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/files", post(ingest_files))
		.route("/v1/admin/directory", get(directory))
		.with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
	status: &'static str,
	backend: &'static str,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
	state.service.store.probe().await.map_err(ServiceError::from)?;

	Ok(Json(HealthResponse { status: "ok", backend: state.service.store.backend() }))
}

async fn webhook(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<Value>,
) -> Result<Json<IngestOutcome>, ApiError> {
	if let Some(expected) = state.service.cfg.security.webhook_shared_key.as_deref() {
		if !key_matches(&headers, WEBHOOK_KEY_HEADER, expected) {
			return Err(ApiError::unauthorized());
		}
	}

	let outcome = state.service.ingest(&payload).await?;
	Ok(Json(outcome))
}

async fn ask(
	State(state): State<AppState>,
	Json(request): Json<AskRequest>,
) -> Result<Json<AskOutcome>, ApiError> {
	let outcome = state.service.ask(request).await?;
	Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
	#[serde(default)]
	term: String,
	k: Option<u32>,
}

async fn search(
	State(state): State<AppState>,
	Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
	let request = SearchRequest { term: params.term, limit: params.k, include_counts: false };
	let response = state.service.search_entities(request).await?;
	Ok(Json(response))
}

async fn typeahead(
	State(state): State<AppState>,
	Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.typeahead(params.term, params.k).await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct FilesRequest {
	#[serde(default)]
	entity: String,
	#[serde(default)]
	files: Vec<FileSpec>,
}

async fn ingest_files(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<FilesRequest>,
) -> Result<Json<FilesIngested>, ApiError> {
	require_admin(&state, &headers)?;

	let outcome = state.service.ingest_files(&request.entity, &request.files).await?;
	Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct DirectoryParams {
	limit: Option<u32>,
	offset: Option<u32>,
}

async fn directory(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(params): Query<DirectoryParams>,
) -> Result<Json<DirectoryDump>, ApiError> {
	require_admin(&state, &headers)?;

	let dump = state
		.service
		.dump_directory(params.limit.unwrap_or(DEFAULT_DUMP_LIMIT), params.offset.unwrap_or(0))
		.await?;
	Ok(Json(dump))
}

fn key_matches(headers: &HeaderMap, header: &str, expected: &str) -> bool {
	headers.get(header).and_then(|value| value.to_str().ok()).is_some_and(|value| value == expected)
}

// An unconfigured admin key locks the surface rather than opening it.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
	let configured = state.service.cfg.security.admin_shared_key.as_deref();

	if !configured.is_some_and(|expected| key_matches(headers, ADMIN_KEY_HEADER, expected)) {
		return Err(ApiError::unauthorized());
	}

	Ok(())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}

	fn unauthorized() -> Self {
		Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Missing or invalid shared key.")
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();

		match err {
			ServiceError::Validation { .. } =>
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			ServiceError::Configuration { .. } =>
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR", message),
			ServiceError::Upstream { .. } =>
				Self::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };
		(self.status, Json(body)).into_response()
	}
}
