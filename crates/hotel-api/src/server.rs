//! Axum server and routes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use hotel_history::FormattedEntry;
use hotel_service::{EntityService, HotelOps, ServiceError};
use hotel_types::{
    BaseResponse, CreateRequest, EntityKind, EntityRequest, EntityStats, ListRequest,
    MutationOutcome, Snapshot, StatsRequest, UpdateRequest,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub ops: Arc<HotelOps>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/:kind/list", post(handle_list))
        .route("/api/:kind/stats", post(handle_stats))
        .route("/api/:kind/get", post(handle_get))
        .route("/api/:kind/create", post(handle_create))
        .route("/api/:kind/update", post(handle_update))
        .route("/api/:kind/delete", post(handle_delete))
        .route("/api/:kind/history", post(handle_history))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Payload of a successful create/update/delete.
#[derive(Debug, Serialize)]
pub struct MutationData {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

fn service<'a>(state: &'a AppState, kind: &str) -> Result<&'a EntityService, ServiceError> {
    EntityKind::parse(kind)
        .map(|k| state.ops.service(k))
        .ok_or_else(|| ServiceError::NotFound(format!("unknown entity kind: {}", kind)))
}

fn error_response<T>(e: ServiceError) -> BaseResponse<T> {
    match e {
        ServiceError::AccessDenied(_) => BaseResponse::error(403, "not authorized"),
        ServiceError::NotFound(msg) => BaseResponse::error(404, msg),
        ServiceError::StorageUnavailable(_) => {
            BaseResponse::error(503, "temporarily unavailable, try again")
        }
        ServiceError::InvalidInput(msg) => BaseResponse::error(400, msg),
    }
}

fn respond<T>(result: Result<T, ServiceError>) -> Json<BaseResponse<T>> {
    Json(match result {
        Ok(data) => BaseResponse::ok("Success", data),
        Err(e) => error_response(e),
    })
}

fn respond_mutation(result: Result<MutationOutcome, ServiceError>) -> Json<BaseResponse<MutationData>> {
    Json(match result {
        Ok(outcome) => {
            let warning = outcome.warning();
            let data = MutationData {
                history_id: outcome.history_entry_id().map(str::to_string),
                id: outcome.id,
            };
            BaseResponse {
                warning,
                ..BaseResponse::ok("Success", data)
            }
        }
        Err(e) => error_response(e),
    })
}

async fn handle_list(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(req): Json<ListRequest>,
) -> Json<BaseResponse<Vec<Snapshot>>> {
    let result = match service(&state, &kind) {
        Ok(svc) => svc.list(&req.actor, &req.options).await,
        Err(e) => Err(e),
    };
    respond(result)
}

async fn handle_stats(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(req): Json<StatsRequest>,
) -> Json<BaseResponse<EntityStats>> {
    let result = match service(&state, &kind) {
        Ok(svc) => svc.stats(&req.actor, req.hotel.as_deref()).await,
        Err(e) => Err(e),
    };
    respond(result)
}

async fn handle_get(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(req): Json<EntityRequest>,
) -> Json<BaseResponse<Snapshot>> {
    let result = match service(&state, &kind) {
        Ok(svc) => svc.get(&req.actor, &req.id).await,
        Err(e) => Err(e),
    };
    respond(result)
}

async fn handle_create(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(req): Json<CreateRequest>,
) -> Json<BaseResponse<MutationData>> {
    let result = match service(&state, &kind) {
        Ok(svc) => svc.create(&req.actor, req.data).await,
        Err(e) => Err(e),
    };
    respond_mutation(result)
}

async fn handle_update(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> Json<BaseResponse<MutationData>> {
    let result = match service(&state, &kind) {
        Ok(svc) => svc.update(&req.actor, &req.id, req.data).await,
        Err(e) => Err(e),
    };
    respond_mutation(result)
}

async fn handle_delete(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(req): Json<EntityRequest>,
) -> Json<BaseResponse<MutationData>> {
    let result = match service(&state, &kind) {
        Ok(svc) => svc.delete(&req.actor, &req.id).await,
        Err(e) => Err(e),
    };
    respond_mutation(result)
}

async fn handle_history(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(req): Json<EntityRequest>,
) -> Json<BaseResponse<Vec<FormattedEntry>>> {
    let result = match service(&state, &kind) {
        Ok(svc) => svc.history(&req.actor, &req.id).await,
        Err(e) => Err(e),
    };
    respond(result)
}

async fn handle_health() -> &'static str {
    "ok"
}
