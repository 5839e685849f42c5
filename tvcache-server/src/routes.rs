use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use tvcache_core::{
    Channel, ChannelView, ServiceError, StoreError, StreamService, SystemSettings,
};

use crate::player;

#[derive(Clone)]
pub struct AppState {
    pub service: StreamService,
    pub player_script_url: Arc<str>,
}

impl AppState {
    pub fn new(service: StreamService, player_script_url: impl Into<Arc<str>>) -> Self {
        Self {
            service,
            player_script_url: player_script_url.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/parse", get(parse))
        .route("/health", get(health))
        .route("/channels", get(list_channels))
        .route("/channels/{id}", put(put_channel).delete(delete_channel))
        .route("/channels/{id}/refresh", post(request_refresh))
        .route("/settings", get(get_settings).put(put_settings))
        .with_state(state)
}

// ============ Erreurs ============

#[derive(Debug)]
pub enum ApiError {
    MissingUrl,
    NotFound,
    UnknownChannel(String),
    InvalidChannel(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingUrl => (StatusCode::BAD_REQUEST, "missing url".to_owned()),
            Self::NotFound => (StatusCode::NOT_FOUND, "stream not found".to_owned()),
            Self::UnknownChannel(id) => (StatusCode::NOT_FOUND, format!("unknown channel: {id}")),
            Self::InvalidChannel(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Unavailable(msg) => {
                warn!(error = %msg, "store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "store unavailable, retry later".to_owned())
            }
        };
        (status, message).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownChannel(id) => Self::UnknownChannel(id),
            StoreError::InvalidChannel(e) => Self::InvalidChannel(e.to_string()),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound => Self::NotFound,
            ServiceError::Store(e) => e.into(),
        }
    }
}

// ============ Handlers ============

/// Flags are presence-only: `?url=...&fresh&tv`.
#[derive(Debug, Deserialize)]
pub struct ParseQuery {
    url: Option<String>,
    fresh: Option<String>,
    tv: Option<String>,
}

/// GET /parse
async fn parse(
    State(state): State<AppState>,
    Query(query): Query<ParseQuery>,
) -> Result<Response, ApiError> {
    let page_url = query
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(ApiError::MissingUrl)?;

    let service = &state.service;
    service.record_open(page_url).await;

    let resolution = if query.fresh.is_some() {
        service.refresh(page_url).await?
    } else {
        service.resolve_and_cache(page_url).await?
    };
    debug!(page = %page_url, source = ?resolution.source, "parse served");

    if query.tv.is_some() {
        let page = player::render(
            page_url,
            &resolution,
            service.ttl_secs(),
            &state.player_script_url,
        );
        return Ok(Html(page).into_response());
    }
    Ok(resolution.stream_url.into_response())
}

async fn health() -> &'static str {
    "OK"
}

/// GET /channels
async fn list_channels(State(state): State<AppState>) -> Result<Json<Vec<ChannelView>>, ApiError> {
    Ok(Json(state.service.store().channel_views().await?))
}

/// PUT /channels/{id}. The path id wins over any id in the body.
async fn put_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut body): Json<serde_json::Value>,
) -> Result<Json<Channel>, ApiError> {
    let Some(fields) = body.as_object_mut() else {
        return Err(ApiError::InvalidChannel("channel must be a JSON object".to_owned()));
    };
    fields.insert("id".to_owned(), serde_json::Value::String(id));

    let channel: Channel =
        serde_json::from_value(body).map_err(|e| ApiError::InvalidChannel(e.to_string()))?;
    state.service.store().upsert_channel(channel.clone()).await?;
    Ok(Json(channel))
}

/// DELETE /channels/{id}
async fn delete_channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.service.store().remove_channel(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::UnknownChannel(id))
    }
}

/// POST /channels/{id}/refresh: picked up by the next scan cycle.
async fn request_refresh(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .store()
        .request_manual_refresh(&id, Utc::now())
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<SystemSettings>, ApiError> {
    Ok(Json(state.service.store().settings().await?))
}

async fn put_settings(
    State(state): State<AppState>,
    Json(settings): Json<SystemSettings>,
) -> Result<Json<SystemSettings>, ApiError> {
    state.service.store().update_settings(settings.clone()).await?;
    Ok(Json(settings))
}
