//! HTTP request handlers
//!
//! Errors come back as `(status, {"status": message})`.

use crate::api::AppState;
use crate::error::Error;
use crate::search::{SearchHit, DEFAULT_CALLER};
use crate::session::SessionStatus;
use crate::source::SourceRequest;
use crate::types::RoomId;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use radiocast_common::stations::Station;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    git_hash: String,
    build_timestamp: String,
    port: u16,
    active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn new(status: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: status.into(),
        })
    }
}

/// Play a named station, a raw stream URL or a search result
#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    station: Option<String>,
    url: Option<String>,
    /// 1-based position in the caller's latest search
    result: Option<usize>,
    caller: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlayResponse {
    room_id: RoomId,
    session_id: Uuid,
    source: String,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    percent: u32, // 0-100
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    percent: u32,
}

#[derive(Debug, Deserialize)]
pub struct AddStationRequest {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    caller: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultEntry {
    index: usize,
    #[serde(flatten)]
    hit: SearchHit,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    query: String,
    caller: String,
    results: Vec<SearchResultEntry>,
}

type ApiError = (StatusCode, Json<StatusResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn api_error(error: Error) -> ApiError {
    let status = match &error {
        Error::NothingPlaying(_) | Error::InvalidState(_) | Error::NoSearchResults(_) => {
            StatusCode::CONFLICT
        }
        Error::UnknownStation(_) => StatusCode::NOT_FOUND,
        Error::InvalidVolume(_) | Error::BadRequest(_) | Error::SearchIndexOutOfRange { .. } => {
            StatusCode::BAD_REQUEST
        }
        Error::Common(radiocast_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
        Error::SourceUnavailable(_) | Error::SearchFailed(_) => StatusCode::BAD_GATEWAY,
        Error::VoiceJoinFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        warn!(error = %error, "Request failed");
    }
    (status, StatusResponse::new(error.to_string()))
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let active_sessions = state.registry.sessions().await.len();

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "radiocast-relay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        port: state.port,
        active_sessions,
    })
}

// ============================================================================
// Stations
// ============================================================================

/// GET /stations
pub async fn list_stations(State(state): State<AppState>) -> Json<Vec<Station>> {
    Json(state.stations.list())
}

/// POST /stations
pub async fn add_station(
    State(state): State<AppState>,
    Json(req): Json<AddStationRequest>,
) -> ApiResult<(StatusCode, Json<Station>)> {
    let station = state
        .stations
        .add(&req.name, &req.url)
        .map_err(|e| api_error(e.into()))?;
    Ok((StatusCode::CREATED, Json(station)))
}

/// GET /stations/search?q=<name>&caller=<id>
pub async fn search_stations(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let caller = query.caller.unwrap_or_else(|| DEFAULT_CALLER.to_string());
    let hits = state
        .search
        .search(&caller, &query.q)
        .await
        .map_err(api_error)?;

    Ok(Json(SearchResponse {
        query: query.q,
        caller,
        results: hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| SearchResultEntry { index: i + 1, hit })
            .collect(),
    }))
}

// ============================================================================
// Rooms
// ============================================================================

/// GET /rooms
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<SessionStatus>> {
    Json(state.registry.sessions().await)
}

/// GET /rooms/:room
pub async fn get_room(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> ApiResult<Json<SessionStatus>> {
    let room = RoomId::from(room);
    match state.registry.lookup(&room).await {
        Some(session) => Ok(Json(session.status())),
        None => Err((
            StatusCode::NOT_FOUND,
            StatusResponse::new(format!("No session for room {}", room)),
        )),
    }
}

/// POST /rooms/:room/play
pub async fn play(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(req): Json<PlayRequest>,
) -> ApiResult<Json<PlayResponse>> {
    let room = RoomId::from(room);
    let request = match (req.station, req.url, req.result) {
        (Some(station), None, None) => SourceRequest::Station(station),
        (None, Some(url), None) => SourceRequest::Url(url),
        (None, None, Some(index)) => SourceRequest::SearchResult {
            caller: req.caller.unwrap_or_else(|| DEFAULT_CALLER.to_string()),
            index,
        },
        _ => {
            return Err(api_error(Error::BadRequest(
                "give exactly one of \"station\", \"url\" or \"result\"".to_string(),
            )))
        }
    };

    let source = request
        .locate(state.stations.as_ref(), &state.search)
        .map_err(api_error)?;
    info!(room = %room, source = %source, "Play requested");

    let session_id = state
        .registry
        .play(room.clone(), &source)
        .await
        .map_err(api_error)?;

    Ok(Json(PlayResponse {
        room_id: room,
        session_id,
        source,
    }))
}

/// POST /rooms/:room/stop
pub async fn stop(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let room = RoomId::from(room);
    state.registry.stop(&room).await.map_err(api_error)?;
    info!(room = %room, "Stopped");
    Ok(StatusResponse::new("stopped"))
}

/// POST /rooms/:room/volume
pub async fn set_volume(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(req): Json<VolumeRequest>,
) -> ApiResult<Json<VolumeResponse>> {
    let room = RoomId::from(room);
    state
        .registry
        .set_volume(&room, req.percent)
        .await
        .map_err(api_error)?;
    Ok(Json(VolumeResponse {
        percent: req.percent,
    }))
}

/// POST /rooms/:room/pause
pub async fn pause(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    state
        .registry
        .pause(&RoomId::from(room))
        .await
        .map_err(api_error)?;
    Ok(StatusResponse::new("paused"))
}

/// POST /rooms/:room/resume
pub async fn resume(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    state
        .registry
        .resume(&RoomId::from(room))
        .await
        .map_err(api_error)?;
    Ok(StatusResponse::new("playing"))
}
