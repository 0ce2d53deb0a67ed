//! HTTP control API
//!
//! Room commands (play, stop, volume, pause, resume), status queries, the
//! station catalog and station search, all thin wrappers over
//! [`SessionRegistry`], [`StationCatalog`] and [`StationSearch`].

pub mod handlers;

use crate::search::StationSearch;
use crate::session::SessionRegistry;
use axum::{
    routing::{get, post},
    Router,
};
use radiocast_common::StationCatalog;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub stations: Arc<StationCatalog>,
    pub search: Arc<StationSearch>,
    /// Port the server listens on (reported by /health)
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))

        // Station catalog
        .route("/stations", get(handlers::list_stations))
        .route("/stations", post(handlers::add_station))
        .route("/stations/search", get(handlers::search_stations))

        // Rooms
        .route("/rooms", get(handlers::list_rooms))
        .route("/rooms/:room", get(handlers::get_room))
        .route("/rooms/:room/play", post(handlers::play))
        .route("/rooms/:room/stop", post(handlers::stop))
        .route("/rooms/:room/volume", post(handlers::set_volume))
        .route("/rooms/:room/pause", post(handlers::pause))
        .route("/rooms/:room/resume", post(handlers::resume))

        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
