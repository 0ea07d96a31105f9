//! HTTP surface for profile management and session monitoring
//!
//! `/config` mirrors the catalog CRUD: listing, id enumeration, single-profile
//! read, delete and add/merge, each gated by its own capability flag. A
//! disabled capability answers an explicit 404 rather than leaving the
//! request hanging. `/sessions/` exposes the registry snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

use crate::config::Settings;
use crate::profiles::{ConnectionProfile, ProfileStore};
use crate::sessions::{SessionEntry, SessionRegistry};

/// Shared application state
///
/// The tunnel collaborator holds the same `profiles` and `sessions` handles:
/// it resolves profiles and registers tunnel opens/closes through them.
pub struct AppState {
    /// Immutable startup settings (catalog excluded; the store owns it)
    pub settings: Arc<Settings>,
    /// Connection profile store
    pub profiles: Arc<ProfileStore>,
    /// Live session registry
    pub sessions: Arc<SessionRegistry>,
}

/// Query parameters accepted by `/config`
#[derive(Debug, Default, Deserialize)]
pub struct ConfigQuery {
    /// Profile id for read and delete
    pub id: Option<String>,
    /// `all` requests the id enumeration
    pub ids: Option<String>,
}

/// `GET /sessions/` - snapshot of live tunnel sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionEntry>> {
    Json(state.sessions.snapshot())
}

/// `GET /config` - id enumeration, single read, or full catalog listing
pub async fn read_profiles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConfigQuery>,
) -> Response {
    let api = &state.settings.server.api;
    let id = query.id.as_deref().unwrap_or("");

    if api.ids && query.ids.as_deref() == Some("all") {
        return Json(state.profiles.ids()).into_response();
    }

    if api.read && !id.is_empty() {
        return match state.profiles.get(id) {
            Some(profile) => Json(profile).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        };
    }

    if api.list {
        return Json(state.profiles.list()).into_response();
    }

    StatusCode::NOT_FOUND.into_response()
}

/// `DELETE /config?id=<id>` - remove a profile
///
/// 200 when an entry was removed, 404 when the id is missing from the query
/// or matches nothing.
pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConfigQuery>,
) -> StatusCode {
    if !state.settings.server.api.delete {
        return StatusCode::NOT_FOUND;
    }

    match query.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) if state.profiles.remove(id) => {
            debug!(id = %id, "Removed connection profile");
            StatusCode::OK
        }
        _ => StatusCode::NOT_FOUND,
    }
}

/// `POST /config` - add or merge a profile, echoing the stored object
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BTreeMap<String, String>>, JsonRejection>,
) -> Response {
    if !state.settings.server.api.update {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Ok(Json(values)) = payload else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let stored = state.profiles.add(ConnectionProfile::from(values));
    debug!(id = ?stored.id(), "Stored connection profile");
    Json(stored).into_response()
}
