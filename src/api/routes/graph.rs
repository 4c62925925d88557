use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::{
    build_graph, GraphSeries, PlayerListing, RangePreset, ViewportLayout, ViewportQuery,
};

/// Load the raw input for a share key and run the pipeline on it.
async fn load_graph(state: &AppState, share_key: &str) -> Result<GraphSeries, ApiError> {
    let players = state.cache.get(share_key).await?;
    let graph = build_graph(&players, &state.config.graph, &state.seasons)?;
    Ok(graph)
}

fn no_graph(share_key: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "share key '{}' has no player with enough graphable matches",
        share_key
    ))
}

pub async fn graph(
    State(state): State<AppState>,
    Path(share_key): Path<String>,
) -> Result<Json<GraphSeries>, ApiError> {
    Ok(Json(load_graph(&state, &share_key).await?))
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub share_key: String,
    pub players: Vec<PlayerListing>,
}

pub async fn matches(
    State(state): State<AppState>,
    Path(share_key): Path<String>,
) -> Result<Json<MatchesResponse>, ApiError> {
    let graph = load_graph(&state, &share_key).await?;
    Ok(Json(MatchesResponse {
        share_key,
        players: graph.listing,
    }))
}

pub async fn viewport(
    State(state): State<AppState>,
    Path(share_key): Path<String>,
    Json(query): Json<ViewportQuery>,
) -> Result<Json<ViewportLayout>, ApiError> {
    if !(query.left.is_finite() && query.right.is_finite()) || query.left > query.right {
        return Err(ApiError::BadRequest(
            "left and right must be finite with left <= right".to_string(),
        ));
    }

    let graph = load_graph(&state, &share_key).await?;
    graph
        .query(&query, &state.config.graph)
        .map(Json)
        .ok_or_else(|| no_graph(&share_key))
}

pub async fn range(
    State(state): State<AppState>,
    Path(share_key): Path<String>,
    Json(preset): Json<RangePreset>,
) -> Result<Json<ViewportLayout>, ApiError> {
    let graph = load_graph(&state, &share_key).await?;
    graph
        .preset(&preset, &state.config.graph)
        .map(Json)
        .ok_or_else(|| no_graph(&share_key))
}
