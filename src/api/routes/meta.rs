use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::models::Season;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
pub struct SeasonsResponse {
    /// Applies before the first boundary
    pub pre_season_label: String,
    pub seasons: Vec<Season>,
}

pub async fn seasons(State(state): State<AppState>) -> Json<SeasonsResponse> {
    Json(SeasonsResponse {
        pre_season_label: state.seasons.pre_season_label().to_string(),
        seasons: state.seasons.all_seasons().to_vec(),
    })
}
