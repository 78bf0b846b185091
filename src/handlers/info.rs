use axum::{extract::State, Json};

use crate::models::InfoResponse;
use crate::AppState;

/// Address the server can be reached at on the local network
/// GET /api/info
pub async fn get_info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        ip: state.local_ip.clone(),
        port: state.config.server.port,
    })
}
