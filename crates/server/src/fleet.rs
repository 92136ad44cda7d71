use axum::{
    Json,
    extract::{Path, State},
};
use engine::FleetProfit;

use crate::{ServerError, server::ServerState};

/// Profit over the delivered loads of every truck of the owner.
pub async fn summary(
    State(state): State<ServerState>,
    Path(owner_id): Path<String>,
) -> Result<Json<FleetProfit>, ServerError> {
    Ok(Json(state.engine.fleet_summary(&owner_id).await?))
}
