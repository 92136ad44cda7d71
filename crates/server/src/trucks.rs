//! Trucks API endpoints.

use api_types::truck::{LoadQuote, TruckList, TruckNew, TruckRename};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{LoadProfit, MoneyCents, PipelineReport, Truck, TruckCostSummary};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub async fn truck_new(
    State(state): State<ServerState>,
    Json(payload): Json<TruckNew>,
) -> Result<(StatusCode, Json<Truck>), ServerError> {
    let truck = state
        .engine
        .new_truck(&payload.owner_id, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(truck)))
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<TruckList>,
) -> Result<Json<Vec<Truck>>, ServerError> {
    let trucks = state.engine.trucks_for_owner(&query.owner_id).await?;
    Ok(Json(trucks))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(truck_id): Path<Uuid>,
) -> Result<Json<Truck>, ServerError> {
    Ok(Json(state.engine.truck(truck_id).await?))
}

pub async fn rename(
    State(state): State<ServerState>,
    Path(truck_id): Path<Uuid>,
    Json(payload): Json<TruckRename>,
) -> Result<Json<Truck>, ServerError> {
    let truck = state.engine.rename_truck(truck_id, &payload.name).await?;
    Ok(Json(truck))
}

pub async fn cost_summary(
    State(state): State<ServerState>,
    Path(truck_id): Path<Uuid>,
) -> Result<Json<TruckCostSummary>, ServerError> {
    Ok(Json(state.engine.truck_cost_summary(truck_id).await?))
}

pub async fn quote(
    State(state): State<ServerState>,
    Path(truck_id): Path<Uuid>,
    Json(payload): Json<LoadQuote>,
) -> Result<Json<LoadProfit>, ServerError> {
    let profit = state
        .engine
        .quote_load(
            truck_id,
            payload.miles,
            MoneyCents::new(payload.pay_minor),
            payload.fuel_cost_per_mile_minor,
        )
        .await?;
    Ok(Json(profit))
}

/// Reruns the truck's pipeline after an out-of-band change.
pub async fn recompute(
    State(state): State<ServerState>,
    Path(truck_id): Path<Uuid>,
) -> Result<Json<PipelineReport>, ServerError> {
    Ok(Json(state.engine.on_truck_mutated(truck_id).await?))
}
