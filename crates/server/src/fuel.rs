//! Fuel purchases API endpoints.

use api_types::fuel::{FuelAttach, FuelPurchaseNew, FuelPurchaseUpdate, FuelType};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{FuelPurchase, MoneyCents, NewFuelPurchase, PipelineReport};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn fuel_type(fuel_type: FuelType) -> engine::FuelType {
    match fuel_type {
        FuelType::Diesel => engine::FuelType::Diesel,
        FuelType::Def => engine::FuelType::Def,
    }
}

pub async fn purchase_new(
    State(state): State<ServerState>,
    Json(payload): Json<FuelPurchaseNew>,
) -> Result<(StatusCode, Json<FuelPurchase>), ServerError> {
    let purchase = state
        .engine
        .new_fuel_purchase(NewFuelPurchase {
            truck_id: payload.truck_id,
            load_id: payload.load_id,
            gallons: payload.gallons,
            total_cost: MoneyCents::new(payload.total_cost_minor),
            purchase_date: payload.purchase_date.with_timezone(&Utc),
            fuel_type: fuel_type(payload.fuel_type),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<Json<FuelPurchase>, ServerError> {
    Ok(Json(state.engine.fuel_purchase(purchase_id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(purchase_id): Path<Uuid>,
    Json(payload): Json<FuelPurchaseUpdate>,
) -> Result<Json<FuelPurchase>, ServerError> {
    let purchase = state
        .engine
        .update_fuel_purchase(
            purchase_id,
            engine::FuelPurchaseUpdate {
                gallons: payload.gallons,
                total_cost: payload.total_cost_minor.map(MoneyCents::new),
                purchase_date: payload.purchase_date.map(|at| at.with_timezone(&Utc)),
                fuel_type: payload.fuel_type.map(fuel_type),
            },
        )
        .await?;
    Ok(Json(purchase))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_fuel_purchase(purchase_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn attach(
    State(state): State<ServerState>,
    Path(purchase_id): Path<Uuid>,
    Json(payload): Json<FuelAttach>,
) -> Result<Json<FuelPurchase>, ServerError> {
    let purchase = state
        .engine
        .attach_fuel_purchase(purchase_id, payload.load_id)
        .await?;
    Ok(Json(purchase))
}

pub async fn detach(
    State(state): State<ServerState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<Json<FuelPurchase>, ServerError> {
    Ok(Json(state.engine.detach_fuel_purchase(purchase_id).await?))
}

pub async fn recompute(
    State(state): State<ServerState>,
    Path(purchase_id): Path<Uuid>,
) -> Result<Json<PipelineReport>, ServerError> {
    Ok(Json(state.engine.on_fuel_purchase_mutated(purchase_id).await?))
}

pub async fn truck_purchases(
    State(state): State<ServerState>,
    Path(truck_id): Path<Uuid>,
) -> Result<Json<Vec<FuelPurchase>>, ServerError> {
    Ok(Json(state.engine.truck_fuel_purchases(truck_id).await?))
}
