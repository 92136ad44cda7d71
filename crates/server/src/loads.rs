//! Loads API endpoints.

use api_types::load::{LoadNew, LoadRecompute, LoadStatus, LoadStatusChange, LoadUpdate};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{Load, LoadProfitability, MoneyCents, NewLoad, PipelineReport, Place};
use serde::Serialize;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

#[derive(Debug, Serialize)]
pub struct LoadStatusChanged {
    pub load: Load,
    /// Present when the change delivered the load.
    pub report: Option<PipelineReport>,
}

fn place(place: api_types::Place) -> Place {
    Place::new(place.city, place.state)
}

fn status(status: LoadStatus) -> engine::LoadStatus {
    match status {
        LoadStatus::Pending => engine::LoadStatus::Pending,
        LoadStatus::InTransit => engine::LoadStatus::InTransit,
        LoadStatus::Delivered => engine::LoadStatus::Delivered,
    }
}

fn load_update(payload: LoadUpdate) -> engine::LoadUpdate {
    let truck_id = if payload.clear_truck {
        Some(None)
    } else {
        payload.truck_id.map(Some)
    };
    let pickup_at = if payload.clear_pickup {
        Some(None)
    } else {
        payload.pickup_at.map(|at| Some(at.with_timezone(&Utc)))
    };
    engine::LoadUpdate {
        truck_id,
        pay: payload.pay_minor.map(MoneyCents::new),
        origin: payload.origin.map(place),
        destination: payload.destination.map(place),
        pickup_at,
    }
}

pub async fn load_new(
    State(state): State<ServerState>,
    Json(payload): Json<LoadNew>,
) -> Result<(StatusCode, Json<Load>), ServerError> {
    let load = state
        .engine
        .new_load(NewLoad {
            truck_id: payload.truck_id,
            miles: payload.miles,
            pay: MoneyCents::new(payload.pay_minor),
            origin: place(payload.origin),
            destination: place(payload.destination),
            pickup_at: payload.pickup_at.map(|at| at.with_timezone(&Utc)),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(load)))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(load_id): Path<Uuid>,
) -> Result<Json<Load>, ServerError> {
    Ok(Json(state.engine.load(load_id).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(load_id): Path<Uuid>,
    Json(payload): Json<LoadUpdate>,
) -> Result<Json<Load>, ServerError> {
    let load = state
        .engine
        .update_load(load_id, load_update(payload))
        .await?;
    Ok(Json(load))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(load_id): Path<Uuid>,
) -> Result<Json<PipelineReport>, ServerError> {
    Ok(Json(state.engine.delete_load(load_id).await?))
}

pub async fn set_status(
    State(state): State<ServerState>,
    Path(load_id): Path<Uuid>,
    Json(payload): Json<LoadStatusChange>,
) -> Result<Json<LoadStatusChanged>, ServerError> {
    let report = state
        .engine
        .set_load_status(load_id, status(payload.status))
        .await?;
    let load = state.engine.load(load_id).await?;
    Ok(Json(LoadStatusChanged { load, report }))
}

pub async fn profitability(
    State(state): State<ServerState>,
    Path(load_id): Path<Uuid>,
) -> Result<Json<LoadProfitability>, ServerError> {
    Ok(Json(state.engine.load_profitability(load_id).await?))
}

/// Reruns the pipelines of a load changed out of band. A load that no
/// longer exists is recomputed as deleted from `previous_truck_id`.
pub async fn recompute(
    State(state): State<ServerState>,
    Path(load_id): Path<Uuid>,
    Query(query): Query<LoadRecompute>,
) -> Result<Json<PipelineReport>, ServerError> {
    let report = state
        .engine
        .on_load_mutated(load_id, query.previous_truck_id)
        .await?;
    Ok(Json(report))
}

pub async fn truck_loads(
    State(state): State<ServerState>,
    Path(truck_id): Path<Uuid>,
) -> Result<Json<Vec<Load>>, ServerError> {
    Ok(Json(state.engine.truck_loads(truck_id).await?))
}

pub async fn unassigned(State(state): State<ServerState>) -> Result<Json<Vec<Load>>, ServerError> {
    Ok(Json(state.engine.unassigned_loads().await?))
}
