//! Weekly cost breakdown endpoints.

use api_types::breakdown::{CostBreakdownUpsert, LineItems};
use axum::{
    Json,
    extract::{Path, State},
};
use engine::{CostBreakdown, CostLineItems, MoneyCents, PipelineReport};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn line_items(items: LineItems) -> CostLineItems {
    CostLineItems {
        truck_payment: MoneyCents::new(items.truck_payment),
        trailer_payment: MoneyCents::new(items.trailer_payment),
        physical_damage_insurance: MoneyCents::new(items.physical_damage_insurance),
        liability_insurance: MoneyCents::new(items.liability_insurance),
        cargo_insurance: MoneyCents::new(items.cargo_insurance),
        bobtail_insurance: MoneyCents::new(items.bobtail_insurance),
        occupational_accident_insurance: MoneyCents::new(items.occupational_accident_insurance),
        eld_subscription: MoneyCents::new(items.eld_subscription),
        other_subscriptions: MoneyCents::new(items.other_subscriptions),
        base_plate: MoneyCents::new(items.base_plate),
        phone: MoneyCents::new(items.phone),
        driver_pay: MoneyCents::new(items.driver_pay),
        fuel: MoneyCents::new(items.fuel),
        def: MoneyCents::new(items.def),
        maintenance: MoneyCents::new(items.maintenance),
        tolls: MoneyCents::new(items.tolls),
        dwell_time: MoneyCents::new(items.dwell_time),
        reefer_fuel: MoneyCents::new(items.reefer_fuel),
        parking: MoneyCents::new(items.parking),
        ifta: MoneyCents::new(items.ifta),
    }
}

/// Manual weekly entry. Creates the week's row or replaces its line items.
pub async fn upsert(
    State(state): State<ServerState>,
    Path(truck_id): Path<Uuid>,
    Json(payload): Json<CostBreakdownUpsert>,
) -> Result<Json<CostBreakdown>, ServerError> {
    let row = state
        .engine
        .upsert_cost_breakdown(truck_id, payload.week_starting, line_items(payload.items))
        .await?;
    Ok(Json(row))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(breakdown_id): Path<Uuid>,
) -> Result<Json<CostBreakdown>, ServerError> {
    Ok(Json(state.engine.cost_breakdown(breakdown_id).await?))
}

pub async fn truck_breakdowns(
    State(state): State<ServerState>,
    Path(truck_id): Path<Uuid>,
) -> Result<Json<Vec<CostBreakdown>>, ServerError> {
    Ok(Json(state.engine.cost_breakdowns(truck_id).await?))
}

pub async fn recompute(
    State(state): State<ServerState>,
    Path(breakdown_id): Path<Uuid>,
) -> Result<Json<PipelineReport>, ServerError> {
    let report = state.engine.on_cost_breakdown_edited(breakdown_id).await?;
    Ok(Json(report))
}
