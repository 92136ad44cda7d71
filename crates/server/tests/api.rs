use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Engine, FixedClock};

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
    ));
    let engine = Engine::builder()
        .database(db)
        .clock(clock)
        .build()
        .await
        .unwrap();
    server::router(Arc::new(engine))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn new_truck(app: &Router, name: &str) -> String {
    let (status, truck) = call(
        app,
        "POST",
        "/trucks",
        Some(json!({ "owner_id": "owner-1", "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    truck["id"].as_str().unwrap().to_string()
}

async fn new_load(app: &Router, truck_id: &str, miles: i64, pay_minor: i64) -> String {
    let (status, load) = call(
        app,
        "POST",
        "/loads",
        Some(json!({
            "truck_id": truck_id,
            "miles": miles,
            "pay_minor": pay_minor,
            "origin": { "city": "Dallas", "state": "TX" },
            "destination": { "city": "Chicago", "state": "IL" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    load["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn new_truck_starts_in_zero_state() {
    let app = app().await;
    let truck_id = new_truck(&app, "Pete").await;

    let (status, summary) = call(&app, "GET", &format!("/trucks/{truck_id}/summary"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_miles"], 0);
    assert_eq!(summary["cost_per_mile_minor"], 0);
    assert_eq!(summary["week_starting"], Value::Null);

    let (status, trucks) = call(&app, "GET", "/trucks?owner_id=owner-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trucks.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn weekly_entry_prices_the_trucks_loads() {
    let app = app().await;
    let truck_id = new_truck(&app, "Pete").await;
    let load_id = new_load(&app, &truck_id, 1000, 300_000).await;

    let (status, row) = call(
        &app,
        "PUT",
        &format!("/trucks/{truck_id}/breakdowns"),
        Some(json!({
            "week_starting": "2026-10-18",
            "items": { "truck_payment": 100_000, "driver_pay": 50_000 },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["cost_per_mile_minor"], 150);

    let (_, truck) = call(&app, "GET", &format!("/trucks/{truck_id}"), None).await;
    assert_eq!(truck["cost_per_mile_minor"], 150);
    assert_eq!(truck["total_miles"], 1000);

    let (status, profit) =
        call(&app, "GET", &format!("/loads/{load_id}/profitability"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profit["cost_per_mile_minor"], 150);
    assert_eq!(profit["net_profit"], 150_000);

    let (status, quote) = call(
        &app,
        "POST",
        &format!("/trucks/{truck_id}/quote"),
        Some(json!({ "miles": 500, "pay_minor": 100_000, "fuel_cost_per_mile_minor": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["total_cost_per_mile_minor"], 200);
    assert_eq!(quote["net_profit"], 0);

    let uri = format!("/trucks/{truck_id}/quote");
    let (status, _) = call(
        &app,
        "POST",
        &uri,
        Some(json!({ "miles": 500, "pay_minor": 100_000, "fuel_cost_per_mile_minor": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        "POST",
        &uri,
        Some(json!({ "miles": i64::MAX / 2, "pay_minor": 0, "fuel_cost_per_mile_minor": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn delivering_twice_is_a_conflict() {
    let app = app().await;
    let truck_id = new_truck(&app, "Pete").await;
    let load_id = new_load(&app, &truck_id, 925, 250_000).await;
    let uri = format!("/loads/{load_id}/status");

    let (status, changed) = call(&app, "POST", &uri, Some(json!({ "status": "delivered" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(changed["load"]["status"], "delivered");
    assert_eq!(changed["report"]["kind"]["kind"], "load_delivered");
    assert_eq!(changed["report"]["deadhead"]["outcome"], "no_queued_load");

    let (status, body) = call(&app, "POST", &uri, Some(json!({ "status": "delivered" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("transition"));
}

#[tokio::test]
async fn invalid_input_is_unprocessable() {
    let app = app().await;
    let truck_id = new_truck(&app, "Pete").await;

    let (status, _) = call(
        &app,
        "POST",
        "/loads",
        Some(json!({
            "truck_id": truck_id,
            "miles": -5,
            "pay_minor": 1000,
            "origin": { "city": "Dallas", "state": "TX" },
            "destination": { "city": "Chicago", "state": "IL" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        "PUT",
        &format!("/trucks/{truck_id}/breakdowns"),
        Some(json!({ "week_starting": "2026-10-19", "items": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn fuel_cannot_attach_to_another_trucks_load() {
    let app = app().await;
    let pete = new_truck(&app, "Pete").await;
    let kenny = new_truck(&app, "Kenny").await;
    let kenny_load = new_load(&app, &kenny, 500, 100_000).await;

    let (status, purchase) = call(
        &app,
        "POST",
        "/fuel",
        Some(json!({
            "truck_id": pete,
            "gallons": 100.0,
            "total_cost_minor": 40_000,
            "purchase_date": "2026-10-19T08:00:00+00:00",
            "fuel_type": "diesel",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["load_id"], Value::Null);
    let purchase_id = purchase["id"].as_str().unwrap();

    let (status, _) = call(
        &app,
        "POST",
        &format!("/fuel/{purchase_id}/attach"),
        Some(json!({ "load_id": kenny_load })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(&app, "DELETE", &format!("/fuel/{purchase_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = app().await;
    let missing = uuid::Uuid::new_v4();

    let (status, _) = call(&app, "GET", &format!("/trucks/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "POST", &format!("/loads/{missing}/recompute"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "GET", &format!("/breakdowns/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
