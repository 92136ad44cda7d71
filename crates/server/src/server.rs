use axum::{
    Router,
    routing::{get, post},
};

use std::sync::Arc;

use crate::{breakdowns, fleet, fuel, loads, trucks};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

pub fn router(engine: Arc<Engine>) -> Router {
    let state = ServerState { engine };
    Router::new()
        .route("/trucks", post(trucks::truck_new).get(trucks::list))
        .route("/trucks/{id}", get(trucks::get).patch(trucks::rename))
        .route("/trucks/{id}/summary", get(trucks::cost_summary))
        .route("/trucks/{id}/quote", post(trucks::quote))
        .route("/trucks/{id}/recompute", post(trucks::recompute))
        .route("/trucks/{id}/loads", get(loads::truck_loads))
        .route("/trucks/{id}/fuel", get(fuel::truck_purchases))
        .route(
            "/trucks/{id}/breakdowns",
            get(breakdowns::truck_breakdowns).put(breakdowns::upsert),
        )
        .route("/loads", post(loads::load_new))
        .route("/loads/unassigned", get(loads::unassigned))
        .route(
            "/loads/{id}",
            get(loads::get).patch(loads::update).delete(loads::delete),
        )
        .route("/loads/{id}/status", post(loads::set_status))
        .route("/loads/{id}/profitability", get(loads::profitability))
        .route("/loads/{id}/recompute", post(loads::recompute))
        .route("/fuel", post(fuel::purchase_new))
        .route(
            "/fuel/{id}",
            get(fuel::get).patch(fuel::update).delete(fuel::delete),
        )
        .route("/fuel/{id}/attach", post(fuel::attach))
        .route("/fuel/{id}/detach", post(fuel::detach))
        .route("/fuel/{id}/recompute", post(fuel::recompute))
        .route("/breakdowns/{id}", get(breakdowns::get))
        .route("/breakdowns/{id}/recompute", post(breakdowns::recompute))
        .route("/fleet/{owner_id}/summary", get(fleet::summary))
        .with_state(state)
}

pub async fn run(engine: Engine, addr: &str) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine))).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
