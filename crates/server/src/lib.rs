use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{router, run, run_with_listener, spawn_with_listener};

mod breakdowns;
mod fleet;
mod fuel;
mod loads;
mod server;
mod trucks;

pub mod types {
    pub mod truck {
        pub use api_types::truck::{LoadQuote, TruckList, TruckNew, TruckRename};
        pub use engine::{LoadProfit, Truck, TruckCostSummary};
    }

    pub mod load {
        pub use api_types::load::{LoadNew, LoadStatus, LoadStatusChange, LoadUpdate};
        pub use engine::{Load, LoadProfitability, PipelineReport};
    }

    pub mod fuel {
        pub use api_types::fuel::{FuelAttach, FuelPurchaseNew, FuelPurchaseUpdate, FuelType};
        pub use engine::FuelPurchase;
    }

    pub mod breakdown {
        pub use api_types::breakdown::{CostBreakdownUpsert, LineItems};
        pub use engine::CostBreakdown;
    }

    pub mod fleet {
        pub use engine::FleetProfit;
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidAmount(_) | EngineError::InvalidId(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::InvalidTransition(_) => StatusCode::CONFLICT,
        EngineError::ConcurrentRecomputation(_) | EngineError::ExternalLookup(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        EngineError::InvariantViolation(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::InvariantViolation(reason) => {
            tracing::error!("recomputation rolled back: {reason}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use engine::DistanceError;

    use super::*;

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_validation_maps_to_422() {
        let res = ServerError::from(EngineError::InvalidAmount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let res = ServerError::from(EngineError::InvalidId("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn engine_transition_maps_to_409() {
        let res =
            ServerError::from(EngineError::InvalidTransition("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_contention_maps_to_503() {
        let res = ServerError::from(EngineError::ConcurrentRecomputation("x".to_string()))
            .into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let res = ServerError::from(EngineError::ExternalLookup(DistanceError::Timeout(3000)))
            .into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn engine_invariant_maps_to_500() {
        let res =
            ServerError::from(EngineError::InvariantViolation("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
