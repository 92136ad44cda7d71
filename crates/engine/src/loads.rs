//! Loads: revenue trips assigned to a truck.
//!
//! A load is created `pending`, may move to `in_transit`, and is delivered
//! exactly once. Delivery is the trigger for deadhead resolution on the
//! truck's next queued load.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Pending,
    InTransit,
    Delivered,
}

impl LoadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
        }
    }

    /// Checks a status change. Transitions are monotonic: a load never goes
    /// back, and a delivered load never changes again.
    pub fn transition_to(self, next: LoadStatus) -> ResultEngine<LoadStatus> {
        match (self, next) {
            (Self::Pending, Self::InTransit)
            | (Self::Pending, Self::Delivered)
            | (Self::InTransit, Self::Delivered) => Ok(next),
            (from, to) => Err(EngineError::InvalidTransition(format!(
                "{} -> {}",
                from.as_str(),
                to.as_str()
            ))),
        }
    }
}

impl TryFrom<&str> for LoadStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            other => Err(EngineError::InvalidTransition(format!(
                "unknown load status: {other}"
            ))),
        }
    }
}

/// A city/state pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub city: String,
    pub state: String,
}

impl Place {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Load {
    pub id: Uuid,
    pub truck_id: Option<Uuid>,
    pub status: LoadStatus,
    /// Revenue miles, fixed at creation.
    pub miles: i64,
    pub deadhead_from: Option<Place>,
    pub deadhead_miles: i64,
    /// Delivered load whose drop-off the deadhead was measured from.
    pub deadhead_source: Option<Uuid>,
    pub total_miles_with_deadhead: Option<i64>,
    pub pay: MoneyCents,
    pub origin: Place,
    pub destination: Place,
    pub rate_per_mile_minor: i64,
    pub profit: MoneyCents,
    pub actual_cost_per_mile_minor: i64,
    pub pickup_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Load {
    /// Revenue plus deadhead miles, preferring the denormalized column.
    pub fn operational_miles(&self) -> i64 {
        self.total_miles_with_deadhead
            .unwrap_or(self.miles.saturating_add(self.deadhead_miles))
    }

    /// Whether the deadhead leading to this load still has to be resolved.
    pub fn awaits_deadhead(&self) -> bool {
        self.status != LoadStatus::Delivered && self.deadhead_miles == 0
    }

    /// Order key for "next load": pickup time, then creation time.
    pub fn queue_key(&self) -> (DateTime<Utc>, DateTime<Utc>, Uuid) {
        (
            self.pickup_at.unwrap_or(self.created_at),
            self.created_at,
            self.id,
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "loads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub truck_id: Option<String>,
    pub status: String,
    pub miles: i64,
    pub deadhead_from_city: Option<String>,
    pub deadhead_from_state: Option<String>,
    pub deadhead_miles: i64,
    pub deadhead_source_load_id: Option<String>,
    pub total_miles_with_deadhead: Option<i64>,
    pub pay_minor: i64,
    pub origin_city: String,
    pub origin_state: String,
    pub destination_city: String,
    pub destination_state: String,
    pub rate_per_mile_minor: i64,
    pub profit_minor: i64,
    pub actual_cost_per_mile_minor: i64,
    pub pickup_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub delivered_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trucks::Entity",
        from = "Column::TruckId",
        to = "super::trucks::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Trucks,
    #[sea_orm(has_many = "super::fuel_purchases::Entity")]
    FuelPurchases,
}

impl Related<super::trucks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trucks.def()
    }
}

impl Related<super::fuel_purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FuelPurchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Load> for ActiveModel {
    fn from(value: &Load) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            truck_id: ActiveValue::Set(value.truck_id.map(|id| id.to_string())),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            miles: ActiveValue::Set(value.miles),
            deadhead_from_city: ActiveValue::Set(
                value.deadhead_from.as_ref().map(|p| p.city.clone()),
            ),
            deadhead_from_state: ActiveValue::Set(
                value.deadhead_from.as_ref().map(|p| p.state.clone()),
            ),
            deadhead_miles: ActiveValue::Set(value.deadhead_miles),
            deadhead_source_load_id: ActiveValue::Set(
                value.deadhead_source.map(|id| id.to_string()),
            ),
            total_miles_with_deadhead: ActiveValue::Set(value.total_miles_with_deadhead),
            pay_minor: ActiveValue::Set(value.pay.cents()),
            origin_city: ActiveValue::Set(value.origin.city.clone()),
            origin_state: ActiveValue::Set(value.origin.state.clone()),
            destination_city: ActiveValue::Set(value.destination.city.clone()),
            destination_state: ActiveValue::Set(value.destination.state.clone()),
            rate_per_mile_minor: ActiveValue::Set(value.rate_per_mile_minor),
            profit_minor: ActiveValue::Set(value.profit.cents()),
            actual_cost_per_mile_minor: ActiveValue::Set(value.actual_cost_per_mile_minor),
            pickup_at: ActiveValue::Set(value.pickup_at),
            created_at: ActiveValue::Set(value.created_at),
            delivered_at: ActiveValue::Set(value.delivered_at),
        }
    }
}

impl TryFrom<Model> for Load {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let deadhead_from = match (model.deadhead_from_city, model.deadhead_from_state) {
            (Some(city), Some(state)) => Some(Place { city, state }),
            _ => None,
        };
        Ok(Self {
            id: parse_uuid(&model.id, "load")?,
            truck_id: model
                .truck_id
                .as_deref()
                .map(|id| parse_uuid(id, "truck"))
                .transpose()?,
            status: LoadStatus::try_from(model.status.as_str())?,
            miles: model.miles,
            deadhead_from,
            deadhead_miles: model.deadhead_miles,
            deadhead_source: model
                .deadhead_source_load_id
                .as_deref()
                .map(|id| parse_uuid(id, "load"))
                .transpose()?,
            total_miles_with_deadhead: model.total_miles_with_deadhead,
            pay: MoneyCents::new(model.pay_minor),
            origin: Place::new(model.origin_city, model.origin_state),
            destination: Place::new(model.destination_city, model.destination_state),
            rate_per_mile_minor: model.rate_per_mile_minor,
            profit: MoneyCents::new(model.profit_minor),
            actual_cost_per_mile_minor: model.actual_cost_per_mile_minor,
            pickup_at: model.pickup_at,
            created_at: model.created_at,
            delivered_at: model.delivered_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn load(miles: i64, deadhead_miles: i64) -> Load {
        let created_at = Utc.with_ymd_and_hms(2026, 10, 12, 8, 0, 0).unwrap();
        Load {
            id: Uuid::new_v4(),
            truck_id: None,
            status: LoadStatus::Pending,
            miles,
            deadhead_from: None,
            deadhead_miles,
            deadhead_source: None,
            total_miles_with_deadhead: None,
            pay: MoneyCents::ZERO,
            origin: Place::new("Chicago", "IL"),
            destination: Place::new("Dallas", "TX"),
            rate_per_mile_minor: 0,
            profit: MoneyCents::ZERO,
            actual_cost_per_mile_minor: 0,
            pickup_at: None,
            created_at,
            delivered_at: None,
        }
    }

    #[test]
    fn status_transitions_are_monotonic() {
        use LoadStatus::*;

        assert_eq!(Pending.transition_to(InTransit), Ok(InTransit));
        assert_eq!(Pending.transition_to(Delivered), Ok(Delivered));
        assert_eq!(InTransit.transition_to(Delivered), Ok(Delivered));

        assert!(InTransit.transition_to(Pending).is_err());
        assert!(Delivered.transition_to(Pending).is_err());
        assert!(Delivered.transition_to(InTransit).is_err());
        assert_eq!(
            Delivered.transition_to(Delivered),
            Err(EngineError::InvalidTransition(
                "delivered -> delivered".to_string()
            ))
        );
    }

    #[test]
    fn operational_miles_falls_back_to_parts() {
        let mut l = load(500, 120);
        assert_eq!(l.operational_miles(), 620);

        l.total_miles_with_deadhead = Some(640);
        assert_eq!(l.operational_miles(), 640);
    }

    #[test]
    fn queue_key_prefers_pickup_time() {
        let early = load(100, 0);
        let mut late_created = load(100, 0);
        late_created.created_at = early.created_at + chrono::Duration::days(1);
        late_created.pickup_at = Some(early.created_at - chrono::Duration::hours(1));

        assert!(late_created.queue_key() < early.queue_key());
    }
}
