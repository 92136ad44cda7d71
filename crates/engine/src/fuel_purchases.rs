//! Fuel purchases.
//!
//! A purchase always belongs to a truck. It counts toward weekly fuel cost
//! and MPG only while it is attached to a load.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Diesel,
    Def,
}

impl FuelType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Diesel => "diesel",
            Self::Def => "def",
        }
    }
}

impl TryFrom<&str> for FuelType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "diesel" => Ok(Self::Diesel),
            "def" => Ok(Self::Def),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid fuel type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuelPurchase {
    pub id: Uuid,
    pub truck_id: Uuid,
    pub load_id: Option<Uuid>,
    pub gallons: f64,
    pub total_cost: MoneyCents,
    pub purchase_date: DateTime<Utc>,
    pub fuel_type: FuelType,
}

impl FuelPurchase {
    pub fn is_attached(&self) -> bool {
        self.load_id.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fuel_purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub truck_id: String,
    pub load_id: Option<String>,
    #[sea_orm(column_type = "Double")]
    pub gallons: f64,
    pub total_cost_minor: i64,
    pub purchase_date: DateTimeUtc,
    pub fuel_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trucks::Entity",
        from = "Column::TruckId",
        to = "super::trucks::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Trucks,
    #[sea_orm(
        belongs_to = "super::loads::Entity",
        from = "Column::LoadId",
        to = "super::loads::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Loads,
}

impl Related<super::trucks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trucks.def()
    }
}

impl Related<super::loads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&FuelPurchase> for ActiveModel {
    fn from(value: &FuelPurchase) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            truck_id: ActiveValue::Set(value.truck_id.to_string()),
            load_id: ActiveValue::Set(value.load_id.map(|id| id.to_string())),
            gallons: ActiveValue::Set(value.gallons),
            total_cost_minor: ActiveValue::Set(value.total_cost.cents()),
            purchase_date: ActiveValue::Set(value.purchase_date),
            fuel_type: ActiveValue::Set(value.fuel_type.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for FuelPurchase {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "fuel purchase")?,
            truck_id: parse_uuid(&model.truck_id, "truck")?,
            load_id: model
                .load_id
                .as_deref()
                .map(|id| parse_uuid(id, "load"))
                .transpose()?,
            gallons: model.gallons,
            total_cost: MoneyCents::new(model.total_cost_minor),
            purchase_date: model.purchase_date,
            fuel_type: FuelType::try_from(model.fuel_type.as_str())?,
        })
    }
}
