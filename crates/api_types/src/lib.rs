//! Request and response bodies of the fleet HTTP API.
//!
//! Money is always integer cents (`*_minor`), miles are whole miles.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub city: String,
    pub state: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: Uuid,
}

pub mod truck {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TruckNew {
        pub owner_id: String,
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TruckRename {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TruckList {
        pub owner_id: String,
    }

    /// A prospective load priced with the truck's current cost-per-mile.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoadQuote {
        pub miles: i64,
        pub pay_minor: i64,
        #[serde(default)]
        pub fuel_cost_per_mile_minor: i64,
    }
}

pub mod load {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum LoadStatus {
        Pending,
        InTransit,
        Delivered,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoadNew {
        pub truck_id: Option<Uuid>,
        pub miles: i64,
        pub pay_minor: i64,
        pub origin: Place,
        pub destination: Place,
        pub pickup_at: Option<DateTime<FixedOffset>>,
    }

    /// Partial load edit. Revenue miles cannot be changed.
    ///
    /// `clear_truck` unassigns the load, `clear_pickup` removes the pickup
    /// time; both win over the matching value.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    pub struct LoadUpdate {
        pub truck_id: Option<Uuid>,
        pub clear_truck: bool,
        pub pay_minor: Option<i64>,
        pub origin: Option<Place>,
        pub destination: Option<Place>,
        pub pickup_at: Option<DateTime<FixedOffset>>,
        pub clear_pickup: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoadStatusChange {
        pub status: LoadStatus,
    }

    /// Truck the load had before an out-of-band change, if any.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct LoadRecompute {
        pub previous_truck_id: Option<Uuid>,
    }
}

pub mod fuel {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FuelType {
        Diesel,
        Def,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FuelPurchaseNew {
        pub truck_id: Uuid,
        pub load_id: Option<Uuid>,
        pub gallons: f64,
        pub total_cost_minor: i64,
        pub purchase_date: DateTime<FixedOffset>,
        pub fuel_type: FuelType,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(default)]
    pub struct FuelPurchaseUpdate {
        pub gallons: Option<f64>,
        pub total_cost_minor: Option<i64>,
        pub purchase_date: Option<DateTime<FixedOffset>>,
        pub fuel_type: Option<FuelType>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FuelAttach {
        pub load_id: Uuid,
    }
}

pub mod breakdown {
    use super::*;

    /// Weekly line items in cents. Missing items are 0.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct LineItems {
        pub truck_payment: i64,
        pub trailer_payment: i64,
        pub physical_damage_insurance: i64,
        pub liability_insurance: i64,
        pub cargo_insurance: i64,
        pub bobtail_insurance: i64,
        pub occupational_accident_insurance: i64,
        pub eld_subscription: i64,
        pub other_subscriptions: i64,
        pub base_plate: i64,
        pub phone: i64,
        pub driver_pay: i64,
        pub fuel: i64,
        pub def: i64,
        pub maintenance: i64,
        pub tolls: i64,
        pub dwell_time: i64,
        pub reefer_fuel: i64,
        pub parking: i64,
        pub ifta: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CostBreakdownUpsert {
        /// Sunday opening the week.
        pub week_starting: NaiveDate,
        pub items: LineItems,
    }
}
