//! Initial schema migration - creates all tables from scratch.
//!
//! - `trucks`: fleet vehicles with cached lifetime miles and weekly costs
//! - `loads`: revenue trips, their deadhead and derived profit
//! - `fuel_purchases`: fuel bought by a truck, optionally attached to a load
//! - `cost_breakdowns`: weekly cost line items, one row per truck and week

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Trucks {
    Table,
    Id,
    OwnerId,
    Name,
    TotalMiles,
    FixedCostsMinor,
    VariableCostsMinor,
    CostPerMileMinor,
    CreatedAt,
}

#[derive(Iden)]
enum Loads {
    Table,
    Id,
    TruckId,
    Status,
    Miles,
    DeadheadFromCity,
    DeadheadFromState,
    DeadheadMiles,
    DeadheadSourceLoadId,
    TotalMilesWithDeadhead,
    PayMinor,
    OriginCity,
    OriginState,
    DestinationCity,
    DestinationState,
    RatePerMileMinor,
    ProfitMinor,
    ActualCostPerMileMinor,
    PickupAt,
    CreatedAt,
    DeliveredAt,
}

#[derive(Iden)]
enum FuelPurchases {
    Table,
    Id,
    TruckId,
    LoadId,
    Gallons,
    TotalCostMinor,
    PurchaseDate,
    FuelType,
}

#[derive(Iden)]
enum CostBreakdowns {
    Table,
    Id,
    TruckId,
    WeekStarting,
    TotalFixedCostsMinor,
    TotalVariableCostsMinor,
    TotalWeeklyCostsMinor,
    CostPerMileMinor,
    GallonsUsed,
    AvgFuelPriceMinor,
    MilesPerGallon,
    MilesThisWeek,
    TotalMilesWithDeadhead,
    UpdatedAt,
}

/// Weekly line items, each a `<name>_minor` cents column.
const LINE_ITEMS: [&str; 20] = [
    "truck_payment",
    "trailer_payment",
    "physical_damage_insurance",
    "liability_insurance",
    "cargo_insurance",
    "bobtail_insurance",
    "occupational_accident_insurance",
    "eld_subscription",
    "other_subscriptions",
    "base_plate",
    "phone",
    "driver_pay",
    "fuel",
    "def",
    "maintenance",
    "tolls",
    "dwell_time",
    "reefer_fuel",
    "parking",
    "ifta",
];

fn zero_int(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Trucks
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Trucks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Trucks::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Trucks::OwnerId).string().not_null())
                    .col(ColumnDef::new(Trucks::Name).string().not_null())
                    .col(&mut zero_int(Trucks::TotalMiles))
                    .col(&mut zero_int(Trucks::FixedCostsMinor))
                    .col(&mut zero_int(Trucks::VariableCostsMinor))
                    .col(&mut zero_int(Trucks::CostPerMileMinor))
                    .col(ColumnDef::new(Trucks::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-trucks-owner_id")
                    .table(Trucks::Table)
                    .col(Trucks::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Loads
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Loads::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Loads::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Loads::TruckId).string())
                    .col(
                        ColumnDef::new(Loads::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Loads::Miles).big_integer().not_null())
                    .col(ColumnDef::new(Loads::DeadheadFromCity).string())
                    .col(ColumnDef::new(Loads::DeadheadFromState).string())
                    .col(&mut zero_int(Loads::DeadheadMiles))
                    .col(ColumnDef::new(Loads::DeadheadSourceLoadId).string())
                    .col(ColumnDef::new(Loads::TotalMilesWithDeadhead).big_integer())
                    .col(&mut zero_int(Loads::PayMinor))
                    .col(ColumnDef::new(Loads::OriginCity).string().not_null())
                    .col(ColumnDef::new(Loads::OriginState).string().not_null())
                    .col(ColumnDef::new(Loads::DestinationCity).string().not_null())
                    .col(ColumnDef::new(Loads::DestinationState).string().not_null())
                    .col(&mut zero_int(Loads::RatePerMileMinor))
                    .col(&mut zero_int(Loads::ProfitMinor))
                    .col(&mut zero_int(Loads::ActualCostPerMileMinor))
                    .col(ColumnDef::new(Loads::PickupAt).timestamp())
                    .col(ColumnDef::new(Loads::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Loads::DeliveredAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-loads-truck_id")
                            .from(Loads::Table, Loads::TruckId)
                            .to(Trucks::Table, Trucks::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-loads-truck_id-status")
                    .table(Loads::Table)
                    .col(Loads::TruckId)
                    .col(Loads::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Fuel purchases
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(FuelPurchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FuelPurchases::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FuelPurchases::TruckId).string().not_null())
                    .col(ColumnDef::new(FuelPurchases::LoadId).string())
                    .col(ColumnDef::new(FuelPurchases::Gallons).double().not_null())
                    .col(&mut zero_int(FuelPurchases::TotalCostMinor))
                    .col(
                        ColumnDef::new(FuelPurchases::PurchaseDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FuelPurchases::FuelType)
                            .string()
                            .not_null()
                            .default("diesel"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fuel_purchases-truck_id")
                            .from(FuelPurchases::Table, FuelPurchases::TruckId)
                            .to(Trucks::Table, Trucks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-fuel_purchases-load_id")
                            .from(FuelPurchases::Table, FuelPurchases::LoadId)
                            .to(Loads::Table, Loads::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fuel_purchases-truck_id")
                    .table(FuelPurchases::Table)
                    .col(FuelPurchases::TruckId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fuel_purchases-load_id")
                    .table(FuelPurchases::Table)
                    .col(FuelPurchases::LoadId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Cost breakdowns
        // ───────────────────────────────────────────────────────────────────
        let mut breakdowns = Table::create();
        breakdowns
            .table(CostBreakdowns::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(CostBreakdowns::Id)
                    .string()
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(CostBreakdowns::TruckId).string().not_null())
            .col(
                ColumnDef::new(CostBreakdowns::WeekStarting)
                    .date()
                    .not_null(),
            );
        for item in LINE_ITEMS {
            breakdowns.col(&mut zero_int(Alias::new(format!("{item}_minor"))));
        }
        breakdowns
            .col(&mut zero_int(CostBreakdowns::TotalFixedCostsMinor))
            .col(&mut zero_int(CostBreakdowns::TotalVariableCostsMinor))
            .col(&mut zero_int(CostBreakdowns::TotalWeeklyCostsMinor))
            .col(&mut zero_int(CostBreakdowns::CostPerMileMinor))
            .col(
                ColumnDef::new(CostBreakdowns::GallonsUsed)
                    .double()
                    .not_null()
                    .default(0.0),
            )
            .col(&mut zero_int(CostBreakdowns::AvgFuelPriceMinor))
            .col(
                ColumnDef::new(CostBreakdowns::MilesPerGallon)
                    .double()
                    .not_null()
                    .default(0.0),
            )
            .col(&mut zero_int(CostBreakdowns::MilesThisWeek))
            .col(&mut zero_int(CostBreakdowns::TotalMilesWithDeadhead))
            .col(
                ColumnDef::new(CostBreakdowns::UpdatedAt)
                    .timestamp()
                    .not_null(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk-cost_breakdowns-truck_id")
                    .from(CostBreakdowns::Table, CostBreakdowns::TruckId)
                    .to(Trucks::Table, Trucks::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            );
        manager.create_table(breakdowns.to_owned()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cost_breakdowns-truck_id-week_starting-unique")
                    .table(CostBreakdowns::Table)
                    .col(CostBreakdowns::TruckId)
                    .col(CostBreakdowns::WeekStarting)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CostBreakdowns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FuelPurchases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Loads::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Trucks::Table).to_owned())
            .await
    }
}
