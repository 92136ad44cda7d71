//! Recomputation pipelines.
//!
//! Every mutation maps onto a [`MutationKind`], and every kind onto a fixed
//! list of stages. [`Engine::dispatch`] is the one place that runs them: it
//! locks the trucks involved, opens a transaction, runs the stages in order
//! and commits.

use std::time::Instant;

use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{CostBreakdown, EngineError, Load, LoadStatus, MoneyCents, ResultEngine, locks::TruckGuards};

use super::{DeadheadOutcome, Engine, with_tx};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationKind {
    TruckChanged {
        truck_id: Uuid,
    },
    LoadDelivered {
        load_id: Uuid,
    },
    /// A load was created, edited, reassigned or deleted. Both the previous
    /// and the current truck are recomputed.
    LoadReassigned {
        load_id: Uuid,
        previous_truck_id: Option<Uuid>,
        truck_id: Option<Uuid>,
    },
    FuelPurchaseChanged {
        truck_id: Uuid,
    },
    BreakdownEdited {
        breakdown_id: Uuid,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Deadhead,
    Mileage,
    FuelAttribution,
    Breakdown,
    Profitability,
}

impl MutationKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TruckChanged { .. } => "truck_changed",
            Self::LoadDelivered { .. } => "load_delivered",
            Self::LoadReassigned { .. } => "load_reassigned",
            Self::FuelPurchaseChanged { .. } => "fuel_purchase_changed",
            Self::BreakdownEdited { .. } => "breakdown_edited",
        }
    }

    fn stages(&self) -> &'static [Stage] {
        use Stage::*;
        match self {
            Self::TruckChanged { .. } => &[Mileage, FuelAttribution, Profitability],
            Self::LoadDelivered { .. } => &[Deadhead, Mileage, FuelAttribution, Profitability],
            Self::LoadReassigned { .. } => &[Mileage, FuelAttribution, Profitability],
            Self::FuelPurchaseChanged { .. } => &[FuelAttribution, Profitability],
            Self::BreakdownEdited { .. } => &[Breakdown, Profitability],
        }
    }
}

/// Derived figures of one truck after a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TruckRecompute {
    pub truck_id: Uuid,
    pub total_miles: i64,
    pub fixed_costs: MoneyCents,
    pub variable_costs: MoneyCents,
    pub cost_per_mile_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineReport {
    pub kind: MutationKind,
    pub trucks: Vec<TruckRecompute>,
    /// Set for deliveries only.
    pub deadhead: Option<DeadheadOutcome>,
}

impl PipelineReport {
    pub fn truck(&self, truck_id: Uuid) -> Option<&TruckRecompute> {
        self.trucks.iter().find(|t| t.truck_id == truck_id)
    }
}

/// What a pipeline works on, resolved inside its transaction.
#[derive(Default)]
struct Targets {
    trucks: Vec<Uuid>,
    delivered: Option<Load>,
    breakdown: Option<CostBreakdown>,
}

impl Targets {
    fn push(&mut self, truck_id: Option<Uuid>) {
        if let Some(id) = truck_id
            && !self.trucks.contains(&id)
        {
            self.trucks.push(id);
        }
    }
}

impl Engine {
    /// Trucks to lock for `kind`, read before the pipeline's transaction.
    async fn lock_targets(&self, kind: &MutationKind) -> ResultEngine<Vec<Uuid>> {
        let db = &self.database;
        Ok(match *kind {
            MutationKind::TruckChanged { truck_id }
            | MutationKind::FuelPurchaseChanged { truck_id } => vec![truck_id],
            MutationKind::LoadDelivered { load_id } => {
                self.require_load(db, load_id).await?.truck_id.into_iter().collect()
            }
            MutationKind::LoadReassigned {
                load_id,
                previous_truck_id,
                truck_id,
            } => {
                let current = self.find_load(db, load_id).await?.and_then(|l| l.truck_id);
                [previous_truck_id, truck_id, current]
                    .into_iter()
                    .flatten()
                    .collect()
            }
            MutationKind::BreakdownEdited { breakdown_id } => {
                vec![self.require_breakdown(db, breakdown_id).await?.truck_id]
            }
        })
    }

    async fn resolve_targets(
        &self,
        db: &DatabaseTransaction,
        kind: &MutationKind,
        guards: &TruckGuards,
    ) -> ResultEngine<Targets> {
        let mut targets = Targets::default();
        match *kind {
            MutationKind::TruckChanged { truck_id }
            | MutationKind::FuelPurchaseChanged { truck_id } => {
                self.require_truck(db, truck_id).await?;
                targets.push(Some(truck_id));
            }
            MutationKind::LoadDelivered { load_id } => {
                let load = self.require_load(db, load_id).await?;
                if load.status != LoadStatus::Delivered {
                    return Err(EngineError::InvalidTransition(format!(
                        "load {load_id} is {}, not delivered",
                        load.status.as_str()
                    )));
                }
                targets.push(load.truck_id);
                targets.delivered = Some(load);
            }
            MutationKind::LoadReassigned {
                load_id,
                previous_truck_id,
                truck_id,
            } => {
                let current = self.find_load(db, load_id).await?.and_then(|l| l.truck_id);
                targets.push(previous_truck_id);
                targets.push(truck_id);
                targets.push(current);
            }
            MutationKind::BreakdownEdited { breakdown_id } => {
                let row = self.require_breakdown(db, breakdown_id).await?;
                targets.push(Some(row.truck_id));
                targets.breakdown = Some(row);
            }
        }
        for &truck_id in &targets.trucks {
            guards.ensure_covers(Some(truck_id))?;
        }
        Ok(targets)
    }

    /// Runs the stages of `kind` on an open transaction. The caller holds the
    /// locks of every truck involved.
    pub(super) async fn run_pipeline(
        &self,
        db: &DatabaseTransaction,
        kind: &MutationKind,
        guards: &TruckGuards,
    ) -> ResultEngine<PipelineReport> {
        let targets = self.resolve_targets(db, kind, guards).await?;
        let mut deadhead = None;

        for stage in kind.stages() {
            match stage {
                Stage::Deadhead => {
                    if let Some(load) = &targets.delivered {
                        deadhead = Some(self.resolve_deadhead(db, load).await?);
                    }
                }
                Stage::Mileage => {
                    for &truck_id in &targets.trucks {
                        self.recompute_total_miles(db, truck_id).await?;
                    }
                }
                Stage::FuelAttribution => {
                    for &truck_id in &targets.trucks {
                        self.recompute_weekly_fuel(db, truck_id).await?;
                    }
                }
                Stage::Breakdown => {
                    if let Some(row) = &targets.breakdown {
                        self.recompute_breakdown(db, row.id).await?;
                    }
                }
                Stage::Profitability => {
                    for &truck_id in &targets.trucks {
                        self.refresh_load_profits(db, truck_id).await?;
                    }
                    if let Some(load) = &targets.delivered
                        && let Some(truck_id) = load.truck_id
                    {
                        let truck = self.require_truck(db, truck_id).await?;
                        self.write_load_profit(db, load, truck.cost_per_mile_minor)
                            .await?;
                    }
                }
            }
            debug!(kind = kind.name(), ?stage, "stage done");
        }

        let mut trucks = Vec::with_capacity(targets.trucks.len());
        for &truck_id in &targets.trucks {
            let truck = self.require_truck(db, truck_id).await?;
            trucks.push(TruckRecompute {
                truck_id,
                total_miles: truck.total_miles,
                fixed_costs: truck.fixed_costs,
                variable_costs: truck.variable_costs,
                cost_per_mile_minor: truck.cost_per_mile_minor,
            });
        }
        Ok(PipelineReport {
            kind: *kind,
            trucks,
            deadhead,
        })
    }

    async fn dispatch_once(&self, kind: &MutationKind) -> ResultEngine<PipelineReport> {
        let started = Instant::now();
        let truck_ids = self.lock_targets(kind).await?;
        let guards = self.locks.acquire(&truck_ids).await?;
        let report = with_tx!(self, |db_tx| {
            self.run_pipeline(&db_tx, kind, &guards).await
        })?;
        info!(
            kind = kind.name(),
            trucks = ?truck_ids,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline done"
        );
        Ok(report)
    }

    /// Runs the recomputation pipeline of `kind`.
    ///
    /// Retried when a truck stays busy past the lock wait, up to the
    /// configured number of attempts.
    pub async fn dispatch(&self, kind: MutationKind) -> ResultEngine<PipelineReport> {
        self.retry_on_contention(kind.name(), || self.dispatch_once(&kind))
            .await
    }

    pub async fn on_truck_mutated(&self, truck_id: Uuid) -> ResultEngine<PipelineReport> {
        self.dispatch(MutationKind::TruckChanged { truck_id }).await
    }

    /// `previous_truck_id` is the truck the load had before the change. A
    /// load that no longer exists is handled as a deletion.
    pub async fn on_load_mutated(
        &self,
        load_id: Uuid,
        previous_truck_id: Option<Uuid>,
    ) -> ResultEngine<PipelineReport> {
        let truck_id = match self.find_load(&self.database, load_id).await? {
            Some(load) => load.truck_id,
            None if previous_truck_id.is_some() => None,
            None => return Err(EngineError::KeyNotFound("load not exists".to_string())),
        };
        self.dispatch(MutationKind::LoadReassigned {
            load_id,
            previous_truck_id,
            truck_id,
        })
        .await
    }

    pub async fn on_load_delivered(&self, load_id: Uuid) -> ResultEngine<PipelineReport> {
        self.dispatch(MutationKind::LoadDelivered { load_id }).await
    }

    pub async fn on_fuel_purchase_mutated(
        &self,
        fuel_purchase_id: Uuid,
    ) -> ResultEngine<PipelineReport> {
        let purchase = self
            .require_fuel_purchase(&self.database, fuel_purchase_id)
            .await?;
        self.dispatch(MutationKind::FuelPurchaseChanged {
            truck_id: purchase.truck_id,
        })
        .await
    }

    pub async fn on_cost_breakdown_edited(
        &self,
        breakdown_id: Uuid,
    ) -> ResultEngine<PipelineReport> {
        self.dispatch(MutationKind::BreakdownEdited { breakdown_id })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_resolves_deadhead_before_mileage() {
        let kind = MutationKind::LoadDelivered {
            load_id: Uuid::new_v4(),
        };
        assert_eq!(
            kind.stages(),
            &[
                Stage::Deadhead,
                Stage::Mileage,
                Stage::FuelAttribution,
                Stage::Profitability
            ]
        );
    }

    #[test]
    fn fuel_changes_skip_mileage() {
        let kind = MutationKind::FuelPurchaseChanged {
            truck_id: Uuid::new_v4(),
        };
        assert!(!kind.stages().contains(&Stage::Mileage));
        assert_eq!(kind.stages()[0], Stage::FuelAttribution);
    }

    #[test]
    fn targets_keep_each_truck_once() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut targets = Targets::default();
        targets.push(Some(a));
        targets.push(None);
        targets.push(Some(b));
        targets.push(Some(a));
        assert_eq!(targets.trucks, vec![a, b]);
    }
}
