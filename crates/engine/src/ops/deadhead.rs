use sea_orm::{ActiveValue, DatabaseTransaction, prelude::*};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{DistanceError, Load, ResultEngine, loads};

use super::Engine;

/// What the deadhead step did for a delivery.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeadheadOutcome {
    /// The delivered load has no truck.
    NotApplicable,
    /// This delivery already produced a deadhead on another load.
    AlreadyApplied { load_id: Uuid },
    /// The truck has no queued load waiting for a deadhead.
    NoQueuedLoad,
    Applied { load_id: Uuid, miles: i64 },
    /// Drop-off and next pickup are in the same place.
    ZeroDistance { load_id: Uuid },
    /// The lookup failed; the next load keeps 0 deadhead miles and is
    /// retried on the truck's next delivery.
    LookupFailed { load_id: Uuid, error: String },
}

impl DeadheadOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

impl Engine {
    async fn lookup_miles(&self, from: &Load, to: &Load) -> Result<i64, DistanceError> {
        let lookup = self
            .distance
            .resolve_miles(&from.destination, &to.origin);
        let miles = tokio::time::timeout(self.distance_timeout, lookup)
            .await
            .map_err(|_| DistanceError::Timeout(self.distance_timeout.as_millis()))??;
        if !miles.is_finite() || miles < 0.0 {
            return Err(DistanceError::Lookup(format!(
                "resolver returned {miles} miles"
            )));
        }
        Ok(miles.round() as i64)
    }

    /// Fills in the deadhead leading from `delivered`'s drop-off to the
    /// truck's next queued load.
    ///
    /// The next load is the earliest (pickup, then creation) not-yet-delivered
    /// load without deadhead. A delivery applies its deadhead at most once.
    pub(super) async fn resolve_deadhead(
        &self,
        db: &DatabaseTransaction,
        delivered: &Load,
    ) -> ResultEngine<DeadheadOutcome> {
        let Some(truck_id) = delivered.truck_id else {
            return Ok(DeadheadOutcome::NotApplicable);
        };

        let truck_loads = self.loads_for_truck(db, truck_id).await?;
        if let Some(done) = truck_loads
            .iter()
            .find(|l| l.deadhead_source == Some(delivered.id))
        {
            debug!(load_id = %delivered.id, "deadhead already applied");
            return Ok(DeadheadOutcome::AlreadyApplied { load_id: done.id });
        }

        let Some(next) = truck_loads
            .into_iter()
            .filter(|l| l.id != delivered.id && l.awaits_deadhead())
            .min_by_key(Load::queue_key)
        else {
            debug!(%truck_id, "no queued load for deadhead");
            return Ok(DeadheadOutcome::NoQueuedLoad);
        };

        let miles = match self.lookup_miles(delivered, &next).await {
            Ok(miles) => miles,
            Err(err) => {
                warn!(
                    delivered = %delivered.id,
                    next = %next.id,
                    error = %err,
                    "deadhead lookup failed, leaving it unresolved"
                );
                return Ok(DeadheadOutcome::LookupFailed {
                    load_id: next.id,
                    error: err.to_string(),
                });
            }
        };
        if miles == 0 {
            return Ok(DeadheadOutcome::ZeroDistance { load_id: next.id });
        }

        loads::ActiveModel {
            id: ActiveValue::Set(next.id.to_string()),
            deadhead_from_city: ActiveValue::Set(Some(delivered.destination.city.clone())),
            deadhead_from_state: ActiveValue::Set(Some(delivered.destination.state.clone())),
            deadhead_miles: ActiveValue::Set(miles),
            deadhead_source_load_id: ActiveValue::Set(Some(delivered.id.to_string())),
            total_miles_with_deadhead: ActiveValue::Set(Some(next.miles + miles)),
            ..Default::default()
        }
        .update(db)
        .await?;

        info!(
            delivered = %delivered.id,
            next = %next.id,
            deadhead_miles = miles,
            "deadhead applied"
        );
        Ok(DeadheadOutcome::Applied {
            load_id: next.id,
            miles,
        })
    }
}
