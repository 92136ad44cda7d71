//! Per-truck recomputation locks.
//!
//! At most one recomputation pipeline may be in flight per truck. Pipelines
//! touching several trucks take the locks in ascending id order.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Debug)]
pub(crate) struct TruckLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    wait: Duration,
}

/// Guards held for the duration of a pipeline.
#[derive(Debug)]
pub(crate) struct TruckGuards {
    ids: Vec<Uuid>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl TruckGuards {
    /// Fails when `truck_id` was reassigned between lookup and locking.
    pub(crate) fn ensure_covers(&self, truck_id: Option<Uuid>) -> ResultEngine<()> {
        match truck_id {
            Some(id) if self.ids.binary_search(&id).is_err() => Err(
                EngineError::ConcurrentRecomputation(format!("truck {id} changed while locking")),
            ),
            _ => Ok(()),
        }
    }
}

impl TruckLocks {
    pub(crate) fn new(wait: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            wait,
        }
    }

    /// The lock of `truck_id`. Entries nobody holds or waits on are dropped
    /// on the way, so the map only keeps trucks with pipelines in flight.
    async fn lock_for(&self, truck_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(truck_id).or_default().clone()
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Locks every truck in `truck_ids`, waiting at most the configured time
    /// for each.
    pub(crate) async fn acquire(&self, truck_ids: &[Uuid]) -> ResultEngine<TruckGuards> {
        let mut ids = truck_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for &id in &ids {
            let lock = self.lock_for(id).await;
            let guard = tokio::time::timeout(self.wait, lock.lock_owned())
                .await
                .map_err(|_| {
                    EngineError::ConcurrentRecomputation(format!("truck {id} is busy"))
                })?;
            guards.push(guard);
        }
        Ok(TruckGuards {
            ids,
            _guards: guards,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_pipeline_on_same_truck_times_out() {
        let locks = TruckLocks::new(Duration::from_millis(20));
        let truck = Uuid::new_v4();

        let held = locks.acquire(&[truck]).await.unwrap();
        let err = locks.acquire(&[truck]).await.unwrap_err();
        assert!(matches!(err, EngineError::ConcurrentRecomputation(_)));

        drop(held);
        assert!(locks.acquire(&[truck]).await.is_ok());
    }

    #[tokio::test]
    async fn different_trucks_do_not_block() {
        let locks = TruckLocks::new(Duration::from_millis(20));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let _held = locks.acquire(&[a]).await.unwrap();
        assert!(locks.acquire(&[b]).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_ids_lock_once() {
        let locks = TruckLocks::new(Duration::from_millis(20));
        let a = Uuid::new_v4();
        assert!(locks.acquire(&[a, a]).await.is_ok());
    }

    #[tokio::test]
    async fn released_trucks_are_forgotten() {
        let locks = TruckLocks::new(Duration::from_millis(20));
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let held = locks.acquire(&[a]).await.unwrap();
        drop(locks.acquire(&[b]).await.unwrap());
        assert_eq!(locks.tracked().await, 2);

        let _c = locks.acquire(&[c]).await.unwrap();
        assert_eq!(locks.tracked().await, 2);

        drop(held);
        for _ in 0..100 {
            drop(locks.acquire(&[Uuid::new_v4()]).await.unwrap());
        }
        assert_eq!(locks.tracked().await, 2);
    }

    #[tokio::test]
    async fn guards_report_uncovered_trucks() {
        let locks = TruckLocks::new(Duration::from_millis(20));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let guards = locks.acquire(&[a]).await.unwrap();
        assert!(guards.ensure_covers(Some(a)).is_ok());
        assert!(guards.ensure_covers(None).is_ok());
        assert!(matches!(
            guards.ensure_covers(Some(b)),
            Err(EngineError::ConcurrentRecomputation(_))
        ));
    }
}
