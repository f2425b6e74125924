use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{PoisonError, RwLock};

use super::domain::NavigatorId;
use super::repository::{RepositoryError, WorkloadTracker};

/// Process-local workload store with one atomic counter per navigator.
///
/// Counter updates share the read lock, so concurrent assignments never serialize on each other.
/// Snapshots take the write lock and therefore see every transfer either fully applied or not at
/// all.
#[derive(Debug, Default)]
pub struct InMemoryWorkloadTracker {
    counters: RwLock<HashMap<NavigatorId, AtomicU32>>,
}

impl InMemoryWorkloadTracker {
    pub fn with_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (NavigatorId, u32)>,
    {
        let counters = counts
            .into_iter()
            .map(|(id, count)| (id, AtomicU32::new(count)))
            .collect();
        Self {
            counters: RwLock::new(counters),
        }
    }

    fn ensure(&self, navigators: &[&NavigatorId]) {
        let missing = {
            let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
            navigators.iter().any(|id| !counters.contains_key(*id))
        };
        if missing {
            let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
            for id in navigators {
                counters.entry((*id).clone()).or_default();
            }
        }
    }

    fn with_counter<T>(&self, navigator: &NavigatorId, apply: impl FnOnce(&AtomicU32) -> T) -> T {
        self.ensure(&[navigator]);
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        match counters.get(navigator) {
            Some(counter) => apply(counter),
            None => apply(&AtomicU32::new(0)),
        }
    }
}

fn saturating_decrement(counter: &AtomicU32) -> u32 {
    match counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |value| {
        Some(value.saturating_sub(1))
    }) {
        Ok(previous) | Err(previous) => previous.saturating_sub(1),
    }
}

impl WorkloadTracker for InMemoryWorkloadTracker {
    fn current_workload(&self, navigator: &NavigatorId) -> Result<u32, RepositoryError> {
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        Ok(counters
            .get(navigator)
            .map(|counter| counter.load(Ordering::Acquire))
            .unwrap_or(0))
    }

    fn increment(&self, navigator: &NavigatorId) -> Result<u32, RepositoryError> {
        Ok(self.with_counter(navigator, |counter| {
            counter.fetch_add(1, Ordering::AcqRel) + 1
        }))
    }

    fn decrement(&self, navigator: &NavigatorId) -> Result<u32, RepositoryError> {
        Ok(self.with_counter(navigator, saturating_decrement))
    }

    fn transfer(&self, from: &NavigatorId, to: &NavigatorId) -> Result<(), RepositoryError> {
        if from == to {
            return Ok(());
        }

        self.ensure(&[from, to]);
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        let (Some(source), Some(target)) = (counters.get(from), counters.get(to)) else {
            return Err(RepositoryError::Unavailable(
                "workload counters disappeared during transfer".to_string(),
            ));
        };

        source
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |value| {
                value.checked_sub(1)
            })
            .map_err(|_| {
                RepositoryError::Conflict(format!("navigator {from} has no cases to transfer"))
            })?;
        target.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn snapshot(
        &self,
        navigators: &[NavigatorId],
    ) -> Result<BTreeMap<NavigatorId, u32>, RepositoryError> {
        let counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        Ok(navigators
            .iter()
            .map(|id| {
                let count = counters
                    .get(id)
                    .map(|counter| counter.load(Ordering::Acquire))
                    .unwrap_or(0);
                (id.clone(), count)
            })
            .collect())
    }
}
