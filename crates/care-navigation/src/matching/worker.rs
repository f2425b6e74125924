//! Background worker that runs rebalancing passes on a schedule.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use super::balancer::WorkloadBalancer;
use super::repository::{CandidateRepository, CaseLedger, WorkloadTracker};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error("rebalancing interval must be greater than zero")]
    ZeroInterval,
}

pub struct BalancerWorker<R, W, L> {
    balancer: Arc<WorkloadBalancer<R, W, L>>,
    interval: Duration,
}

impl<R, W, L> BalancerWorker<R, W, L>
where
    R: CandidateRepository + 'static,
    W: WorkloadTracker + 'static,
    L: CaseLedger + 'static,
{
    pub fn new(
        balancer: Arc<WorkloadBalancer<R, W, L>>,
        interval: Duration,
    ) -> Result<Self, WorkerError> {
        if interval.is_zero() {
            return Err(WorkerError::ZeroInterval);
        }
        Ok(Self { balancer, interval })
    }

    /// Run passes until `shutdown` resolves. The first pass runs one full interval after start.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        tokio::pin!(shutdown);

        tracing::info!(interval = ?self.interval, "balancer worker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.pass().await;
                }
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received, stopping balancer worker");
                    break;
                }
            }
        }
    }

    /// Run exactly `cycles` passes, one per tick, and return how many succeeded.
    pub async fn run_cycles(&self, cycles: usize) -> usize {
        let mut ticker = interval(self.interval);
        let mut succeeded = 0;

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!(cycle = cycle + 1, cycles, "starting rebalancing cycle");
            if self.pass().await {
                succeeded += 1;
            }
        }
        succeeded
    }

    /// Passes hold a blocking lock and call the repositories, so they run off the async workers.
    async fn pass(&self) -> bool {
        let balancer = Arc::clone(&self.balancer);
        match tokio::task::spawn_blocking(move || balancer.rebalance()).await {
            Ok(Ok(result)) => {
                tracing::info!(
                    reassigned = result.reassigned_cases,
                    failed = result.failed_reassignments,
                    "scheduled rebalancing finished"
                );
                true
            }
            Ok(Err(error)) => {
                tracing::error!(%error, "scheduled rebalancing failed");
                false
            }
            Err(error) => {
                tracing::error!(%error, "scheduled rebalancing task aborted");
                false
            }
        }
    }
}
