//! Batch orchestration over single-item bridge execution.
//!
//! A batch run is a single deterministic pass: items execute strictly
//! sequentially, because transfers from one sender share a nonce sequence
//! on the source chain and concurrent submission risks nonce collisions.
//! After each item resolves the caller's progress callback fires
//! synchronously, in order, before the next item starts — live progress
//! without polling.
//!
//! The orchestrator itself never retries within a run; retrying individual
//! failed items is the caller's concern (see
//! [`BridgeExecutor::execute_with_retry`](crate::executor::BridgeExecutor::execute_with_retry)).
//! Partial success is a first-class outcome, not an orchestrator error.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::capability::{BridgeSigner, ChainQuery, MessagingEndpoint};
use crate::chain::Route;
use crate::executor::{BridgeExecutor, BridgeResult};
use crate::gas::GasBreakdown;
use crate::request::TransferRequest;

/// Running state of a batch, handed to the progress callback after each
/// item. `completed + failed <= total` always holds; `results` holds one
/// entry per resolved item, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchBridgeProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub results: Vec<BridgeResult>,
}

impl BatchBridgeProgress {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            results: Vec::with_capacity(total),
        }
    }

    fn record(&mut self, result: BridgeResult) {
        debug_assert!(self.completed + self.failed < self.total);

        if result.success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    pub fn resolved(&self) -> usize {
        self.completed + self.failed
    }

    pub fn finished(&self) -> bool {
        self.resolved() == self.total
    }
}

/// Terminal snapshot of a finished (or cancelled) batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchBridgeResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BridgeResult>,
    /// Aggregate of the breakdowns of successful items only. Gas already
    /// burned by failed-but-broadcast transactions is not reconciled here.
    pub total_gas_breakdown: Option<GasBreakdown>,
    /// True iff no item failed.
    pub success: bool,
}

/// Sequences transfers through a [`BridgeExecutor`], one at a time.
pub struct BatchOrchestrator<S, Q, E> {
    executor: BridgeExecutor<S, Q, E>,
}

impl<S, Q, E> BatchOrchestrator<S, Q, E>
where
    S: BridgeSigner,
    Q: ChainQuery,
    E: MessagingEndpoint,
{
    pub fn new(executor: BridgeExecutor<S, Q, E>) -> Self {
        Self { executor }
    }

    /// Runs the whole batch, invoking `on_progress` synchronously after
    /// each item resolves.
    ///
    /// Cancellation only stops the orchestrator from *starting* the next
    /// item; an already-submitted transaction is never interrupted. A
    /// cancelled run returns early with fewer results than `total`.
    pub async fn run<F>(
        &self,
        requests: &[TransferRequest],
        route: &Route,
        recipient: Address,
        cancel: &CancelToken,
        mut on_progress: F,
    ) -> BatchBridgeResult
    where
        F: FnMut(&BatchBridgeProgress),
    {
        let mut progress = BatchBridgeProgress::new(requests.len());

        info!(
            total = progress.total,
            source = %route.source.name,
            destination = %route.destination.name,
            "starting batch bridge run"
        );

        for request in requests {
            if cancel.is_cancelled() {
                warn!(
                    resolved = progress.resolved(),
                    total = progress.total,
                    "batch run cancelled before next item"
                );
                break;
            }

            let result = self.executor.execute(request, route, recipient).await;
            progress.record(result);
            on_progress(&progress);
        }

        finalize(progress)
    }
}

fn finalize(progress: BatchBridgeProgress) -> BatchBridgeResult {
    let successful_breakdowns: Vec<&GasBreakdown> = progress
        .results
        .iter()
        .filter(|result| result.success)
        .filter_map(|result| result.gas_breakdown.as_ref())
        .collect();

    let total_gas_breakdown = if successful_breakdowns.is_empty() {
        None
    } else {
        match GasBreakdown::aggregate(successful_breakdowns) {
            Ok(total) => Some(total),
            Err(err) => {
                warn!(%err, "could not aggregate batch gas breakdowns");
                None
            }
        }
    };

    let result = BatchBridgeResult {
        total: progress.total,
        succeeded: progress.completed,
        failed: progress.failed,
        success: progress.failed == 0,
        results: progress.results,
        total_gas_breakdown,
    };

    info!(
        total = result.total,
        succeeded = result.succeeded,
        failed = result.failed,
        "batch bridge run finished"
    );

    result
}
