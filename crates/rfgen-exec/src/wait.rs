//! Bounded wait of a table scan for its inbound runtime filters.
//!
//! A scan blocks row production until every filter has settled or its wait
//! budget has elapsed, whichever comes first. Filters that miss the deadline
//! are skipped; the scan then reads unfiltered. Cancellation ends the wait
//! immediately with an error.

use std::sync::Arc;
use std::time::Duration;

use rfgen_planner::dispatch::{WireExecutor, WireExecutorKind};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;

use crate::hub::{FilterState, PublishedFilter, RuntimeFilterHub};
use crate::metrics::emit_span;

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("scan {scan} was cancelled while waiting for runtime filters")]
    Cancelled { scan: String },
    #[error("executor {executor} is not a table scan")]
    NotAScan { executor: String },
}

/// What the scan got before it started reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitOutcome {
    pub arrived: Vec<Arc<PublishedFilter>>,
    pub timed_out: Vec<i32>,
    pub abandoned: Vec<i32>,
}

impl WaitOutcome {
    pub fn is_complete(&self) -> bool {
        self.timed_out.is_empty() && self.abandoned.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ScanFilterGate {
    scan_id: String,
    filter_ids: Vec<i32>,
    max_wait: Duration,
}

impl ScanFilterGate {
    pub fn new(scan_id: impl Into<String>, filter_ids: Vec<i32>, max_wait: Duration) -> Self {
        Self {
            scan_id: scan_id.into(),
            filter_ids,
            max_wait,
        }
    }

    /// Gate for a dispatched table scan. A scan without a wait budget has no
    /// inbound filters and does not wait.
    pub fn from_wire(exec: &WireExecutor) -> Result<Self, WaitError> {
        let WireExecutorKind::TableScan {
            max_wait_time_ms, ..
        } = &exec.kind
        else {
            return Err(WaitError::NotAScan {
                executor: exec.executor_id.clone(),
            });
        };
        let filter_ids = exec
            .runtime_filter_list
            .iter()
            .filter(|rf| rf.target_executor_id == exec.executor_id)
            .map(|rf| rf.id)
            .collect();
        Ok(Self::new(
            exec.executor_id.clone(),
            filter_ids,
            Duration::from_millis(max_wait_time_ms.unwrap_or(0)),
        ))
    }

    pub fn filter_ids(&self) -> &[i32] {
        &self.filter_ids
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub async fn wait(
        &self,
        hub: &RuntimeFilterHub,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome, WaitError> {
        let now = Instant::now();
        // Budgets beyond what the clock can represent wait for settlement only.
        let deadline = now.checked_add(self.max_wait).unwrap_or_else(|| now + FAR_FUTURE);
        let mut outcome = WaitOutcome::default();

        for &id in &self.filter_ids {
            let mut rx = hub.subscribe(id);
            let settled = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(WaitError::Cancelled { scan: self.scan_id.clone() });
                }
                res = timeout_at(deadline, rx.wait_for(|s| !s.is_pending())) => match res {
                    Ok(Ok(state)) => Some(state.clone()),
                    // A released slot closes the channel.
                    Ok(Err(_)) => Some(FilterState::Abandoned),
                    Err(_elapsed) => None,
                },
            };

            match settled {
                Some(FilterState::Ready(filter)) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        scan = %self.scan_id,
                        runtime_filter = id,
                        "runtime filter arrived"
                    );
                    outcome.arrived.push(filter);
                }
                Some(FilterState::Abandoned) | Some(FilterState::Pending) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        scan = %self.scan_id,
                        runtime_filter = id,
                        "runtime filter abandoned by build side"
                    );
                    outcome.abandoned.push(id);
                }
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        scan = %self.scan_id,
                        runtime_filter = id,
                        max_wait = ?self.max_wait,
                        "runtime filter not ready before wait budget, scanning without it"
                    );
                    outcome.timed_out.push(id);
                }
            }
        }

        emit_span(
            "runtime_filter_wait",
            &[
                ("scan", self.scan_id.clone()),
                ("arrived", outcome.arrived.len().to_string()),
                ("timed_out", outcome.timed_out.len().to_string()),
                ("abandoned", outcome.abandoned.len().to_string()),
            ],
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(ids: Vec<i32>, ms: u64) -> ScanFilterGate {
        ScanFilterGate::new("0", ids, Duration::from_millis(ms))
    }

    #[tokio::test(start_paused = true)]
    async fn already_published_filters_return_immediately() {
        let hub = RuntimeFilterHub::new();
        hub.publish(0, vec![7]);
        let start = Instant::now();
        let out = gate(vec![0], 10_000)
            .wait(&hub, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(out.is_complete());
        assert_eq!(out.arrived[0].payload, vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn late_filter_arrives_within_budget() {
        let hub = Arc::new(RuntimeFilterHub::new());
        let publisher = Arc::clone(&hub);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            publisher.publish(1, vec![]);
        });

        let start = Instant::now();
        let out = gate(vec![1], 1_000)
            .wait(&hub, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.arrived.len(), 1);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(300) && waited < Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_filter_times_out_without_error() {
        let hub = RuntimeFilterHub::new();
        hub.publish(2, vec![]);
        let start = Instant::now();
        let out = gate(vec![1, 2], 500)
            .wait(&hub, &CancellationToken::new())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(start.elapsed() < Duration::from_millis(510));
        assert_eq!(out.timed_out, vec![1]);
        // Filters that were ready are still collected after the deadline.
        assert_eq!(out.arrived.len(), 1);
        assert_eq!(out.arrived[0].id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_filter_releases_the_scan() {
        let hub = Arc::new(RuntimeFilterHub::new());
        let builder = Arc::clone(&hub);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            builder.abandon(3);
        });
        let start = Instant::now();
        let out = gate(vec![3], 10_000)
            .wait(&hub, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.abandoned, vec![3]);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_the_wait() {
        let hub = RuntimeFilterHub::new();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let err = gate(vec![5], 10_000).wait(&hub, &cancel).await.unwrap_err();
        assert!(matches!(err, WaitError::Cancelled { scan } if scan == "0"));
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_budget_does_not_overflow_the_deadline() {
        let hub = RuntimeFilterHub::new();
        hub.publish(0, vec![1]);
        hub.abandon(1);
        let out = gate(vec![0, 1], u64::MAX)
            .wait(&hub, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.arrived.len(), 1);
        assert_eq!(out.abandoned, vec![1]);
        assert!(out.timed_out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn released_slot_counts_as_abandoned() {
        let hub = Arc::new(RuntimeFilterHub::new());
        let owner = Arc::clone(&hub);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            owner.release(6);
        });
        let start = Instant::now();
        let out = gate(vec![6], 10_000)
            .wait(&hub, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.abandoned, vec![6]);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn no_filters_means_no_wait() {
        let hub = RuntimeFilterHub::new();
        let out = gate(vec![], 0)
            .wait(&hub, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, WaitOutcome::default());
    }
}
