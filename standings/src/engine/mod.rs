//! Bounded concurrent fetching of independent units.
//!
//! A [`FetchEngine`] runs one phase of work (problem pages, participant
//! details, scoreboard pages) with at most `workers` units in flight. Every
//! unit is retried on its own according to the engine's [`RetryPolicy`] and
//! its outcome is reported individually; a failing unit never aborts the
//! others.
//!
//! Once more than `failure_threshold` units have failed, or when
//! [`EngineHandle::stop`] is called, the engine stops starting new units.
//! Units already in flight finish normally and everything not yet started is
//! reported as [`UnitOutcome::Skipped`].

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::{Result, StandingsError};
use crate::retry::{with_retry, RetryPolicy};

/// Outcome of one unit.
#[derive(Debug)]
pub enum UnitOutcome<I, T> {
    /// The unit produced a value.
    Completed {
        /// Input item.
        item: I,
        /// Produced value.
        value: T,
    },
    /// The unit failed after its retries.
    Failed {
        /// Input item.
        item: I,
        /// Last error.
        error: StandingsError,
    },
    /// The unit was never started.
    Skipped {
        /// Input item.
        item: I,
    },
}

impl<I, T> UnitOutcome<I, T> {
    /// The input item of this unit.
    pub fn item(&self) -> &I {
        match self {
            Self::Completed { item, .. } | Self::Failed { item, .. } | Self::Skipped { item } => item,
        }
    }

    /// The produced value, if the unit completed.
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Completed { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Whether the unit completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Snapshot of engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchProgress {
    /// Units submitted.
    pub total: usize,
    /// Units that produced a value.
    pub completed: usize,
    /// Units that failed after retries.
    pub failed: usize,
    /// Units never started.
    pub skipped: usize,
}

impl FetchProgress {
    /// Units that have finished in any way.
    #[must_use]
    pub fn finished(&self) -> usize {
        self.completed + self.failed + self.skipped
    }

    /// Whether every submitted unit completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// Converts a run with failed or skipped units into a
    /// [`StandingsError::PartialEnrichment`].
    #[must_use]
    pub fn into_partial_error(self) -> Option<StandingsError> {
        (!self.is_complete()).then_some(StandingsError::PartialEnrichment {
            failed: self.failed,
            skipped: self.skipped,
            total: self.total,
        })
    }
}

#[derive(Debug, Default)]
struct EngineState {
    stopped: AtomicBool,
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl EngineState {
    fn snapshot(&self) -> FetchProgress {
        FetchProgress {
            total: self.total.load(Ordering::Acquire),
            completed: self.completed.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
            skipped: self.skipped.load(Ordering::Acquire),
        }
    }
}

/// Control handle of a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    state: Arc<EngineState>,
}

impl EngineHandle {
    /// Stops scheduling new units; in-flight units finish.
    pub fn stop(&self) {
        self.state.stopped.store(true, Ordering::Release);
    }

    /// Whether the engine has been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::Acquire)
    }

    /// Current counters.
    #[must_use]
    pub fn progress(&self) -> FetchProgress {
        self.state.snapshot()
    }
}

/// Bounded worker pool for one fetch phase.
#[derive(Debug)]
pub struct FetchEngine {
    label: String,
    workers: usize,
    retry: RetryPolicy,
    failure_threshold: Option<usize>,
    state: Arc<EngineState>,
}

impl FetchEngine {
    /// Creates an engine with `workers` concurrent units and no retries.
    #[must_use]
    pub fn new(label: impl Into<String>, workers: usize) -> Self {
        Self {
            label: label.into(),
            workers: workers.max(1),
            retry: RetryPolicy::immediate(1),
            failure_threshold: None,
            state: Arc::new(EngineState::default()),
        }
    }

    /// Sets the per-unit retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Stops scheduling once more than `threshold` units have failed.
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    /// Returns a control handle.
    #[must_use]
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Current counters.
    #[must_use]
    pub fn progress(&self) -> FetchProgress {
        self.state.snapshot()
    }

    /// Runs `fetch` for every item. Outcomes are in completion order.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, fetch: F) -> Vec<UnitOutcome<I, T>>
    where
        I: Clone + Send + Sync,
        T: Send,
        F: Fn(I) -> Fut + Sync,
        Fut: Future<Output = Result<T>> + Send,
    {
        let state = &self.state;
        let fetch = &fetch;
        state.total.fetch_add(items.len(), Ordering::AcqRel);
        tracing::debug!(engine = %self.label, units = items.len(), workers = self.workers, "Starting fetch phase");

        let outcomes: Vec<UnitOutcome<I, T>> = stream::iter(items)
            .map(|item| async move {
                if state.stopped.load(Ordering::Acquire) {
                    state.skipped.fetch_add(1, Ordering::AcqRel);
                    return UnitOutcome::Skipped { item };
                }
                match with_retry(&self.retry, &self.label, || fetch(item.clone())).await {
                    Ok(value) => {
                        let completed = state.completed.fetch_add(1, Ordering::AcqRel) + 1;
                        tracing::debug!(engine = %self.label, completed, "Unit completed");
                        UnitOutcome::Completed { item, value }
                    }
                    Err(error) => {
                        let failed = state.failed.fetch_add(1, Ordering::AcqRel) + 1;
                        tracing::warn!(engine = %self.label, failed, error = %error, "Unit failed");
                        if self.failure_threshold.is_some_and(|t| failed > t)
                            && !state.stopped.swap(true, Ordering::AcqRel)
                        {
                            tracing::warn!(engine = %self.label, failed, "Failure threshold exceeded, stopping");
                        }
                        UnitOutcome::Failed { item, error }
                    }
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let progress = state.snapshot();
        tracing::debug!(
            engine = %self.label,
            total = progress.total,
            completed = progress.completed,
            failed = progress.failed,
            skipped = progress.skipped,
            "Fetch phase finished"
        );
        outcomes
    }
}
