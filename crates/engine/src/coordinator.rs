//! Batch fan-out/fan-in for placeholder resolution.
//!
//! Each distinct path in a [`ResolutionBatch`] is parsed once and resolved on
//! its own task. A semaphore bounds how many resolutions are in flight against
//! the accessor, and the batch deadline cancels whatever is still running when
//! it elapses. The outcome always partitions the requested paths into resolved
//! values and failures; nothing here returns `Err`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::{Duration, Instant},
};

use realmpath_types::{ErrorCode, ResolutionBatch, ResolutionError, ResolutionRoot};
use tokio::{sync::Semaphore, task::JoinSet, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    accessor::EntityAccessor,
    parser::parse_path,
    resolver::{PathFailure, PathResolver},
};

/// Stand-in deadline for wall-clock budgets too large to represent.
const UNBOUNDED_DEADLINE_SECS: u64 = 86_400 * 365;

/// Resolved values and failures for one batch, both keyed by requested path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub resolved: BTreeMap<String, String>,
    pub failures: BTreeMap<String, PathFailure>,
}

impl BatchOutcome {
    /// Failures as wire errors, ordered by path.
    pub fn errors(&self) -> Vec<ResolutionError> {
        self.failures.values().map(|failure| failure.error.clone()).collect()
    }

    pub fn requested(&self) -> usize {
        self.resolved.len() + self.failures.len()
    }

    pub fn is_successful(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, requested: String, result: Result<String, PathFailure>) {
        match result {
            Ok(value) => {
                self.resolved.insert(requested, value);
            }
            Err(mut failure) => {
                debug!(
                    path = %requested,
                    code = %failure.code(),
                    message = %failure.error.message,
                    "placeholder path failed to resolve"
                );
                failure.error.placeholder_path = requested.clone();
                self.failures.insert(requested, failure);
            }
        }
    }

    fn contains(&self, requested: &str) -> bool {
        self.resolved.contains_key(requested) || self.failures.contains_key(requested)
    }
}

struct BatchContext {
    root: Option<ResolutionRoot>,
    literals: HashMap<String, String>,
    max_hops: usize,
}

/// Resolves whole batches against a shared, read-only accessor.
#[derive(Clone)]
pub struct BatchResolutionCoordinator {
    accessor: Arc<dyn EntityAccessor>,
}

impl BatchResolutionCoordinator {
    pub fn new(accessor: Arc<dyn EntityAccessor>) -> Self {
        Self { accessor }
    }

    pub fn accessor(&self) -> &Arc<dyn EntityAccessor> {
        &self.accessor
    }

    /// Resolves every path in the batch within its budget.
    pub async fn resolve_batch(&self, batch: &ResolutionBatch) -> BatchOutcome {
        let started_at = Instant::now();
        let budget = batch.budget;
        let mut outcome = BatchOutcome::default();

        let context = Arc::new(BatchContext {
            root: batch.root.clone(),
            literals: batch.literals.clone(),
            max_hops: budget.max_hops,
        });
        let semaphore = Arc::new(Semaphore::new(budget.max_concurrent.clamp(1, Semaphore::MAX_PERMITS)));
        let cancellation = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for requested in &batch.paths {
            let path = match parse_path(requested) {
                Ok(path) => path,
                Err(parse_error) => {
                    let failure = PathFailure::new(ResolutionError::new(
                        requested.as_str(),
                        ErrorCode::InvalidPath,
                        parse_error.to_string(),
                    ));
                    outcome.record(requested.clone(), Err(failure));
                    continue;
                }
            };

            let requested = requested.clone();
            let accessor = Arc::clone(&self.accessor);
            let context = Arc::clone(&context);
            let semaphore = Arc::clone(&semaphore);
            let cancellation = cancellation.clone();
            tasks.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    return (requested, Err(deadline_failure(path.raw())));
                };

                let resolver = PathResolver::new(accessor.as_ref(), context.root.as_ref(), &context.literals, context.max_hops)
                    .with_cancellation(cancellation);
                let result = resolver.resolve(&path).await;
                (requested, result)
            });
        }

        let now = time::Instant::now();
        let deadline = now.checked_add(budget.max_wall_clock()).unwrap_or(now + Duration::from_secs(UNBOUNDED_DEADLINE_SECS));
        let mut deadline_elapsed = false;
        loop {
            match time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((requested, result)))) => outcome.record(requested, result),
                Ok(Some(Err(join_error))) => {
                    error!(error = ?join_error, "placeholder resolution task failed");
                }
                Ok(None) => break,
                Err(_) => {
                    deadline_elapsed = true;
                    cancellation.cancel();
                    while let Some(joined) = tasks.try_join_next() {
                        if let Ok((requested, result)) = joined {
                            outcome.record(requested, result);
                        }
                    }
                    tasks.abort_all();
                    break;
                }
            }
        }

        let mut timed_out = 0usize;
        for requested in &batch.paths {
            if outcome.contains(requested) {
                continue;
            }
            let failure = if deadline_elapsed {
                timed_out += 1;
                deadline_failure(requested)
            } else {
                PathFailure::new(ResolutionError::new(
                    requested.as_str(),
                    ErrorCode::Exception,
                    "placeholder resolution task stopped unexpectedly",
                ))
            };
            outcome.record(requested.clone(), Err(failure));
        }

        info!(
            requested = batch.paths.len(),
            resolved = outcome.resolved.len(),
            failed = outcome.failures.len(),
            timed_out,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "placeholder batch resolved"
        );
        outcome
    }
}

fn deadline_failure(path: &str) -> PathFailure {
    PathFailure::new(ResolutionError::new(
        path,
        ErrorCode::ResolutionTimeout,
        "batch deadline elapsed before the path resolved",
    ))
}
