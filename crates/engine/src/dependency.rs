//! Validation-rule dependency resolution.
//!
//! Rules carry a dependency path naming the value their check depends on.
//! This adapter resolves those paths through the batch coordinator and then
//! classifies each outcome:
//!
//! - `success`: a non-empty value was resolved
//! - `pending`: the path is sound but stops at something the user has not
//!   filled in yet (a missing literal, an unset relation, an empty value)
//! - `error`: navigation is genuinely broken

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use realmpath_types::{Budget, DependencyResolution, DependencyStatus, ResolutionBatch, ResolutionRoot};

use crate::{
    coordinator::{BatchOutcome, BatchResolutionCoordinator},
    resolver::PathFailure,
};

/// A rule id paired with the path its dependency lives at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyTarget {
    pub rule_id: i64,
    pub dependency_path: String,
}

impl DependencyTarget {
    pub fn new(rule_id: i64, dependency_path: impl Into<String>) -> Self {
        Self {
            rule_id,
            dependency_path: dependency_path.into(),
        }
    }
}

/// Resolves rule dependencies, keyed by rule id rather than by path.
#[derive(Clone)]
pub struct DependencyResolutionAdapter {
    coordinator: BatchResolutionCoordinator,
}

impl DependencyResolutionAdapter {
    pub fn new(coordinator: BatchResolutionCoordinator) -> Self {
        Self { coordinator }
    }

    /// Resolves each target and returns one entry per target, ordered by rule id.
    ///
    /// Targets sharing a path are resolved once.
    pub async fn resolve(
        &self,
        targets: &[DependencyTarget],
        root: Option<ResolutionRoot>,
        literals: HashMap<String, String>,
        budget: Budget,
    ) -> Vec<DependencyResolution> {
        let batch = ResolutionBatch::new(targets.iter().map(|target| target.dependency_path.clone()))
            .with_root(root)
            .with_literals(literals)
            .with_budget(budget);
        let outcome = self.coordinator.resolve_batch(&batch).await;
        let resolved_at = Utc::now();

        let mut resolutions: Vec<DependencyResolution> = targets
            .iter()
            .map(|target| classify(target, &outcome, resolved_at))
            .collect();
        resolutions.sort_by_key(|resolution| resolution.rule_id);
        resolutions
    }
}

fn classify(target: &DependencyTarget, outcome: &BatchOutcome, resolved_at: DateTime<Utc>) -> DependencyResolution {
    let mut resolution = DependencyResolution {
        rule_id: target.rule_id,
        status: DependencyStatus::Error,
        resolved_value: String::new(),
        dependency_path: target.dependency_path.clone(),
        resolved_at,
        message: None,
        error_detail: None,
    };

    if let Some(value) = outcome.resolved.get(&target.dependency_path) {
        if value.is_empty() {
            resolution.status = DependencyStatus::Pending;
            resolution.message = Some("dependency has no value yet".to_string());
        } else {
            resolution.status = DependencyStatus::Success;
            resolution.resolved_value = value.clone();
        }
        return resolution;
    }

    match outcome.failures.get(&target.dependency_path) {
        Some(failure) => apply_failure(&mut resolution, failure),
        None => resolution.message = Some("dependency path was not resolved".to_string()),
    }
    resolution
}

fn apply_failure(resolution: &mut DependencyResolution, failure: &PathFailure) {
    resolution.message = Some(failure.error.message.clone());
    if failure.unfilled {
        resolution.status = DependencyStatus::Pending;
        return;
    }
    resolution.status = DependencyStatus::Error;
    resolution.error_detail = Some(match &failure.error.details {
        Some(details) => format!("{}: {}", failure.code(), details),
        None => failure.code().to_string(),
    });
}
