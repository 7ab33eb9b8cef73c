//! Request handling on top of the coordinator.
//!
//! This is the only layer that can fail a request as a whole, and it does so
//! strictly before any path is resolved: malformed roots, a missing or
//! ambiguous path source, or a rule id that does not exist. Once a request is
//! accepted the response is always produced, with per-path failures as data.

use std::sync::Arc;

use chrono::Utc;
use realmpath_types::{
    Budget, DependencyResolution, DependencyResolutionRequest, DependencyResolutionResponse, DependencyStatus, PlaceholderResolutionRequest,
    PlaceholderResolutionResponse, ResolutionBatch, ResolutionRoot, ValidationRule,
};
use thiserror::Error;
use tracing::debug;

use crate::{
    accessor::{AccessorError, EntityAccessor, RuleSource},
    coordinator::BatchResolutionCoordinator,
    dependency::{DependencyResolutionAdapter, DependencyTarget},
    templates::{extract_placeholders_from_all, render_template},
};

/// Request-level rejections.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request must supply explicitPaths or a ruleId whose messages contain placeholders")]
    MissingPathSource,

    #[error("request must supply either explicitPaths or ruleId, not both")]
    AmbiguousPathSource,

    #[error("validation rule {rule_id} does not exist")]
    RuleNotFound { rule_id: i64 },

    #[error("failed to load validation rule {rule_id}: {source}")]
    RuleLookup {
        rule_id: i64,
        #[source]
        source: AccessorError,
    },

    #[error("invalid root entity: {reason}")]
    InvalidRoot { reason: String },
}

impl RequestError {
    /// Stable machine-readable code for transport responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingPathSource => "MissingPathSource",
            Self::AmbiguousPathSource => "AmbiguousPathSource",
            Self::RuleNotFound { .. } => "RuleNotFound",
            Self::RuleLookup { .. } => "RuleLookupFailed",
            Self::InvalidRoot { .. } => "InvalidRoot",
        }
    }

    fn invalid_root(reason: impl Into<String>) -> Self {
        Self::InvalidRoot { reason: reason.into() }
    }
}

/// Entry point used by the HTTP layer and the CLI.
#[derive(Clone)]
pub struct ResolutionService {
    coordinator: BatchResolutionCoordinator,
    dependencies: DependencyResolutionAdapter,
    rules: Arc<dyn RuleSource>,
    budget: Budget,
}

impl ResolutionService {
    pub fn new(accessor: Arc<dyn EntityAccessor>, rules: Arc<dyn RuleSource>, budget: Budget) -> Self {
        let coordinator = BatchResolutionCoordinator::new(accessor);
        Self {
            dependencies: DependencyResolutionAdapter::new(coordinator.clone()),
            coordinator,
            rules,
            budget,
        }
    }

    /// Configured budget ceiling.
    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Resolves the placeholders named by a request.
    pub async fn resolve_placeholders(&self, request: PlaceholderResolutionRequest) -> Result<PlaceholderResolutionResponse, RequestError> {
        let root = build_root(request.root_entity_type.as_deref(), request.root_entity_id)?;
        let explicit_paths = request.explicit_paths.filter(|paths| !paths.is_empty());

        let (paths, rule) = match (explicit_paths, request.rule_id) {
            (Some(_), Some(_)) => return Err(RequestError::AmbiguousPathSource),
            (Some(paths), None) => (paths, None),
            (None, Some(rule_id)) => {
                let rule = self.load_rule(rule_id).await?;
                let paths = extract_placeholders_from_all(rule.message_templates());
                if paths.is_empty() {
                    return Err(RequestError::MissingPathSource);
                }
                (paths, Some(rule))
            }
            (None, None) => return Err(RequestError::MissingPathSource),
        };

        let budget = self.budget.tightened(request.budget.as_ref());
        debug!(
            path_count = paths.len(),
            rule_id = ?rule.as_ref().map(|rule| rule.id),
            root = ?root,
            "resolving placeholder request"
        );

        let batch = ResolutionBatch::new(paths)
            .with_root(root)
            .with_literals(request.literal_placeholders)
            .with_budget(budget);
        let outcome = self.coordinator.resolve_batch(&batch).await;

        let render = |template: Option<&String>| template.map(|template| render_template(template, &outcome.resolved));
        let (rendered_error_message, rendered_success_message) = match &rule {
            Some(rule) => (render(rule.error_message.as_ref()), render(rule.success_message.as_ref())),
            None => (None, None),
        };

        Ok(PlaceholderResolutionResponse {
            total_placeholders_requested: outcome.requested(),
            is_successful: outcome.is_successful(),
            resolution_errors: outcome.errors(),
            resolved_placeholders: outcome.resolved,
            rendered_error_message,
            rendered_success_message,
        })
    }

    /// Resolves the dependency path of each listed rule.
    ///
    /// Every listed rule must exist. Rules listed without an explicit path use
    /// the path stored on the rule; a rule that has none gets an `error` entry
    /// rather than failing the request.
    pub async fn resolve_dependencies(&self, request: DependencyResolutionRequest) -> Result<DependencyResolutionResponse, RequestError> {
        let root = build_root(request.root_entity_type.as_deref(), request.root_entity_id)?;

        let mut targets = Vec::with_capacity(request.dependencies.len());
        let mut unresolvable = Vec::new();
        for dependency in request.dependencies {
            let rule = self.load_rule(dependency.rule_id).await?;
            let path = dependency
                .dependency_path
                .filter(|path| !path.trim().is_empty())
                .or(rule.dependency_path);
            match path {
                Some(path) => targets.push(DependencyTarget::new(dependency.rule_id, path)),
                None => unresolvable.push(missing_dependency_path(dependency.rule_id)),
            }
        }

        let budget = self.budget.tightened(request.budget.as_ref());
        let mut dependencies = if targets.is_empty() {
            Vec::new()
        } else {
            self.dependencies
                .resolve(&targets, root, request.literal_placeholders, budget)
                .await
        };
        dependencies.extend(unresolvable);
        dependencies.sort_by_key(|resolution| resolution.rule_id);

        Ok(DependencyResolutionResponse { dependencies })
    }

    async fn load_rule(&self, rule_id: i64) -> Result<ValidationRule, RequestError> {
        self.rules
            .get_rule(rule_id)
            .await
            .map_err(|source| RequestError::RuleLookup { rule_id, source })?
            .ok_or(RequestError::RuleNotFound { rule_id })
    }
}

fn build_root(entity_type: Option<&str>, entity_id: Option<i64>) -> Result<Option<ResolutionRoot>, RequestError> {
    match (entity_type.map(str::trim), entity_id) {
        (None, None) => Ok(None),
        (Some(""), _) => Err(RequestError::invalid_root("rootEntityType must not be blank")),
        (Some(entity_type), Some(entity_id)) => Ok(Some(ResolutionRoot::new(entity_type, entity_id))),
        (Some(_), None) => Err(RequestError::invalid_root("rootEntityId is required when rootEntityType is set")),
        (None, Some(_)) => Err(RequestError::invalid_root("rootEntityType is required when rootEntityId is set")),
    }
}

fn missing_dependency_path(rule_id: i64) -> DependencyResolution {
    DependencyResolution {
        rule_id,
        status: DependencyStatus::Error,
        resolved_value: String::new(),
        dependency_path: String::new(),
        resolved_at: Utc::now(),
        message: Some(format!("validation rule {rule_id} has no dependency path")),
        error_detail: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{InMemoryEntityGraph, InMemoryRuleStore, PropertyRecord};
    use realmpath_types::{ErrorCode, RuleDependency};
    use std::collections::HashMap;

    fn literal_map<const N: usize>(entries: [(&str, &str); N]) -> HashMap<String, String> {
        entries.into_iter().map(|(key, value)| (key.to_string(), value.to_string())).collect()
    }

    fn service() -> ResolutionService {
        let graph = InMemoryEntityGraph::new().with_entity(
            "Town",
            4,
            [
                ("Name", PropertyRecord::scalar("York")),
                ("Districts", PropertyRecord::collection("District", [])),
            ],
        );
        let rules = InMemoryRuleStore::new([
            ValidationRule {
                id: 1,
                error_message: Some("{Town.Name} cannot hold more than {MaxDistricts} districts".into()),
                success_message: Some("{Town.Mayor.Name} approves".into()),
                dependency_path: Some("Town.Districts.Count".into()),
            },
            ValidationRule {
                id: 2,
                error_message: Some("plain message".into()),
                ..ValidationRule::default()
            },
            ValidationRule {
                id: 3,
                dependency_path: Some("Town.Mayor".into()),
                ..ValidationRule::default()
            },
        ]);
        ResolutionService::new(Arc::new(graph), Arc::new(rules), Budget::default())
    }

    fn town_request() -> PlaceholderResolutionRequest {
        PlaceholderResolutionRequest {
            root_entity_type: Some("Town".into()),
            root_entity_id: Some(4),
            ..PlaceholderResolutionRequest::default()
        }
    }

    #[tokio::test]
    async fn rule_templates_supply_paths_and_render_messages() {
        let request = PlaceholderResolutionRequest {
            rule_id: Some(1),
            literal_placeholders: literal_map([("MaxDistricts", "5")]),
            ..town_request()
        };
        let response = service().resolve_placeholders(request).await.expect("accepted");

        assert_eq!(response.total_placeholders_requested, 3);
        assert_eq!(
            response.rendered_error_message.as_deref(),
            Some("York cannot hold more than 5 districts")
        );
        assert_eq!(response.rendered_success_message.as_deref(), Some("{Town.Mayor.Name} approves"));
        assert_eq!(response.resolution_errors.len(), 1);
        assert_eq!(response.resolution_errors[0].error_code, ErrorCode::NavigationFailed);
        assert!(!response.is_successful);
    }

    #[tokio::test]
    async fn rejects_requests_without_a_single_path_source() {
        let service = service();
        assert!(matches!(
            service.resolve_placeholders(town_request()).await,
            Err(RequestError::MissingPathSource)
        ));

        let both = PlaceholderResolutionRequest {
            explicit_paths: Some(vec!["Town.Name".into()]),
            rule_id: Some(1),
            ..town_request()
        };
        assert!(matches!(service.resolve_placeholders(both).await, Err(RequestError::AmbiguousPathSource)));

        let no_tokens = PlaceholderResolutionRequest {
            rule_id: Some(2),
            ..town_request()
        };
        assert!(matches!(service.resolve_placeholders(no_tokens).await, Err(RequestError::MissingPathSource)));

        let unknown_rule = PlaceholderResolutionRequest {
            rule_id: Some(99),
            ..town_request()
        };
        assert!(matches!(
            service.resolve_placeholders(unknown_rule).await,
            Err(RequestError::RuleNotFound { rule_id: 99 })
        ));
    }

    #[tokio::test]
    async fn rejects_half_specified_roots() {
        let request = PlaceholderResolutionRequest {
            root_entity_type: Some("Town".into()),
            explicit_paths: Some(vec!["Town.Name".into()]),
            ..PlaceholderResolutionRequest::default()
        };
        assert!(matches!(service().resolve_placeholders(request).await, Err(RequestError::InvalidRoot { .. })));
    }

    #[tokio::test]
    async fn dependency_requests_prefer_listed_paths_over_stored_ones() {
        let request = DependencyResolutionRequest {
            root_entity_type: Some("Town".into()),
            root_entity_id: Some(4),
            literal_placeholders: HashMap::new(),
            dependencies: vec![
                RuleDependency {
                    rule_id: 2,
                    dependency_path: None,
                },
                RuleDependency {
                    rule_id: 1,
                    dependency_path: None,
                },
                RuleDependency {
                    rule_id: 3,
                    dependency_path: Some("Town.Name".into()),
                },
            ],
            budget: None,
        };
        let response = service().resolve_dependencies(request).await.expect("accepted");

        let statuses: Vec<_> = response
            .dependencies
            .iter()
            .map(|resolution| (resolution.rule_id, resolution.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                (1, DependencyStatus::Success),
                (2, DependencyStatus::Error),
                (3, DependencyStatus::Success)
            ]
        );
        assert_eq!(response.dependencies[0].resolved_value, "0");
        assert_eq!(response.dependencies[2].dependency_path, "Town.Name");
    }

    #[tokio::test]
    async fn dependency_requests_reject_unknown_rules_even_with_a_path() {
        let request = DependencyResolutionRequest {
            root_entity_type: Some("Town".into()),
            root_entity_id: Some(4),
            literal_placeholders: HashMap::new(),
            dependencies: vec![
                RuleDependency {
                    rule_id: 1,
                    dependency_path: None,
                },
                RuleDependency {
                    rule_id: 999,
                    dependency_path: Some("Town.Name".into()),
                },
            ],
            budget: None,
        };
        assert!(matches!(
            service().resolve_dependencies(request).await,
            Err(RequestError::RuleNotFound { rule_id: 999 })
        ));
    }
}
