//! Inbound requests and outbound responses exchanged with the CRUD layer.
//!
//! Field names follow the camelCase wire format used by the admin backend.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BudgetOverride, ResolutionError};

/// Request to resolve a set of placeholder paths.
///
/// Paths come either from `explicit_paths` or from the message templates of
/// the rule named by `rule_id`. Supplying both, or neither, is rejected before
/// any resolution work begins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderResolutionRequest {
    #[serde(default)]
    pub root_entity_type: Option<String>,
    #[serde(default)]
    pub root_entity_id: Option<i64>,
    /// Values for Layer-0 paths, keyed by the path text.
    #[serde(default)]
    pub literal_placeholders: HashMap<String, String>,
    #[serde(default)]
    pub explicit_paths: Option<Vec<String>>,
    #[serde(default)]
    pub rule_id: Option<i64>,
    #[serde(default)]
    pub budget: Option<BudgetOverride>,
}

/// Result of a placeholder resolution request.
///
/// Always returned with a success status once the request is accepted;
/// per-path failures live in `resolution_errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderResolutionResponse {
    /// Resolved values keyed by raw path, ordered by path.
    pub resolved_placeholders: BTreeMap<String, String>,
    /// Failures ordered by path.
    pub resolution_errors: Vec<ResolutionError>,
    pub total_placeholders_requested: usize,
    pub is_successful: bool,
    /// Rule error message with resolved values substituted; unresolved
    /// tokens are left in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_success_message: Option<String>,
}

/// Request to pre-resolve the dependency paths of several validation rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyResolutionRequest {
    #[serde(default)]
    pub root_entity_type: Option<String>,
    #[serde(default)]
    pub root_entity_id: Option<i64>,
    #[serde(default)]
    pub literal_placeholders: HashMap<String, String>,
    pub dependencies: Vec<RuleDependency>,
    #[serde(default)]
    pub budget: Option<BudgetOverride>,
}

/// A rule id plus the dependency path attached to it.
///
/// When `dependency_path` is omitted the path stored on the rule is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDependency {
    pub rule_id: i64,
    #[serde(default)]
    pub dependency_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyResolutionResponse {
    /// One entry per requested rule, ordered by rule id.
    pub dependencies: Vec<DependencyResolution>,
}

/// Outcome class of a resolved rule dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Success,
    /// The dependency exists but the user has not filled it in yet.
    Pending,
    Error,
}

/// Dependency value resolved for one validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyResolution {
    pub rule_id: i64,
    pub status: DependencyStatus,
    /// Empty unless `status` is `success`.
    pub resolved_value: String,
    pub dependency_path: String,
    pub resolved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Validation rule metadata consumed by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub id: i64,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub success_message: Option<String>,
    #[serde(default)]
    pub dependency_path: Option<String>,
}

impl ValidationRule {
    /// Message templates in the order they are scanned for placeholders.
    pub fn message_templates(&self) -> impl Iterator<Item = &str> {
        [self.error_message.as_deref(), self.success_message.as_deref()]
            .into_iter()
            .flatten()
    }
}

/// Request-level failure body returned at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestErrorBody {
    pub error_code: String,
    pub message: String,
}
