//! Per-request resolution inputs and per-path failures.

use std::{collections::HashMap, fmt, time::Duration};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Classification of a single path failure.
///
/// Every variant is non-fatal: a batch records these as data next to the
/// successfully resolved values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Malformed path syntax or a navigation shape the grammar does not allow.
    InvalidPath,
    /// A Layer-0 path with no matching literal value.
    DependencyNotFilled,
    /// The root entity is absent or does not exist.
    EntityNotFound,
    /// An intermediate hop was missing or tried to navigate past a scalar.
    NavigationFailed,
    /// `First`/`Last` applied to an empty collection.
    AggregateEmpty,
    /// Hop budget or batch deadline exceeded.
    ResolutionTimeout,
    /// Unexpected failure raised by the entity accessor.
    Exception,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPath => "InvalidPath",
            Self::DependencyNotFilled => "DependencyNotFilled",
            Self::EntityNotFound => "EntityNotFound",
            Self::NavigationFailed => "NavigationFailed",
            Self::AggregateEmpty => "AggregateEmpty",
            Self::ResolutionTimeout => "ResolutionTimeout",
            Self::Exception => "Exception",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure recorded for one placeholder path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionError {
    /// Raw path exactly as requested.
    pub placeholder_path: String,
    pub error_code: ErrorCode,
    /// Human-readable summary safe to show to callers.
    pub message: String,
    /// Optional free-text detail; never a stack trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ResolutionError {
    pub fn new(placeholder_path: impl Into<String>, error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            placeholder_path: placeholder_path.into(),
            error_code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.placeholder_path, self.error_code, self.message)
    }
}

/// Starting entity for navigating paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRoot {
    pub entity_type: String,
    pub entity_id: i64,
}

impl ResolutionRoot {
    pub fn new(entity_type: impl Into<String>, entity_id: i64) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
        }
    }
}

impl fmt::Display for ResolutionRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.entity_id)
    }
}

/// Cost bounds applied to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Budget {
    /// Maximum segments a single path may walk.
    pub max_hops: usize,
    /// Maximum path resolutions in flight at once.
    pub max_concurrent: usize,
    /// Deadline for the whole batch, in milliseconds.
    pub max_wall_clock_ms: u64,
}

impl Budget {
    pub const DEFAULT_MAX_HOPS: usize = 6;
    pub const DEFAULT_MAX_CONCURRENT: usize = 8;
    pub const DEFAULT_MAX_WALL_CLOCK_MS: u64 = 2_000;

    /// Largest accepted values for configured limits.
    pub const LIMIT_MAX_HOPS: usize = 64;
    pub const LIMIT_MAX_CONCURRENT: usize = 1_024;
    pub const LIMIT_MAX_WALL_CLOCK_MS: u64 = 600_000;

    pub fn max_wall_clock(&self) -> Duration {
        Duration::from_millis(self.max_wall_clock_ms)
    }

    /// Applies a caller override, only ever lowering the limits.
    ///
    /// Zero values in the override are ignored so a request cannot disable
    /// resolution entirely.
    pub fn tightened(&self, override_budget: Option<&BudgetOverride>) -> Self {
        let Some(requested) = override_budget else {
            return *self;
        };
        Self {
            max_hops: lower_limit(self.max_hops, requested.max_hops),
            max_concurrent: lower_limit(self.max_concurrent, requested.max_concurrent),
            max_wall_clock_ms: lower_limit(self.max_wall_clock_ms, requested.max_wall_clock_ms),
        }
    }
}

fn lower_limit<T: Ord + Copy + Default>(configured: T, requested: Option<T>) -> T {
    match requested {
        Some(value) if value > T::default() => configured.min(value),
        _ => configured,
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_hops: Self::DEFAULT_MAX_HOPS,
            max_concurrent: Self::DEFAULT_MAX_CONCURRENT,
            max_wall_clock_ms: Self::DEFAULT_MAX_WALL_CLOCK_MS,
        }
    }
}

/// Optional per-request budget adjustments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BudgetOverride {
    #[serde(default)]
    pub max_hops: Option<usize>,
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    #[serde(default)]
    pub max_wall_clock_ms: Option<u64>,
}

/// The unit of work for one request.
///
/// Paths are stored raw and deduplicated in first-seen order; the engine
/// parses each one exactly once when the batch is resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionBatch {
    pub paths: IndexSet<String>,
    pub root: Option<ResolutionRoot>,
    pub literals: HashMap<String, String>,
    pub budget: Budget,
}

impl ResolutionBatch {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_root(mut self, root: Option<ResolutionRoot>) -> Self {
        self.root = root;
        self
    }

    pub fn with_literals(mut self, literals: HashMap<String, String>) -> Self {
        self.literals = literals;
        self
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }
}
