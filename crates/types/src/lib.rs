//! Shared type definitions for the Realmpath placeholder resolution engine.
//!
//! This crate holds plain data: parsed paths, batch inputs, per-path errors,
//! and the request/response shapes exchanged with the CRUD layer. Parsing and
//! resolution live in `realmpath-engine`.

mod api;
mod path;
mod resolution;

pub use api::{
    DependencyResolution, DependencyResolutionRequest, DependencyResolutionResponse, DependencyStatus, PlaceholderResolutionRequest,
    PlaceholderResolutionResponse, RequestErrorBody, RuleDependency, ValidationRule,
};
pub use path::{AggregateKind, PathSegment, PlaceholderPath};
pub use resolution::{Budget, BudgetOverride, ErrorCode, ResolutionBatch, ResolutionError, ResolutionRoot};
