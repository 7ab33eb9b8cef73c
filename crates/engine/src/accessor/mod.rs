//! Entity accessor seam between the resolution engine and the CRUD layer.
//!
//! Modules:
//! - `memory`: JSON-loadable in-memory entity graph and rule store used by the CLI, the server's fixture mode, and tests
//!
//! The engine never inspects concrete entity types. Implementations answer two
//! questions: "does this entity exist?" and "what does this property hold?".
//! Absence is ordinary data (`None`, an empty collection), never an error.

mod memory;

use std::fmt;

use async_trait::async_trait;
use realmpath_types::ValidationRule;
use thiserror::Error;

pub use memory::{
    CollectionReference, EntityGraphDocument, EntityRecord, EntityReference, InMemoryEntityGraph, InMemoryRuleStore, PropertyRecord,
};

/// Reference to a live entity returned by an accessor.
///
/// Handles order by id first so `First`/`Last` are stable regardless of the
/// order an accessor returns a collection in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    pub id: i64,
    pub entity_type: String,
}

impl EntityHandle {
    pub fn new(entity_type: impl Into<String>, id: i64) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
        }
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.id)
    }
}

/// Value held by an entity property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Already-stringified scalar; `None` when the field exists but has no value.
    Scalar(Option<String>),
    /// Single related entity; `None` when the relation is unset or dangling.
    Related(Option<EntityHandle>),
    /// Ordered collection of related entities.
    Collection(Vec<EntityHandle>),
}

/// Failures raised by accessor or rule source implementations.
#[derive(Debug, Error)]
pub enum AccessorError {
    #[error("backing store error: {message}")]
    Backend { message: String },

    #[error("backing store timed out during {operation}")]
    Timeout { operation: String },
}

impl AccessorError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into() }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }
}

/// Read-only capability the resolver walks paths with.
#[async_trait]
pub trait EntityAccessor: Send + Sync {
    /// Looks up an entity by type name and id.
    async fn get_entity(&self, entity_type: &str, id: i64) -> Result<Option<EntityHandle>, AccessorError>;

    /// Reads a property of an entity. Returns `Ok(None)` when the entity type
    /// has no property with that name.
    async fn get_property(&self, handle: &EntityHandle, name: &str) -> Result<Option<PropertyValue>, AccessorError>;
}

/// Supplies validation rules for rule-id requests.
#[async_trait]
pub trait RuleSource: Send + Sync {
    async fn get_rule(&self, rule_id: i64) -> Result<Option<ValidationRule>, AccessorError>;
}
