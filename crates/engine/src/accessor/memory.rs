use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use realmpath_types::ValidationRule;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{AccessorError, EntityAccessor, EntityHandle, PropertyValue, RuleSource};

/// Serialized form of an entity graph.
///
/// ```json
/// {
///   "entities": [
///     { "type": "Town", "id": 4, "properties": {
///         "Name": { "scalar": "York" },
///         "Capital": { "related": { "type": "District", "id": 1 } },
///         "Districts": { "collection": { "type": "District", "ids": [1, 2] } }
///     } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityGraphDocument {
    pub entities: Vec<EntityRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityRecord {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: i64,
    #[serde(default)]
    pub properties: HashMap<String, PropertyRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyRecord {
    /// Any JSON scalar; `null` means "no value".
    Scalar(Value),
    Related(Option<EntityReference>),
    Collection(CollectionReference),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityReference {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionReference {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone)]
struct StoredEntity {
    handle: EntityHandle,
    properties: HashMap<String, PropertyRecord>,
}

/// In-memory entity graph implementing [`EntityAccessor`].
///
/// Entity type names match case-insensitively; property names match exactly.
/// References to entities that are not in the graph resolve as absent.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityGraph {
    entities: HashMap<(String, i64), StoredEntity>,
}

impl InMemoryEntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(document: EntityGraphDocument) -> Result<Self> {
        let mut graph = Self::new();
        for record in document.entities {
            let key = entity_key(&record.entity_type, record.id);
            if graph.entities.contains_key(&key) {
                bail!("duplicate entity {}#{} in graph fixture", record.entity_type, record.id);
            }
            graph.insert_record(record);
        }
        Ok(graph)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let document: EntityGraphDocument = serde_json::from_str(content).context("invalid entity graph JSON")?;
        Self::from_document(document)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("failed to read entity graph {}", path.display()))?;
        let graph = Self::from_json_str(&content).with_context(|| format!("failed to load entity graph {}", path.display()))?;
        debug!(path = %path.display(), entity_count = graph.len(), "loaded entity graph fixture");
        Ok(graph)
    }

    /// Adds or replaces an entity.
    pub fn insert_record(&mut self, record: EntityRecord) {
        let key = entity_key(&record.entity_type, record.id);
        self.entities.insert(
            key,
            StoredEntity {
                handle: EntityHandle::new(record.entity_type, record.id),
                properties: record.properties,
            },
        );
    }

    /// Convenience builder used by fixtures and tests.
    pub fn with_entity<I, K>(mut self, entity_type: &str, id: i64, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, PropertyRecord)>,
        K: Into<String>,
    {
        self.insert_record(EntityRecord {
            entity_type: entity_type.to_string(),
            id,
            properties: properties.into_iter().map(|(name, value)| (name.into(), value)).collect(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn lookup(&self, entity_type: &str, id: i64) -> Option<&StoredEntity> {
        self.entities.get(&entity_key(entity_type, id))
    }

    fn existing_handle(&self, entity_type: &str, id: i64) -> Option<EntityHandle> {
        self.lookup(entity_type, id).map(|entity| entity.handle.clone())
    }
}

impl PropertyRecord {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar(value.into())
    }

    pub fn null() -> Self {
        Self::Scalar(Value::Null)
    }

    pub fn related(entity_type: &str, id: i64) -> Self {
        Self::Related(Some(EntityReference {
            entity_type: entity_type.to_string(),
            id,
        }))
    }

    pub fn unset_relation() -> Self {
        Self::Related(None)
    }

    pub fn collection(entity_type: &str, ids: impl IntoIterator<Item = i64>) -> Self {
        Self::Collection(CollectionReference {
            entity_type: entity_type.to_string(),
            ids: ids.into_iter().collect(),
        })
    }
}

fn entity_key(entity_type: &str, id: i64) -> (String, i64) {
    (entity_type.to_ascii_lowercase(), id)
}

fn stringify_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl EntityAccessor for InMemoryEntityGraph {
    async fn get_entity(&self, entity_type: &str, id: i64) -> Result<Option<EntityHandle>, AccessorError> {
        Ok(self.existing_handle(entity_type, id))
    }

    async fn get_property(&self, handle: &EntityHandle, name: &str) -> Result<Option<PropertyValue>, AccessorError> {
        let Some(entity) = self.lookup(&handle.entity_type, handle.id) else {
            return Err(AccessorError::backend(format!("entity {handle} disappeared from the graph")));
        };
        let Some(record) = entity.properties.get(name) else {
            return Ok(None);
        };

        let value = match record {
            PropertyRecord::Scalar(value) => PropertyValue::Scalar(stringify_scalar(value)),
            PropertyRecord::Related(reference) => PropertyValue::Related(
                reference
                    .as_ref()
                    .and_then(|reference| self.existing_handle(&reference.entity_type, reference.id)),
            ),
            PropertyRecord::Collection(collection) => PropertyValue::Collection(
                collection
                    .ids
                    .iter()
                    .filter_map(|id| self.existing_handle(&collection.entity_type, *id))
                    .collect(),
            ),
        };
        Ok(Some(value))
    }
}

/// In-memory [`RuleSource`] keyed by rule id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleStore {
    rules: HashMap<i64, ValidationRule>,
}

impl InMemoryRuleStore {
    pub fn new<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = ValidationRule>,
    {
        Self {
            rules: rules.into_iter().map(|rule| (rule.id, rule)).collect(),
        }
    }

    /// Loads a JSON array of rules.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("failed to read rules {}", path.display()))?;
        let rules: Vec<ValidationRule> =
            serde_json::from_str(&content).with_context(|| format!("invalid rules JSON in {}", path.display()))?;
        debug!(path = %path.display(), rule_count = rules.len(), "loaded validation rules");
        Ok(Self::new(rules))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl RuleSource for InMemoryRuleStore {
    async fn get_rule(&self, rule_id: i64) -> Result<Option<ValidationRule>, AccessorError> {
        Ok(self.rules.get(&rule_id).cloned())
    }
}
