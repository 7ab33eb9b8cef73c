use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use realmpath_engine::{
    AccessorError, BatchResolutionCoordinator, EntityAccessor, EntityHandle, InMemoryEntityGraph, InMemoryRuleStore, PropertyValue,
    ResolutionService,
};
use realmpath_types::{Budget, ErrorCode, PlaceholderResolutionRequest, ResolutionBatch, ResolutionRoot};

/// Fixture graph wrapped with a call counter.
struct CountingAccessor {
    graph: InMemoryEntityGraph,
    calls: AtomicUsize,
}

impl CountingAccessor {
    fn load() -> Arc<Self> {
        let fixture = include_str!("data/realm_fixture.json");
        Arc::new(Self {
            graph: InMemoryEntityGraph::from_json_str(fixture).expect("load realm fixture"),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityAccessor for CountingAccessor {
    async fn get_entity(&self, entity_type: &str, id: i64) -> Result<Option<EntityHandle>, AccessorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.graph.get_entity(entity_type, id).await
    }

    async fn get_property(&self, handle: &EntityHandle, name: &str) -> Result<Option<PropertyValue>, AccessorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.graph.get_property(handle, name).await
    }
}

fn coordinator(accessor: &Arc<CountingAccessor>) -> BatchResolutionCoordinator {
    BatchResolutionCoordinator::new(accessor.clone())
}

fn town(id: i64) -> Option<ResolutionRoot> {
    Some(ResolutionRoot::new("Town", id))
}

#[tokio::test]
async fn counts_a_populated_collection() {
    let accessor = CountingAccessor::load();
    let batch = ResolutionBatch::new(["Town.Districts.Count"]).with_root(town(4));

    let outcome = coordinator(&accessor).resolve_batch(&batch).await;

    assert_eq!(outcome.resolved.get("Town.Districts.Count").map(String::as_str), Some("3"));
    assert!(outcome.is_successful(), "unexpected errors: {:?}", outcome.errors());
}

#[tokio::test]
async fn counts_an_empty_collection_as_zero() {
    let accessor = CountingAccessor::load();
    let batch = ResolutionBatch::new(["Town.Districts.Count"]).with_root(town(5));

    let outcome = coordinator(&accessor).resolve_batch(&batch).await;

    assert_eq!(outcome.resolved.get("Town.Districts.Count").map(String::as_str), Some("0"));
    assert!(outcome.is_successful());
}

#[tokio::test]
async fn first_of_an_empty_collection_is_aggregate_empty() {
    let accessor = CountingAccessor::load();
    let batch = ResolutionBatch::new(["Town.Districts.First.Name"]).with_root(town(5));

    let outcome = coordinator(&accessor).resolve_batch(&batch).await;

    assert!(outcome.resolved.is_empty());
    let errors = outcome.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].placeholder_path, "Town.Districts.First.Name");
    assert_eq!(errors[0].error_code, ErrorCode::AggregateEmpty);
    assert!(!outcome.is_successful());
}

#[tokio::test]
async fn navigating_without_a_root_is_entity_not_found() {
    let accessor = CountingAccessor::load();
    let batch = ResolutionBatch::new(["Town.Name"]);

    let outcome = coordinator(&accessor).resolve_batch(&batch).await;

    assert_eq!(outcome.errors()[0].error_code, ErrorCode::EntityNotFound);
}

#[tokio::test]
async fn literal_paths_never_touch_the_accessor() {
    let accessor = CountingAccessor::load();
    let literals = HashMap::from([("Name".to_string(), "York".to_string())]);
    let batch = ResolutionBatch::new(["Name", "Width"]).with_root(town(4)).with_literals(literals);

    let outcome = coordinator(&accessor).resolve_batch(&batch).await;

    assert_eq!(outcome.resolved.get("Name").map(String::as_str), Some("York"));
    assert_eq!(outcome.failures["Width"].code(), ErrorCode::DependencyNotFilled);
    assert_eq!(accessor.calls(), 0);
}

#[tokio::test]
async fn over_budget_paths_time_out_without_affecting_siblings() {
    let accessor = CountingAccessor::load();
    let literals = HashMap::from([("Name".to_string(), "York".to_string())]);
    let batch = ResolutionBatch::new(["Street.District.Town.Name.Extra", "Street.District.Town.Name", "Name"])
        .with_root(Some(ResolutionRoot::new("Street", 1)))
        .with_literals(literals)
        .with_budget(Budget {
            max_hops: 4,
            ..Budget::default()
        });

    let outcome = coordinator(&accessor).resolve_batch(&batch).await;

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures["Street.District.Town.Name.Extra"].code(), ErrorCode::ResolutionTimeout);
    assert_eq!(outcome.resolved.get("Street.District.Town.Name").map(String::as_str), Some("York"));
    assert_eq!(outcome.resolved.get("Name").map(String::as_str), Some("York"));
}

#[tokio::test]
async fn cyclic_graphs_stop_at_the_hop_bound() {
    let accessor = CountingAccessor::load();
    let batch = ResolutionBatch::new(["District.Town.Capital.Town.Capital.Town.Name"])
        .with_root(Some(ResolutionRoot::new("District", 1)))
        .with_budget(Budget {
            max_hops: 6,
            ..Budget::default()
        });

    let outcome = coordinator(&accessor).resolve_batch(&batch).await;

    assert_eq!(outcome.errors()[0].error_code, ErrorCode::ResolutionTimeout);
}

#[tokio::test]
async fn first_and_last_pick_by_ascending_id() {
    let accessor = CountingAccessor::load();
    let batch = ResolutionBatch::new(["Town.Districts.First.Name", "Town.Districts.Last.Name"]).with_root(town(4));

    let first_run = coordinator(&accessor).resolve_batch(&batch).await;
    let second_run = coordinator(&accessor).resolve_batch(&batch).await;

    assert_eq!(first_run.resolved.get("Town.Districts.First.Name").map(String::as_str), Some("Old Quarter"));
    assert_eq!(first_run.resolved.get("Town.Districts.Last.Name").map(String::as_str), Some("Market"));
    assert_eq!(first_run, second_run);
}

#[tokio::test]
async fn every_requested_path_lands_in_exactly_one_partition() {
    let accessor = CountingAccessor::load();
    let paths = [
        "Town.Name",
        "Town.Capital.Name",
        "Town.Capital.Town.Districts.Count",
        "Town.Mayor",
        "Town.Name.Length",
        "Town.Districts.Name",
        "Town..Name",
        "Count",
    ];
    let batch = ResolutionBatch::new(paths).with_root(town(4));

    let outcome = coordinator(&accessor).resolve_batch(&batch).await;

    assert_eq!(outcome.requested(), paths.len());
    for path in paths {
        let in_resolved = outcome.resolved.contains_key(path);
        let in_failures = outcome.failures.contains_key(path);
        assert!(in_resolved ^ in_failures, "{path} should be in exactly one partition");
    }
}

#[tokio::test]
async fn partial_failures_still_produce_a_response() {
    let accessor = CountingAccessor::load();
    let service = ResolutionService::new(accessor, Arc::new(InMemoryRuleStore::default()), Budget::default());
    let request = PlaceholderResolutionRequest {
        root_entity_type: Some("Town".into()),
        root_entity_id: Some(4),
        explicit_paths: Some(vec!["Town.Name".into(), "Town.Capital.Name".into(), "Town.Mayor.Name".into()]),
        ..PlaceholderResolutionRequest::default()
    };

    let response = service.resolve_placeholders(request).await.expect("request accepted");

    assert_eq!(response.total_placeholders_requested, 3);
    assert_eq!(response.resolved_placeholders.len(), 2);
    assert_eq!(response.resolution_errors.len(), 1);
    assert_eq!(response.resolution_errors[0].placeholder_path, "Town.Mayor.Name");
    assert!(!response.is_successful);
}
