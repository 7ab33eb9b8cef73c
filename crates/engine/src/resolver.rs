//! Single-path resolution against an entity accessor.
//!
//! A path is walked segment by segment starting from the root entity. The
//! current value is always one of: a single entity, a collection of entities,
//! or a scalar. Collections must be reduced immediately by `Count`, `First`,
//! or `Last`; `First`/`Last` yield an entity that navigation may continue
//! from, while `Count` yields a terminal scalar.
//!
//! Every outcome is returned as data. Accessor failures are converted into
//! [`ErrorCode::Exception`] here and never propagate further.

use std::{collections::HashMap, future::Future};

use realmpath_types::{AggregateKind, ErrorCode, PathSegment, PlaceholderPath, ResolutionError, ResolutionRoot};
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::accessor::{AccessorError, EntityAccessor, EntityHandle, PropertyValue};

/// A failed path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFailure {
    pub error: ResolutionError,
    /// True when navigation stopped at a value the user has not filled in yet
    /// (missing literal, unset relation, empty scalar) rather than at a
    /// genuinely broken path.
    pub unfilled: bool,
}

impl PathFailure {
    pub fn new(error: ResolutionError) -> Self {
        Self { error, unfilled: false }
    }

    fn unfilled(error: ResolutionError) -> Self {
        Self { error, unfilled: true }
    }

    pub fn code(&self) -> ErrorCode {
        self.error.error_code
    }
}

impl From<ResolutionError> for PathFailure {
    fn from(error: ResolutionError) -> Self {
        Self::new(error)
    }
}

enum Cursor {
    Entity(EntityHandle),
    Collection(Vec<EntityHandle>),
    Scalar(Option<String>),
}

/// Resolves placeholder paths for one batch.
///
/// The resolver borrows the batch inputs; it holds no state between calls,
/// so one instance may resolve any number of paths.
pub struct PathResolver<'a> {
    accessor: &'a dyn EntityAccessor,
    root: Option<&'a ResolutionRoot>,
    literals: &'a HashMap<String, String>,
    max_hops: usize,
    cancellation: CancellationToken,
}

impl<'a> PathResolver<'a> {
    pub fn new(
        accessor: &'a dyn EntityAccessor,
        root: Option<&'a ResolutionRoot>,
        literals: &'a HashMap<String, String>,
        max_hops: usize,
    ) -> Self {
        Self {
            accessor,
            root,
            literals,
            max_hops,
            cancellation: CancellationToken::new(),
        }
    }

    /// Attaches the batch cancellation token observed before every hop and
    /// during every accessor call.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Resolves one parsed path to a string value.
    pub async fn resolve(&self, path: &PlaceholderPath) -> Result<String, PathFailure> {
        let raw = path.raw();

        if path.is_layer_zero() {
            return self.literals.get(raw).cloned().ok_or_else(|| {
                PathFailure::unfilled(ResolutionError::new(
                    raw,
                    ErrorCode::DependencyNotFilled,
                    format!("no value was supplied for '{raw}'"),
                ))
            });
        }

        if path.hop_count() > self.max_hops {
            return Err(PathFailure::new(
                ResolutionError::new(raw, ErrorCode::ResolutionTimeout, "path exceeds the navigation hop budget").with_details(format!(
                    "path needs {} hops; budget allows {}",
                    path.hop_count(),
                    self.max_hops
                )),
            ));
        }

        let root_handle = self.resolve_root(path).await?;
        let mut cursor = Cursor::Entity(root_handle);
        let segments = path.navigation_segments();

        for (index, segment) in segments.iter().enumerate() {
            self.checkpoint(raw)?;
            let remaining = segments.len() - index - 1;
            cursor = match cursor {
                Cursor::Entity(handle) => self.step_from_entity(raw, &handle, segment, remaining).await?,
                Cursor::Collection(items) => reduce_collection(raw, items, segment, remaining)?,
                Cursor::Scalar(_) => {
                    return Err(PathFailure::new(ResolutionError::new(
                        raw,
                        ErrorCode::NavigationFailed,
                        format!("cannot read '{}' from a scalar value", segment.name()),
                    )));
                }
            };
        }

        match cursor {
            Cursor::Scalar(value) => Ok(value.unwrap_or_default()),
            Cursor::Entity(handle) => Ok(handle.id.to_string()),
            Cursor::Collection(_) => Err(PathFailure::new(
                ResolutionError::new(raw, ErrorCode::InvalidPath, "path ends at a collection")
                    .with_details("reduce the collection with Count, First, or Last"),
            )),
        }
    }

    async fn resolve_root(&self, path: &PlaceholderPath) -> Result<EntityHandle, PathFailure> {
        let raw = path.raw();
        let Some(root) = self.root else {
            return Err(PathFailure::new(ResolutionError::new(
                raw,
                ErrorCode::EntityNotFound,
                "no root entity was supplied for a navigating path",
            )));
        };

        let root_segment = path.root_segment().unwrap_or_default();
        if !root_segment.eq_ignore_ascii_case(&root.entity_type) {
            return Err(PathFailure::new(
                ResolutionError::new(raw, ErrorCode::EntityNotFound, format!("path root '{root_segment}' is not available"))
                    .with_details(format!("request root is {root}")),
            ));
        }

        if self.cancellation.is_cancelled() {
            return Err(deadline_elapsed(raw));
        }
        let handle = self
            .call(raw, &root.entity_type, self.accessor.get_entity(&root.entity_type, root.entity_id))
            .await?;
        handle.ok_or_else(|| {
            PathFailure::new(ResolutionError::new(
                raw,
                ErrorCode::EntityNotFound,
                format!("root entity {root} does not exist"),
            ))
        })
    }

    async fn step_from_entity(
        &self,
        raw: &str,
        handle: &EntityHandle,
        segment: &PathSegment,
        remaining: usize,
    ) -> Result<Cursor, PathFailure> {
        let name = match segment {
            PathSegment::Field(name) => name.as_str(),
            PathSegment::Aggregate(kind) => {
                return Err(PathFailure::new(
                    ResolutionError::new(raw, ErrorCode::InvalidPath, format!("'{kind}' can only be applied to a collection"))
                        .with_details(format!("{handle} is a single entity")),
                ));
            }
        };

        let value = self.call(raw, name, self.accessor.get_property(handle, name)).await?;
        match value {
            None => Err(PathFailure::new(ResolutionError::new(
                raw,
                ErrorCode::NavigationFailed,
                format!("{} has no property '{name}'", handle.entity_type),
            ))),
            Some(PropertyValue::Scalar(value)) => {
                if remaining == 0 {
                    Ok(Cursor::Scalar(value))
                } else {
                    Err(scalar_dead_end(raw, name, value.as_deref()))
                }
            }
            Some(PropertyValue::Related(Some(related))) => Ok(Cursor::Entity(related)),
            Some(PropertyValue::Related(None)) if remaining == 0 => Ok(Cursor::Scalar(None)),
            Some(PropertyValue::Related(None)) => Err(PathFailure::unfilled(ResolutionError::new(
                raw,
                ErrorCode::NavigationFailed,
                format!("'{name}' on {handle} is not set"),
            ))),
            Some(PropertyValue::Collection(items)) => Ok(Cursor::Collection(items)),
        }
    }

    fn checkpoint(&self, raw: &str) -> Result<(), PathFailure> {
        if self.cancellation.is_cancelled() {
            return Err(deadline_elapsed(raw));
        }
        Ok(())
    }

    /// Runs an accessor call, abandoning it when the batch is cancelled.
    async fn call<T, F>(&self, raw: &str, target: &str, operation: F) -> Result<T, PathFailure>
    where
        F: Future<Output = Result<T, AccessorError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(deadline_elapsed(raw)),
            result = operation => result.map_err(|accessor_error| {
                error!(path = %raw, target = %target, error = ?accessor_error, "entity accessor failed");
                PathFailure::new(ResolutionError::new(
                    raw,
                    ErrorCode::Exception,
                    format!("entity accessor failed while reading '{target}': {accessor_error}"),
                ))
            }),
        }
    }
}

fn reduce_collection(raw: &str, mut items: Vec<EntityHandle>, segment: &PathSegment, remaining: usize) -> Result<Cursor, PathFailure> {
    let kind = match segment {
        PathSegment::Aggregate(kind) => *kind,
        PathSegment::Field(name) => AggregateKind::from_keyword(name).ok_or_else(|| {
            PathFailure::new(
                ResolutionError::new(raw, ErrorCode::InvalidPath, format!("cannot read '{name}' from a collection"))
                    .with_details("reduce the collection with Count, First, or Last before navigating further"),
            )
        })?,
    };

    match kind {
        AggregateKind::Count if remaining > 0 => Err(PathFailure::new(ResolutionError::new(
            raw,
            ErrorCode::NavigationFailed,
            "cannot navigate past Count",
        ))),
        AggregateKind::Count => Ok(Cursor::Scalar(Some(items.len().to_string()))),
        AggregateKind::First | AggregateKind::Last => {
            items.sort();
            let picked = if kind == AggregateKind::First {
                items.into_iter().next()
            } else {
                items.pop()
            };
            picked.map(Cursor::Entity).ok_or_else(|| {
                PathFailure::new(ResolutionError::new(
                    raw,
                    ErrorCode::AggregateEmpty,
                    format!("{kind} was applied to an empty collection"),
                ))
            })
        }
    }
}

fn scalar_dead_end(raw: &str, name: &str, value: Option<&str>) -> PathFailure {
    let error = ResolutionError::new(raw, ErrorCode::NavigationFailed, format!("cannot navigate past scalar '{name}'"));
    if value.is_none_or(str::is_empty) {
        PathFailure::unfilled(error.with_details(format!("'{name}' has no value yet")))
    } else {
        PathFailure::new(error)
    }
}

fn deadline_elapsed(raw: &str) -> PathFailure {
    PathFailure::new(ResolutionError::new(
        raw,
        ErrorCode::ResolutionTimeout,
        "batch deadline elapsed before the path resolved",
    ))
}
