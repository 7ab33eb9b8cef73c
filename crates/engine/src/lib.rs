//! # Realmpath Engine
//!
//! The Realmpath Engine resolves dot-separated placeholder paths such as
//! `Structure.District.Town.Name` against a live entity graph and reports
//! every outcome, success or failure, as data.
//!
//! ## Key Features
//!
//! - **Path Parsing**: Splits raw paths into field and aggregate segments
//! - **Graph Navigation**: Walks relations from a root entity through an [`accessor::EntityAccessor`]
//! - **Aggregates**: `Count`, `First`, and `Last` over entity collections
//! - **Bounded Batches**: Hop, concurrency, and wall-clock limits per batch
//! - **Rule Dependencies**: Classifies rule dependency paths as success, pending, or error
//!
//! ## Usage
//!
//! ```rust
//! use realmpath_engine::parser::parse_path;
//!
//! let path = parse_path("Town.Districts.Count")?;
//! assert_eq!(path.segments().len(), 3);
//! assert!(path.terminal_aggregate().is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`parser`**: Path grammar
//! - **`templates`**: Placeholder extraction from and rendering into message templates
//! - **`accessor`**: Entity accessor and rule source seams, plus in-memory implementations
//! - **`resolver`**: Single-path navigation
//! - **`coordinator`**: Batch fan-out under a budget
//! - **`dependency`**: Rule dependency classification
//! - **`service`**: Request validation and response assembly

pub mod accessor;
pub mod coordinator;
pub mod dependency;
pub mod parser;
pub mod resolver;
mod service;
pub mod templates;

pub use accessor::{AccessorError, EntityAccessor, EntityHandle, InMemoryEntityGraph, InMemoryRuleStore, PropertyValue, RuleSource};
pub use coordinator::{BatchOutcome, BatchResolutionCoordinator};
pub use dependency::{DependencyResolutionAdapter, DependencyTarget};
pub use parser::{PathParseError, parse_path};
pub use resolver::{PathFailure, PathResolver};
pub use service::{RequestError, ResolutionService};
pub use templates::{extract_placeholders, extract_placeholders_from_all, render_template};
