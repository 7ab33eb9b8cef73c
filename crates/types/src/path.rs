//! Parsed placeholder paths.
//!
//! A placeholder path is a dotted navigation expression such as
//! `Town.Districts.Count`. The engine parses raw text into a
//! [`PlaceholderPath`] once per request and hands the parsed form to the
//! resolver; this module only holds the data shapes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved aggregate keywords that may reduce a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateKind {
    /// Number of elements in the collection.
    Count,
    /// Element with the lowest entity id.
    First,
    /// Element with the highest entity id.
    Last,
}

impl AggregateKind {
    /// Matches `Count`, `First`, or `Last` case-insensitively.
    pub fn from_keyword(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("count") {
            Some(Self::Count)
        } else if text.eq_ignore_ascii_case("first") {
            Some(Self::First)
        } else if text.eq_ignore_ascii_case("last") {
            Some(Self::Last)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "Count",
            Self::First => "First",
            Self::Last => "Last",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dot-separated token of a placeholder path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name")]
pub enum PathSegment {
    /// A property name looked up on the current entity.
    Field(String),
    /// A reserved keyword in final position.
    Aggregate(AggregateKind),
}

impl PathSegment {
    /// Returns the segment text as it should appear in diagnostics.
    pub fn name(&self) -> &str {
        match self {
            Self::Field(name) => name.as_str(),
            Self::Aggregate(kind) => kind.as_str(),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate(_))
    }
}

/// Immutable parsed form of a raw placeholder path.
///
/// A single-segment path is a *Layer-0* path and is satisfied from
/// caller-supplied literal values only. Anything longer is a *navigating*
/// path whose first segment names the root entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceholderPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl PlaceholderPath {
    /// Builds a path from already-validated segments.
    ///
    /// Callers are expected to go through the engine's parser, which enforces
    /// that segments are non-empty and that aggregates only appear last.
    pub fn from_segments(raw: impl Into<String>, segments: Vec<PathSegment>) -> Self {
        Self {
            raw: raw.into(),
            segments,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// True for a single-segment path resolved from literals.
    pub fn is_layer_zero(&self) -> bool {
        self.segments.len() == 1
    }

    /// Name of the root entity for navigating paths.
    pub fn root_segment(&self) -> Option<&str> {
        if self.is_layer_zero() {
            return None;
        }
        self.segments.first().map(PathSegment::name)
    }

    /// Segments walked after the root lookup.
    pub fn navigation_segments(&self) -> &[PathSegment] {
        self.segments.get(1..).unwrap_or_default()
    }

    /// Number of hops the path costs: one per segment.
    pub fn hop_count(&self) -> usize {
        self.segments.len()
    }

    pub fn terminal_aggregate(&self) -> Option<AggregateKind> {
        match self.segments.last() {
            Some(PathSegment::Aggregate(kind)) => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for PlaceholderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_keywords_match_case_insensitively() {
        assert_eq!(AggregateKind::from_keyword("count"), Some(AggregateKind::Count));
        assert_eq!(AggregateKind::from_keyword("FIRST"), Some(AggregateKind::First));
        assert_eq!(AggregateKind::from_keyword("Last"), Some(AggregateKind::Last));
        assert_eq!(AggregateKind::from_keyword("Counts"), None);
    }

    #[test]
    fn layer_zero_paths_have_no_root_segment() {
        let path = PlaceholderPath::from_segments("Name", vec![PathSegment::Field("Name".into())]);
        assert!(path.is_layer_zero());
        assert_eq!(path.root_segment(), None);
        assert!(path.navigation_segments().is_empty());
    }

    #[test]
    fn navigating_path_exposes_root_and_tail() {
        let path = PlaceholderPath::from_segments(
            "Town.Districts.Count",
            vec![
                PathSegment::Field("Town".into()),
                PathSegment::Field("Districts".into()),
                PathSegment::Aggregate(AggregateKind::Count),
            ],
        );
        assert_eq!(path.root_segment(), Some("Town"));
        assert_eq!(path.navigation_segments().len(), 2);
        assert_eq!(path.hop_count(), 3);
        assert_eq!(path.terminal_aggregate(), Some(AggregateKind::Count));
        assert_eq!(path.to_string(), "Town.Districts.Count");
    }
}
