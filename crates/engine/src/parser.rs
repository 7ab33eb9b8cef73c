//! Placeholder path parsing.
//!
//! Splits raw text on `.` and classifies each segment. `Count`, `First`, and
//! `Last` are reserved only in final position; the same text earlier in a path
//! is an ordinary field name and is disambiguated by the resolver based on the
//! shape of the value it is applied to.

use realmpath_types::{AggregateKind, PathSegment, PlaceholderPath};
use thiserror::Error;

/// Reasons a raw path cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("placeholder path is empty")]
    Empty,

    #[error("placeholder path '{raw}' has an empty segment at position {position}")]
    EmptySegment { raw: String, position: usize },

    #[error("placeholder path '{raw}' contains whitespace in segment '{segment}'")]
    Whitespace { raw: String, segment: String },
}

/// Parses a raw placeholder path.
///
/// Surrounding whitespace is trimmed; the trimmed text becomes the canonical
/// raw form. Whitespace inside a segment is rejected.
pub fn parse_path(raw: &str) -> Result<PlaceholderPath, PathParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathParseError::Empty);
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    let last_index = parts.len() - 1;
    let mut segments = Vec::with_capacity(parts.len());

    for (position, part) in parts.iter().enumerate() {
        if part.is_empty() {
            return Err(PathParseError::EmptySegment {
                raw: trimmed.to_string(),
                position,
            });
        }
        if part.chars().any(char::is_whitespace) {
            return Err(PathParseError::Whitespace {
                raw: trimmed.to_string(),
                segment: (*part).to_string(),
            });
        }

        // A lone keyword is a Layer-0 literal name, not an aggregate over nothing.
        let aggregate = if position == last_index && last_index > 0 {
            AggregateKind::from_keyword(part)
        } else {
            None
        };
        segments.push(match aggregate {
            Some(kind) => PathSegment::Aggregate(kind),
            None => PathSegment::Field((*part).to_string()),
        });
    }

    Ok(PlaceholderPath::from_segments(trimmed, segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> PathSegment {
        PathSegment::Field(name.to_string())
    }

    #[test]
    fn parses_navigating_path_with_trailing_aggregate() {
        let path = parse_path("Town.Districts.Count").expect("parsed");
        assert_eq!(
            path.segments(),
            &[field("Town"), field("Districts"), PathSegment::Aggregate(AggregateKind::Count)]
        );
    }

    #[test]
    fn aggregate_keyword_mid_path_stays_a_field() {
        let path = parse_path("Town.Districts.First.Name").expect("parsed");
        assert_eq!(path.segments()[2], field("First"));
        assert_eq!(path.terminal_aggregate(), None);
    }

    #[test]
    fn trailing_keyword_is_case_insensitive() {
        let path = parse_path("Town.Districts.last").expect("parsed");
        assert_eq!(path.terminal_aggregate(), Some(AggregateKind::Last));
    }

    #[test]
    fn single_keyword_is_a_layer_zero_field() {
        let path = parse_path("Count").expect("parsed");
        assert!(path.is_layer_zero());
        assert_eq!(path.segments(), &[field("Count")]);
    }

    #[test]
    fn rejects_empty_and_hollow_paths() {
        assert_eq!(parse_path("  "), Err(PathParseError::Empty));
        assert!(matches!(
            parse_path("Town..Name"),
            Err(PathParseError::EmptySegment { position: 1, .. })
        ));
        assert!(matches!(parse_path(".Name"), Err(PathParseError::EmptySegment { position: 0, .. })));
        assert!(matches!(parse_path("Town."), Err(PathParseError::EmptySegment { position: 1, .. })));
    }

    #[test]
    fn rejects_inner_whitespace_but_trims_edges() {
        assert!(matches!(parse_path("Town.Dis tricts"), Err(PathParseError::Whitespace { .. })));
        assert_eq!(parse_path(" Town.Name ").expect("parsed").raw(), "Town.Name");
    }
}
